//! Room struct definition
//!
//! A room owns one song queue and the search credential it was created with.

use std::time::Instant;

use crate::types::{RoomCode, Song};

/// Collaborative queue room
///
/// Only reachable through `RoomRegistry`; callers receive copies of the
/// queue, never references into it.
#[derive(Debug)]
pub struct Room {
    /// Room code for identification
    pub code: RoomCode,
    /// Bearer token forwarded to the search provider
    credential: String,
    /// Ordered song queue
    queue: Vec<Song>,
    /// Room creation time
    pub created_at: Instant,
}

impl Room {
    /// Create an empty room with the given code and credential
    pub fn new(code: RoomCode, credential: String) -> Self {
        Self {
            code,
            credential,
            queue: Vec::new(),
            created_at: Instant::now(),
        }
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }

    pub fn queue(&self) -> &[Song] {
        &self.queue
    }

    /// Replace the whole queue (client-side reordering)
    pub fn replace_queue(&mut self, queue: Vec<Song>) {
        self.queue = queue;
    }

    /// Append one song to the end of the queue
    pub fn push_song(&mut self, song: Song) {
        self.queue.push(song);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn song(id: &str) -> Song {
        match json!({ "id": id }) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_room_creation() {
        let room = Room::new(RoomCode::parse("ABCD"), "tok1".to_string());

        assert_eq!(room.code.as_str(), "ABCD");
        assert_eq!(room.credential(), "tok1");
        assert!(room.queue().is_empty());
    }

    #[test]
    fn test_push_song_appends_in_order() {
        let mut room = Room::new(RoomCode::parse("ABCD"), String::new());
        room.push_song(song("s1"));
        room.push_song(song("s2"));

        assert_eq!(room.queue(), &[song("s1"), song("s2")]);
    }

    #[test]
    fn test_replace_queue() {
        let mut room = Room::new(RoomCode::parse("ABCD"), String::new());
        room.push_song(song("s1"));
        room.replace_queue(vec![song("s3"), song("s2")]);

        assert_eq!(room.queue(), &[song("s3"), song("s2")]);

        room.replace_queue(Vec::new());
        assert!(room.queue().is_empty());
    }
}
