//! Room registry
//!
//! Process-wide map from room code to `Room`. Owned by the `RoomServer` actor,
//! so every operation here runs to completion without interleaving.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::code::{CodeGenerator, RandomCodeGenerator, DEFAULT_CODE_LENGTH};
use crate::error::AppError;
use crate::room::Room;
use crate::types::{RoomCode, Song};

/// Default cap on consecutive code collisions before giving up
pub const DEFAULT_MAX_CODE_ATTEMPTS: usize = 10_000;

/// Registry tuning
#[derive(Debug, Clone, Copy)]
pub struct RegistryConfig {
    /// Letters per generated room code
    pub code_length: usize,
    /// Collisions tolerated by `create_room` before `CapacityExceeded`
    pub max_code_attempts: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            code_length: DEFAULT_CODE_LENGTH,
            max_code_attempts: DEFAULT_MAX_CODE_ATTEMPTS,
        }
    }
}

/// Owner of every live room
pub struct RoomRegistry {
    rooms: HashMap<RoomCode, Room>,
    generator: Box<dyn CodeGenerator>,
    config: RegistryConfig,
}

impl RoomRegistry {
    /// Create an empty registry drawing codes from `generator`
    pub fn new(generator: Box<dyn CodeGenerator>, config: RegistryConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            generator,
            config,
        }
    }

    /// Allocate a fresh code and store a new room under it.
    ///
    /// Candidates are drawn until one is not a live code. With 26^4 codes this
    /// terminates quickly in practice; the attempt cap only trips when the
    /// keyspace is nearly exhausted.
    pub fn create_room(&mut self, credential: String) -> Result<RoomCode, AppError> {
        let mut attempts = 0;
        let code = loop {
            if attempts >= self.config.max_code_attempts {
                warn!(
                    "Gave up allocating a room code after {} attempts ({} live rooms)",
                    attempts,
                    self.rooms.len()
                );
                return Err(AppError::CapacityExceeded { attempts });
            }
            attempts += 1;

            let code = self.generator.generate(self.config.code_length);
            if !self.rooms.contains_key(&code) {
                break code;
            }
            debug!("Room code {} already taken, retrying", code);
        };

        self.rooms
            .insert(code.clone(), Room::new(code.clone(), credential));
        info!("Room {} created ({} live rooms)", code, self.rooms.len());

        Ok(code)
    }

    pub fn exists(&self, code: &RoomCode) -> bool {
        self.rooms.contains_key(code)
    }

    /// Copy of the room's current queue
    pub fn get_queue(&self, code: &RoomCode) -> Result<Vec<Song>, AppError> {
        Ok(self.room(code)?.queue().to_vec())
    }

    /// Overwrite the room's queue wholesale
    pub fn replace_queue(&mut self, code: &RoomCode, queue: Vec<Song>) -> Result<(), AppError> {
        let room = self.room_mut(code)?;
        room.replace_queue(queue);
        debug!("Room {} queue replaced ({} songs)", code, room.queue().len());
        Ok(())
    }

    /// Append one song and return the resulting queue
    pub fn append_song(&mut self, code: &RoomCode, song: Song) -> Result<Vec<Song>, AppError> {
        let room = self.room_mut(code)?;
        room.push_song(song);
        debug!("Room {} queue now {} songs", code, room.queue().len());
        Ok(room.queue().to_vec())
    }

    pub fn credential(&self, code: &RoomCode) -> Result<String, AppError> {
        Ok(self.room(code)?.credential().to_string())
    }

    /// Delete a room. Removing an absent code is a no-op.
    ///
    /// Returns whether a room was actually removed.
    pub fn remove(&mut self, code: &RoomCode) -> bool {
        match self.rooms.remove(code) {
            Some(room) => {
                info!(
                    "Room {} removed after {:?} ({} live rooms)",
                    code,
                    room.created_at.elapsed(),
                    self.rooms.len()
                );
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    fn room(&self, code: &RoomCode) -> Result<&Room, AppError> {
        self.rooms
            .get(code)
            .ok_or_else(|| AppError::RoomNotFound(code.clone()))
    }

    fn room_mut(&mut self, code: &RoomCode) -> Result<&mut Room, AppError> {
        self.rooms
            .get_mut(code)
            .ok_or_else(|| AppError::RoomNotFound(code.clone()))
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(Box::new(RandomCodeGenerator), RegistryConfig::default())
    }
}
