//! Real-time message protocol definitions
//!
//! JSON-based bidirectional message protocol using Serde's tagged enum
//! for type-safe serialization/deserialization.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::types::Song;

/// Client → Server message
///
/// Uses tagged enum with snake_case naming.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Attach this connection to a room's queue updates
    CreateRoom { room_code: String },
}

/// Server → Client message
///
/// Uses tagged enum with snake_case naming.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection successful, client ID issued
    Connected { client_id: String },
    /// Authoritative queue after a change
    UpdateQueue { queue: Vec<Song> },
    /// The subscribed room no longer exists
    RoomClosed { room_code: String },
    /// Error occurred
    Error { code: ErrorCode, message: String },
}

/// Error codes for ServerMessage::Error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Non-existent room code
    RoomNotFound,
    /// Invalid message format
    InvalidMessage,
    /// Anything else
    Internal,
}

/// Convert AppError to ServerMessage for client notification
impl From<AppError> for ServerMessage {
    fn from(err: AppError) -> Self {
        let (code, message) = match &err {
            AppError::RoomNotFound(room_code) => {
                (ErrorCode::RoomNotFound, format!("Room '{}' not found", room_code))
            }
            AppError::Json(e) => {
                (ErrorCode::InvalidMessage, format!("Invalid message format: {}", e))
            }
            _ => (ErrorCode::Internal, "Internal error".to_string()),
        };
        ServerMessage::Error { code, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RoomCode;

    #[test]
    fn test_client_message_deserialize() {
        let json = r#"{"type": "create_room", "room_code": "ABCD"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        let ClientMessage::CreateRoom { room_code } = msg;
        assert_eq!(room_code, "ABCD");
    }

    #[test]
    fn test_unknown_client_message_rejected() {
        let json = r#"{"type": "chat", "content": "hi"}"#;
        assert!(serde_json::from_str::<ClientMessage>(json).is_err());
    }

    #[test]
    fn test_update_queue_serialize() {
        let song = match serde_json::json!({ "id": "s1" }) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        let msg = ServerMessage::UpdateQueue { queue: vec![song] };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "type": "update_queue", "queue": [{ "id": "s1" }] })
        );
    }

    #[test]
    fn test_room_not_found_conversion() {
        let msg: ServerMessage = AppError::RoomNotFound(RoomCode::parse("ABCD")).into();
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"code\":\"room_not_found\""));
        assert!(json.contains("ABCD"));
    }
}
