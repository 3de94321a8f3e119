//! Wire protocol: JSON messages over the WebSocket.

use serde::{Deserialize, Serialize};
use starfall_core::entities::EntityId;
use starfall_core::game_loop::{PlayerCommand, TickEvents};
use starfall_core::snapshot::WorldSnapshot;

/// Messages the client sends to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    /// Join the game under a display name.
    Login {
        /// Display name.
        username: String,
    },
    /// Queue a command for the next tick. Requires a prior login.
    Action(PlayerCommand),
}

/// Messages the server sends to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    /// Login accepted.
    LoginSuccess {
        /// Player created for this connection.
        player_id: EntityId,
        /// Greeting.
        message: String,
    },
    /// A message could not be handled.
    Error {
        /// What went wrong.
        message: String,
    },
    /// State after a tick.
    WorldUpdate(WorldUpdate),
}

impl ServerMessage {
    /// Build an error message.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// Snapshot and events of one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldUpdate {
    /// World after the tick.
    pub snapshot: WorldSnapshot,
    /// What happened during the tick.
    pub events: TickEvents,
}

#[cfg(test)]
mod tests {
    use super::*;
    use starfall_core::entities::Position;

    #[test]
    fn test_login_wire_shape() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"Login","data":{"username":"Ana"}}"#).unwrap();
        assert_eq!(msg, ClientMessage::Login { username: "Ana".into() });
    }

    #[test]
    fn test_action_wire_shape() {
        let text = r#"{"type":"Action","data":{"type":"Move","data":{"to":{"x":1,"y":2,"z":0}}}}"#;
        let msg: ClientMessage = serde_json::from_str(text).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Action(PlayerCommand::Move {
                to: Position::new(1, 2, 0)
            })
        );

        let unit: ClientMessage =
            serde_json::from_str(r#"{"type":"Action","data":{"type":"LeaveFaction"}}"#).unwrap();
        assert_eq!(unit, ClientMessage::Action(PlayerCommand::LeaveFaction));
    }

    #[test]
    fn test_error_serializes_with_tag() {
        let text = serde_json::to_string(&ServerMessage::error("login required")).unwrap();
        assert_eq!(text, r#"{"type":"Error","data":{"message":"login required"}}"#);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"Dance","data":{}}"#).is_err());
    }
}
