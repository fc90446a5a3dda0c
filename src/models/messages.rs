use actix::Message;
use serde::{Deserialize, Serialize};

use crate::game::ClockSnapshot;
use crate::models::{GameAction, SessionState};

/// Message sent from client to server
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ClientMessage {
    /// One of `create`, `join`, `action`, `sync`, `view`
    pub message_type: String,
    pub game_id: Option<String>,
    pub color_preference: Option<String>,
    pub base_minutes: Option<u32>,
    pub increment_seconds: Option<u32>,
    pub action: Option<GameAction>,
    /// For `view`: show the position after this zero-based ply, or the live one when absent
    pub ply: Option<usize>,
}

/// Message sent from server to client
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ServerMessage {
    pub message_type: String,
    pub game_id: Option<String>,
    pub color: Option<String>,
    pub state: Option<SessionState>,
    pub clock: Option<ClockSnapshot>,
    /// Actions applied to produce `state`, in order
    pub applied: Option<Vec<GameAction>>,
    /// Board index this connection is viewing, set on `history_view`
    pub view_index: Option<usize>,
    pub error: Option<String>,
}

impl ServerMessage {
    pub fn error(game_id: Option<String>, error: impl ToString) -> Self {
        Self {
            message_type: "error".to_string(),
            game_id,
            error: Some(error.to_string()),
            ..Default::default()
        }
    }

    pub fn with_state(
        message_type: &str,
        game_id: &str,
        state: &SessionState,
        clock: ClockSnapshot,
    ) -> Self {
        Self {
            message_type: message_type.to_string(),
            game_id: Some(game_id.to_string()),
            state: Some(state.clone()),
            clock: Some(clock),
            ..Default::default()
        }
    }
}

/// Message type for WebSocket communication
#[derive(Message)]
#[rtype(result = "()")]
pub struct ChessWebSocketMessage(pub String);
