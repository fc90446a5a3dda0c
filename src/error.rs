use thiserror::Error;

/// Rejections reported by a rules engine. The reducer absorbs these as no-ops.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RulesError {
    #[error("Invalid position: {0}")]
    InvalidPosition(String),

    #[error("Invalid square: {0}")]
    InvalidSquare(String),

    #[error("Illegal move: {from}-{to}")]
    IllegalMove { from: String, to: String },

    #[error("Starting position must have white to move: {0}")]
    NotWhiteToMove(String),
}

/// Errors the relay reports back to a connected client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Game not found: {0}")]
    GameNotFound(String),

    #[error("No game ID provided")]
    MissingGameId,

    #[error("No action provided")]
    MissingAction,

    #[error("Not in a game")]
    NotInGame,

    #[error("Game is full")]
    GameFull,

    #[error("You are a spectator")]
    Spectator,

    #[error("Cannot act for {0}")]
    WrongSeat(String),

    #[error("Game over can only be declared by the server")]
    ReservedAction,

    #[error("Unknown message type: {0}")]
    UnknownMessage(String),

    #[error("Cannot move while viewing an earlier position")]
    ViewingHistory,

    #[error(transparent)]
    Rules(#[from] RulesError),
}
