use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Standard chess starting position
pub const STARTING_POSITION: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// One of the two seats at the board
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PlayerColor {
    White,
    Black,
}

impl PlayerColor {
    pub fn opposite(self) -> Self {
        match self {
            PlayerColor::White => PlayerColor::Black,
            PlayerColor::Black => PlayerColor::White,
        }
    }

    /// The color that plays the move with the given zero-based ply index
    pub fn for_ply(ply: usize) -> Self {
        if ply % 2 == 0 {
            PlayerColor::White
        } else {
            PlayerColor::Black
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlayerColor::White => "white",
            PlayerColor::Black => "black",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GameVariant {
    #[default]
    Standard,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimeControl {
    pub base_minutes: u32,
    pub increment_seconds: u32,
}

impl TimeControl {
    pub fn new(base_minutes: u32, increment_seconds: u32) -> Self {
        Self {
            base_minutes,
            increment_seconds,
        }
    }

    pub fn base_ms(&self) -> i64 {
        i64::from(self.base_minutes) * 60_000
    }

    pub fn increment_ms(&self) -> i64 {
        i64::from(self.increment_seconds) * 1_000
    }
}

impl Default for TimeControl {
    fn default() -> Self {
        Self::new(5, 3)
    }
}

/// Piece a pawn may promote to
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotionPiece {
    #[serde(rename = "q")]
    Queen,
    #[serde(rename = "r")]
    Rook,
    #[serde(rename = "b")]
    Bishop,
    #[serde(rename = "n")]
    Knight,
}

/// A proposed move; legality is left to the rules engine
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Move {
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<PromotionPiece>,
}

impl Move {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            promotion: None,
        }
    }

    pub fn promoting(mut self, piece: PromotionPiece) -> Self {
        self.promotion = Some(piece);
        self
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum GameStatus {
    Waiting,
    InProgress,
    Complete,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum GameOverReason {
    Checkmate,
    WhiteResignation,
    BlackResignation,
    Stalemate,
    InsufficientMaterial,
    ThreefoldRepetition,
    WhiteTimeout,
    BlackTimeout,
    DrawAgreed,
}

impl GameOverReason {
    pub fn resignation(color: PlayerColor) -> Self {
        match color {
            PlayerColor::White => GameOverReason::WhiteResignation,
            PlayerColor::Black => GameOverReason::BlackResignation,
        }
    }

    pub fn timeout(color: PlayerColor) -> Self {
        match color {
            PlayerColor::White => GameOverReason::WhiteTimeout,
            PlayerColor::Black => GameOverReason::BlackTimeout,
        }
    }
}

/// Identity bound to each seat
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Players {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub white: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub black: Option<String>,
}

impl Players {
    pub fn get(&self, color: PlayerColor) -> Option<&str> {
        match color {
            PlayerColor::White => self.white.as_deref(),
            PlayerColor::Black => self.black.as_deref(),
        }
    }

    pub fn both_seated(&self) -> bool {
        self.white.is_some() && self.black.is_some()
    }

    pub fn color_of(&self, player_id: &str) -> Option<PlayerColor> {
        if self.white.as_deref() == Some(player_id) {
            Some(PlayerColor::White)
        } else if self.black.as_deref() == Some(player_id) {
            Some(PlayerColor::Black)
        } else {
            None
        }
    }

    fn slot_mut(&mut self, color: PlayerColor) -> &mut Option<String> {
        match color {
            PlayerColor::White => &mut self.white,
            PlayerColor::Black => &mut self.black,
        }
    }
}

/// Pending rollback targets, keyed by the requesting color
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct TakebackRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub white: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub black: Option<usize>,
}

impl TakebackRequest {
    pub fn get(&self, color: PlayerColor) -> Option<usize> {
        match color {
            PlayerColor::White => self.white,
            PlayerColor::Black => self.black,
        }
    }

    pub fn set(&mut self, color: PlayerColor, target: usize) {
        *self.slot_mut(color) = Some(target);
    }

    pub fn take(&mut self, color: PlayerColor) -> Option<usize> {
        self.slot_mut(color).take()
    }

    pub fn is_pending(&self) -> bool {
        self.white.is_some() || self.black.is_some()
    }

    fn slot_mut(&mut self, color: PlayerColor) -> &mut Option<usize> {
        match color {
            PlayerColor::White => &mut self.white,
            PlayerColor::Black => &mut self.black,
        }
    }
}

/// Who takes white when a game is created from an accepted invitation
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PlayerOrdering {
    #[default]
    CreatorFirst,
    ChallengerFirst,
}

/// One game instance. Mutated only by the reducer once play has started.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub variant: GameVariant,
    pub time_control: TimeControl,
    pub players: Players,
    pub moves: Vec<Move>,
    pub moves_with_notation: Vec<String>,
    pub move_times: Vec<DateTime<Utc>>,
    pub boards: Vec<String>,
    pub status: GameStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_over_reason: Option<GameOverReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub takeback_request: TakebackRequest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draw_offer: Option<PlayerColor>,
}

impl SessionState {
    /// Empty standard game with both seats open
    pub fn new(time_control: TimeControl) -> Self {
        Self::from_position(GameVariant::Standard, time_control, STARTING_POSITION)
    }

    /// Session starting from `position`. Callers outside the crate go through
    /// `Reducer::session_from_position`, which checks white is to move.
    pub(crate) fn from_position(
        variant: GameVariant,
        time_control: TimeControl,
        position: impl Into<String>,
    ) -> Self {
        Self {
            variant,
            time_control,
            players: Players::default(),
            moves: Vec::new(),
            moves_with_notation: Vec::new(),
            move_times: Vec::new(),
            boards: vec![position.into()],
            status: GameStatus::Waiting,
            game_over_reason: None,
            completed_at: None,
            takeback_request: TakebackRequest::default(),
            draw_offer: None,
        }
    }

    /// Bind `player_id` to an empty seat. Only allowed before the first move.
    pub fn seat(&mut self, color: PlayerColor, player_id: impl Into<String>) -> bool {
        let player_id = player_id.into();
        if self.status != GameStatus::Waiting || self.players.color_of(&player_id).is_some() {
            return false;
        }
        let slot = self.players.slot_mut(color);
        if slot.is_some() {
            return false;
        }
        *slot = Some(player_id);
        true
    }

    /// Latest position. `None` only for a corrupt record with no boards.
    pub fn current_board(&self) -> Option<&str> {
        self.boards.last().map(String::as_str)
    }

    pub fn side_to_move(&self) -> PlayerColor {
        PlayerColor::for_ply(self.moves.len())
    }

    pub fn player_color(&self, player_id: &str) -> Option<PlayerColor> {
        self.players.color_of(player_id)
    }

    pub fn last_move(&self) -> Option<&Move> {
        self.moves.last()
    }

    pub fn last_move_time(&self) -> Option<DateTime<Utc>> {
        self.move_times.last().copied()
    }

    pub fn is_complete(&self) -> bool {
        self.status == GameStatus::Complete
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(TimeControl::default())
    }
}

/// Build a fully seated standard game between an invitation's creator and challenger
pub fn create_game(
    time_control: TimeControl,
    creator_id: &str,
    challenger_id: &str,
    ordering: PlayerOrdering,
) -> SessionState {
    let mut state = SessionState::new(time_control);
    let (white, black) = match ordering {
        PlayerOrdering::CreatorFirst => (creator_id, challenger_id),
        PlayerOrdering::ChallengerFirst => (challenger_id, creator_id),
    };
    state.players.white = Some(white.to_string());
    state.players.black = Some(black.to_string());
    state
}
