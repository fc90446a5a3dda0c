//! Live clock derivation from a session's raw timing inputs.
//!
//! Nothing here mutates a session. The relay polls [`timeout_action`] and
//! submits the returned `game-over` through the reducer like any other action.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{GameAction, GameOverReason, GameStatus, PlayerColor, SessionState};

/// Remaining time per side, in milliseconds. Never negative.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSnapshot {
    pub white_ms: i64,
    pub black_ms: i64,
    /// The side whose clock is ticking, if any
    pub running: Option<PlayerColor>,
}

impl ClockSnapshot {
    pub fn remaining(&self, color: PlayerColor) -> i64 {
        match color {
            PlayerColor::White => self.white_ms,
            PlayerColor::Black => self.black_ms,
        }
    }
}

/// Unclamped remaining time for both sides at `now`
fn raw_remaining(state: &SessionState, now: DateTime<Utc>) -> (i64, i64, Option<PlayerColor>) {
    let base = state.time_control.base_ms();
    let increment = state.time_control.increment_ms();
    let mut white = base;
    let mut black = base;

    // White's first move is free; every later move is charged from the previous one
    for (ply, pair) in state.move_times.windows(2).enumerate() {
        let spent = (pair[1] - pair[0]).num_milliseconds();
        match PlayerColor::for_ply(ply + 1) {
            PlayerColor::White => white += increment - spent,
            PlayerColor::Black => black += increment - spent,
        }
    }

    let running = match (state.status, state.last_move_time()) {
        (GameStatus::InProgress, Some(last)) => Some((state.side_to_move(), now - last)),
        (GameStatus::Complete, Some(last)) => state
            .completed_at
            .map(|done| (state.side_to_move(), done - last)),
        _ => None,
    };

    let mut ticking = None;
    if let Some((color, elapsed)) = running {
        let elapsed = elapsed.num_milliseconds().max(0);
        match color {
            PlayerColor::White => white -= elapsed,
            PlayerColor::Black => black -= elapsed,
        }
        if state.status == GameStatus::InProgress {
            ticking = Some(color);
        }
    }

    (white, black, ticking)
}

pub fn remaining(state: &SessionState, now: DateTime<Utc>) -> ClockSnapshot {
    let (white, black, running) = raw_remaining(state, now);
    ClockSnapshot {
        white_ms: white.max(0),
        black_ms: black.max(0),
        running,
    }
}

/// The `game-over` a clock observer should submit at `now`, if the side to move has flagged
pub fn timeout_action(state: &SessionState, now: DateTime<Utc>) -> Option<GameAction> {
    if state.status != GameStatus::InProgress {
        return None;
    }
    let (white, black, running) = raw_remaining(state, now);
    let color = running?;
    let left = match color {
        PlayerColor::White => white,
        PlayerColor::Black => black,
    };
    (left <= 0).then(|| GameAction::game_over(GameOverReason::timeout(color)))
}
