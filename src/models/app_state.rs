use actix::Addr;
use chrono::{DateTime, Utc};
use log::info;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::config::Config;
use crate::error::SessionError;
use crate::game::{clock, HistoryCursor, Reducer};
use crate::models::{GameAction, PlayerColor, SessionState, TimeControl};
use crate::websocket::ChessWebSocket;

/// Application state shared between connections
pub struct AppState {
    /// Sessions keyed by game ID
    pub games: Mutex<HashMap<String, SessionState>>,
    /// Connection IDs attached to each game, players and spectators alike
    pub connections: Mutex<HashMap<String, Vec<String>>>,
    pub sessions: Mutex<HashMap<String, Addr<ChessWebSocket>>>,
    pub reducer: Reducer,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            games: Mutex::new(HashMap::new()),
            connections: Mutex::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
            reducer: Reducer::standard(),
            config,
        }
    }

    /// Open a new game with `connection_id` seated as `color`
    pub fn create_game(
        &self,
        connection_id: &str,
        time_control: TimeControl,
        color: PlayerColor,
    ) -> Result<(String, SessionState), SessionError> {
        let game_id = Uuid::new_v4().to_string();
        let mut state = self.reducer.new_session(time_control)?;
        state.seat(color, connection_id);

        lock(&self.games).insert(game_id.clone(), state.clone());
        lock(&self.connections).insert(game_id.clone(), vec![connection_id.to_string()]);
        Ok((game_id, state))
    }

    /// Attach `connection_id` to a game, seating it if a seat is free.
    ///
    /// Tries `preference` first (black when absent), then the other color. A
    /// connection that gets no seat spectates, unless it asked for a color.
    pub fn join_game(
        &self,
        game_id: &str,
        connection_id: &str,
        preference: Option<PlayerColor>,
    ) -> Result<(SessionState, Option<PlayerColor>), SessionError> {
        let preferred = preference.unwrap_or(PlayerColor::Black);
        let (state, color) = {
            let mut games = lock(&self.games);
            let state = games
                .get_mut(game_id)
                .ok_or_else(|| SessionError::GameNotFound(game_id.to_string()))?;
            let color = match state.player_color(connection_id) {
                Some(color) => Some(color),
                None => [preferred, preferred.opposite()]
                    .into_iter()
                    .find(|color| state.seat(*color, connection_id)),
            };
            (state.clone(), color)
        };

        if color.is_none() && preference.is_some() {
            return Err(SessionError::GameFull);
        }

        let mut connections = lock(&self.connections);
        let connection_ids = connections.entry(game_id.to_string()).or_default();
        if !connection_ids.iter().any(|id| id == connection_id) {
            connection_ids.push(connection_id.to_string());
        }
        Ok((state, color))
    }

    /// Detach `connection_id` from a game. Returns true when it was the last
    /// connection and the session has been discarded.
    pub fn leave_game(&self, game_id: &str, connection_id: &str) -> bool {
        let now_empty = {
            let mut connections = lock(&self.connections);
            match connections.get_mut(game_id) {
                Some(connection_ids) => {
                    connection_ids.retain(|id| id != connection_id);
                    info!("Removed {} from game {}'s connections", connection_id, game_id);
                    if connection_ids.is_empty() {
                        connections.remove(game_id);
                        true
                    } else {
                        false
                    }
                }
                None => false,
            }
        };

        if now_empty {
            info!("No more connections in game {}. Cleaning up.", game_id);
            lock(&self.games).remove(game_id);
        }
        now_empty
    }

    /// Bind a client's action to its seat and run it through the reducer.
    ///
    /// Moves are refused while the sender's cursor is parked on an earlier position.
    pub fn submit_action(
        &self,
        game_id: &str,
        connection_id: &str,
        seat: Option<PlayerColor>,
        cursor: &HistoryCursor,
        action: GameAction,
        now: DateTime<Utc>,
    ) -> Result<(SessionState, Vec<GameAction>), SessionError> {
        let seat = seat.ok_or(SessionError::Spectator)?;
        let action = action.bind_to_seat(seat, connection_id)?;

        let mut games = lock(&self.games);
        let slot = games
            .get_mut(game_id)
            .ok_or_else(|| SessionError::GameNotFound(game_id.to_string()))?;
        let action = match action {
            GameAction::MoveMade { mv, player_id } => cursor
                .move_action(slot, mv, player_id)
                .ok_or(SessionError::ViewingHistory)?,
            other => other,
        };
        Ok(self.dispatch_into(slot, action, now))
    }

    /// Apply the timeout for `game_id` if the side to move has flagged at `now`
    pub fn flag_if_expired(
        &self,
        game_id: &str,
        now: DateTime<Utc>,
    ) -> Option<(SessionState, Vec<GameAction>)> {
        let mut games = lock(&self.games);
        let slot = games.get_mut(game_id)?;
        let timeout = clock::timeout_action(slot, now)?;
        info!("Clock flagged in game {}", game_id);
        Some(self.dispatch_into(slot, timeout, now))
    }

    fn dispatch_into(
        &self,
        slot: &mut SessionState,
        action: GameAction,
        now: DateTime<Utc>,
    ) -> (SessionState, Vec<GameAction>) {
        let current = std::mem::take(slot);
        let (next, applied) = self.reducer.dispatch(current, action, now);
        *slot = next.clone();
        (next, applied)
    }
}

/// Lock a mutex, recovering the data if another connection panicked while holding it
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
