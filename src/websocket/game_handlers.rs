use actix_web_actors::ws;
use chrono::{DateTime, Utc};
use log::info;

use crate::error::SessionError;
use crate::game::{clock, HistoryCursor};
use crate::models::{lock, ClientMessage, GameAction, PlayerColor, ServerMessage, SessionState, TimeControl};
use crate::websocket::handler::ChessWebSocket;

fn parse_color(preference: Option<&str>) -> Option<PlayerColor> {
    match preference.map(str::to_lowercase).as_deref() {
        Some("white") => Some(PlayerColor::White),
        Some("black") => Some(PlayerColor::Black),
        _ => None,
    }
}

impl ChessWebSocket {
    pub fn handle_create(
        &mut self,
        msg: ClientMessage,
        ctx: &mut ws::WebsocketContext<Self>,
    ) -> Result<(), SessionError> {
        let defaults = self.app_state.config.default_time_control();
        let time_control = TimeControl::new(
            msg.base_minutes.unwrap_or(defaults.base_minutes),
            msg.increment_seconds.unwrap_or(defaults.increment_seconds),
        );
        let color = parse_color(msg.color_preference.as_deref()).unwrap_or(PlayerColor::White);

        self.leave_game();

        let (game_id, state) = self.app_state.create_game(&self.id, time_control, color)?;
        info!(
            "Created game {} ({}+{}), creator {} plays {}",
            game_id,
            time_control.base_minutes,
            time_control.increment_seconds,
            self.id,
            color.as_str()
        );

        self.game_id = game_id.clone();
        self.color = Some(color);
        self.cursor = HistoryCursor::live();

        let mut response =
            ServerMessage::with_state("game_created", &game_id, &state, clock::remaining(&state, Utc::now()));
        response.color = Some(color.as_str().to_string());
        self.send(ctx, &response);
        Ok(())
    }

    pub fn handle_join(
        &mut self,
        msg: ClientMessage,
        ctx: &mut ws::WebsocketContext<Self>,
    ) -> Result<(), SessionError> {
        let game_id = msg.game_id.ok_or(SessionError::MissingGameId)?;
        if game_id == self.game_id {
            return self.handle_sync(ctx);
        }
        info!("Connection {} joining game {}", self.id, game_id);

        let preference = parse_color(msg.color_preference.as_deref());
        let (state, color) = self.app_state.join_game(&game_id, &self.id, preference)?;

        self.leave_game();
        self.game_id = game_id.clone();
        self.color = color;
        self.cursor = HistoryCursor::live();

        let snapshot = clock::remaining(&state, Utc::now());
        let mut response = ServerMessage::with_state("game_joined", &game_id, &state, snapshot);
        response.color = Some(color.map_or("spectator", PlayerColor::as_str).to_string());
        self.send(ctx, &response);

        // Notify everyone once a seat is taken
        if let Some(color) = color {
            let mut notification = ServerMessage::with_state("player_joined", &game_id, &state, snapshot);
            notification.color = Some(color.as_str().to_string());
            self.broadcast_to_game(&game_id, &notification);
        }
        Ok(())
    }

    pub fn handle_action(&mut self, msg: ClientMessage) -> Result<(), SessionError> {
        if self.game_id.is_empty() {
            return Err(SessionError::NotInGame);
        }
        let action = msg.action.ok_or(SessionError::MissingAction)?;
        info!("Connection {} submits {}", self.id, action.kind());

        let now = Utc::now();
        let (state, applied) =
            self.app_state
                .submit_action(&self.game_id, &self.id, self.color, &self.cursor, action, now)?;
        self.broadcast_update(&state, applied, now);
        Ok(())
    }

    /// Park this connection's cursor on an earlier position, or follow the live one again
    pub fn handle_view(
        &mut self,
        msg: ClientMessage,
        ctx: &mut ws::WebsocketContext<Self>,
    ) -> Result<(), SessionError> {
        let state = self.current_state()?;
        match msg.ply {
            Some(ply) => self.cursor.select_move(&state, ply),
            None => self.cursor.follow_live(),
        }

        let mut response =
            ServerMessage::with_state("history_view", &self.game_id, &state, clock::remaining(&state, Utc::now()));
        response.view_index = Some(self.cursor.index(&state));
        self.send(ctx, &response);
        Ok(())
    }

    pub fn handle_sync(&mut self, ctx: &mut ws::WebsocketContext<Self>) -> Result<(), SessionError> {
        let state = self.current_state()?;
        let mut response =
            ServerMessage::with_state("time_sync", &self.game_id, &state, clock::remaining(&state, Utc::now()));
        response.color = Some(self.color.map_or("spectator", PlayerColor::as_str).to_string());
        self.send(ctx, &response);
        Ok(())
    }

    /// Submit a timeout for this connection's game if the side to move has flagged
    pub fn check_clock(&mut self) {
        if self.game_id.is_empty() {
            return;
        }
        let now = Utc::now();
        if let Some((state, applied)) = self.app_state.flag_if_expired(&self.game_id, now) {
            self.broadcast_update(&state, applied, now);
        }
    }

    fn current_state(&self) -> Result<SessionState, SessionError> {
        if self.game_id.is_empty() {
            return Err(SessionError::NotInGame);
        }
        lock(&self.app_state.games)
            .get(&self.game_id)
            .cloned()
            .ok_or_else(|| SessionError::GameNotFound(self.game_id.clone()))
    }

    /// Tell the whole game about an applied action log
    fn broadcast_update(&self, state: &SessionState, applied: Vec<GameAction>, now: DateTime<Utc>) {
        info!(
            "Game {} applied [{}], {} moves, status {:?}",
            self.game_id,
            applied.iter().map(GameAction::kind).collect::<Vec<_>>().join(", "),
            state.moves.len(),
            state.status
        );

        let mut update =
            ServerMessage::with_state("state_updated", &self.game_id, state, clock::remaining(state, now));
        update.applied = Some(applied);
        self.broadcast_to_game(&self.game_id, &update);
    }
}
