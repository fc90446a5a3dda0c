use actix::*;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use log::{info, warn};
use uuid::Uuid;

use crate::error::SessionError;
use crate::game::HistoryCursor;
use crate::models::{lock, AppState, ChessWebSocketMessage, ClientMessage, PlayerColor, ServerMessage};

/// WebSocket handler for one connected client, player or spectator
pub struct ChessWebSocket {
    pub id: String,
    pub app_state: web::Data<AppState>,
    pub game_id: String,
    pub color: Option<PlayerColor>,
    /// Which past position this client is viewing
    pub cursor: HistoryCursor,
}

impl ChessWebSocket {
    pub fn new(app_state: web::Data<AppState>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            app_state,
            game_id: String::new(),
            color: None,
            cursor: HistoryCursor::live(),
        }
    }
}

impl Actor for ChessWebSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        // Register the actor with the application state
        let addr = ctx.address();
        let total_sessions = {
            let mut sessions = lock(&self.app_state.sessions);
            sessions.insert(self.id.clone(), addr);
            sessions.len()
        };
        info!("WebSocket connection started: {}", self.id);
        info!("Total active sessions: {}", total_sessions);

        // Act as the clock observer for whatever game this connection is in
        let interval = self.app_state.config.clock_check_interval();
        ctx.run_interval(interval, |act, _ctx| act.check_clock());
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        self.leave_game();

        let total_sessions = {
            let mut sessions = lock(&self.app_state.sessions);
            sessions.remove(&self.id);
            sessions.len()
        };
        info!("WebSocket connection closed: {}", self.id);
        info!("Total active sessions: {}", total_sessions);

        Running::Stop
    }
}

impl Handler<ChessWebSocketMessage> for ChessWebSocket {
    type Result = ();

    fn handle(&mut self, msg: ChessWebSocketMessage, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

// WebSocket message handler
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ChessWebSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {}
            Ok(ws::Message::Text(text)) => {
                info!("Received text message: {}", text);
                match serde_json::from_str::<ClientMessage>(text.as_ref()) {
                    Ok(client_msg) => self.handle_message(client_msg, ctx),
                    Err(e) => {
                        warn!("Error parsing client message: {}", e);
                        self.send(ctx, &ServerMessage::error(None, format!("Invalid message format: {}", e)));
                    }
                }
            }
            Ok(ws::Message::Binary(_)) => {
                warn!("Binary messages are not supported");
                self.send(ctx, &ServerMessage::error(None, "Binary messages are not supported"));
            }
            Ok(ws::Message::Close(reason)) => {
                info!("Connection closed: {:?}", reason);
                ctx.close(reason);
                ctx.stop();
            }
            _ => {
                ctx.stop();
            }
        }
    }
}

impl ChessWebSocket {
    pub fn handle_message(&mut self, msg: ClientMessage, ctx: &mut ws::WebsocketContext<Self>) {
        let message_type = msg.message_type.clone();
        let result = match message_type.as_str() {
            "create" => self.handle_create(msg, ctx),
            "join" => self.handle_join(msg, ctx),
            "action" => self.handle_action(msg),
            "sync" => self.handle_sync(ctx),
            "view" => self.handle_view(msg, ctx),
            other => Err(SessionError::UnknownMessage(other.to_string())),
        };

        if let Err(e) = result {
            warn!("Request from {} failed: {}", self.id, e);
            let game_id = (!self.game_id.is_empty()).then(|| self.game_id.clone());
            self.send(ctx, &ServerMessage::error(game_id, e));
        }
    }

    /// Send a message to this connection only
    pub fn send(&self, ctx: &mut ws::WebsocketContext<Self>, message: &ServerMessage) {
        match serde_json::to_string(message) {
            Ok(text) => ctx.text(text),
            Err(e) => {
                warn!("Failed to serialize response: {}", e);
                ctx.text("{\"error\": \"Internal server error\"}");
            }
        }
    }

    pub fn broadcast_to_game(&self, game_id: &str, message: &ServerMessage) {
        info!("Broadcasting {} to game {}", message.message_type, game_id);

        // Scope the locks to minimize lock time
        let recipients: Vec<Addr<ChessWebSocket>> = {
            let connections = lock(&self.app_state.connections);
            let Some(connection_ids) = connections.get(game_id) else {
                info!("No connections found for game {}", game_id);
                return;
            };
            let sessions = lock(&self.app_state.sessions);
            connection_ids
                .iter()
                .filter_map(|id| sessions.get(id).cloned())
                .collect()
        };

        let msg_str = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to serialize broadcast: {}", e);
                return;
            }
        };

        for addr in recipients {
            addr.do_send(ChessWebSocketMessage(msg_str.clone()));
        }
    }

    /// Detach from the current game. The last connection out discards the session.
    pub fn leave_game(&mut self) {
        if self.game_id.is_empty() {
            return;
        }
        self.app_state.leave_game(&self.game_id, &self.id);
        self.game_id.clear();
        self.color = None;
        self.cursor = HistoryCursor::live();
    }
}

/// WebSocket connection handler
pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let socket = ChessWebSocket::new(app_state);
    info!("New WebSocket connection: {}", socket.id);
    ws::start(socket, &req, stream)
}
