use actix_files as fs;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use log::warn;
use serde::Serialize;

use crate::game::{clock, ClockSnapshot};
use crate::models::{lock, AppState, SessionState};

/// HTTP handler for the index page
pub async fn index(req: HttpRequest, app_state: web::Data<AppState>) -> HttpResponse {
    let path = app_state.config.static_dir.join("index.html");
    match fs::NamedFile::open_async(&path).await {
        Ok(file) => file.into_response(&req),
        Err(e) => {
            warn!("Cannot open {}: {}", path.display(), e);
            HttpResponse::Ok().body("Chess session server")
        }
    }
}

#[derive(Serialize)]
struct GameSnapshot<'a> {
    game_id: &'a str,
    state: SessionState,
    clock: ClockSnapshot,
}

/// Read-only view of one session, for spectators and reconnecting clients
pub async fn get_game(path: web::Path<String>, app_state: web::Data<AppState>) -> impl Responder {
    let game_id = path.into_inner();
    let state = lock(&app_state.games).get(&game_id).cloned();
    match state {
        Some(state) => {
            let clock = clock::remaining(&state, Utc::now());
            HttpResponse::Ok().json(GameSnapshot {
                game_id: &game_id,
                state,
                clock,
            })
        }
        None => HttpResponse::NotFound().json(serde_json::json!({
            "error": format!("Game not found: {}", game_id)
        })),
    }
}

/// Configure the HTTP routes
pub fn configure_routes(cfg: &mut web::ServiceConfig, static_dir: &std::path::Path) {
    cfg.service(web::resource("/ws").route(web::get().to(crate::websocket::ws_index)))
        .service(web::resource("/games/{game_id}").route(web::get().to(get_game)))
        .service(web::resource("/").route(web::get().to(index)))
        .service(fs::Files::new("/static", static_dir));
}
