use actix_web::{web, App, HttpServer};
use clap::Parser;
use log::info;

use chess_session::config::Config;
use chess_session::models::AppState;
use chess_session::routes::configure_routes;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::parse();
    let (host, port) = config.bind_address();
    let static_dir = config.static_dir.clone();
    info!(
        "Starting chess session server at http://{}:{} (default clock {}+{})",
        host, port, config.base_minutes, config.increment_seconds
    );

    // Create shared application state
    let app_state = web::Data::new(AppState::new(config));

    HttpServer::new(move || {
        let static_dir = static_dir.clone();
        App::new()
            .app_data(app_state.clone())
            .configure(move |cfg| configure_routes(cfg, &static_dir))
    })
    .bind((host, port))?
    .run()
    .await
}
