use std::io;
use std::path::PathBuf;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};

use crate::controllers;
use crate::state::AppState;

/// The /api/v1 route table, shared by the server and by tests.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(controllers::sessions::create_session)
            .service(controllers::sessions::list_sessions)
            .service(controllers::sessions::get_session)
            .service(controllers::sessions::create_branch)
            .service(controllers::sessions::switch_primary_branch)
            .service(controllers::sessions::compress)
            .service(controllers::messages::send_message)
            .service(controllers::messages::cancel_call)
            .service(controllers::messages::branch_history)
            .service(controllers::streaming::subscribe_session_events)
            .service(controllers::health::handler),
    );
}

pub async fn run_server_with_config(
    port: u16,
    db_path: PathBuf,
    api_key: String,
    api_base: Option<String>,
    default_model: String,
) -> io::Result<()> {
    let state = AppState::with_config(db_path, api_key, api_base, default_model)
        .await
        .map_err(|e| io::Error::other(format!("failed to initialize state: {e}")))?;

    run_server(port, state).await
}

pub async fn run_server(port: u16, state: AppState) -> io::Result<()> {
    let state = web::Data::new(state);

    log::info!("Listening on port {}", port);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Cors::permissive())
            .configure(configure_api)
    })
    .bind(("127.0.0.1", port))?
    .run()
    .await
}
