/// HTTP server with WebSocket support for browsing record sources
use actix_web::{middleware, web, App, Error, HttpRequest, HttpResponse, HttpServer};
use actix_web_actors::ws;
use log::info;

use crate::config::ServerConfig;
use crate::websocket::{AppState, RecordViewSocket};

/// WebSocket endpoint handler
async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let resp = ws::start(RecordViewSocket::new(state), &req, stream)?;
    Ok(resp)
}

/// Source listing, also available over the WebSocket
async fn sources(state: web::Data<AppState>) -> HttpResponse {
    match state.provider.list_sources().await {
        Ok(sources) => HttpResponse::Ok().json(sources),
        Err(e) => HttpResponse::InternalServerError().json(serde_json::json!({
            "error": e.to_string()
        })),
    }
}

/// Health check endpoint
async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "message": "RecordView server is running"
    }))
}

/// Start the HTTP server with WebSocket support
pub async fn run_server(config: ServerConfig) -> std::io::Result<()> {
    let state = web::Data::new(AppState::new(&config));

    info!("RecordView server, data directory {}", config.data_dir.display());
    info!("WebSocket: ws://{}:{}/ws", config.host, config.port);
    info!("Health check: http://{}:{}/health", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            // Enable logger
            .wrap(middleware::Logger::default())
            // CORS for development
            .wrap(
                actix_cors::Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .route("/ws", web::get().to(ws_index))
            .route("/sources", web::get().to(sources))
            .route("/health", web::get().to(health_check))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
