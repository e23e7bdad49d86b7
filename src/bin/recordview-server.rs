/// RecordView Server
///
/// Serves the JSON record files of a data directory to browser clients over
/// a WebSocket, one view per connection.

use recordview::config::ServerConfig;
use recordview::server::run_server;
use std::io;

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // HOST, PORT and RECORDVIEW_DATA_DIR, with defaults
    let config = ServerConfig::from_env()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    if let Err(e) = config.validate() {
        log::warn!("{}; sources will fail to load until it exists", e);
    }

    run_server(config).await
}
