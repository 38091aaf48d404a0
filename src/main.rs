//! calc-server: a single-client TCP calculator server
//!
//! The server speaks a line-oriented text protocol:
//! - add, sub, mul over 32-bit signed integers
//! - one accepted client per run
//! - a fixed budget of request/response iterations
//! - Configuration via CLI arguments or TOML file

mod config;
mod protocol;
mod server;
mod session;

use config::Config;
use server::Server;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        listen = %config.listen,
        backlog = config.backlog,
        iterations = config.iterations(),
        pause_ms = config.pause_duration_ms,
        "Starting calc-server"
    );

    let server = Server::bind(&config)?;
    server.serve()?;

    info!("Server run complete");
    Ok(())
}
