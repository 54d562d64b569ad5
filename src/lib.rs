pub mod cache;
pub mod client;
pub mod codec;
pub mod commands;
pub mod config;
pub mod events;
pub mod gateway;
pub mod listing;
pub mod protocol;
pub mod ranking;
pub mod reply;
pub mod server;
pub mod store;
pub mod upstream;

use tracing::debug;
use tracing_subscriber::EnvFilter;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Result<T> = std::result::Result<T, Error>;

/// Installs the global fmt subscriber, honouring `RUST_LOG` and defaulting to `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| debug!("Failed to initialize global tracing: {}", e));
}
