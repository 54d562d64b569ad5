use clap::Parser;
use std::path::PathBuf;
use tokio::time::Duration;

use crate::codec::DEFAULT_MAX_RESPONSE_SIZE;

const GATEWAY_PORT: u16 = 4000;
const STORE_PORT: u16 = 3000;

#[derive(Parser, Debug, Clone)]
#[command(name = "gateway", about = "Caching front-end for the listing store")]
pub struct GatewayConfig {
    /// The host to listen on
    #[arg(long, env = "GATEWAY_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// The port to listen on
    #[arg(short, long, env = "GATEWAY_PORT", default_value_t = GATEWAY_PORT)]
    pub port: u16,

    /// Address of the listing store
    #[arg(long, env = "STORE_ADDR", default_value = "127.0.0.1:3000")]
    pub store_addr: String,

    /// Seconds a store response is served from the cache
    #[arg(long, env = "CACHE_TTL", default_value_t = 60)]
    pub cache_ttl: u64,

    /// Seconds to wait for the store to answer a query
    #[arg(long, env = "STORE_TIMEOUT", default_value_t = 5)]
    pub store_timeout: u64,

    /// Largest store response accepted, in bytes
    #[arg(long, env = "MAX_RESPONSE_SIZE", default_value_t = DEFAULT_MAX_RESPONSE_SIZE)]
    pub max_response_size: usize,
}

impl GatewayConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout)
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "store", about = "In-memory listing store")]
pub struct StoreConfig {
    /// The host to listen on
    #[arg(long, env = "STORE_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// The port to listen on
    #[arg(short, long, env = "STORE_PORT", default_value_t = STORE_PORT)]
    pub port: u16,

    /// JSON file holding the listings
    #[arg(long, env = "STORE_DATASET", default_value = "listings.json")]
    pub dataset: PathBuf,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "client", about = "Interactive client for the listing gateway")]
pub struct ClientConfig {
    /// Address of the gateway
    #[arg(long, env = "GATEWAY_ADDR", default_value = "127.0.0.1:4000")]
    pub gateway_addr: String,

    /// Seconds to wait for a reply
    #[arg(long, env = "CLIENT_TIMEOUT", default_value_t = 5)]
    pub timeout: u64,
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_flags() {
        let config = GatewayConfig::parse_from([
            "gateway",
            "-p",
            "4100",
            "--store-addr",
            "10.0.0.1:3100",
            "--cache-ttl",
            "5",
        ]);

        assert_eq!(config.port, 4100);
        assert_eq!(config.store_addr, "10.0.0.1:3100");
        assert_eq!(config.cache_ttl(), Duration::from_secs(5));
        assert_eq!(config.max_response_size, DEFAULT_MAX_RESPONSE_SIZE);
    }

    #[test]
    fn store_flags() {
        let config = StoreConfig::parse_from(["store", "--dataset", "data/listings.json"]);

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.dataset, PathBuf::from("data/listings.json"));
    }

    #[test]
    fn client_flags() {
        let config = ClientConfig::parse_from(["client", "--gateway-addr", "10.0.0.2:4100"]);

        assert_eq!(config.gateway_addr, "10.0.0.2:4100");
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }
}
