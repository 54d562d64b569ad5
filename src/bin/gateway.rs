use clap::Parser;
use listings::config::GatewayConfig;
use listings::{server, Error};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = GatewayConfig::parse();

    server::run(config).await
}
