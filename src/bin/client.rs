use clap::Parser;
use listings::config::ClientConfig;
use listings::{client, Error};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = ClientConfig::parse();

    client::run(config).await
}
