use clap::Parser;
use listings::config::StoreConfig;
use listings::{store, Error};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = StoreConfig::parse();

    store::server::run(config).await
}
