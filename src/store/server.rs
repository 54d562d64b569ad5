use futures::StreamExt;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::codec::FramedRead;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::codec::LineCodec;
use crate::config::StoreConfig;
use crate::store::{dataset, ListingStore};
use crate::Error;

pub async fn run(config: StoreConfig) -> Result<(), Error> {
    crate::init_tracing();

    let listings = dataset::load(&config.dataset).await?;
    let store = ListingStore::new(listings);
    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;

    info!(
        "Listing store serving {} listings on {}",
        store.len(),
        listener.local_addr()?
    );

    serve(listener, store).await
}

/// Accepts gateway connections until the listener fails.
pub async fn serve(listener: TcpListener, store: ListingStore) -> Result<(), Error> {
    loop {
        let (socket, peer) = listener.accept().await?;
        let store = store.clone();
        info!("Accepted connection from {:?}", peer);

        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, peer, store).await {
                error!(error = %e, "Store connection failed");
            }
        });
    }
}

#[instrument(name = "store_connection", skip(stream, store), fields(connection_id))]
pub(crate) async fn handle_connection<S>(
    stream: S,
    peer: SocketAddr,
    store: ListingStore,
) -> Result<(), Error>
where
    S: AsyncRead + AsyncWrite,
{
    tracing::Span::current().record("connection_id", Uuid::new_v4().to_string());

    let (reader, mut writer) = tokio::io::split(stream);
    let mut lines = FramedRead::new(reader, LineCodec::default());

    while let Some(line) = lines.next().await {
        let line = line?;
        if line.is_empty() {
            continue;
        }

        debug!("Received raw command: {}", line);
        let response = store.handle_line(&line);

        let mut bytes = response.to_json()?;
        bytes.push(b'\n');
        writer.write_all(&bytes).await?;
    }

    info!("Connection closed");
    Ok(())
}
