use futures::StreamExt;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::codec::FramedRead;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::cache::Cache;
use crate::codec::LineCodec;
use crate::commands::executable::Executable;
use crate::commands::Command;
use crate::config::GatewayConfig;
use crate::events::EventKind;
use crate::gateway::{Gateway, Session};
use crate::reply::Reply;
use crate::upstream::{StoreClient, StoreOptions, UpstreamError};
use crate::Error;

pub async fn run(config: GatewayConfig) -> Result<(), Error> {
    crate::init_tracing();

    let options = StoreOptions {
        timeout: config.store_timeout(),
        max_response_size: config.max_response_size,
    };
    let store = StoreClient::connect(config.store_addr.as_str(), options).await?;
    info!("Connected to listing store at {}", config.store_addr);

    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    let gateway = Gateway::new(store, Cache::new(config.cache_ttl()));

    info!("Gateway listening on {}", listener.local_addr()?);

    serve(listener, gateway).await
}

/// Accepts clients until the listener fails or the store connection is lost. Losing the store is
/// reported as an error, since no further request could be answered.
pub async fn serve(listener: TcpListener, gateway: Gateway) -> Result<(), Error> {
    loop {
        let (socket, client_address) = tokio::select! {
            _ = gateway.store.closed() => {
                error!("Listing store connection lost, shutting down");
                return Err(UpstreamError::Disconnected.into());
            }
            accepted = listener.accept() => accepted?,
        };

        let gateway = gateway.clone();
        info!("Accepted connection from {:?}", client_address);

        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, client_address, gateway).await {
                error!(error = %e, "Connection failed");
            }
        });
    }
}

#[instrument(
    name = "connection",
    skip(stream, gateway),
    fields(connection_id, client_address)
)]
pub async fn handle_connection<S>(
    stream: S,
    client_address: SocketAddr,
    gateway: Gateway,
) -> Result<(), Error>
where
    S: AsyncRead + AsyncWrite,
{
    tracing::Span::current()
        .record("connection_id", Uuid::new_v4().to_string())
        .record("client_address", client_address.to_string());

    let session = gateway.session(client_address);
    session.record(EventKind::Connect, "");

    let res = serve_session(stream, &session).await;

    session.record(EventKind::Disconnect, "");
    info!("Connection closed");
    res
}

/// The per-connection command loop: wait for a line, process it, reply, repeat. Ends on `QUIT`,
/// when the client hangs up or when the store connection is lost.
async fn serve_session<S>(stream: S, session: &Session) -> Result<(), Error>
where
    S: AsyncRead + AsyncWrite,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut lines = FramedRead::new(reader, LineCodec::default());

    writer.write_all(&Reply::Ready.serialize()).await?;

    while let Some(line) = lines.next().await {
        let line = line?;
        if line.is_empty() {
            continue;
        }

        session.record(EventKind::Request, line.as_str());

        let reply = match process(&line, session).await {
            Ok(reply) => reply,
            Err(e) => {
                let reply = Reply::error(e.to_string());
                session.record(EventKind::Response, reply.summary());
                writer.write_all(&reply.serialize()).await?;
                return Err(e.into());
            }
        };

        session.record(EventKind::Response, reply.summary());
        writer.write_all(&reply.serialize()).await?;

        if reply == Reply::Bye {
            break;
        }
    }

    Ok(())
}

/// Client mistakes and recoverable store failures become error replies. Only a lost store
/// connection is returned as `Err`.
async fn process(line: &str, session: &Session) -> Result<Reply, UpstreamError> {
    let cmd = match Command::try_from(line) {
        Ok(cmd) => cmd,
        Err(e) => return Ok(Reply::error(e.to_string())),
    };

    match cmd.exec(session).await {
        Ok(reply) => Ok(reply),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!(error = ?e, "Store request failed");
            Ok(Reply::error(e.to_string()))
        }
    }
}
