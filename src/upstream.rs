use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::io;
use std::sync::Arc;
use thiserror::Error as ThisError;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::codec::{CodecError, JsonCodec, LineCodec, DEFAULT_MAX_RESPONSE_SIZE};
use crate::protocol::{ProtocolError, RawCommand, Response};

type Reader = Box<dyn AsyncRead + Send + Unpin>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// Failures talking to the listing store. The display text is what clients get to see.
#[derive(Debug, ThisError)]
pub enum UpstreamError {
    #[error("data_server bad response")]
    Malformed(#[source] serde_json::Error),
    #[error("data_server bad response")]
    UnexpectedShape(#[source] ProtocolError),
    /// The store answered with an error object where a listing array was required.
    #[error("data_server bad response")]
    UnexpectedError { message: String },
    #[error("data_server timeout")]
    Timeout(Duration),
    #[error("data_server unavailable")]
    Disconnected,
    #[error("data_server unavailable")]
    Transport(#[source] CodecError),
}

impl UpstreamError {
    /// Whether the store connection is gone for good.
    pub fn is_fatal(&self) -> bool {
        matches!(self, UpstreamError::Disconnected | UpstreamError::Transport(_))
    }
}

#[derive(Clone, Copy, Debug)]
pub struct StoreOptions {
    pub timeout: Duration,
    pub max_response_size: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions {
            timeout: Duration::from_secs(5),
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
        }
    }
}

/// Client for the single connection a gateway keeps to the listing store.
///
/// The protocol has no request ids, so exchanges are serialized: a request is written and its
/// response read while holding the connection lock. Clones share the same connection.
#[derive(Clone)]
pub struct StoreClient {
    inner: Arc<Inner>,
}

struct Inner {
    connection: Mutex<Option<Connection>>,
    timeout: Duration,
    closed: CancellationToken,
}

struct Connection {
    writer: FramedWrite<Writer, LineCodec>,
    reader: FramedRead<Reader, JsonCodec>,
    // Responses the store still owes us, including ones for requests that timed out.
    pending: usize,
}

impl Connection {
    async fn exchange(&mut self, request: String) -> Result<Value, UpstreamError> {
        self.writer
            .feed(request)
            .await
            .map_err(UpstreamError::Transport)?;
        self.pending += 1;
        self.writer.flush().await.map_err(UpstreamError::Transport)?;

        loop {
            let item = match self.reader.next().await {
                Some(item) => item.map_err(UpstreamError::Transport)?,
                None => return Err(UpstreamError::Disconnected),
            };

            self.pending = self.pending.saturating_sub(1);
            if self.pending > 0 {
                debug!("Discarding stale store response");
                continue;
            }

            return item.map_err(UpstreamError::Malformed);
        }
    }
}

impl StoreClient {
    pub async fn connect(addr: impl ToSocketAddrs, options: StoreOptions) -> io::Result<StoreClient> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream, options))
    }

    pub fn new<S>(stream: S, options: StoreOptions) -> StoreClient
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        let reader: Reader = Box::new(reader);
        let writer: Writer = Box::new(writer);

        let connection = Connection {
            writer: FramedWrite::new(writer, LineCodec::default()),
            reader: FramedRead::new(reader, JsonCodec::new(options.max_response_size)),
            pending: 0,
        };

        StoreClient {
            inner: Arc::new(Inner {
                connection: Mutex::new(Some(connection)),
                timeout: options.timeout,
                closed: CancellationToken::new(),
            }),
        }
    }

    /// Sends one raw command and decodes the store's answer.
    pub async fn query(&self, cmd: &RawCommand) -> Result<Response, UpstreamError> {
        let value = self.request(cmd).await?;
        Response::from_json(value).map_err(UpstreamError::UnexpectedShape)
    }

    async fn request(&self, cmd: &RawCommand) -> Result<Value, UpstreamError> {
        let mut connection = self.inner.connection.lock().await;
        let conn = connection.as_mut().ok_or(UpstreamError::Disconnected)?;

        let result = timeout(self.inner.timeout, conn.exchange(cmd.encode())).await;

        match result {
            Ok(Err(e)) if e.is_fatal() => {
                warn!(error = ?e, "Lost connection to the listing store");
                *connection = None;
                self.inner.closed.cancel();
                Err(e)
            }
            Ok(result) => result,
            Err(_) => {
                warn!("Listing store did not answer {} in time", cmd);
                Err(UpstreamError::Timeout(self.inner.timeout))
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.is_cancelled()
    }

    /// Resolves once the store connection is lost.
    pub async fn closed(&self) {
        self.inner.closed.cancelled().await
    }
}
