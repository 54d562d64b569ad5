//! Interactive command line client for the gateway.

use futures::{SinkExt, StreamExt};
use std::io;
use thiserror::Error as ThisError;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines, ReadHalf, Stdin,
    WriteHalf,
};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::{timeout, Duration};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, warn};

use crate::codec::{CodecError, LineCodec};
use crate::config::ClientConfig;
use crate::protocol::encode_city;
use crate::Error;

#[derive(Debug, ThisError)]
pub enum ClientError {
    #[error("no reply from the gateway within {0:?}")]
    Timeout(Duration),
    #[error("gateway closed the connection")]
    Closed,
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Input rejected before anything is sent to the gateway.
#[derive(Debug, PartialEq, ThisError)]
pub enum InputError {
    #[error("City cannot be empty")]
    EmptyCity,
    #[error("Price must be a valid number")]
    InvalidPrice,
    #[error("Price must be a positive number")]
    NonPositivePrice,
}

/// Builds a `SEARCH` command line from what the user typed.
pub fn search_command(city: &str, price: &str) -> Result<String, InputError> {
    let city = city.trim();
    if city.is_empty() {
        return Err(InputError::EmptyCity);
    }

    let price: i64 = price.trim().parse().map_err(|_| InputError::InvalidPrice)?;
    if price <= 0 {
        return Err(InputError::NonPositivePrice);
    }

    Ok(format!(
        "SEARCH city={} max_price={}",
        encode_city(city),
        price
    ))
}

/// Whether the collected lines form a whole reply. Results run until `END`, every other reply
/// (banner, `OK bye`, `ERROR ...`) is a single line.
pub fn is_complete(reply: &[String]) -> bool {
    match reply.first() {
        None => false,
        Some(first) if first.starts_with("OK RESULT") => {
            reply.len() > 1 && reply.last().is_some_and(|line| line == "END")
        }
        Some(_) => true,
    }
}

pub fn is_empty_result(reply: &[String]) -> bool {
    reply.first().is_some_and(|line| line == "OK RESULT 0")
}

pub struct GatewayClient<S> {
    lines: FramedRead<ReadHalf<S>, LineCodec>,
    writer: FramedWrite<WriteHalf<S>, LineCodec>,
    timeout: Duration,
}

impl GatewayClient<TcpStream> {
    pub async fn connect(
        addr: impl ToSocketAddrs,
        timeout: Duration,
    ) -> Result<GatewayClient<TcpStream>, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self::new(stream, timeout))
    }
}

impl<S> GatewayClient<S>
where
    S: AsyncRead + AsyncWrite,
{
    pub fn new(stream: S, timeout: Duration) -> GatewayClient<S> {
        let (reader, writer) = tokio::io::split(stream);

        GatewayClient {
            lines: FramedRead::new(reader, LineCodec::default()),
            writer: FramedWrite::new(writer, LineCodec::default()),
            timeout,
        }
    }

    pub async fn send(&mut self, command: String) -> Result<Vec<String>, ClientError> {
        debug!("Sending {}", command);
        self.writer.send(command).await?;
        self.read_reply().await
    }

    /// Collects the lines of one reply. When the gateway goes quiet or hangs up half way, whatever
    /// arrived so far is returned.
    pub async fn read_reply(&mut self) -> Result<Vec<String>, ClientError> {
        let mut reply = Vec::new();

        loop {
            let next = match timeout(self.timeout, self.lines.next()).await {
                Ok(next) => next,
                Err(_) if reply.is_empty() => return Err(ClientError::Timeout(self.timeout)),
                Err(_) => {
                    warn!("Reply incomplete after {:?}", self.timeout);
                    return Ok(reply);
                }
            };

            match next {
                Some(line) => {
                    reply.push(line?);
                    if is_complete(&reply) {
                        return Ok(reply);
                    }
                }
                None if reply.is_empty() => return Err(ClientError::Closed),
                None => return Ok(reply),
            }
        }
    }
}

struct Prompt {
    input: Lines<BufReader<Stdin>>,
}

impl Prompt {
    fn new() -> Prompt {
        Prompt {
            input: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// `None` once stdin is closed.
    async fn ask(&mut self, question: &str) -> io::Result<Option<String>> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(question.as_bytes()).await?;
        stdout.flush().await?;

        let answer = self.input.next_line().await?;
        Ok(answer.map(|line| line.trim().to_string()))
    }
}

pub async fn run(config: ClientConfig) -> Result<(), Error> {
    crate::init_tracing();

    let mut client = GatewayClient::connect(config.gateway_addr.as_str(), config.timeout()).await?;
    let banner = client.read_reply().await?;
    println!("{}\n", banner.join("\n"));

    let mut prompt = Prompt::new();

    while let Some(command) = prompt.ask("Enter command (LIST, SEARCH, or QUIT): ").await? {
        match command.to_uppercase().as_str() {
            "LIST" => {
                let reply = client.send("LIST".to_string()).await?;
                print_reply(&reply);
            }
            "SEARCH" => search(&mut client, &mut prompt).await?,
            "QUIT" => {
                let reply = client.send("QUIT".to_string()).await?;
                print_reply(&reply);
                println!("Closing connection...");
                break;
            }
            _ => println!("Invalid command. Use LIST, SEARCH, or QUIT."),
        }
    }

    Ok(())
}

async fn search(client: &mut GatewayClient<TcpStream>, prompt: &mut Prompt) -> Result<(), Error> {
    loop {
        let Some(city) = prompt.ask("City (e.g., Long Beach, San Diego): ").await? else {
            return Ok(());
        };
        let Some(price) = prompt.ask("Max Price: ").await? else {
            return Ok(());
        };

        let command = match search_command(&city, &price) {
            Ok(command) => command,
            Err(e) => {
                println!("Error: {}. Please try again.\n", e);
                continue;
            }
        };

        let reply = client.send(command).await?;
        print_reply(&reply);

        if !is_empty_result(&reply) {
            return Ok(());
        }

        let retry = prompt
            .ask("No listings found for that city. Try again? (y/n): ")
            .await?
            .unwrap_or_default()
            .to_lowercase();
        if retry != "y" && retry != "yes" {
            return Ok(());
        }
    }
}

fn print_reply(reply: &[String]) {
    println!("\n{}\n", reply.join("\n"));
}
