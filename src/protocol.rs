//! The line protocol spoken between the gateway and the listing store.
//!
//! Requests are single lines of space separated tokens:
//!
//! ```text
//! RAW_LIST
//! RAW_SEARCH city=<percent-encoded string> max_price=<integer>
//! ```
//!
//! Responses are a single JSON document, either an array of listings or `{"error": "<message>"}`.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error as ThisError;

use crate::listing::Listing;

/// Bytes left untouched when a city is put on the wire. Everything else is `%XX` encoded.
const CITY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b'/');

pub fn encode_city(city: &str) -> String {
    utf8_percent_encode(city, CITY).to_string()
}

/// Invalid escapes are passed through and invalid UTF-8 is replaced, never rejected.
pub fn decode_city(city: &str) -> String {
    percent_decode_str(city).decode_utf8_lossy().into_owned()
}

/// Collects `key=value` tokens. Tokens without `=` are ignored and a repeated key keeps its last
/// value.
pub fn parse_params<'a, I>(tokens: I) -> HashMap<&'a str, &'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    tokens
        .into_iter()
        .filter_map(|token| token.split_once('='))
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
pub enum RawCommand {
    List,
    Search { city: String, max_price: i64 },
}

impl RawCommand {
    /// Parses a raw command line as received by the store. Parsing is permissive: unknown keys are
    /// ignored, a missing city is empty and a missing `max_price` is zero.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let mut tokens = line.split_whitespace();
        let name = tokens.next().ok_or(ProtocolError::UnknownCommand)?;

        if name.eq_ignore_ascii_case("RAW_LIST") {
            return Ok(RawCommand::List);
        }

        if !name.eq_ignore_ascii_case("RAW_SEARCH") {
            return Err(ProtocolError::UnknownCommand);
        }

        let params = parse_params(tokens);
        let city = params.get("city").map(|c| decode_city(c)).unwrap_or_default();
        let max_price = match params.get("max_price") {
            Some(value) => value
                .parse::<i64>()
                .map_err(|_| ProtocolError::InvalidInteger { param: "max_price" })?,
            None => 0,
        };

        Ok(RawCommand::Search { city, max_price })
    }

    /// The wire form of the command, without the trailing newline.
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RawCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawCommand::List => write!(f, "RAW_LIST"),
            RawCommand::Search { city, max_price } => write!(
                f,
                "RAW_SEARCH city={} max_price={}",
                encode_city(city),
                max_price
            ),
        }
    }
}

/// A decoded store response. Also the payload kept by the gateway cache.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Listings(Vec<Listing>),
    Error {
        #[serde(deserialize_with = "error_message")]
        error: String,
    },
}

/// Error messages are usually strings, any other JSON value is kept as its JSON text.
fn error_message<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(message) => Ok(message),
        other => Ok(other.to_string()),
    }
}

impl Response {
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            error: message.into(),
        }
    }

    /// Interprets a JSON document received from the store. Anything other than an array of valid
    /// listings or an object carrying an `error` is rejected.
    pub fn from_json(value: Value) -> Result<Self, ProtocolError> {
        serde_json::from_value(value).map_err(ProtocolError::UnexpectedResponse)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(self).map_err(ProtocolError::UnexpectedResponse)
    }
}

impl From<ProtocolError> for Response {
    fn from(err: ProtocolError) -> Self {
        Response::error(err.to_string())
    }
}

#[derive(Debug, ThisError)]
pub enum ProtocolError {
    #[error("Unknown command")]
    UnknownCommand,
    #[error("{param} must be an int")]
    InvalidInteger { param: &'static str },
    #[error("unexpected response shape: {0}")]
    UnexpectedResponse(serde_json::Error),
}
