use bytes::{Buf, BufMut, BytesMut};
use serde_json::Value;
use std::io;
use thiserror::Error as ThisError;
use tokio_util::codec::{Decoder, Encoder};

pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;
pub const DEFAULT_MAX_RESPONSE_SIZE: usize = 8 * 1024 * 1024;

#[derive(Debug, ThisError)]
pub enum CodecError {
    #[error("line length exceeds limit of {0} bytes")]
    LineTooLong(usize),
    #[error("response size exceeds limit of {0} bytes")]
    ResponseTooLarge(usize),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Newline delimited text, used for client commands and raw store commands.
///
/// Invalid UTF-8 is replaced rather than rejected and surrounding whitespace (including a `\r`
/// before the newline) is trimmed.
pub struct LineCodec {
    max_length: usize,
    // Index in the buffer up to which we already know there is no newline.
    next_index: usize,
}

impl LineCodec {
    pub fn new(max_length: usize) -> LineCodec {
        LineCodec {
            max_length,
            next_index: 0,
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LENGTH)
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let newline = src[self.next_index..]
            .iter()
            .position(|b| *b == b'\n')
            .map(|offset| self.next_index + offset);

        match newline {
            Some(index) => {
                self.next_index = 0;
                let line = src.split_to(index + 1);
                Ok(Some(to_line(&line[..index])))
            }
            None if src.len() > self.max_length => Err(CodecError::LineTooLong(self.max_length)),
            None => {
                self.next_index = src.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }

        // A final line without a terminating newline still counts.
        self.next_index = 0;
        if src.is_empty() {
            return Ok(None);
        }
        let rest = src.split();
        Ok(Some(to_line(&rest)))
    }
}

impl Encoder<String> for LineCodec {
    type Error = CodecError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(line.len() + 1);
        dst.put_slice(line.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}

fn to_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}

/// Incremental decoder for store responses.
///
/// Every response is one JSON value on its own line. Each time more bytes arrive the codec tries
/// to parse a value from the start of the buffer. An incomplete value keeps waiting for more data.
/// Once a value parses, the rest of its line is dropped. A line that can never parse is yielded
/// as a single `Err` once its newline has arrived, so each response line produces exactly one
/// item.
pub struct JsonCodec {
    max_size: usize,
    // Set when a value was decoded but the end of its line has not arrived yet.
    discarding: bool,
}

impl JsonCodec {
    pub fn new(max_size: usize) -> JsonCodec {
        JsonCodec {
            max_size,
            discarding: false,
        }
    }

    /// Drops the remainder of the current line, or everything buffered if its newline is still
    /// to come.
    fn discard_line(&mut self, src: &mut BytesMut) {
        match src.iter().position(|b| *b == b'\n') {
            Some(index) => {
                src.advance(index + 1);
                self.discarding = false;
            }
            None => {
                src.clear();
                self.discarding = true;
            }
        }
    }

    fn check_size(&self, src: &BytesMut) -> Result<(), CodecError> {
        if src.len() > self.max_size {
            return Err(CodecError::ResponseTooLarge(self.max_size));
        }
        Ok(())
    }
}

impl Default for JsonCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RESPONSE_SIZE)
    }
}

impl Decoder for JsonCodec {
    type Item = Result<Value, serde_json::Error>;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.discarding {
            self.discard_line(src);
            if self.discarding {
                return Ok(None);
            }
        }

        let whitespace = src
            .iter()
            .take_while(|b| b.is_ascii_whitespace())
            .count();
        src.advance(whitespace);

        if src.is_empty() {
            return Ok(None);
        }

        let (parsed, consumed) = {
            let mut values = serde_json::Deserializer::from_slice(&src[..]).into_iter::<Value>();
            let parsed = values.next();
            (parsed, values.byte_offset())
        };

        match parsed {
            Some(Ok(value)) => {
                src.advance(consumed);
                self.discard_line(src);
                Ok(Some(Ok(value)))
            }
            Some(Err(err)) if err.is_eof() => {
                self.check_size(src)?;
                Ok(None)
            }
            Some(Err(err)) => match src.iter().position(|b| *b == b'\n') {
                Some(index) => {
                    src.advance(index + 1);
                    Ok(Some(Err(err)))
                }
                None => {
                    // Report the bad line once, when all of it is here.
                    self.check_size(src)?;
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(item) = self.decode(src)? {
            return Ok(Some(item));
        }

        // A malformed last line is still reported. A truncated value will never complete.
        let item = match serde_json::from_slice::<Value>(&src[..]) {
            Err(err) if !src.is_empty() && !err.is_eof() => Some(Err(err)),
            _ => None,
        };
        src.clear();
        self.discarding = false;
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_lines() {
        let mut codec = LineCodec::default();
        let mut buf = BytesMut::from("LIST\r\nSEARCH city=Austin");

        assert_eq!(codec.decode(&mut buf).unwrap(), Some("LIST".to_string()));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b" max_price=10\n");
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some("SEARCH city=Austin max_price=10".to_string())
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_line_with_invalid_utf8() {
        let mut codec = LineCodec::default();
        let mut buf = BytesMut::from(&b"LI\xffST\n"[..]);

        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some("LI\u{FFFD}ST".to_string())
        );
    }

    #[test]
    fn decode_unterminated_line_at_eof() {
        let mut codec = LineCodec::default();
        let mut buf = BytesMut::from("RAW_LIST");

        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(
            codec.decode_eof(&mut buf).unwrap(),
            Some("RAW_LIST".to_string())
        );
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
    }

    #[test]
    fn reject_long_lines() {
        let mut codec = LineCodec::new(8);
        let mut buf = BytesMut::from("SEARCH city=");

        assert!(matches!(
            codec.decode(&mut buf),
            Err(CodecError::LineTooLong(8))
        ));
    }

    #[test]
    fn encode_line() {
        let mut codec = LineCodec::default();
        let mut buf = BytesMut::new();

        codec.encode("RAW_LIST".to_string(), &mut buf).unwrap();
        assert_eq!(&buf[..], b"RAW_LIST\n");
    }

    #[test]
    fn decode_json_incrementally() {
        let mut codec = JsonCodec::default();
        let mut buf = BytesMut::from("[{\"id\": 1, \"city\": \"Aus");

        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"tin\"}]\n");
        let value = codec.decode(&mut buf).unwrap().unwrap().unwrap();

        assert_eq!(value, json!([{"id": 1, "city": "Austin"}]));
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_json_split_inside_multibyte_character() {
        let mut codec = JsonCodec::default();
        let text = "[\"São Paulo\"]".as_bytes();
        let split = text.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let mut buf = BytesMut::from(&text[..split]);

        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(&text[split..]);
        let value = codec.decode(&mut buf).unwrap().unwrap().unwrap();
        assert_eq!(value, json!(["São Paulo"]));
    }

    #[test]
    fn decode_consecutive_json_values() {
        let mut codec = JsonCodec::default();
        let mut buf = BytesMut::from("\n [] \n{\"error\": \"Unknown command\"}\n");

        assert_eq!(codec.decode(&mut buf).unwrap().unwrap().unwrap(), json!([]));
        assert_eq!(
            codec.decode(&mut buf).unwrap().unwrap().unwrap(),
            json!({"error": "Unknown command"})
        );
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn decode_malformed_json_skips_line() {
        let mut codec = JsonCodec::default();
        let mut buf = BytesMut::from("not json\n[]\n");

        assert!(codec.decode(&mut buf).unwrap().unwrap().is_err());
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap().unwrap(), json!([]));
    }

    #[test]
    fn decode_json_drops_rest_of_line() {
        let mut codec = JsonCodec::default();
        let mut buf = BytesMut::from("[] junk\n{\"error\": \"second\"}\n");

        assert_eq!(codec.decode(&mut buf).unwrap().unwrap().unwrap(), json!([]));
        assert_eq!(
            codec.decode(&mut buf).unwrap().unwrap().unwrap(),
            json!({"error": "second"})
        );
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn decode_json_drops_rest_of_line_across_chunks() {
        let mut codec = JsonCodec::default();
        let mut buf = BytesMut::from("[] ju");

        assert_eq!(codec.decode(&mut buf).unwrap().unwrap().unwrap(), json!([]));
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"nk\n[1]\n");
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap().unwrap(), json!([1]));
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn decode_malformed_line_in_chunks_yields_one_error() {
        let mut codec = JsonCodec::default();
        let mut buf = BytesMut::from("oops");

        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b" more\n[]\n");
        assert!(codec.decode(&mut buf).unwrap().unwrap().is_err());
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap().unwrap(), json!([]));
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn decode_malformed_last_line_at_eof() {
        let mut codec = JsonCodec::default();
        let mut buf = BytesMut::from("oops");

        assert!(codec.decode_eof(&mut buf).unwrap().unwrap().is_err());
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
    }

    #[test]
    fn decode_truncated_json_at_eof() {
        let mut codec = JsonCodec::default();
        let mut buf = BytesMut::from("[{\"id\": 1");

        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
        assert!(buf.is_empty());
    }

    #[test]
    fn reject_oversized_response() {
        let mut codec = JsonCodec::new(4);
        let mut buf = BytesMut::from("[1, 2, 3");

        assert!(matches!(
            codec.decode(&mut buf),
            Err(CodecError::ResponseTooLarge(4))
        ));
    }
}
