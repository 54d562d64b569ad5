use std::fmt;

use crate::listing::Listing;

pub const BANNER: &str =
    "OK app_server ready. Commands: LIST | SEARCH city=<City> max_price=<Int> | QUIT";

/// Everything the gateway writes back to a client.
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    Ready,
    /// Listings, already ranked.
    Results(Vec<Listing>),
    Error(String),
    Bye,
}

impl Reply {
    pub fn error(message: impl Into<String>) -> Reply {
        Reply::Error(message.into())
    }

    /// First line of the reply, used when logging responses.
    pub fn summary(&self) -> String {
        match self {
            Reply::Ready => BANNER.to_string(),
            Reply::Results(listings) => format!("OK RESULT {}", listings.len()),
            Reply::Error(message) => format!("ERROR {}", message),
            Reply::Bye => "OK bye".to_string(),
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl From<Reply> for Vec<u8> {
    fn from(reply: Reply) -> Self {
        reply.serialize()
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Results(listings) => {
                writeln!(f, "OK RESULT {}", listings.len())?;
                for listing in listings {
                    writeln!(
                        f,
                        "{} | {} | {} | ${} | {} bd",
                        listing.id, listing.city, listing.address, listing.price, listing.bedrooms
                    )?;
                }
                writeln!(f, "END")
            }
            reply => writeln!(f, "{}", reply.summary()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::ListingId;

    #[test]
    fn format_results() {
        let reply = Reply::Results(vec![
            Listing {
                id: ListingId::Number(2),
                city: "Austin".to_string(),
                address: "2 Oak".to_string(),
                price: 800,
                bedrooms: 3,
            },
            Listing {
                id: ListingId::Number(1),
                city: "Austin".to_string(),
                address: "1 Elm".to_string(),
                price: 1000,
                bedrooms: 2,
            },
        ]);

        assert_eq!(
            reply.to_string(),
            "OK RESULT 2\n\
             2 | Austin | 2 Oak | $800 | 3 bd\n\
             1 | Austin | 1 Elm | $1000 | 2 bd\n\
             END\n"
        );
        assert_eq!(reply.summary(), "OK RESULT 2");
    }

    #[test]
    fn format_empty_results() {
        assert_eq!(Reply::Results(vec![]).to_string(), "OK RESULT 0\nEND\n");
    }

    #[test]
    fn format_error_without_end() {
        let bytes: Vec<u8> = Reply::error("max_price must be an int").into();
        assert_eq!(bytes, b"ERROR max_price must be an int\n");
    }

    #[test]
    fn format_banner_and_bye() {
        assert_eq!(
            Reply::Ready.to_string(),
            "OK app_server ready. Commands: LIST | SEARCH city=<City> max_price=<Int> | QUIT\n"
        );
        assert_eq!(Reply::Bye.to_string(), "OK bye\n");
    }
}
