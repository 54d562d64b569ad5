use crate::cache::CacheKey;
use crate::commands::executable::Executable;
use crate::commands::{reply_from, CommandParser, CommandParserError};
use crate::events::EventKind;
use crate::gateway::Session;
use crate::protocol::{decode_city, RawCommand};
use crate::reply::Reply;
use crate::upstream::UpstreamError;

/// Listings in `city` priced at or below `max_price`. The city arrives percent-encoded and is kept
/// decoded, with the client's casing, for the cache key. Matching at the store ignores case.
#[derive(Debug, PartialEq)]
pub struct Search {
    pub city: String,
    pub max_price: i64,
}

impl Executable for Search {
    async fn exec(self, session: &Session) -> Result<Reply, UpstreamError> {
        let key = CacheKey::search(&self.city, self.max_price);

        if let Some(payload) = session.gateway.cache.get(&key) {
            session.record(EventKind::CacheHit, key.as_str());
            return Ok(reply_from(payload));
        }
        session.record(EventKind::CacheMiss, key.as_str());

        let cmd = RawCommand::Search {
            city: self.city,
            max_price: self.max_price,
        };
        session.record(EventKind::Forward, cmd.encode());

        // Error payloads are cached as well, so a failing query is not retried within the TTL.
        let payload = session.gateway.store.query(&cmd).await?;
        session.gateway.cache.put(key, payload.clone());

        Ok(reply_from(payload))
    }
}

impl TryFrom<&mut CommandParser<'_>> for Search {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser<'_>) -> Result<Self, Self::Error> {
        let city = parser.param("city").map(decode_city).unwrap_or_default();
        let max_price = parser.integer_param("max_price")?;

        Ok(Self { city, max_price })
    }
}
