use crate::cache::CacheKey;
use crate::commands::executable::Executable;
use crate::commands::{reply_from, CommandParser, CommandParserError};
use crate::events::EventKind;
use crate::gateway::Session;
use crate::protocol::{RawCommand, Response};
use crate::reply::Reply;
use crate::upstream::UpstreamError;

/// Every listing the store holds, cheapest first.
#[derive(Debug, PartialEq)]
pub struct List;

impl Executable for List {
    async fn exec(self, session: &Session) -> Result<Reply, UpstreamError> {
        let key = CacheKey::list();

        if let Some(payload) = session.gateway.cache.get(&key) {
            session.record(EventKind::CacheHit, key.as_str());
            return Ok(reply_from(payload));
        }
        session.record(EventKind::CacheMiss, key.as_str());

        let cmd = RawCommand::List;
        session.record(EventKind::Forward, cmd.encode());

        match session.gateway.store.query(&cmd).await? {
            Response::Error { error } => Err(UpstreamError::UnexpectedError { message: error }),
            payload => {
                session.gateway.cache.put(key, payload.clone());
                Ok(reply_from(payload))
            }
        }
    }
}

impl TryFrom<&mut CommandParser<'_>> for List {
    type Error = CommandParserError;

    fn try_from(_parser: &mut CommandParser<'_>) -> Result<Self, Self::Error> {
        Ok(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{listing, session};

    #[tokio::test]
    async fn list_ranks_and_caches() {
        let (session, events) = session(vec![
            listing(1, "Austin", "1 Elm", 1000, 2),
            listing(2, "Long Beach", "2 Oak", 800, 3),
            listing(3, "San Diego", "3 Pine", 800, 4),
        ]);

        let reply = List.exec(&session).await.unwrap();
        assert_eq!(
            reply.to_string(),
            "OK RESULT 3\n\
             3 | San Diego | 3 Pine | $800 | 4 bd\n\
             2 | Long Beach | 2 Oak | $800 | 3 bd\n\
             1 | Austin | 1 Elm | $1000 | 2 bd\n\
             END\n"
        );

        let again = List.exec(&session).await.unwrap();
        assert_eq!(again, reply);

        assert_eq!(
            events.kinds(),
            vec![
                EventKind::CacheMiss,
                EventKind::Forward,
                EventKind::CacheHit
            ]
        );
        assert_eq!(events.events()[1].detail, "RAW_LIST");
    }

    #[tokio::test]
    async fn list_empty_store() {
        let (session, _) = session(vec![]);

        let reply = List.exec(&session).await.unwrap();
        assert_eq!(reply, Reply::Results(vec![]));
    }
}
