use std::net::SocketAddr;
use std::sync::Arc;

use crate::cache::Cache;
use crate::events::{Event, EventKind, EventSink, TracingSink};
use crate::upstream::StoreClient;

/// State shared by every client session of one gateway: the store connection, the result cache
/// and the event log. Cheap to clone.
#[derive(Clone)]
pub struct Gateway {
    pub store: StoreClient,
    pub cache: Cache,
    events: Arc<dyn EventSink>,
}

impl Gateway {
    pub fn new(store: StoreClient, cache: Cache) -> Gateway {
        Gateway {
            store,
            cache,
            events: Arc::new(TracingSink),
        }
    }

    pub fn with_events(mut self, events: impl EventSink + 'static) -> Gateway {
        self.events = Arc::new(events);
        self
    }

    pub fn session(&self, peer: SocketAddr) -> Session {
        Session {
            gateway: self.clone(),
            peer,
        }
    }
}

/// A single client connection's view of the gateway.
pub struct Session {
    pub gateway: Gateway,
    pub peer: SocketAddr,
}

impl Session {
    pub fn record(&self, kind: EventKind, detail: impl Into<String>) {
        self.gateway
            .events
            .record(Event::new(kind, self.peer, detail));
    }
}
