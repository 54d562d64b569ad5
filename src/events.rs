use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use strum_macros::{Display, EnumString};
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString)]
pub enum EventKind {
    #[strum(serialize = "CONNECT")]
    Connect,
    #[strum(serialize = "REQUEST")]
    Request,
    #[strum(serialize = "CACHE HIT")]
    CacheHit,
    #[strum(serialize = "CACHE MISS")]
    CacheMiss,
    #[strum(serialize = "FORWARD")]
    Forward,
    #[strum(serialize = "RESPONSE")]
    Response,
    #[strum(serialize = "DISCONNECT")]
    Disconnect,
}

/// One entry of the gateway's append-only event log.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    pub peer: SocketAddr,
    pub detail: String,
}

impl Event {
    pub fn new(kind: EventKind, peer: SocketAddr, detail: impl Into<String>) -> Event {
        Event {
            timestamp: Utc::now(),
            kind,
            peer,
            detail: detail.into(),
        }
    }
}

/// Receives events as a side effect of serving requests. Implementations must not block the
/// caller.
pub trait EventSink: Send + Sync {
    fn record(&self, event: Event);
}

/// Emits every event as a structured `tracing` record. Where it ends up is up to the installed
/// subscriber.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: Event) {
        info!(
            target: "listings::events",
            timestamp = %event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            kind = %event.kind,
            peer = %event.peer,
            detail = %event.detail,
            "{} {}: {}",
            event.kind,
            event.peer,
            event.detail
        );
    }
}

/// Keeps events in memory.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<Event>>>,
}

impl MemorySink {
    pub fn new() -> MemorySink {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().unwrap().iter().map(|e| e.kind).collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind == kind)
            .count()
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn kind_names() {
        assert_eq!(EventKind::CacheHit.to_string(), "CACHE HIT");
        assert_eq!(EventKind::Forward.to_string(), "FORWARD");
        assert_eq!(
            EventKind::from_str("CACHE MISS").unwrap(),
            EventKind::CacheMiss
        );
    }

    #[test]
    fn memory_sink_keeps_order() {
        let sink = MemorySink::new();
        let peer: SocketAddr = "127.0.0.1:5000".parse().unwrap();

        sink.record(Event::new(EventKind::Connect, peer, ""));
        sink.record(Event::new(EventKind::Request, peer, "LIST"));
        sink.record(Event::new(EventKind::Request, peer, "QUIT"));

        assert_eq!(
            sink.kinds(),
            vec![EventKind::Connect, EventKind::Request, EventKind::Request]
        );
        assert_eq!(sink.count(EventKind::Request), 2);
        assert_eq!(sink.events()[1].detail, "LIST");
    }
}
