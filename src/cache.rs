use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::time::{Duration, Instant};

use crate::protocol::Response;

pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// The Cache keeps store responses for a fixed time-to-live. Expired entries are only removed when
/// they are looked up again, there is no background sweeper. It can be shared between sessions and
/// cloned cheaply using reference counting.
#[derive(Clone)]
pub struct Cache {
    inner: Arc<InnerCache>,
}

impl Cache {
    pub fn new(ttl: Duration) -> Cache {
        let inner = Arc::new(InnerCache {
            state: Mutex::new(State {
                entries: HashMap::new(),
            }),
            ttl,
        });

        Self { inner }
    }

    pub fn get(&self, key: &CacheKey) -> Option<Response> {
        self.lock().get(key)
    }

    pub fn put(&self, key: CacheKey, payload: Response) {
        self.lock().put(key, payload)
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl Deref for Cache {
    type Target = InnerCache;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

pub struct InnerCache {
    state: Mutex<State>,
    ttl: Duration,
}

impl InnerCache {
    pub fn lock(&self) -> InnerCacheLocked<'_> {
        let state = self.state.lock().unwrap();
        InnerCacheLocked {
            state,
            ttl: self.ttl,
        }
    }
}

pub struct InnerCacheLocked<'a> {
    state: MutexGuard<'a, State>,
    ttl: Duration,
}

impl<'a> InnerCacheLocked<'a> {
    pub fn get(&mut self, key: &CacheKey) -> Option<Response> {
        let entry = self.state.entries.get(key)?;

        if entry.inserted_at.elapsed() < self.ttl {
            return Some(entry.payload.clone());
        }

        self.state.entries.remove(key);
        None
    }

    pub fn put(&mut self, key: CacheKey, payload: Response) {
        let entry = Entry {
            inserted_at: Instant::now(),
            payload,
        };
        self.state.entries.insert(key, entry);
    }

    /// Number of stored entries, expired ones included until they are looked up.
    pub fn len(&self) -> usize {
        self.state.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.entries.is_empty()
    }
}

/// Identifies a cacheable query. Built from the command name and its decoded parameters, so
/// `city=Long%20Beach` and `city=Long Beach` share an entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn list() -> CacheKey {
        CacheKey("LIST".to_string())
    }

    pub fn search(city: &str, max_price: i64) -> CacheKey {
        CacheKey(format!("SEARCH:{}:{}", city, max_price))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

struct Entry {
    inserted_at: Instant,
    payload: Response,
}

struct State {
    entries: HashMap<CacheKey, Entry>,
}
