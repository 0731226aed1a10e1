// In-process TTL caches. One instance per concern (pages, lookups, entities),
// constructed once at startup and injected into the adapters. Expiry is
// checked lazily on read; a read that observes an expired entry removes it.
// Memory growth is bounded by the key space (catalog URLs + known titles).

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

/// Listing pages go stale quickly; identity lookups and resolved entities
/// are stable for hours.
pub fn page_ttl() -> Duration {
    Duration::minutes(10)
}

pub fn lookup_ttl() -> Duration {
    Duration::hours(6)
}

pub fn entity_ttl() -> Duration {
    Duration::hours(6)
}

/// Injectable time source so cache expiry is testable without real delays.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

struct Entry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    /// Returns the cached value unless it is missing or expired. Expired
    /// entries are removed on observation.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        let now = self.clock.now();
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insert or replace; the entry lives for the cache's TTL from now.
    pub fn insert(&self, key: K, value: V) {
        let expires_at = self.clock.now() + self.ttl;
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.insert(key, Entry { value, expires_at });
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
