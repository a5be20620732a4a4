use std::{
    borrow::Borrow,
    hash::Hash,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use ahash::HashMap;

use crate::catalog::Hotel;

/// All three key spaces share the same TTL.
pub const CACHE_TTL: Duration = Duration::from_secs(2 * 60);

pub type Clock = Arc<dyn Fn() -> Instant + Send + Sync>;

pub struct Caches {
    /// normalized location string -> hotels at that location
    pub by_location: TtlCache<String, Vec<Hotel>>,
    /// normalized hotel id -> hotel. populated as a side effect of every
    /// page fetch, not just direct by-id lookups
    pub by_id: TtlCache<String, Hotel>,
    /// bucketed (lat, lon, limit, target_km) key -> resolved nearby result
    pub nearby: TtlCache<String, Vec<Hotel>>,
}

impl Caches {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(Instant::now))
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self {
            by_location: TtlCache::with_clock(CACHE_TTL, clock.clone()),
            by_id: TtlCache::with_clock(CACHE_TTL, clock.clone()),
            nearby: TtlCache::with_clock(CACHE_TTL, clock),
        }
    }
}

impl Default for Caches {
    fn default() -> Self {
        Self::new()
    }
}

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Expiring key -> value store. Entries are immutable once written (a write
/// replaces, never merges) and are only evicted lazily when an expired entry
/// is read. Unread stale entries linger until the process ends.
pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
    ttl: Duration,
    clock: Clock,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(Instant::now))
    }

    pub fn with_clock(ttl: Duration, clock: Clock) -> Self {
        Self {
            entries: Mutex::new(HashMap::default()),
            ttl,
            clock,
        }
    }

    /// Returns the stored value without resetting its expiry. An entry whose
    /// deadline has passed is removed and treated as absent.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let now = (self.clock)();
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if entry.expires_at <= now => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    pub fn set(&self, key: K, value: V) {
        let expires_at = (self.clock)() + self.ttl;
        self.entries
            .lock()
            .unwrap()
            .insert(key, Entry { value, expires_at });
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
