use crate::ExecutionToken;
use dashmap::DashMap;
use std::{
    any::Any,
    fmt::Write,
    sync::Arc,
    time::{Duration, Instant},
};

/// Retention policy for cached results.
#[derive(Clone, Debug, Default)]
pub struct CachePolicy {
    /// `None` keeps the entry until it is invalidated.
    pub time_to_live: Option<Duration>,
}

impl CachePolicy {
    pub fn forever() -> Self {
        Self::default()
    }

    pub fn expiring(time_to_live: Duration) -> Self {
        Self {
            time_to_live: Some(time_to_live),
        }
    }
}

/// External collaborator storing materialized results.
///
/// Object safe so data sources can hold it as a trait object; the typed
/// surface lives on [`ResultCacheExt`].
pub trait ResultCache: Send + Sync {
    fn read(&self, key: &str) -> Option<Arc<dyn Any + Send + Sync>>;
    fn write(&self, key: String, value: Arc<dyn Any + Send + Sync>, policy: &CachePolicy);
    fn invalidate(&self, key: &str);
    fn clear(&self);
}

/// Typed helpers over the object-safe cache surface.
pub trait ResultCacheExt: ResultCache {
    fn read_typed<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        self.read(key).and_then(|v| v.downcast::<T>().ok())
    }

    fn write_typed<T: Send + Sync + 'static>(
        &self,
        key: impl Into<String>,
        value: T,
        policy: &CachePolicy,
    ) -> Arc<T> {
        let value = Arc::new(value);
        self.write(key.into(), value.clone(), policy);
        value
    }
}

impl<C: ResultCache + ?Sized> ResultCacheExt for C {}

struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    expires: Option<Instant>,
}

/// In-process cache on a concurrent map. Expiry is enforced lazily on read.
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ResultCache for MemoryCache {
    fn read(&self, key: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        let expired = match self.entries.get(key) {
            Some(entry) => match entry.expires {
                Some(expires) if expires <= Instant::now() => true,
                _ => return Some(entry.value.clone()),
            },
            None => return None,
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }

    fn write(&self, key: String, value: Arc<dyn Any + Send + Sync>, policy: &CachePolicy) {
        let expires = policy.time_to_live.map(|ttl| Instant::now() + ttl);
        self.entries.insert(key, CacheEntry { value, expires });
    }

    fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }

    fn clear(&self) {
        self.entries.clear();
    }
}

/// Derives the cache key of a statement: its text plus every bound value, so
/// the same query with different arguments caches separately.
pub fn cache_key(token: &ExecutionToken) -> String {
    let mut key = String::with_capacity(token.sql.len() + 32);
    key.push_str(&token.sql);
    for parameter in &token.parameters {
        key.push('\u{1}');
        let _ = write!(key, "{:?}", parameter.value);
    }
    key
}
