use std::time::{Duration, Instant};

use moka::future::Cache;
use moka::Expiry;

use crate::types::SearchResponse;

const NORMAL_TTL: Duration = Duration::from_secs(300);
const DEEP_TTL: Duration = Duration::from_secs(600);

// Entries are never proactively swept upstream; a capacity bound keeps the
// cache from growing without limit under varied queries.
const MAX_ENTRIES: u64 = 2_000;

#[derive(Clone)]
struct Entry {
    deep: bool,
    response: SearchResponse,
}

/// Deep responses are expensive to recompute (every provider, in
/// parallel), so they live twice as long.
struct ModeTtl {
    normal: Duration,
    deep: Duration,
}

impl ModeTtl {
    fn ttl_for(&self, entry: &Entry) -> Duration {
        if entry.deep {
            self.deep
        } else {
            self.normal
        }
    }
}

impl Expiry<String, Entry> for ModeTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(self.ttl_for(entry))
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(self.ttl_for(entry))
    }
}

/// In-memory TTL cache mapping a canonical query key to a finished
/// [`SearchResponse`]. Not persisted across restarts.
pub struct ResultCache {
    inner: Cache<String, Entry>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::with_ttls(NORMAL_TTL, DEEP_TTL)
    }

    pub fn with_ttls(normal: Duration, deep: Duration) -> Self {
        let inner = Cache::builder()
            .max_capacity(MAX_ENTRIES)
            .expire_after(ModeTtl { normal, deep })
            .build();
        Self { inner }
    }

    /// Canonical cache key. `fast` is deliberately not part of the key:
    /// a fast and a non-fast query with the same text, limit and deep
    /// flag share one entry.
    pub fn key(query: &str, max_results: usize, deep: bool) -> String {
        format!("{}|{}|{}", query.trim().to_lowercase(), max_results, deep)
    }

    pub async fn get(&self, key: &str) -> Option<SearchResponse> {
        self.inner.get(key).await.map(|entry| entry.response)
    }

    pub async fn put(&self, key: String, deep: bool, response: SearchResponse) {
        self.inner.insert(key, Entry { deep, response }).await;
    }

    pub fn clear(&self) {
        self.inner.invalidate_all();
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}
