//! In-memory TTL cache for successful GET responses on table routes.

use crate::config::CacheConfig;
use axum::body::Bytes;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedResponse {
    pub content_type: Option<String>,
    pub body: Bytes,
}

struct Entry {
    response: CachedResponse,
    stored_at: Instant,
}

impl Entry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() >= ttl
    }
}

/// Keyed by request URI (path and query).
pub struct ResponseCache {
    entries: RwLock<HashMap<String, Entry>>,
    ttl: Duration,
    max_entries: usize,
}

impl ResponseCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        ResponseCache {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.ttl(), config.max_entries)
    }

    pub fn get(&self, key: &str) -> Option<CachedResponse> {
        let entries = self.entries.read().ok()?;
        entries
            .get(key)
            .filter(|e| !e.is_expired(self.ttl))
            .map(|e| e.response.clone())
    }

    /// Returns false when the cache is full of live entries and nothing was stored.
    pub fn insert(&self, key: impl Into<String>, response: CachedResponse) -> bool {
        let Ok(mut entries) = self.entries.write() else {
            return false;
        };
        let key = key.into();
        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            let ttl = self.ttl;
            entries.retain(|_, e| !e.is_expired(ttl));
            if entries.len() >= self.max_entries {
                return false;
            }
        }
        entries.insert(
            key,
            Entry {
                response,
                stored_at: Instant::now(),
            },
        );
        true
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
