//! Rendered page cache
//!
//! Pages are served from memory for a fixed revalidation window after they
//! were rendered, then rendered again from fresh content on the next
//! request. A window of zero disables caching.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// A rendered page and when it was rendered
#[derive(Debug, Clone)]
struct CacheEntry {
    html: String,
    rendered_at: Instant,
}

/// Time-boxed cache of rendered HTML keyed by route
#[derive(Debug)]
pub struct PageCache {
    revalidate: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl PageCache {
    pub fn new(revalidate: Duration) -> Self {
        Self {
            revalidate,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn enabled(&self) -> bool {
        !self.revalidate.is_zero()
    }

    /// Cached page for `key` if it is still within the window
    pub async fn get(&self, key: &str) -> Option<String> {
        if !self.enabled() {
            return None;
        }
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.rendered_at.elapsed() < self.revalidate {
            tracing::debug!("Page cache hit: {}", key);
            Some(entry.html.clone())
        } else {
            None
        }
    }

    pub async fn insert(&self, key: &str, html: &str) {
        if !self.enabled() {
            return;
        }
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| e.rendered_at.elapsed() < self.revalidate);
        entries.insert(
            key.to_string(),
            CacheEntry {
                html: html.to_string(),
                rendered_at: Instant::now(),
            },
        );
    }

    /// Number of entries, stale ones included
    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hit_within_window() {
        let cache = PageCache::new(Duration::from_secs(60));
        assert!(cache.get("/").await.is_none());
        cache.insert("/", "<html>").await;
        assert_eq!(cache.get("/").await.as_deref(), Some("<html>"));
        assert!(cache.get("/post/x").await.is_none());
    }

    #[tokio::test]
    async fn test_stale_entries_are_revalidated() {
        let cache = PageCache::new(Duration::from_millis(10));
        cache.insert("/", "old").await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(cache.get("/").await.is_none());

        cache.insert("/post/a", "new").await;
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_zero_window_disables_cache() {
        let cache = PageCache::new(Duration::ZERO);
        cache.insert("/", "page").await;
        assert!(cache.get("/").await.is_none());
        assert_eq!(cache.len().await, 0);
    }
}
