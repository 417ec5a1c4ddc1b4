//! Request counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters recorded by the dispatcher.
#[derive(Debug, Default)]
pub struct ProxyMetrics {
    requests: AtomicU64,
    bad_paths: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    origin_fetches: AtomicU64,
    origin_failures: AtomicU64,
    save_failures: AtomicU64,
}

impl ProxyMetrics {
    /// Create zeroed metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// An inbound request arrived.
    pub fn request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// The request path did not match the tile grammar.
    pub fn bad_path(&self) {
        self.bad_paths.fetch_add(1, Ordering::Relaxed);
    }

    /// A lookup found a cached tile.
    pub fn cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// A lookup missed (or failed and degraded to a miss).
    pub fn cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// An origin fetch was started.
    pub fn origin_fetch(&self) {
        self.origin_fetches.fetch_add(1, Ordering::Relaxed);
    }

    /// An origin fetch failed.
    pub fn origin_failure(&self) {
        self.origin_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// A background cache save failed.
    pub fn save_failure(&self) {
        self.save_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time copy of all counters.
    pub fn snapshot(&self) -> ProxySnapshot {
        ProxySnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            bad_paths: self.bad_paths.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            origin_fetches: self.origin_fetches.load(Ordering::Relaxed),
            origin_failures: self.origin_failures.load(Ordering::Relaxed),
            save_failures: self.save_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the proxy counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProxySnapshot {
    pub requests: u64,
    pub bad_paths: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub origin_fetches: u64,
    pub origin_failures: u64,
    pub save_failures: u64,
}

impl ProxySnapshot {
    /// Cache hit ratio over completed lookups, 0.0 when none occurred.
    pub fn hit_ratio(&self) -> f64 {
        let lookups = self.cache_hits + self.cache_misses;
        if lookups == 0 {
            return 0.0;
        }
        self.cache_hits as f64 / lookups as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_metrics_snapshot_is_zero() {
        let metrics = ProxyMetrics::new();
        assert_eq!(metrics.snapshot(), ProxySnapshot::default());
    }

    #[test]
    fn test_counters_accumulate() {
        let metrics = ProxyMetrics::new();
        metrics.request();
        metrics.request();
        metrics.cache_hit();
        metrics.cache_miss();
        metrics.origin_fetch();
        metrics.origin_failure();
        metrics.save_failure();
        metrics.bad_path();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests, 2);
        assert_eq!(snapshot.cache_hits, 1);
        assert_eq!(snapshot.cache_misses, 1);
        assert_eq!(snapshot.origin_fetches, 1);
        assert_eq!(snapshot.origin_failures, 1);
        assert_eq!(snapshot.save_failures, 1);
        assert_eq!(snapshot.bad_paths, 1);
    }

    #[test]
    fn test_hit_ratio() {
        let metrics = ProxyMetrics::new();
        assert_eq!(metrics.snapshot().hit_ratio(), 0.0);
        metrics.cache_hit();
        metrics.cache_hit();
        metrics.cache_hit();
        metrics.cache_miss();
        assert_eq!(metrics.snapshot().hit_ratio(), 0.75);
    }
}
