//! Per-request dispatch logic.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::{debug, error, info, warn};

use crate::cache::TileCache;
use crate::config::ProxyConfig;
use crate::fetch::OriginFetcher;
use crate::stream::tee;
use crate::telemetry::ProxyMetrics;
use crate::tile::{TileArtifact, TileKey, TilePathParser};

/// The tile dispatcher.
///
/// Depends only on the [`TileCache`] and [`OriginFetcher`] traits; the
/// concrete backend and transport are construction-time choices.
pub struct TileProxy {
    config: ProxyConfig,
    parser: TilePathParser,
    cache: Arc<dyn TileCache>,
    fetcher: Arc<dyn OriginFetcher>,
    metrics: Arc<ProxyMetrics>,
}

impl TileProxy {
    /// Create a proxy over the given cache backend and origin fetcher.
    pub fn new(
        config: ProxyConfig,
        cache: Arc<dyn TileCache>,
        fetcher: Arc<dyn OriginFetcher>,
    ) -> Self {
        let parser = TilePathParser::new(&config.shards);
        Self {
            config,
            parser,
            cache,
            fetcher,
            metrics: Arc::new(ProxyMetrics::new()),
        }
    }

    /// Get the proxy configuration.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Get a handle to the request counters.
    pub fn metrics(&self) -> Arc<ProxyMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Handle one request path.
    ///
    /// This is the whole per-request state machine; the HTTP layer in
    /// [`super::server`] only extracts the path and writes the response.
    pub async fn dispatch(&self, path: &str) -> Response {
        self.metrics.request();

        let Some(key) = self.parser.parse(path) else {
            debug!(path, "Path does not match tile grammar");
            self.metrics.bad_path();
            return (StatusCode::NOT_FOUND, "Not Found").into_response();
        };

        match self.cache.load(&key).await {
            Ok(Some(artifact)) => {
                debug!(key = %key, "Cache hit");
                self.metrics.cache_hit();
                artifact_response(artifact)
            }
            Ok(None) => {
                debug!(key = %key, "Cache miss");
                self.metrics.cache_miss();
                self.serve_remote_tile(key).await
            }
            Err(e) => {
                // A failed lookup degrades to a miss; cache correctness
                // is never load-bearing for the response.
                warn!(key = %key, error = %e, "Cache lookup failed");
                self.metrics.cache_miss();
                self.serve_remote_tile(key).await
            }
        }
    }

    /// Fetch a tile from the origin, fan it out to the client and the
    /// cache, and answer with the client copy.
    async fn serve_remote_tile(&self, key: TileKey) -> Response {
        let url = key.origin_url(&self.config.tile_host);
        self.metrics.origin_fetch();

        let artifact = match self.fetcher.fetch(&url).await {
            Ok(artifact) => artifact,
            Err(e) => {
                error!(key = %key, url, error = %e, "Origin fetch failed");
                self.metrics.origin_failure();
                return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
                    .into_response();
            }
        };

        let TileArtifact { metadata, content } = artifact;
        let (client_copy, cache_copy) = tee(content);

        // Fire-and-forget: the save result is only observed for
        // diagnostics and never affects the in-flight response.
        let cache = Arc::clone(&self.cache);
        let metrics = Arc::clone(&self.metrics);
        let save_metadata = metadata.clone();
        tokio::spawn(async move {
            match cache.save(&key, cache_copy, save_metadata).await {
                Ok(()) => info!(key = %key, "Cached tile"),
                Err(e) => {
                    metrics.save_failure();
                    warn!(key = %key, error = %e, "Tile cache save failed");
                }
            }
        });

        artifact_response(TileArtifact::new(metadata, client_copy))
    }
}

/// Build a 200 response streaming the artifact's bytes with its headers.
fn artifact_response(artifact: TileArtifact) -> Response {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, artifact.metadata.content_type);
    if let Some(encoding) = artifact.metadata.content_encoding {
        builder = builder.header(header::CONTENT_ENCODING, encoding);
    }

    match builder.body(Body::from_stream(artifact.content)) {
        Ok(response) => response,
        Err(e) => {
            // Only reachable when the origin declared a malformed header.
            error!(error = %e, "Failed to build tile response");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{BoxFuture, CacheError};
    use crate::fetch::tests::MockFetcher;
    use crate::tile::{collect_stream, TileMetadata, TileStream};
    use bytes::Bytes;
    use http_body_util::BodyExt;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Recorded save call: key, content type, drained bytes.
    type SaveCall = (TileKey, String, Vec<u8>);

    /// Scriptable cache double recording save invocations.
    struct MockCache {
        /// Result for `load`: a hit payload, a miss, or an error.
        load_result: LoadBehavior,
        /// Whether `save` should fail after draining its input.
        fail_saves: bool,
        saves: Mutex<Vec<SaveCall>>,
        loads: Mutex<u64>,
    }

    enum LoadBehavior {
        Hit(Vec<u8>, String),
        Miss,
        Fail,
    }

    impl MockCache {
        fn missing() -> Self {
            Self::with_behavior(LoadBehavior::Miss)
        }

        fn holding(bytes: &[u8], content_type: &str) -> Self {
            Self::with_behavior(LoadBehavior::Hit(
                bytes.to_vec(),
                content_type.to_string(),
            ))
        }

        fn failing_lookups() -> Self {
            Self::with_behavior(LoadBehavior::Fail)
        }

        fn with_behavior(load_result: LoadBehavior) -> Self {
            Self {
                load_result,
                fail_saves: false,
                saves: Mutex::new(Vec::new()),
                loads: Mutex::new(0),
            }
        }

        fn failing_saves(mut self) -> Self {
            self.fail_saves = true;
            self
        }
    }

    impl TileCache for MockCache {
        fn load(
            &self,
            _key: &TileKey,
        ) -> BoxFuture<'_, Result<Option<TileArtifact>, CacheError>> {
            *self.loads.lock().unwrap() += 1;
            Box::pin(async move {
                match &self.load_result {
                    LoadBehavior::Hit(bytes, content_type) => Ok(Some(TileArtifact::from_bytes(
                        TileMetadata::new(content_type.clone()),
                        Bytes::from(bytes.clone()),
                    ))),
                    LoadBehavior::Miss => Ok(None),
                    LoadBehavior::Fail => {
                        Err(CacheError::Storage("index unavailable".to_string()))
                    }
                }
            })
        }

        fn save(
            &self,
            key: &TileKey,
            content: TileStream,
            metadata: TileMetadata,
        ) -> BoxFuture<'_, Result<(), CacheError>> {
            let key = *key;
            Box::pin(async move {
                let bytes = collect_stream(content).await?;
                self.saves
                    .lock()
                    .unwrap()
                    .push((key, metadata.content_type, bytes));
                if self.fail_saves {
                    return Err(CacheError::Storage("disk full".to_string()));
                }
                Ok(())
            })
        }
    }

    fn proxy(cache: Arc<MockCache>, fetcher: Arc<MockFetcher>) -> TileProxy {
        TileProxy::new(ProxyConfig::default(), cache, fetcher)
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        response
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec()
    }

    /// Wait for the detached save task to record its call.
    async fn wait_for_saves(cache: &MockCache, expected: usize) {
        for _ in 0..100 {
            if cache.saves.lock().unwrap().len() >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("save task never ran");
    }

    const PNG_BYTES: &[u8] = &[0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a];

    #[tokio::test]
    async fn test_invalid_path_is_not_found_without_fetch() {
        let fetcher = Arc::new(MockFetcher::serving(PNG_BYTES, "image/png"));
        let proxy = proxy(Arc::new(MockCache::missing()), fetcher.clone());

        for path in ["/z/1/2/3.png", "/a/5/6.png", "/", "/favicon.ico"] {
            let response = proxy.dispatch(path).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }
        assert_eq!(fetcher.call_count(), 0);
    }

    #[tokio::test]
    async fn test_hit_serves_cached_bytes_without_fetch_or_save() {
        let cache = Arc::new(MockCache::holding(PNG_BYTES, "image/png"));
        let fetcher = Arc::new(MockFetcher::serving(b"wrong", "image/png"));
        let proxy = proxy(cache.clone(), fetcher.clone());

        let response = proxy.dispatch("/a/3/2/1.png").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/png"
        );
        assert_eq!(body_bytes(response).await, PNG_BYTES);

        assert_eq!(fetcher.call_count(), 0);
        assert!(cache.saves.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_miss_fetches_once_and_saves_once() {
        let cache = Arc::new(MockCache::missing());
        let fetcher = Arc::new(MockFetcher::serving(PNG_BYTES, "image/png"));
        let proxy = proxy(cache.clone(), fetcher.clone());

        let response = proxy.dispatch("/a/3/2/1.png").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/png"
        );
        assert_eq!(body_bytes(response).await, PNG_BYTES);

        assert_eq!(fetcher.call_count(), 1);
        assert_eq!(
            fetcher.urls.lock().unwrap().as_slice(),
            &["https://a.tile.openstreetmap.org/3/2/1.png".to_string()]
        );

        wait_for_saves(&cache, 1).await;
        let saves = cache.saves.lock().unwrap();
        let (key, content_type, bytes) = &saves[0];
        assert_eq!(*key, TileKey::new('a', 3, 2, 1));
        assert_eq!(content_type, "image/png");
        assert_eq!(bytes.as_slice(), PNG_BYTES);
    }

    #[tokio::test]
    async fn test_save_failure_leaves_response_intact() {
        let cache = Arc::new(MockCache::missing().failing_saves());
        let fetcher = Arc::new(MockFetcher::serving(PNG_BYTES, "image/png"));
        let proxy = proxy(cache.clone(), fetcher);

        let response = proxy.dispatch("/b/7/8/9.png").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, PNG_BYTES);

        wait_for_saves(&cache, 1).await;
        assert_eq!(proxy.metrics().snapshot().save_failures, 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_server_fault_without_save() {
        let cache = Arc::new(MockCache::missing());
        let fetcher = Arc::new(MockFetcher::failing());
        let proxy = proxy(cache.clone(), fetcher.clone());

        let response = proxy.dispatch("/a/3/2/1.png").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_bytes(response).await, b"Internal Server Error");

        assert_eq!(fetcher.call_count(), 1);
        // Give any stray task a chance to run before asserting absence.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(cache.saves.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_failure_degrades_to_miss() {
        let cache = Arc::new(MockCache::failing_lookups());
        let fetcher = Arc::new(MockFetcher::serving(PNG_BYTES, "image/png"));
        let proxy = proxy(cache, fetcher.clone());

        let response = proxy.dispatch("/c/10/20/30.png").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, PNG_BYTES);
        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn test_metrics_track_dispatch_outcomes() {
        let cache = Arc::new(MockCache::missing());
        let fetcher = Arc::new(MockFetcher::serving(PNG_BYTES, "image/png"));
        let proxy = proxy(cache, fetcher);

        proxy.dispatch("/bogus").await;
        let response = proxy.dispatch("/a/1/2/3.png").await;
        body_bytes(response).await;

        let snapshot = proxy.metrics().snapshot();
        assert_eq!(snapshot.requests, 2);
        assert_eq!(snapshot.bad_paths, 1);
        assert_eq!(snapshot.cache_misses, 1);
        assert_eq!(snapshot.origin_fetches, 1);
    }
}
