//! Object-storage cache backend.
//!
//! Generic over an [`ObjectStore`] so the gzip transform, staleness window,
//! and failure policy can be tested without a real bucket; the S3 adapter
//! lives in [`super::s3`].
//!
//! Tiles are stored gzip-compressed with `Content-Encoding: gzip` and the
//! original `Content-Type` preserved as object metadata. `load` reverses
//! the compression transparently, so callers always see the original bytes.

use std::io::{Read, Write};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use thiserror::Error;
use tracing::{debug, warn};

use crate::tile::{collect_stream, TileArtifact, TileKey, TileMetadata, TileStream};

use super::traits::{BoxFuture, CacheError, TileCache};

/// Content type recorded when the origin never declared one.
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Errors from an object store.
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    /// The store rejected or failed the operation.
    #[error("Object store error: {0}")]
    Backend(String),
}

/// One stored object with its metadata.
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// The object bytes as stored (possibly compressed).
    pub bytes: Bytes,
    /// `Content-Type` object metadata.
    pub content_type: Option<String>,
    /// `Content-Encoding` object metadata.
    pub content_encoding: Option<String>,
    /// When the object was last written.
    pub last_modified: Option<SystemTime>,
}

/// Whole-object get/put interface over a remote store.
///
/// Absence is `Ok(None)`, never an error; `Err` is reserved for transport
/// or backend faults. All implementations must be `Send + Sync`.
pub trait ObjectStore: Send + Sync {
    /// Fetch an object by key, or `None` if no such key exists.
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<StoredObject>, ObjectStoreError>>;

    /// Write an object under the given key, overwriting any previous one.
    fn put(&self, key: &str, object: StoredObject) -> BoxFuture<'_, Result<(), ObjectStoreError>>;
}

/// What to do when the object store fails for a reason other than
/// "no such key".
///
/// Failing open masks a backend outage as a permanent cache miss;
/// `FailLoud` instead surfaces the fault to the caller (who still degrades
/// to a miss, but logs it at the proxy boundary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailPolicy {
    /// Treat any store error as an absent entry (logged at debug).
    #[default]
    FailOpen,
    /// Return the error to the caller as a `CacheError`.
    FailLoud,
}

/// Object-storage tile cache.
///
/// Wraps any [`ObjectStore`] with key translation, gzip compression on
/// save, transparent decompression on load, and an optional maximum-age
/// staleness check.
pub struct ObjectStorageCache {
    store: Arc<dyn ObjectStore>,
    lifetime: Option<Duration>,
    fail_policy: FailPolicy,
}

impl ObjectStorageCache {
    /// Create a cache over the given store with no staleness window and
    /// the default fail-open policy.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            lifetime: None,
            fail_policy: FailPolicy::default(),
        }
    }

    /// Treat entries older than this many days as absent on load.
    pub fn with_lifetime_days(mut self, days: u64) -> Self {
        self.lifetime = Some(Duration::from_secs(days * 24 * 60 * 60));
        self
    }

    /// Set the policy for store errors other than "not found".
    pub fn with_fail_policy(mut self, policy: FailPolicy) -> Self {
        self.fail_policy = policy;
        self
    }

    fn is_stale(&self, object: &StoredObject) -> bool {
        let (Some(lifetime), Some(modified)) = (self.lifetime, object.last_modified) else {
            return false;
        };
        match modified.elapsed() {
            Ok(age) => age > lifetime,
            // Clock skew put last_modified in the future; not stale.
            Err(_) => false,
        }
    }

    fn absorb<T>(&self, context: &str, error: ObjectStoreError) -> Result<Option<T>, CacheError> {
        match self.fail_policy {
            FailPolicy::FailOpen => {
                debug!(error = %error, "{context}; treating as miss");
                Ok(None)
            }
            FailPolicy::FailLoud => Err(CacheError::Storage(error.to_string())),
        }
    }
}

impl TileCache for ObjectStorageCache {
    fn load(&self, key: &TileKey) -> BoxFuture<'_, Result<Option<TileArtifact>, CacheError>> {
        let key = *key;
        Box::pin(async move {
            let object = match self.store.get(&key.object_key()).await {
                Ok(Some(object)) => object,
                Ok(None) => return Ok(None),
                Err(e) => return self.absorb("Object store get failed", e),
            };

            if self.is_stale(&object) {
                debug!(key = %key, "Cached object exceeds lifetime; treating as miss");
                return Ok(None);
            }

            let bytes = if object.content_encoding.as_deref() == Some("gzip") {
                match gunzip(&object.bytes) {
                    Ok(bytes) => Bytes::from(bytes),
                    Err(e) => {
                        // Malformed stored record; the origin path will
                        // rewrite it.
                        warn!(key = %key, error = %e, "Cached object failed to decompress");
                        return self
                            .absorb("Decompression failed", ObjectStoreError::Backend(e.to_string()));
                    }
                }
            } else {
                object.bytes
            };

            let content_type = object
                .content_type
                .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string());
            Ok(Some(TileArtifact::from_bytes(
                TileMetadata::new(content_type),
                bytes,
            )))
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
            let compressed = gzip(&bytes)?;

            let object = StoredObject {
                bytes: Bytes::from(compressed),
                content_type: Some(metadata.content_type),
                content_encoding: Some("gzip".to_string()),
                last_modified: Some(SystemTime::now()),
            };

            self.store
                .put(&key.object_key(), object)
                .await
                .map_err(|e| CacheError::Storage(e.to_string()))?;
            debug!(key = %key, uncompressed_bytes = bytes.len(), "Cached tile to object store");
            Ok(())
        })
    }
}

fn gzip(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()
}

fn gunzip(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}
