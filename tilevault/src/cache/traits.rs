//! Core trait for tile cache backends.
//!
//! # Design Principles
//!
//! - **Absence is not failure**: `load` returns `Ok(None)` for a key that
//!   was never saved; errors are reserved for backend faults, and even
//!   those only degrade to a miss at the dispatcher.
//! - **Streams in, streams out**: backends consume and produce
//!   [`TileStream`]s so tile bytes never need to be buffered twice.
//! - **Dyn-compatible**: async methods return `Pin<Box<dyn Future>>` so the
//!   dispatcher can hold an `Arc<dyn TileCache>` and backends can be swapped
//!   at construction time.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::tile::{TileArtifact, TileKey, TileMetadata, TileStream};

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors that can occur inside a cache backend.
///
/// These never reach a client: the dispatcher treats a `load` error as a
/// miss and a `save` error as a logged diagnostic.
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O error reading or writing cached tiles.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persistent index could not be read or written.
    #[error("Index error: {0}")]
    Index(String),

    /// Backend-specific storage error.
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Asynchronous cache for tile artifacts.
///
/// Any backend (local filesystem, object storage, or other) implements
/// these two operations. All implementations must be `Send + Sync` for use
/// across async tasks.
pub trait TileCache: Send + Sync {
    /// Look up a tile by key.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(artifact))` on a hit
    /// - `Ok(None)` when the key was never saved (or the backend's
    ///   staleness policy treats the entry as absent)
    /// - `Err(_)` only for backend faults a fail-loud policy chooses to
    ///   surface; callers treat this identically to a miss
    fn load(&self, key: &TileKey) -> BoxFuture<'_, Result<Option<TileArtifact>, CacheError>>;

    /// Persist a tile under the given key.
    ///
    /// Consumes the entire input stream or fails attempting to. A re-save
    /// of the same key overwrites the previous entry (last write wins).
    /// Failure must not affect any response already in flight; callers
    /// fire-and-forget this operation.
    fn save(
        &self,
        key: &TileKey,
        content: TileStream,
        metadata: TileMetadata,
    ) -> BoxFuture<'_, Result<(), CacheError>>;
}
