//! Tile cache contract and backends.
//!
//! The [`TileCache`] trait is the one seam the dispatcher depends on; the
//! concrete backends are swappable at construction time:
//!
//! ```text
//! Dispatcher ────► Arc<dyn TileCache> ──┬──► FilesystemCache (files + index)
//!                                       └──► ObjectStorageCache ──► dyn ObjectStore (S3)
//! ```
//!
//! Cache correctness is best-effort, never load-bearing: a failed lookup is
//! a miss, a failed save is logged and dropped. Neither ever breaks a
//! client response.

mod filesystem;
mod object;
mod s3;
mod traits;

pub use filesystem::FilesystemCache;
pub use object::{FailPolicy, ObjectStorageCache, ObjectStore, ObjectStoreError, StoredObject};
pub use s3::S3ObjectStore;
pub use traits::{BoxFuture, CacheError, TileCache};
