//! Local filesystem cache backend.
//!
//! Stores one file per tile, named deterministically from the key, plus a
//! small persistent JSON index mapping keys to `{file_name, content_type}`
//! records. The index is loaded once at startup and rewritten after each
//! save under a single-writer mutex; concurrent saves for different keys
//! cannot corrupt each other's records. A load racing a save for the same
//! key may observe either a hit or a miss — eventual consistency is all
//! the contract asks for.

use std::collections::HashMap;
use std::path::PathBuf;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use crate::tile::{TileArtifact, TileKey, TileMetadata, TileStream};

use super::traits::{BoxFuture, CacheError, TileCache};

/// File name of the persistent index inside the cache directory.
const INDEX_FILE: &str = "tile-index.json";

/// One persisted index entry.
///
/// Created on save, read on load, never updated in place; a re-save of the
/// same key overwrites the record (last write wins, no versioning).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheRecord {
    file_name: String,
    content_type: String,
}

/// Filesystem-backed tile cache.
///
/// The reference [`TileCache`] implementation: tile bytes live in files
/// under the cache directory, the key→file mapping lives in a JSON index
/// persisted alongside them.
pub struct FilesystemCache {
    directory: PathBuf,
    index_path: PathBuf,
    index: Mutex<HashMap<String, CacheRecord>>,
}

impl FilesystemCache {
    /// Open (or create) a cache rooted at the given directory.
    ///
    /// An existing index file is loaded; a missing or unreadable one starts
    /// the cache empty rather than failing, since cached state is always
    /// reconstructible from the origin.
    pub fn open(directory: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory)?;

        let index_path = directory.join(INDEX_FILE);
        let index = match std::fs::read(&index_path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(records) => records,
                Err(e) => {
                    warn!(path = %index_path.display(), error = %e, "Discarding malformed tile index");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };

        Ok(Self {
            directory,
            index_path,
            index: Mutex::new(index),
        })
    }

    fn index_key(key: &TileKey) -> String {
        format!(
            "{}:{}:{}:{}",
            key.shard(),
            key.zoom(),
            key.column(),
            key.row()
        )
    }

    async fn persist_index(
        &self,
        index: &HashMap<String, CacheRecord>,
    ) -> Result<(), CacheError> {
        let json = serde_json::to_vec_pretty(index)
            .map_err(|e| CacheError::Index(e.to_string()))?;
        fs::write(&self.index_path, json).await?;
        Ok(())
    }
}

impl TileCache for FilesystemCache {
    fn load(&self, key: &TileKey) -> BoxFuture<'_, Result<Option<TileArtifact>, CacheError>> {
        let key = *key;
        Box::pin(async move {
            let record = {
                let index = self.index.lock().await;
                index.get(&Self::index_key(&key)).cloned()
            };

            let Some(record) = record else {
                return Ok(None);
            };

            let path = self.directory.join(&record.file_name);
            let file = match fs::File::open(&path).await {
                Ok(file) => file,
                Err(e) => {
                    // Stale index entry; treat as a miss so the origin
                    // path repopulates it.
                    warn!(key = %key, path = %path.display(), error = %e, "Indexed tile file unreadable");
                    return Ok(None);
                }
            };

            debug!(key = %key, path = %path.display(), "Filesystem cache hit");
            let content: TileStream = Box::pin(ReaderStream::new(file));
            Ok(Some(TileArtifact::new(
                TileMetadata::new(record.content_type),
                content,
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
            let file_name = key.file_name();
            let path = self.directory.join(&file_name);

            let mut file = fs::File::create(&path).await?;
            let mut content = content;
            while let Some(chunk) = content.next().await {
                file.write_all(&chunk?).await?;
            }
            file.flush().await?;

            let mut index = self.index.lock().await;
            index.insert(
                Self::index_key(&key),
                CacheRecord {
                    file_name,
                    content_type: metadata.content_type,
                },
            );
            self.persist_index(&index).await?;
            debug!(key = %key, path = %path.display(), "Cached tile to filesystem");
            Ok(())
        })
    }
}
