//! Tile payload types.
//!
//! A `TileArtifact` is the result of a successful cache lookup or origin
//! fetch: content headers plus the tile bytes as a lazy stream. The stream
//! is finite, single-pass, and not restartable — anything that needs to
//! feed two consumers must duplicate it *before* consumption (see
//! [`crate::stream::tee`]).

use std::io;
use std::pin::Pin;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

/// A single-pass stream of tile bytes.
pub type TileStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Content headers describing a tile payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileMetadata {
    /// MIME type of the tile bytes, e.g. `image/png`.
    pub content_type: String,
    /// Transfer encoding of the bytes, if any (e.g. `gzip`).
    pub content_encoding: Option<String>,
}

impl TileMetadata {
    /// Create metadata with a content type and no encoding.
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            content_encoding: None,
        }
    }

    /// Set the content encoding.
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.content_encoding = Some(encoding.into());
        self
    }
}

/// A tile payload: content headers plus the byte stream.
///
/// Produced by exactly one source (cache backend or origin fetch) and owned
/// by the dispatcher for the duration of one request. Once the stream is
/// consumed it cannot be replayed.
pub struct TileArtifact {
    /// Content headers for the payload.
    pub metadata: TileMetadata,
    /// The tile bytes. Single-pass; drain it or drop it.
    pub content: TileStream,
}

impl TileArtifact {
    /// Create an artifact from metadata and a stream.
    pub fn new(metadata: TileMetadata, content: TileStream) -> Self {
        Self { metadata, content }
    }

    /// Create an artifact whose stream yields one in-memory chunk.
    pub fn from_bytes(metadata: TileMetadata, bytes: Bytes) -> Self {
        Self {
            metadata,
            content: Box::pin(stream::once(async move { Ok::<_, io::Error>(bytes) })),
        }
    }

    /// Drain the stream into a single buffer.
    ///
    /// Consumes the artifact's stream; fails on the first stream error.
    pub async fn collect(self) -> io::Result<Vec<u8>> {
        collect_stream(self.content).await
    }
}

/// Drain a tile stream into a single buffer.
pub(crate) async fn collect_stream(mut stream: TileStream) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_bytes_round_trips() {
        let artifact = TileArtifact::from_bytes(
            TileMetadata::new("image/png"),
            Bytes::from_static(&[0x89, 0x50, 0x4e, 0x47]),
        );
        assert_eq!(artifact.metadata.content_type, "image/png");
        assert_eq!(artifact.metadata.content_encoding, None);
        assert_eq!(artifact.collect().await.unwrap(), &[0x89, 0x50, 0x4e, 0x47]);
    }

    #[tokio::test]
    async fn test_collect_propagates_stream_error() {
        let content: TileStream = Box::pin(stream::iter(vec![
            Ok(Bytes::from_static(b"ok")),
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "origin died")),
        ]));
        let artifact = TileArtifact::new(TileMetadata::new("image/png"), content);
        assert!(artifact.collect().await.is_err());
    }

    #[test]
    fn test_metadata_with_encoding() {
        let meta = TileMetadata::new("image/png").with_encoding("gzip");
        assert_eq!(meta.content_encoding.as_deref(), Some("gzip"));
    }
}
