//! Origin tile server client.
//!
//! A thin wrapper over one outbound GET: no retry, no timeout override
//! beyond the transport defaults, no special interpretation of status
//! codes beyond "did the body stream become available". The trait exists
//! so dispatcher tests can substitute a recording double.

use std::io;

use futures::StreamExt;
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE};
use thiserror::Error;

use crate::cache::BoxFuture;
use crate::tile::{TileArtifact, TileMetadata, TileStream};

/// Identifying User-Agent sent with every origin request.
///
/// Tile servers rate-limit or block unidentified clients, so this is not
/// optional; operators can override it in [`crate::config::ProxyConfig`].
pub const DEFAULT_USER_AGENT: &str = "TileVault/0.1 (+https://github.com/tilevault/tilevault)";

/// Errors from an origin fetch. Always user-visible as a server fault.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Network or transport failure before a body became available.
    #[error("Origin request failed: {0}")]
    Transport(String),

    /// The origin answered with a non-success status.
    #[error("Origin returned HTTP {status}")]
    Status { status: u16 },
}

/// Fetches tiles from the remote tile server.
pub trait OriginFetcher: Send + Sync {
    /// Perform one GET and expose the response body as a byte stream.
    fn fetch(&self, url: &str) -> BoxFuture<'_, Result<TileArtifact, FetchError>>;
}

/// Real origin fetcher using async reqwest.
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    /// Create a fetcher sending the given User-Agent.
    pub fn new(user_agent: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

impl OriginFetcher for ReqwestFetcher {
    fn fetch(&self, url: &str) -> BoxFuture<'_, Result<TileArtifact, FetchError>> {
        let url = url.to_string();
        Box::pin(async move {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    status: status.as_u16(),
                });
            }

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("application/octet-stream")
                .to_string();
            let content_encoding = response
                .headers()
                .get(CONTENT_ENCODING)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            let mut metadata = TileMetadata::new(content_type);
            if let Some(encoding) = content_encoding {
                metadata = metadata.with_encoding(encoding);
            }

            let content: TileStream = Box::pin(
                response
                    .bytes_stream()
                    .map(|chunk| chunk.map_err(|e| io::Error::new(io::ErrorKind::Other, e))),
            );

            Ok(TileArtifact::new(metadata, content))
        })
    }
}
