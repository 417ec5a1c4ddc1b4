//! TileVault - read-through caching reverse proxy for map tiles
//!
//! Clients request a slippy-map tile by shard/zoom/column/row; the proxy
//! answers from its cache on a hit and otherwise fetches the tile from the
//! remote tile server, streaming the bytes to the client and to the cache
//! simultaneously. Cache backends (local filesystem, object storage) are
//! swappable behind one contract, and cache failures never break a client
//! response.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tilevault::cache::FilesystemCache;
//! use tilevault::config::ProxyConfig;
//! use tilevault::fetch::ReqwestFetcher;
//! use tilevault::proxy::{serve, TileProxy};
//!
//! let config = ProxyConfig::default();
//! let cache = Arc::new(FilesystemCache::open("tiles")?);
//! let fetcher = Arc::new(ReqwestFetcher::new(&config.user_agent)?);
//! serve(Arc::new(TileProxy::new(config, cache, fetcher))).await?;
//! ```

pub mod cache;
pub mod config;
pub mod fetch;
pub mod proxy;
pub mod stream;
pub mod telemetry;
pub mod tile;
