//! Tile identity and payload types.
//!
//! A tile is addressed by a server shard letter plus zoom/column/row in the
//! standard slippy-map pyramid. This module provides the key type used for
//! cache lookups, the parser for the inbound request path grammar, and the
//! artifact type that carries tile bytes as a single-pass stream.

mod artifact;
mod key;
mod path;

pub use artifact::{TileArtifact, TileMetadata, TileStream};
pub(crate) use artifact::collect_stream;
pub use key::TileKey;
pub use path::TilePathParser;
