//! Request path parsing.
//!
//! Inbound requests use the fixed grammar `/{shard}/{zoom}/{column}/{row}.png`
//! where shard is a single letter from the accepted alphabet, zoom is one or
//! two digits, and column/row are digit sequences. Anything else is not a
//! tile request.

use regex::Regex;

use super::TileKey;

/// Parser for the tile request path grammar.
///
/// Built once per proxy from the accepted shard alphabet; the compiled
/// regex is reused across requests.
pub struct TilePathParser {
    pattern: Regex,
}

impl TilePathParser {
    /// Create a parser accepting the given shard letters.
    ///
    /// # Arguments
    ///
    /// * `shards` - The accepted shard alphabet, e.g. `"abc"`
    pub fn new(shards: &str) -> Self {
        let pattern = Regex::new(&format!(
            r"^/([{}])/(\d{{1,2}})/(\d+)/(\d+)\.png$",
            regex::escape(shards)
        ))
        .expect("shard alphabet produces a valid pattern");

        Self { pattern }
    }

    /// Parse a request path into a tile key.
    ///
    /// Returns `None` for any path that does not match the grammar,
    /// including digit sequences too large for the coordinate types.
    pub fn parse(&self, path: &str) -> Option<TileKey> {
        let captures = self.pattern.captures(path)?;

        let shard = captures[1].chars().next()?;
        let zoom = captures[2].parse::<u8>().ok()?;
        let column = captures[3].parse::<u32>().ok()?;
        let row = captures[4].parse::<u32>().ok()?;

        Some(TileKey::new(shard, zoom, column, row))
    }
}
