//! Tile key value type.

use std::fmt;

/// Identifies one map tile.
///
/// Combines the tile server's shard letter with the zoom/column/row address
/// in the Web Mercator tile pyramid. Constructed per request and used as the
/// cache lookup key; equality and hashing cover all four fields.
///
/// Coordinates are not validated against actual pyramid bounds — any values
/// that fit the field types are accepted and forwarded to the origin.
///
/// # Example
///
/// ```
/// use tilevault::tile::TileKey;
///
/// let key = TileKey::new('a', 3, 2, 1);
/// assert_eq!(key.origin_url("tile.openstreetmap.org"),
///            "https://a.tile.openstreetmap.org/3/2/1.png");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileKey {
    /// Server shard letter (e.g. 'a', 'b', 'c').
    shard: char,
    /// Zoom level (the path grammar caps this at two digits).
    zoom: u8,
    /// Tile column (X coordinate, increases eastward).
    column: u32,
    /// Tile row (Y coordinate, increases southward).
    row: u32,
}

impl TileKey {
    /// Create a new tile key.
    pub fn new(shard: char, zoom: u8, column: u32, row: u32) -> Self {
        Self {
            shard,
            zoom,
            column,
            row,
        }
    }

    /// Get the shard letter.
    pub fn shard(&self) -> char {
        self.shard
    }

    /// Get the zoom level.
    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Get the tile column.
    pub fn column(&self) -> u32 {
        self.column
    }

    /// Get the tile row.
    pub fn row(&self) -> u32 {
        self.row
    }

    /// Build the origin URL for this tile on the given tile host.
    ///
    /// The shard letter becomes the DNS prefix, per the tile server's
    /// load-distribution scheme.
    pub fn origin_url(&self, tile_host: &str) -> String {
        format!(
            "https://{}.{}/{}/{}/{}.png",
            self.shard, tile_host, self.zoom, self.column, self.row
        )
    }

    /// Object-storage key for this tile: `{shard}/{column}/{row}/{zoom}`.
    pub fn object_key(&self) -> String {
        format!("{}/{}/{}/{}", self.shard, self.column, self.row, self.zoom)
    }

    /// Deterministic file name for the filesystem backend:
    /// `{shard}-{zoom}-{column}-{row}.png`.
    pub fn file_name(&self) -> String {
        format!(
            "{}-{}-{}-{}.png",
            self.shard, self.zoom, self.column, self.row
        )
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}.png",
            self.shard, self.zoom, self.column, self.row
        )
    }
}
