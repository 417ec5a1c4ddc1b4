//! Proxy configuration.

use crate::fetch::DEFAULT_USER_AGENT;

/// Default port the proxy listens on.
pub const DEFAULT_PORT: u16 = 8080;

/// Default shard alphabet accepted by the path grammar and used for
/// origin DNS prefixes.
pub const DEFAULT_SHARDS: &str = "abc";

/// Well-known tile server hosts.
pub mod hosts {
    /// OpenStreetMap's standard raster tile layer.
    pub const OPENSTREETMAP: &str = "tile.openstreetmap.org";
    /// OpenTopoMap's topographic layer.
    pub const OPENTOPOMAP: &str = "tile.opentopomap.org";
}

/// Configuration for the tile proxy.
///
/// Cache backend selection is a construction-time choice made by the
/// caller (see `tilevault-cli`); the proxy itself only needs the origin
/// host and listening parameters.
#[derive(Clone, Debug)]
pub struct ProxyConfig {
    /// Remote tile server host, without the shard prefix.
    pub tile_host: String,

    /// Port to listen on.
    pub port: u16,

    /// Accepted shard letters.
    pub shards: String,

    /// User-Agent sent with origin requests.
    pub user_agent: String,

    /// Enable verbose diagnostic logging.
    pub debug: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            tile_host: hosts::OPENSTREETMAP.to_string(),
            port: DEFAULT_PORT,
            shards: DEFAULT_SHARDS.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            debug: false,
        }
    }
}

impl ProxyConfig {
    /// Create a config for the given tile host with defaults elsewhere.
    pub fn new(tile_host: impl Into<String>) -> Self {
        Self {
            tile_host: tile_host.into(),
            ..Self::default()
        }
    }

    /// Set the listening port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the accepted shard alphabet.
    pub fn with_shards(mut self, shards: impl Into<String>) -> Self {
        self.shards = shards.into();
        self
    }

    /// Set the origin User-Agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Enable verbose diagnostic logging.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProxyConfig::default();
        assert_eq!(config.tile_host, "tile.openstreetmap.org");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.shards, "abc");
        assert!(!config.debug);
    }

    #[test]
    fn test_builder_methods() {
        let config = ProxyConfig::new(hosts::OPENTOPOMAP)
            .with_port(9000)
            .with_shards("ab")
            .with_user_agent("test-agent")
            .with_debug(true);
        assert_eq!(config.tile_host, "tile.opentopomap.org");
        assert_eq!(config.port, 9000);
        assert_eq!(config.shards, "ab");
        assert_eq!(config.user_agent, "test-agent");
        assert!(config.debug);
    }
}
