//! TileVault CLI - runs the tile proxy with a chosen cache backend.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing::error;

use tilevault::cache::{
    FailPolicy, FilesystemCache, ObjectStorageCache, S3ObjectStore, TileCache,
};
use tilevault::config::{hosts, ProxyConfig, DEFAULT_PORT};
use tilevault::fetch::ReqwestFetcher;
use tilevault::proxy::{serve, TileProxy};
use tilevault::telemetry::init_logging;

#[derive(Parser)]
#[command(name = "tilevault", version, about = "Caching reverse proxy for map tiles")]
struct Cli {
    /// Port to listen on.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Named tile server to proxy.
    #[arg(long, value_enum, default_value_t = TileServer::Openstreetmap)]
    tile_server: TileServer,

    /// Custom tile host, overriding --tile-server.
    #[arg(long)]
    tile_host: Option<String>,

    /// Accepted shard letters, matching the tile server's DNS prefixes.
    #[arg(long)]
    shards: Option<String>,

    /// Cache backend.
    #[arg(long, value_enum, default_value_t = Backend::Filesystem)]
    cache: Backend,

    /// Tile directory for the filesystem backend.
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Bucket for the s3 backend.
    #[arg(long)]
    bucket: Option<String>,

    /// AWS region for the s3 backend; ambient configuration when omitted.
    #[arg(long)]
    region: Option<String>,

    /// Treat s3 entries older than this many days as absent.
    #[arg(long)]
    cache_lifetime_days: Option<u64>,

    /// Surface s3 backend errors in logs instead of silently treating
    /// them as cache misses.
    #[arg(long)]
    fail_loud: bool,

    /// User-Agent sent to the origin tile server.
    #[arg(long)]
    user_agent: Option<String>,

    /// Enable verbose diagnostic logging.
    #[arg(long)]
    debug: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum TileServer {
    Openstreetmap,
    Opentopomap,
}

impl TileServer {
    fn host(self) -> &'static str {
        match self {
            TileServer::Openstreetmap => hosts::OPENSTREETMAP,
            TileServer::Opentopomap => hosts::OPENTOPOMAP,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    Filesystem,
    S3,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let tile_host = cli
        .tile_host
        .clone()
        .unwrap_or_else(|| cli.tile_server.host().to_string());

    let mut config = ProxyConfig::new(tile_host)
        .with_port(cli.port)
        .with_debug(cli.debug);
    if let Some(shards) = &cli.shards {
        config = config.with_shards(shards.clone());
    }
    if let Some(user_agent) = &cli.user_agent {
        config = config.with_user_agent(user_agent.clone());
    }

    let cache = build_cache(&cli).await?;
    let fetcher = Arc::new(ReqwestFetcher::new(&config.user_agent)?);

    serve(Arc::new(TileProxy::new(config, cache, fetcher))).await?;
    Ok(())
}

async fn build_cache(cli: &Cli) -> Result<Arc<dyn TileCache>, Box<dyn std::error::Error>> {
    match cli.cache {
        Backend::Filesystem => {
            let directory = match &cli.cache_dir {
                Some(dir) => dir.clone(),
                None => default_cache_dir()?,
            };
            Ok(Arc::new(FilesystemCache::open(directory)?))
        }
        Backend::S3 => {
            let bucket = cli
                .bucket
                .as_deref()
                .ok_or("--bucket is required with --cache s3")?;
            let store = Arc::new(S3ObjectStore::connect(bucket, cli.region.clone()).await);

            let mut cache = ObjectStorageCache::new(store);
            if let Some(days) = cli.cache_lifetime_days {
                cache = cache.with_lifetime_days(days);
            }
            if cli.fail_loud {
                cache = cache.with_fail_policy(FailPolicy::FailLoud);
            }
            Ok(Arc::new(cache))
        }
    }
}

fn default_cache_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let base = dirs::cache_dir().ok_or("no cache directory; pass --cache-dir")?;
    Ok(base.join("tilevault").join("tiles"))
}
