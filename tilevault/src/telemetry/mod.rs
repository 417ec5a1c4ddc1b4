//! Proxy telemetry: structured logging setup and request counters.
//!
//! Counters are lock-free atomics updated from request tasks with minimal
//! overhead; `snapshot()` produces a point-in-time copy for display.

mod logging;
mod metrics;

pub use logging::init_logging;
pub use metrics::{ProxyMetrics, ProxySnapshot};
