//! One-reader, two-sink byte-stream duplication.
//!
//! A tile fetched from the origin must reach two consumers that drain at
//! their own pace: the client response body and the cache writer. The
//! source stream is single-pass, so it is read exactly once by a pump task
//! that hands each chunk to both sinks. `Bytes` chunks are reference
//! counted, so duplication copies a handle, not the payload.
//!
//! Sink independence:
//! - A slow sink never delays the other; chunks queue per sink.
//! - A dropped sink (client disconnect) is detached; the pump keeps
//!   feeding the remaining one until the source ends.
//! - When every sink is gone the pump stops draining the source.
//! - A source error is forwarded to each attached sink and ends both
//!   streams.

use std::io;

use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::tile::TileStream;

/// Duplicate a single-pass byte stream into two independent streams.
///
/// Spawns a detached pump task that owns the source; the returned streams
/// can be consumed from different tasks at different speeds.
pub fn tee(source: TileStream) -> (TileStream, TileStream) {
    let (tx_a, rx_a) = mpsc::unbounded_channel();
    let (tx_b, rx_b) = mpsc::unbounded_channel();

    tokio::spawn(pump(source, vec![tx_a, tx_b]));

    (
        Box::pin(UnboundedReceiverStream::new(rx_a)),
        Box::pin(UnboundedReceiverStream::new(rx_b)),
    )
}

async fn pump(mut source: TileStream, mut sinks: Vec<mpsc::UnboundedSender<io::Result<Bytes>>>) {
    while let Some(item) = source.next().await {
        match item {
            Ok(chunk) => {
                // A send fails only when the receiver is gone; detach it.
                sinks.retain(|tx| tx.send(Ok(chunk.clone())).is_ok());
                if sinks.is_empty() {
                    return;
                }
            }
            Err(e) => {
                let kind = e.kind();
                let message = e.to_string();
                for tx in &sinks {
                    let _ = tx.send(Err(io::Error::new(kind, message.clone())));
                }
                return;
            }
        }
    }
}
