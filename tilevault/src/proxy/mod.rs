//! The read-through proxy: request dispatch and the HTTP server.
//!
//! Per-request control flow:
//!
//! ```text
//! request ──► parse path ──► cache.load ──┬── hit ────► stream to client
//!                │                        │
//!                └─ no match: 404         └── miss ──► origin fetch ──► tee
//!                                                         │              │
//!                                              failure: 500        ┌─────┴─────┐
//!                                                                client      cache.save
//!                                                                copy        (detached)
//! ```
//!
//! Cache faults never reach a client: a failed lookup is a miss, a failed
//! save is a logged diagnostic on a detached task.

mod dispatcher;
mod server;

pub use dispatcher::TileProxy;
pub use server::{router, serve, ServeError};
