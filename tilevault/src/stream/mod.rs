//! Byte-stream fan-out.

mod tee;

pub use tee::tee;
