//! Transport-level helpers below the HTTP layer.

pub mod socket;

pub use socket::{ByteOrder, Timeouts};
