//! Carbide - HTTP/1.1 protocol stack
//!
//! Message model, chunked transfer-coding, connection lifecycle and a
//! listening server that dispatches requests to handlers.

pub mod config;
pub mod error;
pub mod events;
pub mod http;
pub mod net;
pub mod server;

pub use error::{Error, Result};
