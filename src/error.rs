//! Error types shared by the protocol, connection and server layers.

use std::io;

use thiserror::Error;
use uuid::Uuid;

/// Errors raised while parsing, sending or receiving HTTP messages.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed start line, header line or chunk-size line.
    #[error("format error: {0}")]
    Format(String),

    /// A method, URI, header name or header value contains illegal characters.
    #[error("invalid token in {field}: {value:?}")]
    InvalidToken { field: &'static str, value: String },

    /// The remote end closed the socket (a zero-byte read or a failed write).
    #[error("connection closed by peer")]
    ConnectionClosedByPeer,

    /// A blocking wait was interrupted by an abort signal.
    #[error("operation aborted")]
    OperationAborted,

    /// A single read, write or wait exceeded its configured timeout.
    #[error("socket operation timed out after {0} ms")]
    Timeout(u64),

    /// Lower-level transport failure.
    #[error("socket error: {0}")]
    Socket(#[from] io::Error),

    /// A session task panicked; the connection was torn down.
    #[error("session task panicked")]
    SessionPanicked,

    /// The connection registry already holds a connection with this id.
    #[error("a connection already exists in the registry with an id of {0}")]
    DuplicateConnection(Uuid),

    /// Host name resolution produced no usable address.
    #[error("unable to resolve '{0}'")]
    AddressResolution(String),
}

impl Error {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Error::Format(msg.into())
    }

    /// Returns `true` for the silent-close conditions: cooperative aborts.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Error::OperationAborted)
    }

    /// Returns `true` when the peer went away, including resets reported by the OS.
    pub fn is_closed_by_peer(&self) -> bool {
        match self {
            Error::ConnectionClosedByPeer => true,
            Error::Socket(e) => matches!(
                e.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
