//! HTTP/1.1 protocol implementation.
//!
//! The layer is organized bottom-up:
//!
//! - **`token`**, **`version`**, **`header`**, **`status`**, **`request_line`**: wire-level
//!   pieces of a message head
//! - **`chunked`**: chunked transfer-coding and its incremental decoder
//! - **`message`**, **`request`**, **`response`**: the message model
//! - **`parser`**: head parsing and body framing over a receive buffer
//! - **`connection`**: the per-connection request/response state machine
//! - **`dispatcher`**: routes requests to a hosting integration or static content
//! - **`client`**: request/response exchange for dialed connections
//! - **`mime`**: MIME type detection based on file extensions
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │    Open     │ ← Wait for the next request
//!        └──────┬──────┘
//!               │ bytes arrive
//!               ▼
//!        ┌──────────────────┐
//!        │ ReadingHead/Body │ ← Parse head, then body by framing
//!        └──────┬───────────┘
//!               │ Request complete
//!               ▼
//!        ┌──────────────────┐
//!        │   Dispatching    │ ← Hosting integration or static content
//!        └──────┬───────────┘
//!               │ Response ready
//!               ▼
//!        ┌──────────────────┐
//!        │     Writing      │ ← Send response to the peer
//!        └──────┬───────────┘
//!               │ Response sent
//!               ├─ Keep-Alive → Open (same connection)
//!               └─ Close → Closed
//! ```
//!
//! # Example
//!
//! ```ignore
//! use carbide::http::client;
//! use carbide::http::request::RequestBuilder;
//! use carbide::net::Timeouts;
//!
//! let request = RequestBuilder::new("GET", "/")?.header("Host", "example.com")?.build();
//! let response = client::get_response_at("example.com", 80, &request, Timeouts::default(), None).await?;
//! ```

pub mod chunked;
pub mod client;
pub mod connection;
pub mod dispatcher;
pub mod header;
pub mod message;
pub mod mime;
pub mod names;
pub mod parser;
pub mod request;
pub mod request_line;
pub mod response;
pub mod status;
pub mod token;
pub mod version;

pub use connection::{Connection, ConnectionHandle, ConnectionState};
pub use header::{Header, HeaderCollection};
pub use message::HttpMessage;
pub use request::{Method, Request, RequestBuilder};
pub use response::{Response, ResponseBuilder};
pub use status::{Status, StatusCode, StatusLine};
pub use version::ProtocolVersion;
