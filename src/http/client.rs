//! Synchronous-style request/response exchange for client connections.
//!
//! Every variant returns `Ok(None)` when the exchange was cancelled through
//! [`ConnectionHandle::end_session`](crate::http::connection::ConnectionHandle::end_session).

use std::net::SocketAddr;

use tracing::debug;

use crate::error::Result;
use crate::http::connection::Connection;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::net::socket::{self, ResolveHook, Timeouts};

/// Sends `request` over an open connection and reads the response.
///
/// Failures are recorded as the connection's last error before being returned.
pub async fn get_response(connection: &mut Connection, request: &Request) -> Result<Option<Response>> {
    let exchange = async {
        connection.send_message(request).await?;
        connection.read_response(request).await
    };

    match exchange.await {
        Ok(response) => Ok(Some(response)),
        Err(e) if e.is_aborted() => {
            debug!(id = %connection.id(), "exchange cancelled");
            Ok(None)
        }
        Err(e) => {
            connection.handle().set_last_error(&e);
            Err(e)
        }
    }
}

/// Opens a dedicated connection to `endpoint`, exchanges `request` and closes
/// the connection again whatever the outcome.
pub async fn get_response_from(
    endpoint: SocketAddr,
    request: &Request,
    timeouts: Timeouts,
) -> Result<Option<Response>> {
    let mut connection = Connection::connect(endpoint, timeouts).await?;
    let result = get_response(&mut connection, request).await;
    connection.close().await;
    result
}

/// Resolves `address:port` (notifying `on_resolving` first) and exchanges
/// `request` over a dedicated connection.
pub async fn get_response_at(
    address: &str,
    port: u16,
    request: &Request,
    timeouts: Timeouts,
    on_resolving: Option<&ResolveHook>,
) -> Result<Option<Response>> {
    let endpoint = socket::resolve(address, port, on_resolving).await?;
    get_response_from(endpoint, request, timeouts).await
}
