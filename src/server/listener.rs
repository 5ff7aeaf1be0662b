use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::error::Result;
use crate::events::ExceptionEvent;
use crate::http::connection::Connection;
use crate::net::socket::{self, LISTEN_BACKLOG};

use super::Shared;

/// Pause after a failed accept so a persistent error (EMFILE) cannot spin.
pub(super) const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Binds `addr` with address reuse and the standard backlog.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    let socket = socket::create_tcp_socket(&addr, true)?;
    socket.bind(addr)?;
    Ok(socket.listen(LISTEN_BACKLOG)?)
}

/// Accepts connections until the task is cancelled.
///
/// Every accepted socket becomes a registered [`Connection`] with its
/// observers wired before its session starts. Accept failures are reported
/// and the loop keeps going after [`ACCEPT_BACKOFF`].
pub(super) async fn run(listener: TcpListener, shared: Arc<Shared>) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                accept_failed(&shared, e).await;
                continue;
            }
        };

        let verbose = shared.verbose();
        if verbose {
            info!("Accepted connection from {}", peer);
        }

        let connection = match Connection::accept(stream, shared.timeouts) {
            Ok(connection) => connection,
            Err(e) => {
                shared.exceptions.emit(&ExceptionEvent::new(None, e));
                continue;
            }
        };

        let Some(dispatcher) = shared.dispatcher() else {
            // Stopping; the connection is dropped unregistered.
            continue;
        };

        let handle = connection.handle().clone();
        handle.set_verbose(verbose);

        let exceptions = shared.clone();
        handle.on_exception(move |event| exceptions.exceptions.emit(event));

        let registry = shared.registry.clone();
        handle.on_closed(move |closed| {
            registry.remove(closed.id());
        });

        if let Err(e) = shared.registry.add(handle.clone()) {
            shared.exceptions.emit(&ExceptionEvent::new(Some(handle.id()), e));
            continue;
        }

        connection.begin_session(dispatcher);
    }
}

async fn accept_failed(shared: &Shared, e: io::Error) {
    warn!(error = %e, "accept failed");
    shared.exceptions.emit(&ExceptionEvent::new(None, e.into()));
    tokio::time::sleep(ACCEPT_BACKOFF).await;
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Instant;

    use super::*;
    use crate::events::Observers;
    use crate::net::socket::Timeouts;
    use crate::server::registry::ConnectionRegistry;

    fn shared() -> Shared {
        Shared {
            verbose: AtomicBool::new(false),
            timeouts: Timeouts::default(),
            registry: Arc::new(ConnectionRegistry::new()),
            exceptions: Observers::new(),
            dispatcher: Mutex::new(None),
        }
    }

    #[tokio::test]
    async fn accept_failure_is_reported_then_backs_off() {
        let shared = shared();
        let reported = Arc::new(AtomicUsize::new(0));
        let counter = reported.clone();
        shared.exceptions.subscribe(move |event: &ExceptionEvent| {
            assert!(event.connection_id.is_none());
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let started = Instant::now();
        accept_failed(&shared, io::Error::from_raw_os_error(24)).await;

        assert!(started.elapsed() >= ACCEPT_BACKOFF);
        assert_eq!(reported.load(Ordering::SeqCst), 1);
    }
}
