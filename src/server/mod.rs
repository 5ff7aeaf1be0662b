//! The listening server: accept loop, connection registry and lifecycle.
//!
//! ```text
//! Stopped ──start──▶ Starting ──bind ok──▶ Listening ──stop──▶ Stopping ──▶ Stopped
//!                        └──bind failed──▶ Stopped
//! ```

pub mod listener;
pub mod registry;

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::{Config, StaticFilesConfig};
use crate::error::{Error, Result};
use crate::events::{ExceptionEvent, Observers};
use crate::http::dispatcher::{HostingIntegration, RequestDispatcher};
use crate::net::socket::Timeouts;

pub use registry::ConnectionRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    Starting,
    Listening,
    Stopping,
}

/// State the accept task shares with the server.
pub(crate) struct Shared {
    verbose: AtomicBool,
    timeouts: Timeouts,
    registry: Arc<ConnectionRegistry>,
    exceptions: Observers<ExceptionEvent>,
    dispatcher: Mutex<Option<Arc<RequestDispatcher>>>,
}

impl Shared {
    fn verbose(&self) -> bool {
        self.verbose.load(Ordering::Relaxed)
    }

    fn dispatcher(&self) -> Option<Arc<RequestDispatcher>> {
        self.dispatcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_dispatcher(&self, dispatcher: Option<Arc<RequestDispatcher>>) {
        *self.dispatcher.lock().unwrap_or_else(PoisonError::into_inner) = dispatcher;
    }
}

/// An HTTP/1.1 server.
pub struct Server {
    shared: Arc<Shared>,
    state: Mutex<ServerState>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
    local_addr: Mutex<Option<SocketAddr>>,
    hosting: Option<Arc<dyn HostingIntegration>>,
    static_files: Option<StaticFilesConfig>,
    started: Observers<SocketAddr>,
    stopped: Observers<()>,
}

impl Default for Server {
    fn default() -> Self {
        Self::new(Timeouts::default())
    }
}

impl Server {
    pub fn new(timeouts: Timeouts) -> Self {
        Self {
            shared: Arc::new(Shared {
                verbose: AtomicBool::new(false),
                timeouts,
                registry: Arc::new(ConnectionRegistry::new()),
                exceptions: Observers::new(),
                dispatcher: Mutex::new(None),
            }),
            state: Mutex::new(ServerState::Stopped),
            accept_task: Mutex::new(None),
            local_addr: Mutex::new(None),
            hosting: None,
            static_files: None,
            started: Observers::new(),
            stopped: Observers::new(),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        let server = Self::new(cfg.timeouts()).with_static_files(cfg.static_files.clone());
        server.set_verbose(cfg.server.verbose);
        server
    }

    pub fn with_hosting(mut self, hosting: Arc<dyn HostingIntegration>) -> Self {
        self.hosting = Some(hosting);
        self
    }

    pub fn with_static_files(mut self, static_files: Option<StaticFilesConfig>) -> Self {
        self.static_files = static_files;
        self
    }

    pub fn state(&self) -> ServerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: ServerState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    pub fn is_started(&self) -> bool {
        self.state() == ServerState::Listening
    }

    pub fn verbose(&self) -> bool {
        self.shared.verbose()
    }

    /// Applies to connections accepted from now on.
    pub fn set_verbose(&self, verbose: bool) {
        self.shared.verbose.store(verbose, Ordering::Relaxed);
    }

    /// The bound address while listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.shared.registry
    }

    pub fn connection_count(&self) -> usize {
        self.shared.registry.len()
    }

    pub fn on_started(&self, callback: impl Fn(&SocketAddr) + Send + Sync + 'static) {
        self.started.subscribe(callback);
    }

    pub fn on_stopped(&self, callback: impl Fn(&()) + Send + Sync + 'static) {
        self.stopped.subscribe(callback);
    }

    /// Failures from the accept loop and from every connection end up here.
    pub fn on_exception(&self, callback: impl Fn(&ExceptionEvent) + Send + Sync + 'static) {
        self.shared.exceptions.subscribe(callback);
    }

    /// Starts listening on `endpoint` without hosting.
    pub async fn start(&self, endpoint: SocketAddr) -> Result<SocketAddr> {
        self.start_with_hosting(endpoint, false).await
    }

    /// Binds `endpoint` and runs the accept loop on its own task. Returns the
    /// bound address, which differs from `endpoint` when port 0 was asked for.
    ///
    /// Starting a server that is already started returns its current address.
    pub async fn start_with_hosting(&self, endpoint: SocketAddr, enable_hosting: bool) -> Result<SocketAddr> {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            match *state {
                ServerState::Stopped => {}
                ServerState::Listening => {
                    if let Some(addr) = self.local_addr() {
                        return Ok(addr);
                    }
                }
                ServerState::Starting | ServerState::Stopping => {
                    return Err(Error::Socket(io::Error::other("server is changing state")));
                }
            }
            *state = ServerState::Starting;
        }

        let listener = match listener::bind(endpoint).await {
            Ok(listener) => listener,
            Err(e) => {
                warn!(endpoint = %endpoint, error = %e, "failed to bind");
                self.set_state(ServerState::Stopped);
                return Err(e);
            }
        };
        let addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(e) => {
                self.set_state(ServerState::Stopped);
                return Err(e.into());
            }
        };

        let mut dispatcher = RequestDispatcher::new().with_static_files(self.static_files.clone());
        if let Some(hosting) = &self.hosting {
            dispatcher = dispatcher.with_hosting(hosting.clone());
        }
        dispatcher.set_hosting_enabled(enable_hosting);
        self.shared.set_dispatcher(Some(Arc::new(dispatcher)));

        let task = tokio::spawn(listener::run(listener, self.shared.clone()));
        *self.accept_task.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);
        *self.local_addr.lock().unwrap_or_else(PoisonError::into_inner) = Some(addr);
        self.set_state(ServerState::Listening);

        info!("Listening on {}", addr);
        self.started.emit(&addr);
        Ok(addr)
    }

    /// Stops accepting and, with `end_current_sessions`, ends every live
    /// session. Sessions left running keep their own tasks.
    pub async fn stop(&self, end_current_sessions: bool) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state != ServerState::Listening {
                return;
            }
            *state = ServerState::Stopping;
        }

        let task = self.accept_task.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(task) = task {
            task.abort();
            // Cancellation is the expected outcome here.
            let _ = task.await;
        }

        if end_current_sessions {
            for connection in self.shared.registry.snapshot() {
                if connection.is_alive() {
                    // The Closed observer takes it out of the registry.
                    connection.end_session();
                } else {
                    self.shared.registry.remove(connection.id());
                }
            }
        }

        self.shared.set_dispatcher(None);
        *self.local_addr.lock().unwrap_or_else(PoisonError::into_inner) = None;
        self.set_state(ServerState::Stopped);

        info!("Server stopped");
        self.stopped.emit(&());
    }
}
