use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::BytesMut;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::events::{ExceptionEvent, MessageProgress, Observers};
use crate::http::chunked::ChunkedDecoder;
use crate::http::dispatcher::RequestDispatcher;
use crate::http::message::{HttpMessage, Message, SEND_CHUNK_SIZE};
use crate::http::names::general;
use crate::http::parser::{parse_head, request_framing, response_framing, BodyFraming};
use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::http::status::StatusCode;
use crate::net::socket::{self, Timeouts, READ_CHUNK};

/// Where a connection is in its request/response cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Created,
    /// Idle between exchanges.
    Open,
    ReadingHead,
    ReadingBody,
    Dispatching,
    Writing,
    Closed,
}

/// The shared face of a connection.
///
/// The socket itself lives in [`Connection`]; the handle is what the server
/// registry, observers and hosting integrations hold on to. Teardown through
/// the handle happens exactly once no matter how many paths ask for it.
pub struct ConnectionHandle {
    id: Uuid,
    peer_addr: SocketAddr,
    server_side: bool,
    alive: AtomicBool,
    closed: AtomicBool,
    verbose: AtomicBool,
    abort: watch::Sender<bool>,
    last_error: Mutex<Option<String>>,
    task: Mutex<Option<JoinHandle<()>>>,
    opened: Observers<ConnectionHandle>,
    closed_observers: Observers<ConnectionHandle>,
    exception: Observers<ExceptionEvent>,
    sending: Observers<MessageProgress>,
    receiving: Observers<MessageProgress>,
}

impl ConnectionHandle {
    fn new(peer_addr: SocketAddr, server_side: bool) -> Self {
        let (abort, _) = watch::channel(false);
        Self {
            id: Uuid::new_v4(),
            peer_addr,
            server_side,
            alive: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            verbose: AtomicBool::new(false),
            abort,
            last_error: Mutex::new(None),
            task: Mutex::new(None),
            opened: Observers::new(),
            closed_observers: Observers::new(),
            exception: Observers::new(),
            sending: Observers::new(),
            receiving: Observers::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// `true` for accepted connections, `false` for dialed ones.
    pub fn is_server_side(&self) -> bool {
        self.server_side
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn verbose(&self) -> bool {
        self.verbose.load(Ordering::Relaxed)
    }

    pub fn set_verbose(&self, verbose: bool) {
        self.verbose.store(verbose, Ordering::Relaxed);
    }

    /// Message of the most recent failure seen on this connection.
    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_last_error(&self, error: &Error) {
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(error.to_string());
    }

    pub fn on_opened(&self, callback: impl Fn(&ConnectionHandle) + Send + Sync + 'static) {
        self.opened.subscribe(callback);
    }

    pub fn on_closed(&self, callback: impl Fn(&ConnectionHandle) + Send + Sync + 'static) {
        self.closed_observers.subscribe(callback);
    }

    pub fn on_exception(&self, callback: impl Fn(&ExceptionEvent) + Send + Sync + 'static) {
        self.exception.subscribe(callback);
    }

    pub fn on_sending(&self, callback: impl Fn(&MessageProgress) + Send + Sync + 'static) {
        self.sending.subscribe(callback);
    }

    pub fn on_receiving(&self, callback: impl Fn(&MessageProgress) + Send + Sync + 'static) {
        self.receiving.subscribe(callback);
    }

    /// Forcibly ends the session regardless of what it is doing.
    ///
    /// A pending availability wait fails with [`Error::OperationAborted`], the
    /// session task is cancelled and the connection closes.
    pub fn end_session(&self) {
        self.abort.send_replace(true);
        if let Some(task) = self.task.lock().unwrap_or_else(PoisonError::into_inner).take() {
            task.abort();
        }
        self.close();
    }

    /// Runs the close path once: marks the connection dead, wakes any waiter
    /// and notifies the Closed observers.
    pub(crate) fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.alive.store(false, Ordering::SeqCst);
        self.abort.send_replace(true);

        if self.verbose() {
            info!(id = %self.id, peer = %self.peer_addr, "connection closed");
        }
        self.closed_observers.emit(self);
    }

    /// Records `error` and raises it through the Exception observers, unless it
    /// is a silent close.
    pub(crate) fn report(&self, error: Error) {
        if error.is_aborted() {
            debug!(id = %self.id, "session aborted");
            return;
        }

        warn!(id = %self.id, peer = %self.peer_addr, error = %error, "connection failed");
        self.set_last_error(&error);
        self.exception.emit(&ExceptionEvent::new(Some(self.id), error));
    }

    fn abort_signal(&self) -> watch::Receiver<bool> {
        self.abort.subscribe()
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("server_side", &self.server_side)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Runs the close path when a session task ends, whether it returns, is
/// cancelled, or unwinds from a panic.
struct SessionGuard(Arc<ConnectionHandle>);

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            self.0.close();
            return;
        }

        // Observers must not run while unwinding; hand the teardown to a fresh task.
        let handle = self.0.clone();
        let teardown = move || {
            handle.report(Error::SessionPanicked);
            handle.close();
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move { teardown() });
            }
            Err(_) => {
                self.0.alive.store(false, Ordering::SeqCst);
                self.0.abort.send_replace(true);
            }
        }
    }
}

/// An HTTP connection over one TCP stream.
///
/// Server-side connections run their read/dispatch/write loop on a task of
/// their own via [`Connection::begin_session`]; client-side connections are
/// driven directly by the exchange functions in [`crate::http::client`].
pub struct Connection {
    stream: TcpStream,
    buffer: BytesMut,
    scratch: Vec<u8>,
    state: ConnectionState,
    timeouts: Timeouts,
    abort: watch::Receiver<bool>,
    handle: Arc<ConnectionHandle>,
}

impl Connection {
    /// Wraps an accepted socket.
    pub fn accept(stream: TcpStream, timeouts: Timeouts) -> Result<Self> {
        let peer_addr = stream.peer_addr()?;
        Ok(Self::with_handle(stream, timeouts, ConnectionHandle::new(peer_addr, true)))
    }

    /// Dials `addr`, bounding the connect by the send timeout.
    pub async fn connect(addr: SocketAddr, timeouts: Timeouts) -> Result<Self> {
        let socket = socket::create_tcp_socket(&addr, false)?;
        let stream = timeout(timeouts.send, socket.connect(addr))
            .await
            .map_err(|_| Error::Timeout(timeouts.send.as_millis() as u64))??;

        let mut connection = Self::with_handle(stream, timeouts, ConnectionHandle::new(addr, false));
        connection.state = ConnectionState::Open;
        Ok(connection)
    }

    fn with_handle(stream: TcpStream, timeouts: Timeouts, handle: ConnectionHandle) -> Self {
        if let Err(e) = stream.set_nodelay(true) {
            debug!(id = %handle.id, error = %e, "set_nodelay failed");
        }
        let abort = handle.abort_signal();
        Self {
            stream,
            buffer: BytesMut::with_capacity(4096),
            scratch: vec![0u8; READ_CHUNK],
            state: ConnectionState::Created,
            timeouts,
            abort,
            handle: Arc::new(handle),
        }
    }

    pub fn id(&self) -> Uuid {
        self.handle.id
    }

    pub fn handle(&self) -> &Arc<ConnectionHandle> {
        &self.handle
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Starts the session loop on its own task and hands back the shared handle.
    ///
    /// Observers must be wired on the handle before this is called; the Opened
    /// event fires first thing.
    pub fn begin_session(mut self, dispatcher: Arc<RequestDispatcher>) -> Arc<ConnectionHandle> {
        let handle = self.handle.clone();
        self.state = ConnectionState::Open;
        if handle.verbose() {
            info!(id = %handle.id, peer = %handle.peer_addr, "connection opened");
        }
        handle.opened.emit(&handle);

        let task = tokio::spawn(async move {
            let guard = SessionGuard(self.handle.clone());
            if let Err(e) = self.serve(&dispatcher).await {
                guard.0.report(e);
            }
            self.shutdown().await;
        });

        // end_session may already have run while the task was being spawned.
        if handle.closed.load(Ordering::SeqCst) {
            task.abort();
        } else {
            *handle.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);
        }
        handle
    }

    /// One request/response exchange after another until either side asks to
    /// close, the peer goes away, or something fails.
    async fn serve(&mut self, dispatcher: &RequestDispatcher) -> Result<()> {
        loop {
            let Some(request) = self.read_request().await? else {
                return Ok(());
            };

            self.state = ConnectionState::Dispatching;
            if self.handle.verbose() {
                info!(
                    id = %self.handle.id,
                    method = request.method(),
                    uri = request.request_uri(),
                    "dispatching request"
                );
            }

            let close = request.wants_close();
            let needed = request.response_needed();
            let head = request.method_kind() == Some(Method::HEAD);
            let keep_alive_requested = !close && request.protocol_version().closes_by_default();
            let response = dispatcher.dispatch(&self.handle, request).await;

            let mut close = close;
            if let Some(mut response) = response.filter(|_| needed) {
                close |= response.wants_close();
                if !response.is_chunked() && response.content_length()?.is_none() {
                    response.set_content_length(response.body().len())?;
                }
                if close {
                    response.set_header_value(general::CONNECTION, "close")?;
                } else if keep_alive_requested {
                    response.set_header_value(general::CONNECTION, "keep-alive")?;
                }
                self.send(&response, !head).await?;
            }

            if close {
                return Ok(());
            }
            self.state = ConnectionState::Open;
        }
    }

    /// Reads the next request.
    ///
    /// `None` means the peer closed the connection before sending any byte of
    /// a new request, which is a normal end of a keep-alive session.
    pub async fn read_request(&mut self) -> Result<Option<Request>> {
        let Some(mut message) = self.read_head().await? else {
            return Ok(None);
        };

        let framing = request_framing(&Request::from_message(message.clone())?)?;
        self.read_body(&mut message, framing).await?;
        Ok(Some(Request::from_message(message)?))
    }

    /// Reads the response to `request`, skipping interim `1xx` responses.
    pub async fn read_response(&mut self, request: &Request) -> Result<Response> {
        loop {
            let mut message = self.read_head().await?.ok_or(Error::ConnectionClosedByPeer)?;

            let head_only = Response::from_message(message.clone())?;
            let status = head_only.status_code();
            let framing = response_framing(status, request.method(), &head_only)?;
            self.read_body(&mut message, framing).await?;

            let response = Response::from_message(message)?;
            let interim = status.as_u16() < 200 && status != StatusCode::SwitchingProtocols;
            if !interim {
                return Ok(response);
            }
            debug!(id = %self.handle.id, status = status.as_u16(), "skipping interim response");
        }
    }

    async fn read_head(&mut self) -> Result<Option<Message>> {
        self.state = ConnectionState::ReadingHead;
        loop {
            if let Some((message, consumed)) = parse_head(&mut self.buffer)? {
                self.handle.receiving.emit(&MessageProgress {
                    first_line: message.first_line.trim_end().to_string(),
                    just_headers: true,
                    bytes_this_callback: consumed,
                    total_bytes: consumed,
                });
                return Ok(Some(message));
            }

            let idle = self.buffer.is_empty();
            match self.fill().await {
                Ok(_) => {}
                Err(e) if idle && (e.is_closed_by_peer() || matches!(e, Error::Timeout(_))) => {
                    if self.handle.verbose() {
                        debug!(id = %self.handle.id, "peer closed idle connection");
                    }
                    return Ok(None);
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn read_body(&mut self, message: &mut Message, framing: BodyFraming) -> Result<()> {
        self.state = ConnectionState::ReadingBody;

        let first_line = message.first_line.trim_end().to_string();
        let mut total = 0usize;
        let mut progress = |connection: &Connection, bytes: usize| {
            if bytes == 0 {
                return;
            }
            total += bytes;
            connection.handle.receiving.emit(&MessageProgress {
                first_line: first_line.clone(),
                just_headers: false,
                bytes_this_callback: bytes,
                total_bytes: total,
            });
        };

        match framing {
            BodyFraming::Empty => {}
            BodyFraming::Length(len) => {
                progress(self, self.buffer.len().min(len));
                while self.buffer.len() < len {
                    let before = self.buffer.len();
                    self.fill().await?;
                    let fresh = self.buffer.len().min(len) - before;
                    progress(self, fresh);
                }
                message.body = self.buffer.split_to(len).to_vec();
            }
            BodyFraming::Chunked => {
                let mut decoder = ChunkedDecoder::new();
                progress(self, self.buffer.len());
                while !decoder.decode(&mut self.buffer)? {
                    let n = self.fill().await?;
                    progress(self, n);
                }
                let body = decoder.into_body();
                message.body = body.to_bytes();
                message.trailers = body.trailers;
            }
            BodyFraming::UntilClose => {
                progress(self, self.buffer.len());
                loop {
                    match self.fill().await {
                        Ok(n) => progress(self, n),
                        Err(e) if e.is_closed_by_peer() => break,
                        Err(e) => return Err(e),
                    }
                }
                message.body = self.buffer.split().to_vec();
            }
        }
        Ok(())
    }

    /// Waits for data and appends one read's worth to the buffer.
    async fn fill(&mut self) -> Result<usize> {
        socket::wait_for_available_bytes(&self.stream, &mut self.abort, 1, self.timeouts.recv).await?;
        let n = socket::receive_bytes(&mut self.stream, &mut self.scratch, self.timeouts.recv).await?;
        self.buffer.extend_from_slice(&self.scratch[..n]);
        Ok(n)
    }

    /// Writes a request or response, raising a progress event for the head and
    /// for every body block.
    pub async fn send_message(&mut self, message: &impl HttpMessage) -> Result<()> {
        self.send(message, true).await
    }

    /// Writes the head and, with `with_body`, the body. Responses to HEAD go
    /// out head-only so their `Content-Length` still describes the entity.
    async fn send(&mut self, message: &impl HttpMessage, with_body: bool) -> Result<()> {
        self.state = ConnectionState::Writing;
        let first_line = message.first_line().trim_end().to_string();

        let head = message.head_bytes();
        socket::send_bytes(&mut self.stream, &head, self.timeouts.send).await?;
        let mut total = head.len();
        self.handle.sending.emit(&MessageProgress {
            first_line: first_line.clone(),
            just_headers: true,
            bytes_this_callback: head.len(),
            total_bytes: total,
        });

        let body = if with_body { message.body_bytes() } else { Vec::new() };
        for block in body.chunks(SEND_CHUNK_SIZE) {
            socket::send_bytes(&mut self.stream, block, self.timeouts.send).await?;
            total += block.len();
            self.handle.sending.emit(&MessageProgress {
                first_line: first_line.clone(),
                just_headers: false,
                bytes_this_callback: block.len(),
                total_bytes: total,
            });
        }
        Ok(())
    }

    async fn shutdown(&mut self) {
        self.state = ConnectionState::Closed;
        if let Err(e) = timeout(self.timeouts.send, self.stream.shutdown()).await.unwrap_or(Ok(())) {
            debug!(id = %self.handle.id, error = %e, "shutdown failed");
        }
    }

    /// Shuts the stream down and runs the close path.
    pub async fn close(mut self) {
        self.shutdown().await;
        self.handle.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn panicking_session_is_reported_and_closed() {
        let handle = Arc::new(ConnectionHandle::new("127.0.0.1:9".parse().unwrap(), true));

        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = errors.clone();
        handle.on_exception(move |event| sink.lock().unwrap().push(event.error.clone()));
        let (closed_tx, mut closed_rx) = mpsc::unbounded_channel();
        handle.on_closed(move |_| {
            let _ = closed_tx.send(());
        });

        let guarded = handle.clone();
        let task = tokio::spawn(async move {
            let _guard = SessionGuard(guarded);
            panic!("session bug");
        });
        assert!(task.await.unwrap_err().is_panic());

        tokio::time::timeout(Duration::from_secs(5), closed_rx.recv())
            .await
            .unwrap();
        assert!(!handle.is_alive());
        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(matches!(*errors[0], Error::SessionPanicked));
    }

    #[tokio::test]
    async fn finished_session_closes_once() {
        let handle = Arc::new(ConnectionHandle::new("127.0.0.1:9".parse().unwrap(), true));
        let closed = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let count = closed.clone();
        handle.on_closed(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        });

        drop(SessionGuard(handle.clone()));
        handle.end_session();

        assert_eq!(closed.load(Ordering::SeqCst), 1);
        assert!(handle.last_error().is_none());
    }
}
