//! Routes each received request either to a hosting integration or to the
//! built-in static content handler.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::StaticFilesConfig;
use crate::error::Result;
use crate::http::connection::ConnectionHandle;
use crate::http::header::Header;
use crate::http::mime;
use crate::http::names::entity;
use crate::http::request::{Method, Request};
use crate::http::response::{Response, ResponseBuilder};
use crate::http::status::StatusCode;

const ALLOWED_METHODS: &str = "GET, HEAD";

/// An application host that can answer requests on the server's behalf.
pub trait HostingIntegration: Send + Sync {
    /// Handles `args.request()`.
    ///
    /// Set a response to answer, cancel to drop the request without a reply, or
    /// leave both alone to fall back to local content.
    fn process_request(&self, connection: &ConnectionHandle, args: &mut RequestCancelArgs);
}

/// A request offered to a [`HostingIntegration`] together with its outcome.
///
/// Cancelling clears any response; setting a response clears the cancel flag.
#[derive(Debug)]
pub struct RequestCancelArgs {
    request: Request,
    cancel: bool,
    response: Option<Response>,
}

impl RequestCancelArgs {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            cancel: false,
            response: None,
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn cancel(&mut self) {
        self.cancel = true;
        self.response = None;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel
    }

    pub fn set_response(&mut self, response: Response) {
        self.response = Some(response);
        self.cancel = false;
    }

    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    pub fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }

    pub fn into_request(self) -> Request {
        self.request
    }
}

/// Request router shared by every connection of a server.
#[derive(Default)]
pub struct RequestDispatcher {
    hosting: Option<Arc<dyn HostingIntegration>>,
    hosting_enabled: bool,
    static_files: Option<StaticFilesConfig>,
}

impl RequestDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hosting(mut self, hosting: Arc<dyn HostingIntegration>) -> Self {
        self.hosting = Some(hosting);
        self
    }

    pub fn with_static_files(mut self, static_files: Option<StaticFilesConfig>) -> Self {
        self.static_files = static_files;
        self
    }

    pub fn set_hosting_enabled(&mut self, enabled: bool) {
        self.hosting_enabled = enabled;
    }

    pub fn hosting_enabled(&self) -> bool {
        self.hosting_enabled && self.hosting.is_some()
    }

    /// Produces the response for `request`, or `None` when hosting cancelled it.
    pub async fn dispatch(&self, connection: &ConnectionHandle, request: Request) -> Option<Response> {
        let request = match self.hosting.as_ref().filter(|_| self.hosting_enabled) {
            Some(hosting) => {
                let mut args = RequestCancelArgs::new(request);
                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    hosting.process_request(connection, &mut args)
                }));
                if outcome.is_err() {
                    warn!(id = %connection.id(), "hosting integration panicked");
                    return Some(Response::internal_error());
                }
                if args.is_cancelled() {
                    debug!(id = %connection.id(), "request cancelled by hosting integration");
                    return None;
                }
                if let Some(response) = args.take_response() {
                    return Some(response);
                }
                args.into_request()
            }
            None => request,
        };

        Some(self.local_response(&request).await)
    }

    async fn local_response(&self, request: &Request) -> Response {
        if !matches!(request.method_kind(), Some(Method::GET | Method::HEAD)) {
            return Response::method_not_allowed(ALLOWED_METHODS);
        }

        let Some(static_files) = &self.static_files else {
            return Response::not_found();
        };

        let Some(relative) = sanitize(request.request_uri_without_query_string()) else {
            return Response::bad_request();
        };

        match serve_file(static_files, &relative).await {
            Ok(Some(response)) => response,
            Ok(None) => Response::not_found(),
            Err(e) => {
                warn!(path = %relative.display(), error = %e, "failed to serve static file");
                Response::internal_error()
            }
        }
    }
}

/// Turns a request path into a relative file path, rejecting anything that
/// could climb out of the content root.
fn sanitize(path: &str) -> Option<PathBuf> {
    let decoded = urlencoding::decode(path).ok()?;
    if decoded.contains('\\') || decoded.contains('\0') {
        return None;
    }

    let mut relative = PathBuf::new();
    for component in Path::new(decoded.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(relative)
}

async fn serve_file(static_files: &StaticFilesConfig, relative: &Path) -> Result<Option<Response>> {
    let mut path = static_files.root.join(relative);

    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_dir() => path.push(&static_files.index),
        Ok(_) => {}
        Err(_) => return Ok(None),
    }

    let body = match tokio::fs::read(&path).await {
        Ok(body) => body,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let response = ResponseBuilder::new(StatusCode::Ok)
        .header(Header::new(entity::CONTENT_TYPE, mime::content_type_for(&path))?)
        .body(body)
        .build();
    Ok(Some(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traversal_is_rejected() {
        assert_eq!(sanitize("/a/b.txt"), Some(PathBuf::from("a/b.txt")));
        assert_eq!(sanitize("/"), Some(PathBuf::new()));
        assert_eq!(sanitize("/../etc/passwd"), None);
        assert_eq!(sanitize("/a/%2e%2e/%2e%2e/etc"), None);
        assert_eq!(sanitize("/a%5c..%5cb"), None);
    }

    #[test]
    fn escapes_are_decoded_before_the_walk() {
        assert_eq!(sanitize("/docs/a%20b.txt"), Some(PathBuf::from("docs/a b.txt")));
        assert_eq!(sanitize("/nul%00.txt"), None);
        assert_eq!(sanitize("/%ff"), None);
    }

    #[test]
    fn cancel_and_response_exclude_each_other() {
        let mut args = RequestCancelArgs::new(Request::new());
        args.set_response(Response::ok("x"));
        args.cancel();
        assert!(args.is_cancelled());
        assert!(args.response().is_none());

        args.set_response(Response::ok("y"));
        assert!(!args.is_cancelled());
        assert!(args.response().is_some());
    }
}
