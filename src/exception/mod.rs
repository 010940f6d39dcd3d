use crate::error::BoxError;
use crate::util::stack::Trace;
use axum::response::{IntoResponse, Response};
use std::error::Error;
use std::fmt;
use std::sync::Arc;

pub mod context;
pub mod http;
pub mod normalize;
pub mod record;

pub use context::RequestContext;
pub use http::{HttpExceptionFilter, Negotiation, ResponseFormat};
pub use normalize::{normalize, resolve_message, resolve_status};
pub use record::{ExceptionRecord, HeaderValues};

/// A shared, type-erased error as handed to hooks
pub type SharedError = Arc<dyn Error + Send + Sync>;

pub const NOT_FOUND_MESSAGE: &str = "404 not found";

/// An error carrying an HTTP status
///
/// `http_code` is an explicit override and wins over `status_code`; when
/// neither is set the exception resolves to 500.
///
/// # Example
/// ```
/// use meshestra_exception::exception::HttpException;
///
/// let err = HttpException::new(403, "forbidden");
/// assert_eq!(err.code(), 403);
///
/// let err = HttpException::new(502, "upstream failed").with_http_code(503);
/// assert_eq!(err.code(), 503);
/// ```
#[derive(Debug)]
pub struct HttpException {
    status_code: Option<u16>,
    http_code: Option<u16>,
    message: String,
    source: Option<BoxError>,
    trace: Option<Trace>,
}

impl HttpException {
    pub fn new(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code: Some(status_code),
            http_code: None,
            message: message.into(),
            source: None,
            trace: Trace::capture(),
        }
    }

    /// An exception without any status, resolving to 500
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status_code: None,
            http_code: None,
            message: message.into(),
            source: None,
            trace: Trace::capture(),
        }
    }

    pub fn not_found() -> Self {
        Self::new(404, NOT_FOUND_MESSAGE)
    }

    /// The not-found raised for a bare 404 response, without a trace
    pub(crate) fn unmatched() -> Self {
        Self {
            status_code: Some(404),
            http_code: None,
            message: NOT_FOUND_MESSAGE.to_string(),
            source: None,
            trace: None,
        }
    }

    pub fn with_http_code(mut self, http_code: u16) -> Self {
        self.http_code = Some(http_code);
        self
    }

    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_trace(mut self, trace: Trace) -> Self {
        self.trace = Some(trace);
        self
    }

    /// The resolved status: `http_code`, then `status_code`, then 500
    pub fn code(&self) -> u16 {
        self.http_code.or(self.status_code).unwrap_or(500)
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    pub fn http_code(&self) -> Option<u16> {
        self.http_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn trace(&self) -> Option<&Trace> {
        self.trace.as_ref()
    }
}

impl fmt::Display for HttpException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for HttpException {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn Error + 'static))
    }
}

impl From<anyhow::Error> for HttpException {
    fn from(err: anyhow::Error) -> Self {
        let mut exception = Self::internal(err.to_string());
        exception.trace = Trace::rendered_from(err.backtrace());
        exception.with_source(err)
    }
}

/// Marks a response as carrying a thrown error
///
/// Handlers that cannot return an error through the service (axum handlers
/// always produce a response) attach this extension instead; the exception
/// middleware removes it and handles the error as if it had been returned.
#[derive(Clone)]
pub struct Thrown(pub(crate) SharedError);

impl Thrown {
    pub fn new(error: impl Into<BoxError>) -> Self {
        Self(Arc::from(error.into()))
    }

    pub fn error(&self) -> &(dyn Error + Send + Sync + 'static) {
        &*self.0
    }
}

impl fmt::Debug for Thrown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Thrown").field(&self.0.to_string()).finish()
    }
}

/// Throw any error from a handler as a 500 response
pub fn throw(error: impl Into<BoxError>) -> Response {
    let error = error.into();
    let status = match find_http_exception(&*error) {
        Some(exception) => http::clamp_status(exception.code()),
        None => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
    };
    let mut response = status.into_response();
    response.extensions_mut().insert(Thrown::new(error));
    response
}

impl IntoResponse for HttpException {
    fn into_response(self) -> Response {
        throw(self)
    }
}

/// Walk the error and its sources for the first [`HttpException`]
pub fn find_http_exception<'a>(error: &'a (dyn Error + 'static)) -> Option<&'a HttpException> {
    let mut current = Some(error);
    while let Some(err) = current {
        if let Some(exception) = err.downcast_ref::<HttpException>() {
            return Some(exception);
        }
        current = err.source();
    }
    None
}

/// Walk the error and its sources for a captured trace
pub fn find_trace<'a>(error: &'a (dyn Error + 'static)) -> Option<&'a Trace> {
    let mut current = Some(error);
    while let Some(err) = current {
        if let Some(trace) = err.downcast_ref::<HttpException>().and_then(HttpException::trace) {
            return Some(trace);
        }
        if let Some(trace) = err
            .downcast_ref::<crate::observer::UncaughtPanic>()
            .and_then(crate::observer::UncaughtPanic::trace)
        {
            return Some(trace);
        }
        current = err.source();
    }
    None
}
