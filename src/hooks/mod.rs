//! Hooks invoked by the exception middleware.
//!
//! - [`ExceptionLogger`] receives every record, off the request path
//! - [`CustomHandler`] replaces the built-in response writer
//! - [`PageRenderer`] renders the configured not-found page

use crate::error::BoxError;
use crate::exception::{ExceptionRecord, RequestContext, SharedError};
use async_trait::async_trait;
use axum::response::Response;
use std::error::Error;
use std::future::Future;
use std::sync::Arc;

pub mod logging;
pub mod render;

pub use logging::TracingLogger;
pub use render::FilePageRenderer;

/// Receives exception records
///
/// Called from a background worker, never awaited by the request. `request`
/// is `None` for failures reported outside a request (uncaught panics).
pub trait ExceptionLogger: Send + Sync + 'static {
    fn log(
        &self,
        record: &ExceptionRecord,
        request: Option<&RequestContext>,
        error: &(dyn Error + Send + Sync + 'static),
    );
}

/// Takes over response shaping
///
/// The returned response is sent as is; the middleware writes neither body
/// nor status of its own.
#[async_trait]
pub trait CustomHandler: Send + Sync + 'static {
    async fn handle(
        &self,
        record: &ExceptionRecord,
        request: &RequestContext,
        error: &SharedError,
    ) -> Result<Response, BoxError>;
}

/// Renders a named page to HTML
#[async_trait]
pub trait PageRenderer: Send + Sync + 'static {
    async fn render(&self, page: &str, record: &ExceptionRecord) -> Result<String, BoxError>;
}

/// [`ExceptionLogger`] backed by a closure
pub struct FnLogger<F>(F);

impl<F> FnLogger<F>
where
    F: Fn(&ExceptionRecord, Option<&RequestContext>, &(dyn Error + Send + Sync + 'static))
        + Send
        + Sync
        + 'static,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> ExceptionLogger for FnLogger<F>
where
    F: Fn(&ExceptionRecord, Option<&RequestContext>, &(dyn Error + Send + Sync + 'static))
        + Send
        + Sync
        + 'static,
{
    fn log(
        &self,
        record: &ExceptionRecord,
        request: Option<&RequestContext>,
        error: &(dyn Error + Send + Sync + 'static),
    ) {
        (self.0)(record, request, error)
    }
}

/// [`CustomHandler`] backed by an async closure over owned arguments
pub struct FnCustom<F>(F);

impl<F, Fut> FnCustom<F>
where
    F: Fn(Arc<ExceptionRecord>, RequestContext, SharedError) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, BoxError>> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> CustomHandler for FnCustom<F>
where
    F: Fn(Arc<ExceptionRecord>, RequestContext, SharedError) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, BoxError>> + Send + 'static,
{
    async fn handle(
        &self,
        record: &ExceptionRecord,
        request: &RequestContext,
        error: &SharedError,
    ) -> Result<Response, BoxError> {
        (self.0)(Arc::new(record.clone()), request.clone(), Arc::clone(error)).await
    }
}
