//! Request interception.
//!
//! [`ExceptionInterceptor`] wraps the rest of the pipeline through the
//! [`Interceptor`] contract; [`ExceptionLayer`] mounts it as a tower layer.

use crate::error::BoxError;
use async_trait::async_trait;
use axum::{body::Body, http::Request, response::Response};
use std::future::Future;
use std::pin::Pin;

mod exception;
pub mod layer;

pub use exception::ExceptionInterceptor;
pub use layer::{ExceptionLayer, ExceptionMiddleware};

/// What an interceptor hands back to the layer
pub type InterceptorResult = Result<Response, BoxError>;

type NextFuture = Pin<Box<dyn Future<Output = InterceptorResult> + Send>>;
type NextFn = Box<dyn FnOnce(Request<Body>) -> NextFuture + Send>;

/// The rest of the pipeline, callable once
pub struct Next {
    run: NextFn,
}

impl Next {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Request<Body>) -> NextFuture + Send + 'static,
    {
        Self { run: Box::new(f) }
    }

    /// Run the downstream stages; their failure comes back as `Err`
    pub async fn run(self, request: Request<Body>) -> InterceptorResult {
        (self.run)(request).await
    }
}

/// Wraps downstream stages with its own pre/post processing
///
/// # Example
/// ```rust,ignore
/// struct Deny;
///
/// #[async_trait]
/// impl Interceptor for Deny {
///     async fn intercept(&self, req: Request<Body>, next: Next) -> InterceptorResult {
///         if req.headers().contains_key("x-blocked") {
///             return Err(HttpException::new(403, "blocked").into());
///         }
///         next.run(req).await
///     }
/// }
/// ```
#[async_trait]
pub trait Interceptor: Send + Sync + 'static {
    async fn intercept(&self, request: Request<Body>, next: Next) -> InterceptorResult;
}
