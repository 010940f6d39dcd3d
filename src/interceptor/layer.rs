use crate::config::ExceptionOptions;
use crate::error::BoxError;
use crate::interceptor::{ExceptionInterceptor, Interceptor, InterceptorResult, Next};
use axum::{body::Body, http::Request, response::Response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Tower Layer for the exception middleware
///
/// Hook failures surface as the service error, so in an axum app put the
/// layer behind `HandleErrorLayer`:
///
/// ```rust,no_run
/// use axum::{Router, error_handling::HandleErrorLayer, http::StatusCode, routing::get};
/// use meshestra_exception::prelude::*;
/// use tower::ServiceBuilder;
///
/// let app: Router = Router::new()
///     .route("/", get(|| async { "ok" }))
///     .layer(
///         ServiceBuilder::new()
///             .layer(HandleErrorLayer::new(|err: BoxError| async move {
///                 (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
///             }))
///             .layer(ExceptionLayer::default()),
///     );
/// ```
#[derive(Clone)]
pub struct ExceptionLayer {
    interceptor: Arc<ExceptionInterceptor>,
}

impl ExceptionLayer {
    pub fn new(options: ExceptionOptions) -> Self {
        Self {
            interceptor: Arc::new(ExceptionInterceptor::new(options)),
        }
    }
}

impl Default for ExceptionLayer {
    /// Minimal mode: `{code, message}` bodies and no hooks
    fn default() -> Self {
        Self::new(ExceptionOptions::default())
    }
}

impl<S> Layer<S> for ExceptionLayer {
    type Service = ExceptionMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ExceptionMiddleware {
            inner,
            interceptor: Arc::clone(&self.interceptor),
        }
    }
}

#[derive(Clone)]
pub struct ExceptionMiddleware<S> {
    inner: S,
    interceptor: Arc<ExceptionInterceptor>,
}

impl<S> Service<Request<Body>> for ExceptionMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError> + Send,
{
    type Response = Response;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let interceptor = Arc::clone(&self.interceptor);

        // Take the service that was driven to readiness, leave a clone behind
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let next = Next::new(move |req| -> Pin<Box<dyn Future<Output = InterceptorResult> + Send>> {
                Box::pin(async move { inner.call(req).await.map_err(Into::<BoxError>::into) })
            });

            interceptor.intercept(request, next).await
        })
    }
}
