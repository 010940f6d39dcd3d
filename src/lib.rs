//! # Meshestra Exception
//!
//! Error-handling middleware for axum/tower HTTP pipelines.
//!
//! Every failure raised further down the pipeline, including "no route
//! matched", becomes a consistent error response. The middleware normalizes
//! the failure into an [`ExceptionRecord`], answers with it as JSON (or a
//! not-found page for browsers), and hands the record to an optional logger
//! off the request path.
//!
//! ## Features
//!
//! - **Unified failures**: handler errors, thrown [`HttpException`]s and bare 404s take one path
//! - **Debug records**: request line, headers, cookies and parsed stack frames with source context
//! - **Hooks**: custom response handler, background logger and a not-found page renderer
//! - **Process observer**: panics outside the request flow reach the same logger
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use axum::{Router, error_handling::HandleErrorLayer, routing::get};
//! use meshestra_exception::prelude::*;
//! use tower::ServiceBuilder;
//!
//! async fn forbidden() -> Result<&'static str, HttpException> {
//!     Err(HttpException::new(403, "Forbidden"))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = ExceptionOptions::builder()
//!         .debug(true)
//!         .logger(TracingLogger)
//!         .build()?;
//!
//!     let app = Router::new().route("/admin", get(forbidden)).layer(
//!         ServiceBuilder::new()
//!             .layer(HandleErrorLayer::new(|err: BoxError| async move {
//!                 (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
//!             }))
//!             .layer(ExceptionLayer::new(options)),
//!     );
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod exception;
pub mod hooks;
pub mod interceptor;
pub mod observer;
pub mod util;
pub mod worker;

// Re-export core types
pub use config::{ConfigService, ExceptionOptions, ExceptionOptionsBuilder};
pub use error::{BoxError, ExceptionError, Result};
pub use exception::{ExceptionRecord, HttpException, RequestContext, Thrown, throw};
pub use interceptor::{ExceptionInterceptor, ExceptionLayer, ExceptionMiddleware};

// Re-export commonly used types from dependencies
pub use async_trait::async_trait;
pub use axum;

/// Prelude module for convenient imports
///
/// ```
/// use meshestra_exception::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{ConfigService, ExceptionOptions, ExceptionOptionsBuilder};
    pub use crate::error::{BoxError, ExceptionError};
    pub use crate::exception::{
        ExceptionRecord, HttpException, HttpExceptionFilter, Negotiation, RequestContext,
        ResponseFormat, SharedError, Thrown, throw,
    };
    pub use crate::hooks::{
        CustomHandler, ExceptionLogger, FilePageRenderer, PageRenderer, TracingLogger,
    };
    pub use crate::interceptor::{ExceptionLayer, Interceptor, InterceptorResult, Next};
    pub use crate::observer::UncaughtPanic;
    pub use async_trait::async_trait;
    pub use axum::{
        http::StatusCode,
        response::{IntoResponse, Response},
    };
    pub use std::sync::Arc;
}
