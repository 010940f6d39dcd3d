use super::ConfigService;
use crate::error::{BoxError, Result};
use crate::exception::{ExceptionRecord, Negotiation, RequestContext, SharedError};
use crate::hooks::{CustomHandler, ExceptionLogger, FnCustom, FnLogger, PageRenderer};
use crate::worker::LogWorker;
use axum::response::Response;
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

const DEBUG_KEY: &str = "EXCEPTION_DEBUG";
const DEFAULT_MESSAGE_KEY: &str = "EXCEPTION_DEFAULT_MESSAGE";
const NOT_FOUND_PAGE_KEY: &str = "EXCEPTION_NOT_FOUND_PAGE";
const NEGOTIATION_KEY: &str = "EXCEPTION_NEGOTIATION";
const LOG_THREADS_KEY: &str = "EXCEPTION_LOG_THREADS";

/// Options for the exception middleware
///
/// Built once and shared by every request. The default value is the minimal
/// mode: `{code, message}` bodies, no hooks, no debug detail.
#[derive(Clone, Default)]
pub struct ExceptionOptions {
    debug: bool,
    logger: Option<Arc<dyn ExceptionLogger>>,
    custom: Option<Arc<dyn CustomHandler>>,
    default_message: Option<String>,
    not_found_page: Option<String>,
    renderer: Option<Arc<dyn PageRenderer>>,
    negotiation: Negotiation,
    worker: Option<LogWorker>,
}

impl ExceptionOptions {
    pub fn builder() -> ExceptionOptionsBuilder {
        ExceptionOptionsBuilder::new()
    }

    /// Debug mode exposes request details and stacks; keep it off in production
    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn default_message(&self) -> Option<&str> {
        self.default_message.as_deref()
    }

    pub fn not_found_page(&self) -> Option<&str> {
        self.not_found_page.as_deref()
    }

    pub fn negotiation(&self) -> Negotiation {
        self.negotiation
    }

    pub fn logger(&self) -> Option<&Arc<dyn ExceptionLogger>> {
        self.logger.as_ref()
    }

    pub fn custom(&self) -> Option<&Arc<dyn CustomHandler>> {
        self.custom.as_ref()
    }

    pub fn renderer(&self) -> Option<&Arc<dyn PageRenderer>> {
        self.renderer.as_ref()
    }

    pub(crate) fn worker(&self) -> Option<&LogWorker> {
        self.worker.as_ref()
    }
}

impl fmt::Debug for ExceptionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionOptions")
            .field("debug", &self.debug)
            .field("logger", &self.logger.is_some())
            .field("custom", &self.custom.is_some())
            .field("default_message", &self.default_message)
            .field("not_found_page", &self.not_found_page)
            .field("renderer", &self.renderer.is_some())
            .field("negotiation", &self.negotiation)
            .finish()
    }
}

/// Builder for [`ExceptionOptions`]
///
/// # Example
///
/// ```rust,no_run
/// use meshestra_exception::prelude::*;
///
/// let options = ExceptionOptions::builder()
///     .debug(cfg!(debug_assertions))
///     .default_message("something went wrong")
///     .logger(TracingLogger)
///     .build()
///     .expect("Failed to build exception options");
/// ```
pub struct ExceptionOptionsBuilder {
    debug: bool,
    logger: Option<Arc<dyn ExceptionLogger>>,
    custom: Option<Arc<dyn CustomHandler>>,
    default_message: Option<String>,
    not_found_page: Option<String>,
    renderer: Option<Arc<dyn PageRenderer>>,
    negotiation: Negotiation,
    log_threads: usize,
}

impl Default for ExceptionOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExceptionOptionsBuilder {
    pub fn new() -> Self {
        Self {
            debug: false,
            logger: None,
            custom: None,
            default_message: None,
            not_found_page: None,
            renderer: None,
            negotiation: Negotiation::default(),
            log_threads: 1,
        }
    }

    /// Start from values found in a [`ConfigService`]
    ///
    /// Reads `EXCEPTION_DEBUG`, `EXCEPTION_DEFAULT_MESSAGE`,
    /// `EXCEPTION_NOT_FOUND_PAGE`, `EXCEPTION_NEGOTIATION` and
    /// `EXCEPTION_LOG_THREADS`. Hooks still have to be set in code.
    pub fn from_config(config: &ConfigService) -> Result<Self> {
        let mut builder = Self::new();

        if let Some(debug) = config.get_bool(DEBUG_KEY)? {
            builder.debug = debug;
        }
        if let Some(message) = config.get(DEFAULT_MESSAGE_KEY) {
            builder.default_message = Some(message);
        }
        if let Some(page) = config.get(NOT_FOUND_PAGE_KEY) {
            builder.not_found_page = Some(page);
        }
        if let Some(negotiation) = config.get_parsed::<Negotiation>(NEGOTIATION_KEY)? {
            builder.negotiation = negotiation;
        }
        if let Some(threads) = config.get_parsed::<usize>(LOG_THREADS_KEY)? {
            builder.log_threads = threads;
        }

        Ok(builder)
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn logger(mut self, logger: impl ExceptionLogger) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    /// Use a closure as the logger
    pub fn logger_fn<F>(self, f: F) -> Self
    where
        F: Fn(&ExceptionRecord, Option<&RequestContext>, &(dyn Error + Send + Sync + 'static))
            + Send
            + Sync
            + 'static,
    {
        self.logger(FnLogger::new(f))
    }

    pub fn custom(mut self, custom: impl CustomHandler) -> Self {
        self.custom = Some(Arc::new(custom));
        self
    }

    /// Use an async closure as the custom handler
    pub fn custom_fn<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Arc<ExceptionRecord>, RequestContext, SharedError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<Response, BoxError>> + Send + 'static,
    {
        self.custom(FnCustom::new(f))
    }

    pub fn default_message(mut self, message: impl Into<String>) -> Self {
        self.default_message = Some(message.into());
        self
    }

    pub fn not_found_page(mut self, page: impl Into<String>) -> Self {
        self.not_found_page = Some(page.into());
        self
    }

    pub fn renderer(mut self, renderer: impl PageRenderer) -> Self {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    pub fn negotiation(mut self, negotiation: Negotiation) -> Self {
        self.negotiation = negotiation;
        self
    }

    /// Threads for the background logger, capped at the number of CPUs
    pub fn log_threads(mut self, threads: usize) -> Self {
        self.log_threads = threads;
        self
    }

    pub fn build(self) -> Result<ExceptionOptions> {
        let worker = match self.logger {
            Some(_) => Some(LogWorker::new(self.log_threads.clamp(1, num_cpus::get()))?),
            None => None,
        };

        Ok(ExceptionOptions {
            debug: self.debug,
            logger: self.logger,
            custom: self.custom,
            default_message: self.default_message,
            not_found_page: self.not_found_page,
            renderer: self.renderer,
            negotiation: self.negotiation,
            worker,
        })
    }
}
