//! Process-wide observer for failures outside the request flow.
//!
//! The first request through any exception middleware installs a panic hook
//! that forwards panics to that middleware's logger. Installation happens at
//! most once per process, however many middleware instances exist; the
//! previously installed hook keeps running after ours.
//!
//! The logger never runs inside the hook: reports go through the logger
//! worker, and panics on worker threads (a failing logger) are left to the
//! worker's own panic handler. A panic raised inside a panic hook aborts the
//! process.

use crate::config::ExceptionOptions;
use crate::exception::normalize;
use crate::util::stack::Trace;
use crate::worker;
use std::panic::{self, PanicHookInfo};
use std::sync::{Arc, Once};
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

static INSTALL: Once = Once::new();
static INSTALLATIONS: AtomicUsize = AtomicUsize::new(0);

/// A panic observed by the process-wide hook
#[derive(Debug, Error)]
#[error("{message}")]
pub struct UncaughtPanic {
    message: String,
    location: Option<String>,
    trace: Option<Trace>,
}

impl UncaughtPanic {
    fn from_hook(info: &PanicHookInfo<'_>, capture_trace: bool) -> Self {
        let payload = info.payload();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_default();

        Self {
            message,
            location: info.location().map(|l| l.to_string()),
            trace: if capture_trace { Trace::force_capture() } else { None },
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// `file:line:column` of the panic, when known
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn trace(&self) -> Option<&Trace> {
        self.trace.as_ref()
    }
}

/// Install the observer unless one is already installed
///
/// Only the first caller's options are used. Concurrent first calls block
/// until the single installation finishes.
pub fn install(options: &ExceptionOptions) {
    INSTALL.call_once(|| {
        let options = options.clone();
        let previous = panic::take_hook();

        panic::set_hook(Box::new(move |info| {
            if let (Some(logger), Some(pool)) = (options.logger(), options.worker()) {
                if !worker::on_worker_thread() {
                    let error = UncaughtPanic::from_hook(info, options.debug());
                    let record = normalize(&error, None, &options);
                    let logger = Arc::clone(logger);
                    pool.submit(move || logger.log(&record, None, &error));
                }
            }
            previous(info);
        }));

        INSTALLATIONS.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("Exception observer installed");
    });
}

/// Whether the observer has been installed in this process
pub fn is_installed() -> bool {
    INSTALL.is_completed()
}

/// Number of installations performed; never more than one
pub fn installations() -> usize {
    INSTALLATIONS.load(Ordering::SeqCst)
}
