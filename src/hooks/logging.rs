use crate::exception::{ExceptionRecord, RequestContext};
use crate::hooks::ExceptionLogger;
use std::error::Error;

/// A logger that writes exception records through `tracing`
///
/// Server errors (5xx, and codes outside the valid range) are logged at
/// `error`, everything else at `warn`.
#[derive(Clone, Default)]
pub struct TracingLogger;

impl ExceptionLogger for TracingLogger {
    fn log(
        &self,
        record: &ExceptionRecord,
        request: Option<&RequestContext>,
        error: &(dyn Error + Send + Sync + 'static),
    ) {
        let (method, uri) = match request {
            Some(ctx) => (ctx.method().to_string(), ctx.uri().to_string()),
            None => ("-".to_string(), "-".to_string()),
        };

        if record.code >= 500 || record.code < 100 {
            tracing::error!(
                code = record.code,
                %method,
                %uri,
                error = %error,
                "<-- {} {} {}",
                method,
                uri,
                record.message
            );
        } else {
            tracing::warn!(
                code = record.code,
                %method,
                %uri,
                "<-- {} {} {}",
                method,
                uri,
                record.message
            );
        }
    }
}
