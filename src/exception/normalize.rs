//! Exception normalization.
//!
//! Turns an arbitrary error plus the request snapshot into an
//! [`ExceptionRecord`]. Request details and the stack are only collected in
//! debug mode.

use super::context::RequestContext;
use super::record::{ExceptionRecord, collect_headers};
use super::{find_http_exception, find_trace};
use crate::config::ExceptionOptions;
use crate::util::{cookie::parse_cookies, stack::parse_stack};
use axum::http::header;
use std::error::Error;

pub const DEFAULT_MESSAGE: &str = "unknown exception";

/// Status carried by the error chain, or 500
pub fn resolve_status(error: &(dyn Error + 'static)) -> u16 {
    find_http_exception(error).map_or(500, super::HttpException::code)
}

/// The error's message, falling back to the configured default
pub fn resolve_message(error: &(dyn Error + 'static), options: &ExceptionOptions) -> String {
    let message = error.to_string();
    if !message.is_empty() {
        return message;
    }
    options
        .default_message()
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_MESSAGE)
        .to_string()
}

/// Build the exception record for `error`
///
/// `request` is `None` for failures observed outside a request, such as
/// panics reported by the process-wide observer.
pub fn normalize(
    error: &(dyn Error + 'static),
    request: Option<&RequestContext>,
    options: &ExceptionOptions,
) -> ExceptionRecord {
    let mut record = ExceptionRecord::new(resolve_status(error), resolve_message(error, options));

    if !options.debug() {
        return record;
    }

    if let Some(ctx) = request {
        record.http_version = Some(ctx.http_version());
        record.method = Some(ctx.method().to_string());
        record.url = Some(ctx.url());
        record.connection = ctx.header(header::CONNECTION).map(str::to_string);
        record.headers = Some(collect_headers(ctx.headers()));
        record.cookies = Some(parse_cookies(ctx.cookie_header().as_deref()));
    }
    record.stack = Some(find_trace(error).map(parse_stack).unwrap_or_default());

    tracing::error!("Exception intercepted: {:?}", record);

    record
}
