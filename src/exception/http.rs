use super::context::RequestContext;
use super::record::ExceptionRecord;
use crate::error::{ExceptionError, Result};
use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use std::str::FromStr;

/// How the client's preferred format is detected
///
/// `Accept` looks at the request's `Accept` header. `ResponseType` reads the
/// content type the downstream service already set on its response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Negotiation {
    #[default]
    Accept,
    ResponseType,
}

impl FromStr for Negotiation {
    type Err = ExceptionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accept" => Ok(Self::Accept),
            "response-type" | "response_type" => Ok(Self::ResponseType),
            other => Err(ExceptionError::invalid_config("negotiation", other)),
        }
    }
}

/// The format a client prefers
///
/// Error bodies are always JSON; an `Html` preference only selects the
/// configured not-found page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
    Html,
}

/// Resolve the response status for an exception code
///
/// Codes in `(0, 600]` that form a valid status are kept; everything else
/// degrades to 500.
pub fn clamp_status(code: u16) -> StatusCode {
    if code == 0 || code > 600 {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// The default response writer for normalized exceptions
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpExceptionFilter {
    negotiation: Negotiation,
}

impl HttpExceptionFilter {
    pub fn new(negotiation: Negotiation) -> Self {
        Self { negotiation }
    }

    /// Pick the client's preferred format for this request
    ///
    /// `prior` is the downstream response when there is one; thrown service
    /// errors have none.
    pub fn negotiate(&self, request: &RequestContext, prior: Option<&Response>) -> ResponseFormat {
        match self.negotiation {
            Negotiation::Accept => match request.accept() {
                Some(accept) if accept.contains("text/html") => ResponseFormat::Html,
                _ => ResponseFormat::Json,
            },
            Negotiation::ResponseType => {
                let content_type = prior
                    .and_then(|r| r.headers().get(header::CONTENT_TYPE))
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<mime::Mime>().ok());

                match content_type {
                    Some(m) if m.type_() == mime::TEXT && m.subtype() == mime::HTML => {
                        ResponseFormat::Html
                    }
                    _ => ResponseFormat::Json,
                }
            }
        }
    }

    /// Write `body` as JSON with the resolved status
    pub fn catch(&self, body: &ExceptionRecord) -> Response {
        (clamp_status(body.code), Json(body)).into_response()
    }
}

pub(crate) fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
