use crate::util::cookie::Cookie;
use crate::util::stack::StackFrame;
use axum::http::HeaderMap;
use serde::Serialize;
use std::collections::BTreeMap;

/// Request header values, a single string unless the header repeats
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum HeaderValues {
    One(String),
    Many(Vec<String>),
}

/// The normalized exception
///
/// Only `code` and `message` are always present. Request details, cookies and
/// the stack are filled in debug mode and skipped from the wire when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionRecord {
    pub code: u16,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, HeaderValues>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookies: Option<Vec<Cookie>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<Vec<StackFrame>>,
}

impl ExceptionRecord {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            http_version: None,
            method: None,
            url: None,
            connection: None,
            headers: None,
            cookies: None,
            stack: None,
        }
    }

    /// The `{code, message}` view sent outside debug mode
    pub fn minimal(&self) -> Self {
        Self::new(self.code, self.message.clone())
    }

    pub fn is_not_found(&self) -> bool {
        self.code == 404
    }

    pub fn is_minimal(&self) -> bool {
        *self == self.minimal()
    }
}

/// Collect every header, keeping repeated values together
pub fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, HeaderValues> {
    headers
        .keys()
        .map(|name| {
            let mut values: Vec<String> = headers
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .collect();

            let values = if values.len() == 1 {
                HeaderValues::One(values.remove(0))
            } else {
                HeaderValues::Many(values)
            };
            (name.as_str().to_string(), values)
        })
        .collect()
}
