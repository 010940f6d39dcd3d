//! Stack frame extraction.
//!
//! Frames are read from the rendered form of a [`Backtrace`], which looks like
//!
//! ```text
//!    0: app::handlers::load_user
//!              at ./src/handlers.rs:42:9
//!    1: core::ops::function::FnOnce::call_once
//!              at /rustc/90b35a623/library/core/src/ops/function.rs:250:5
//! ```
//!
//! Frames that point into application sources get the surrounding source lines
//! attached; toolchain and native frames do not.

use crate::error::{ExceptionError, Result};
use serde::Serialize;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Number of source lines attached before and after the failing line
pub const CONTEXT_LINES: usize = 5;

const TOOLCHAIN_PREFIX: &str = "/rustc/";

/// A backtrace carried by an error
#[derive(Debug, Clone)]
pub enum Trace {
    Captured(Arc<Backtrace>),
    Rendered(Arc<str>),
}

impl Trace {
    /// Capture a backtrace if `RUST_BACKTRACE`/`RUST_LIB_BACKTRACE` enable it
    pub fn capture() -> Option<Self> {
        Self::from_backtrace(Backtrace::capture())
    }

    /// Capture a backtrace unconditionally
    pub fn force_capture() -> Option<Self> {
        Self::from_backtrace(Backtrace::force_capture())
    }

    pub fn from_backtrace(backtrace: Backtrace) -> Option<Self> {
        match backtrace.status() {
            BacktraceStatus::Captured => Some(Self::Captured(Arc::new(backtrace))),
            _ => None,
        }
    }

    /// Render a borrowed backtrace, as handed out by `anyhow`
    pub fn rendered_from(backtrace: &Backtrace) -> Option<Self> {
        match backtrace.status() {
            BacktraceStatus::Captured => Some(Self::rendered(backtrace.to_string())),
            _ => None,
        }
    }

    pub fn rendered(text: impl Into<Arc<str>>) -> Self {
        Self::Rendered(text.into())
    }

    pub fn render(&self) -> String {
        match self {
            Self::Captured(backtrace) => backtrace.to_string(),
            Self::Rendered(text) => text.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceContext {
    pub pre: Vec<String>,
    pub line: String,
    pub post: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    pub function_name: Option<String>,
    pub file_name: Option<String>,
    pub line_number: Option<usize>,
    pub column_number: Option<usize>,
    pub native: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<SourceContext>,
}

impl StackFrame {
    fn new(function_name: &str) -> Self {
        Self {
            function_name: Some(function_name.to_string()),
            file_name: None,
            line_number: None,
            column_number: None,
            native: true,
            context: None,
        }
    }

    fn set_location(&mut self, location: &str) {
        let mut parts = location.rsplitn(3, ':');
        let (column, line, file) = (parts.next(), parts.next(), parts.next());

        match (
            file,
            line.and_then(|l| l.parse::<usize>().ok()),
            column.and_then(|c| c.parse::<usize>().ok()),
        ) {
            (Some(file), Some(line), Some(column)) => {
                self.file_name = Some(file.to_string());
                self.line_number = Some(line);
                self.column_number = Some(column);
            }
            _ => {
                // `file:line` without a column, or no position at all
                match location.rsplit_once(':') {
                    Some((file, line)) if line.parse::<usize>().is_ok() => {
                        self.file_name = Some(file.to_string());
                        self.line_number = line.parse().ok();
                    }
                    _ => self.file_name = Some(location.to_string()),
                }
            }
        }
        self.native = false;
    }

    /// Whether the frame belongs to the runtime or a library rather than
    /// application sources
    pub fn is_library(&self) -> bool {
        if self.native {
            return true;
        }
        let Some(file) = self.file_name.as_deref() else {
            return true;
        };
        if file.starts_with(TOOLCHAIN_PREFIX) {
            return true;
        }
        !Path::new(file).is_absolute() && !file.starts_with('.')
    }
}

/// Parse rendered backtrace text into frames, preserving their order
pub fn parse_trace(text: &str) -> Vec<StackFrame> {
    let mut frames: Vec<StackFrame> = Vec::new();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with("note:") {
            continue;
        }

        if let Some(location) = line.strip_prefix("at ") {
            if let Some(frame) = frames.last_mut() {
                frame.set_location(location.trim());
            }
            continue;
        }

        match split_frame_index(line) {
            Some(function) => frames.push(StackFrame::new(function)),
            // Inlined symbols are printed without an index
            None if !frames.is_empty() => frames.push(StackFrame::new(line)),
            None => {}
        }
    }

    frames
}

fn split_frame_index(line: &str) -> Option<&str> {
    let (index, rest) = line.split_once(':')?;
    if index.is_empty() || !index.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(rest.trim())
}

/// Source files read during one [`parse_stack`] call
#[derive(Default)]
struct SourceCache {
    files: HashMap<PathBuf, Option<Arc<[String]>>>,
}

impl SourceCache {
    fn lines(&mut self, path: &Path) -> Option<Arc<[String]>> {
        self.files
            .entry(path.to_path_buf())
            .or_insert_with(|| match read_lines(path) {
                Ok(lines) => Some(lines),
                Err(e) => {
                    tracing::debug!("Stack context unavailable: {}", e);
                    None
                }
            })
            .clone()
    }
}

fn read_lines(path: &Path) -> Result<Arc<[String]>> {
    let contents = std::fs::read_to_string(path).map_err(|source| ExceptionError::SourceRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(contents.lines().map(str::to_string).collect())
}

/// Slice the lines around `line_number` (1-based)
pub fn source_context(lines: &[String], line_number: usize) -> Option<SourceContext> {
    if line_number == 0 || line_number > lines.len() {
        return None;
    }
    let index = line_number - 1;
    let end = (line_number + CONTEXT_LINES).min(lines.len());

    Some(SourceContext {
        pre: lines[index.saturating_sub(CONTEXT_LINES)..index].to_vec(),
        line: lines[index].clone(),
        post: lines[line_number..end].to_vec(),
    })
}

/// Parse a trace and attach source context to application frames
pub fn parse_stack(trace: &Trace) -> Vec<StackFrame> {
    let mut cache = SourceCache::default();

    parse_trace(&trace.render())
        .into_iter()
        .map(|mut frame| {
            if !frame.is_library() {
                if let (Some(file), Some(line)) = (frame.file_name.as_deref(), frame.line_number) {
                    frame.context = cache
                        .lines(Path::new(file))
                        .and_then(|lines| source_context(&lines, line));
                }
            }
            frame
        })
        .collect()
}
