//! Pure parsing helpers used while normalizing exceptions.

pub mod cookie;
pub mod stack;

pub use cookie::{Cookie, parse_cookies};
pub use stack::{SourceContext, StackFrame, parse_stack, parse_trace};
