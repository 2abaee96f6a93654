//! Cross-cutting support: logging and fatal-error reporting.

pub mod logger;
pub mod panic;
