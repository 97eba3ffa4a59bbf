// Chart request DSL parser

pub mod lexer;
pub mod request;

// Public API re-exports
pub use request::{parse_chart_request, parse_request};
