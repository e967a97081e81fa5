//! Configuration errors, rendered through miette

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("Failed to parse KDL")]
    #[diagnostic(code(keystate::config::parse_error))]
    ParseError {
        #[source_code]
        src: String,
        #[label("here")]
        span: miette::SourceSpan,
        #[source]
        source: kdl::KdlError,
    },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(keystate::config::invalid))]
    Invalid { message: String },

    #[error("Missing required field: {field}")]
    #[diagnostic(code(keystate::config::missing_field))]
    MissingField { field: String },

    #[error("Timing '{option}' must be greater than zero, got {value}")]
    #[diagnostic(
        code(keystate::config::invalid_timing),
        help("timings are whole milliseconds, e.g. `sequence-timeout-ms 1000`")
    )]
    InvalidTiming { option: String, value: i64 },

    #[error("{option} for binding '{combo}' must be {expected}")]
    #[diagnostic(code(keystate::config::invalid_binding))]
    InvalidBinding {
        combo: String,
        option: String,
        expected: &'static str,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
