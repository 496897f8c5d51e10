//! Error types
//!
//! Startup failures and request-path decoding failures. Everything else in the
//! request path is answered with an HTTP response rather than an error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid listen address '{addr}': {source}")]
    InvalidAddress {
        addr: String,
        source: std::net::AddrParseError,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed percent-encoding at byte {position} of '{path}'")]
    MalformedEscape { path: String, position: usize },

    #[error("request path '{0}' does not decode to UTF-8")]
    InvalidUtf8(String),
}

pub type Result<T> = std::result::Result<T, Error>;
