//! HTTP protocol layer module
//!
//! Validators, MIME table, range parsing and response builders shared by the
//! file responder and the request handler.

pub mod cache;
pub mod mime;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use range::{parse_range_header, ByteRange, RangeParseResult};
pub use response::{
    build_304_response, build_404_response, build_405_response, build_413_response,
    build_416_response, build_500_response, build_options_response, build_redirect_response,
    FileHeaders,
};
