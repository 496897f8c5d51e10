//! Request handler module
//!
//! Dispatches every request through variant resolution to the file responder.

mod listing;
pub mod path;
pub mod router;
pub mod static_files;

// Re-export main entry point
pub use router::{handle_request, RequestContext};
