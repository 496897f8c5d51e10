//! Request dispatch module
//!
//! Entry point for HTTP request processing: path decoding, body size check,
//! variant resolution, delegation to the file responder, header overlay and
//! access logging.

use crate::config::AppState;
use crate::handler::path::decode_request_path;
use crate::handler::static_files::{self, ServeOptions};
use crate::http;
use crate::logger::{self, AccessLogEntry};
use crate::resolver::{self, FsProbe, Resolution, Rule};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::HeaderMap;
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// What the file responder needs from a request
///
/// Rewriting a request to a compressed sibling swaps `path` and keeps the
/// conditional and range headers, so they apply to the sibling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub method: Method,
    /// Decoded path, starting with `/`
    pub path: String,
    pub if_none_match: Option<String>,
    pub if_modified_since: Option<String>,
    pub range_header: Option<String>,
}

impl RequestContext {
    pub fn new(method: Method, path: String, headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string)
        };
        Self {
            method,
            path,
            if_none_match: header("if-none-match"),
            if_modified_since: header("if-modified-since"),
            range_header: header("range"),
        }
    }

    /// Same request aimed at another path
    #[must_use]
    pub fn with_path(&self, path: String) -> Self {
        Self {
            path,
            ..self.clone()
        }
    }

    pub fn is_head(&self) -> bool {
        self.method == Method::HEAD
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let mut entry = access_entry(&req, peer_addr);

    let mut response = match check_body_size(&req, state.config.http.max_body_size) {
        Some(resp) => resp,
        None => match decode_request_path(req.uri().path()) {
            Ok(decoded) => {
                let served = serve_resolved(&req, decoded, &state).await;
                entry.content_encoding = served.encoding.map(resolver::Encoding::token);
                entry.backing_path = Some(served.path);
                served.response
            }
            Err(e) => {
                logger::log_error(&format!("Failed to decode request path: {e}"));
                http::build_500_response()
            }
        },
    };

    if let Ok(server) = hyper::header::HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(hyper::header::SERVER, server);
    }

    if state.access_log() {
        entry.status = response.status().as_u16();
        entry.body_bytes = hyper::body::Body::size_hint(response.body())
            .exact()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Response plus the resolution that produced it
struct Served {
    path: String,
    encoding: Option<resolver::Encoding>,
    response: Response<Full<Bytes>>,
}

/// Resolve the variant, delegate to the file responder, overlay headers
async fn serve_resolved<B>(req: &Request<B>, decoded: String, state: &AppState) -> Served {
    let resolution = resolver::resolve(&FsProbe, &state.root, req.uri().path(), &decoded).await;
    log_resolution(req.uri().path(), &resolution);

    let original = RequestContext::new(req.method().clone(), decoded, req.headers());
    let ctx = match resolution.rule {
        Rule::Implicit => original.with_path(resolution.path.clone()),
        Rule::Explicit | Rule::Passthrough => original,
    };

    let options = ServeOptions {
        root: &state.root,
        dir_listing: resolution.dir_listing,
        index_files: &state.config.routes.index_files,
        enable_cors: state.config.http.enable_cors,
    };
    let mut response = static_files::serve(&ctx, &options).await;
    resolution.apply(&mut response);

    Served {
        path: resolution.path,
        encoding: resolution.encoding,
        response,
    }
}

fn log_resolution(raw_path: &str, resolution: &Resolution) {
    logger::log_debug(&format!(
        "{raw_path} -> {} ({:?}, encoding: {}, content-type: {})",
        resolution.path,
        resolution.rule,
        resolution.encoding.map_or("-", resolver::Encoding::token),
        resolution.content_type.unwrap_or("-"),
    ));
}

fn access_entry<B>(req: &Request<B>, peer_addr: SocketAddr) -> AccessLogEntry {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = match req.version() {
        hyper::Version::HTTP_10 => "1.0",
        hyper::Version::HTTP_2 => "2",
        _ => "1.1",
    }
    .to_string();
    entry.referer = header("referer");
    entry.user_agent = header("user-agent");
    entry
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size<B>(req: &Request<B>, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let content_length = req.headers().get("content-length")?;
    content_length.to_str().map_or_else(
        |_| {
            logger::log_warning("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
            Ok(size) if size > max_body_size => {
                logger::log_error(&format!(
                    "Request body too large: {size} bytes (max: {max_body_size})"
                ));
                Some(http::build_413_response())
            }
            Err(_) => {
                logger::log_warning(&format!(
                    "Invalid Content-Length value: '{size_str}', skipping size check"
                ));
                None
            }
            _ => None,
        },
    )
}
