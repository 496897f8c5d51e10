//! Static file serving module
//!
//! The file responder: maps a decoded request path onto the serving root and
//! answers with the file, an index file, a directory listing, a redirect to
//! the slash-terminated directory URL, or 404.

use crate::handler::listing;
use crate::handler::path::encode_path;
use crate::handler::router::RequestContext;
use crate::http::{self, cache, mime, FileHeaders, RangeParseResult};
use crate::logger;
use crate::resolver::local_path;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Response};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Per-call responder options
#[derive(Debug, Clone, Copy)]
pub struct ServeOptions<'a> {
    pub root: &'a Path,
    pub dir_listing: bool,
    pub index_files: &'a [String],
    pub enable_cors: bool,
}

/// Serve `ctx.path` from `options.root`
pub async fn serve(ctx: &RequestContext, options: &ServeOptions<'_>) -> Response<Full<Bytes>> {
    match ctx.method {
        Method::GET | Method::HEAD => {}
        Method::OPTIONS => return http::build_options_response(options.enable_cors),
        _ => {
            logger::log_warning(&format!("Method not allowed: {}", ctx.method));
            return http::build_405_response();
        }
    }

    let Some(target) = contained_path(options.root, &ctx.path) else {
        return http::build_404_response();
    };

    let metadata = match fs::metadata(&target).await {
        Ok(m) => m,
        Err(_) => return http::build_404_response(),
    };

    if metadata.is_dir() {
        return serve_directory(ctx, options, &target).await;
    }

    serve_file(ctx, &local_path(options.root, &ctx.path), &target, &metadata).await
}

/// Canonical location of `path` under `root`, or `None` when it is missing or
/// escapes the root
fn contained_path(root: &Path, path: &str) -> Option<PathBuf> {
    let root_canonical = match root.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            logger::log_warning(&format!(
                "Serving root not found or inaccessible '{}': {e}",
                root.display()
            ));
            return None;
        }
    };

    // Missing files are common (404), no need to log at warning level
    let canonical = local_path(root, path).canonicalize().ok()?;
    if !canonical.starts_with(&root_canonical) {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {path} -> {}",
            canonical.display()
        ));
        return None;
    }
    Some(canonical)
}

async fn serve_directory(
    ctx: &RequestContext,
    options: &ServeOptions<'_>,
    dir: &Path,
) -> Response<Full<Bytes>> {
    if !ctx.path.ends_with('/') {
        return http::build_redirect_response(&format!("{}/", encode_path(&ctx.path)));
    }

    for index_file in options.index_files {
        let index_path = dir.join(index_file);
        if let Ok(metadata) = fs::metadata(&index_path).await {
            if metadata.is_file() {
                return serve_file(ctx, &index_path, &index_path, &metadata).await;
            }
        }
    }

    if !options.dir_listing {
        return http::build_404_response();
    }

    match listing::read_entries(dir).await {
        Ok(entries) => {
            let html = listing::render(&ctx.path, &entries);
            http::response::build_html_response(html, ctx.is_head())
        }
        Err(e) => {
            logger::log_error(&format!(
                "Failed to list directory '{}': {e}",
                dir.display()
            ));
            http::build_500_response()
        }
    }
}

/// Serve a regular file; `named` decides the content type, `target` is read
async fn serve_file(
    ctx: &RequestContext,
    named: &Path,
    target: &Path,
    metadata: &Metadata,
) -> Response<Full<Bytes>> {
    let content = match fs::read(target).await {
        Ok(c) => Bytes::from(c),
        Err(e) => {
            logger::log_error(&format!(
                "Failed to read file '{}': {e}",
                target.display()
            ));
            return http::build_500_response();
        }
    };

    let etag = cache::generate_etag(&content);
    let modified = metadata.modified().ok();
    let last_modified = modified.map(cache::format_http_date);
    let headers = FileHeaders {
        content_type: mime::for_path(named),
        etag: &etag,
        last_modified: last_modified.as_deref(),
    };

    if cache::is_not_modified(
        ctx.if_none_match.as_deref(),
        ctx.if_modified_since.as_deref(),
        &etag,
        modified,
    ) {
        return http::build_304_response(&etag, headers.last_modified);
    }

    let total_size = content.len() as u64;
    match http::parse_range_header(ctx.range_header.as_deref(), total_size) {
        RangeParseResult::Valid(range) => {
            let (Ok(start), Ok(end)) = (usize::try_from(range.start), usize::try_from(range.end))
            else {
                return http::build_416_response(total_size);
            };
            http::response::build_partial_response(
                content.slice(start..=end),
                &headers,
                range,
                total_size,
                ctx.is_head(),
            )
        }
        RangeParseResult::NotSatisfiable => http::build_416_response(total_size),
        RangeParseResult::None => {
            http::response::build_file_response(content, &headers, ctx.is_head())
        }
    }
}
