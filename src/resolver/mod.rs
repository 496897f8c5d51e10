//! Compressed-variant resolution
//!
//! Decides which file under the serving root answers a request and which
//! headers are overlaid on the file responder's response. Rules, first match
//! wins:
//!
//! 1. `*.br` that exists: served as-is with `Content-Encoding: br`
//! 2. `*.gz` that exists: served as-is with `Content-Encoding: gzip`
//! 3. `*.unityweb`: sibling lookup uses the stem when `stem.br` or `stem.gz` exists
//! 4. `<base>.br` exists: request rewritten to it, `Content-Encoding: br`
//! 5. `<base>.gz` exists: request rewritten to it, `Content-Encoding: gzip`
//! 6. otherwise the request passes through with directory listing enabled
//!
//! Paths with a `..` component are never probed and always pass through, so
//! the file responder's containment check answers them.
//!
//! Explicit requests (1, 2) infer `Content-Type` from the suffix left after
//! dropping the encoding extension. Rewritten requests (4, 5) infer it from a
//! substring match anywhere in the request path, so `/app.json` served from
//! `app.json.br` is labelled `application/javascript`. Existing deployments
//! depend on that labelling.

pub mod probe;

pub use probe::{exists, FsProbe, Probe};

use hyper::header::{HeaderValue, CONTENT_ENCODING, CONTENT_TYPE};
use hyper::Response;
use std::path::{Component, Path, PathBuf};

/// Legacy extension whose payload lives in a `.br`/`.gz` sibling of its stem
pub const LEGACY_ALIAS_SUFFIX: &str = ".unityweb";

/// Inner-file suffixes with a forced `Content-Type`, in match order
const CONTENT_TYPES: [(&str, &str); 3] = [
    (".wasm", "application/wasm"),
    (".js", "application/javascript"),
    (".data", "application/octet-stream"),
];

/// Precompressed variant encodings, in preference order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Brotli,
    Gzip,
}

impl Encoding {
    pub const PREFERENCE: [Self; 2] = [Self::Brotli, Self::Gzip];

    /// File suffix of the variant, including the dot
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Brotli => ".br",
            Self::Gzip => ".gz",
        }
    }

    /// `Content-Encoding` token
    pub const fn token(self) -> &'static str {
        match self {
            Self::Brotli => "br",
            Self::Gzip => "gzip",
        }
    }
}

/// Which rule produced a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// The request named an existing compressed file
    Explicit,
    /// The request was rewritten to a compressed sibling
    Implicit,
    /// No compressed variant; served unmodified
    Passthrough,
}

/// Outcome of resolving one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Decoded path, relative to the root, handed to the file responder
    pub path: String,
    pub encoding: Option<Encoding>,
    pub content_type: Option<&'static str>,
    pub dir_listing: bool,
    pub rule: Rule,
}

impl Resolution {
    fn passthrough(path: &str) -> Self {
        Self {
            path: path.to_string(),
            encoding: None,
            content_type: None,
            dir_listing: true,
            rule: Rule::Passthrough,
        }
    }

    /// Overlay `Content-Encoding` / `Content-Type` on a delegated response
    pub fn apply<B>(&self, response: &mut Response<B>) {
        let headers = response.headers_mut();
        if let Some(encoding) = self.encoding {
            headers.insert(CONTENT_ENCODING, HeaderValue::from_static(encoding.token()));
        }
        if let Some(content_type) = self.content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
    }
}

/// Content type for a path whose final suffix is in the table
pub fn content_type_by_suffix(path: &str) -> Option<&'static str> {
    CONTENT_TYPES
        .iter()
        .find(|(suffix, _)| path.ends_with(suffix))
        .map(|&(_, content_type)| content_type)
}

/// Content type for a path containing a table suffix anywhere
pub fn content_type_by_substring(path: &str) -> Option<&'static str> {
    CONTENT_TYPES
        .iter()
        .find(|(suffix, _)| path.contains(suffix))
        .map(|&(_, content_type)| content_type)
}

/// Location on disk of a request path
pub fn local_path(root: &Path, path: &str) -> PathBuf {
    root.join(path.trim_start_matches('/'))
}

/// Resolve a request against `root`
///
/// `raw_path` is the URI path as received and drives content-type inference;
/// `decoded_path` is its percent-decoded form and drives every probe.
pub async fn resolve<P: Probe + Sync>(
    probe: &P,
    root: &Path,
    raw_path: &str,
    decoded_path: &str,
) -> Resolution {
    if escapes_root(decoded_path) {
        return Resolution::passthrough(decoded_path);
    }

    for encoding in Encoding::PREFERENCE {
        if decoded_path.ends_with(encoding.suffix())
            && exists(probe, &local_path(root, decoded_path)).await
        {
            let inner = raw_path
                .get(..raw_path.len().saturating_sub(encoding.suffix().len()))
                .unwrap_or_default();
            return Resolution {
                path: decoded_path.to_string(),
                encoding: Some(encoding),
                content_type: content_type_by_suffix(inner),
                dir_listing: false,
                rule: Rule::Explicit,
            };
        }
    }

    let base = match decoded_path.strip_suffix(LEGACY_ALIAS_SUFFIX) {
        Some(stem) if has_variant(probe, root, stem).await => stem,
        _ => decoded_path,
    };

    for encoding in Encoding::PREFERENCE {
        let candidate = format!("{base}{}", encoding.suffix());
        if exists(probe, &local_path(root, &candidate)).await {
            return Resolution {
                path: candidate,
                encoding: Some(encoding),
                content_type: content_type_by_substring(raw_path),
                dir_listing: false,
                rule: Rule::Implicit,
            };
        }
    }

    Resolution::passthrough(decoded_path)
}

/// Whether a request path climbs out of the root through `..`
fn escapes_root(path: &str) -> bool {
    Path::new(path)
        .components()
        .any(|c| matches!(c, Component::ParentDir))
}

async fn has_variant<P: Probe + Sync>(probe: &P, root: &Path, stem: &str) -> bool {
    for encoding in Encoding::PREFERENCE {
        if exists(probe, &local_path(root, &format!("{stem}{}", encoding.suffix()))).await {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io;
    use std::sync::Mutex;

    const ROOT: &str = "/srv/www";

    /// In-memory probe recording every path it is asked about
    #[derive(Default)]
    struct FakeProbe {
        existing: HashSet<PathBuf>,
        denied: HashSet<PathBuf>,
        probed: Mutex<Vec<PathBuf>>,
    }

    impl FakeProbe {
        fn with(files: &[&str]) -> Self {
            Self {
                existing: files.iter().map(|f| local_path(Path::new(ROOT), f)).collect(),
                ..Self::default()
            }
        }

        fn deny(mut self, file: &str) -> Self {
            self.denied.insert(local_path(Path::new(ROOT), file));
            self
        }

        fn probe_count(&self) -> usize {
            self.probed.lock().unwrap().len()
        }
    }

    impl Probe for FakeProbe {
        async fn status(&self, path: &Path) -> io::Result<()> {
            self.probed.lock().unwrap().push(path.to_path_buf());
            if self.existing.contains(path) {
                Ok(())
            } else if self.denied.contains(path) {
                Err(io::Error::from(io::ErrorKind::PermissionDenied))
            } else {
                Err(io::Error::from(io::ErrorKind::NotFound))
            }
        }
    }

    async fn run(probe: &FakeProbe, path: &str) -> Resolution {
        resolve(probe, Path::new(ROOT), path, path).await
    }

    #[tokio::test]
    async fn test_explicit_brotli_request() {
        let probe = FakeProbe::with(&["/game.wasm.br"]);
        let res = run(&probe, "/game.wasm.br").await;

        assert_eq!(res.rule, Rule::Explicit);
        assert_eq!(res.path, "/game.wasm.br");
        assert_eq!(res.encoding, Some(Encoding::Brotli));
        assert_eq!(res.content_type, Some("application/wasm"));
        assert!(!res.dir_listing);
        assert_eq!(probe.probe_count(), 1);
    }

    #[tokio::test]
    async fn test_explicit_gzip_request() {
        let probe = FakeProbe::with(&["/Build/loader.js.gz"]);
        let res = run(&probe, "/Build/loader.js.gz").await;

        assert_eq!(res.rule, Rule::Explicit);
        assert_eq!(res.encoding, Some(Encoding::Gzip));
        assert_eq!(res.content_type, Some("application/javascript"));
    }

    #[tokio::test]
    async fn test_explicit_request_with_unknown_inner_suffix() {
        let probe = FakeProbe::with(&["/styles.css.br"]);
        let res = run(&probe, "/styles.css.br").await;

        assert_eq!(res.encoding, Some(Encoding::Brotli));
        assert_eq!(res.content_type, None);
    }

    #[tokio::test]
    async fn test_explicit_inference_is_suffix_only() {
        // ".js" appears mid-path but the inner file is ".txt"
        let probe = FakeProbe::with(&["/app.js.txt.br"]);
        let res = run(&probe, "/app.js.txt.br").await;
        assert_eq!(res.content_type, None);
    }

    #[tokio::test]
    async fn test_missing_explicit_falls_through_to_implicit() {
        // "/a.br" is absent, so "/a.br.gz" is considered a sibling
        let probe = FakeProbe::with(&["/a.br.gz"]);
        let res = run(&probe, "/a.br").await;

        assert_eq!(res.rule, Rule::Implicit);
        assert_eq!(res.path, "/a.br.gz");
        assert_eq!(res.encoding, Some(Encoding::Gzip));
    }

    #[tokio::test]
    async fn test_implicit_brotli_fallback() {
        let probe = FakeProbe::with(&["/game.wasm.br", "/game.data"]);
        let res = run(&probe, "/game.wasm").await;

        assert_eq!(res.rule, Rule::Implicit);
        assert_eq!(res.path, "/game.wasm.br");
        assert_eq!(res.encoding, Some(Encoding::Brotli));
        assert_eq!(res.content_type, Some("application/wasm"));
        assert_eq!(probe.probe_count(), 1);
    }

    #[tokio::test]
    async fn test_implicit_prefers_brotli_over_gzip() {
        let probe = FakeProbe::with(&["/bundle.js.br", "/bundle.js.gz"]);
        let res = run(&probe, "/bundle.js").await;
        assert_eq!(res.encoding, Some(Encoding::Brotli));
    }

    #[tokio::test]
    async fn test_implicit_gzip_fallback() {
        let probe = FakeProbe::with(&["/bundle.js.gz"]);
        let res = run(&probe, "/bundle.js").await;

        assert_eq!(res.path, "/bundle.js.gz");
        assert_eq!(res.encoding, Some(Encoding::Gzip));
        assert_eq!(res.content_type, Some("application/javascript"));
        assert_eq!(probe.probe_count(), 2);
    }

    #[tokio::test]
    async fn test_implicit_inference_uses_substring() {
        let probe = FakeProbe::with(&["/app.json.br", "/game.wasm.framework.br", "/notes.br"]);

        let res = run(&probe, "/app.json").await;
        assert_eq!(res.content_type, Some("application/javascript"));

        let res = run(&probe, "/game.wasm.framework").await;
        assert_eq!(res.content_type, Some("application/wasm"));

        let res = run(&probe, "/notes").await;
        assert_eq!(res.encoding, Some(Encoding::Brotli));
        assert_eq!(res.content_type, None);
    }

    #[tokio::test]
    async fn test_implicit_inference_reads_raw_request_path() {
        let probe = FakeProbe::with(&["/my game.wasm.br"]);
        let res = resolve(&probe, Path::new(ROOT), "/my%20game.wasm", "/my game.wasm").await;

        assert_eq!(res.path, "/my game.wasm.br");
        assert_eq!(res.content_type, Some("application/wasm"));
    }

    #[tokio::test]
    async fn test_legacy_alias_resolves_to_stem_variant() {
        let probe = FakeProbe::with(&["/Build/game.br", "/Build/game.unityweb.br"]);
        let res = run(&probe, "/Build/game.unityweb").await;

        assert_eq!(res.rule, Rule::Implicit);
        assert_eq!(res.path, "/Build/game.br");
        assert_eq!(res.encoding, Some(Encoding::Brotli));
        assert_eq!(res.content_type, None);
    }

    #[tokio::test]
    async fn test_legacy_alias_with_gzip_stem() {
        let probe = FakeProbe::with(&["/Build/game.data.gz"]);
        let res = run(&probe, "/Build/game.data.unityweb").await;

        assert_eq!(res.path, "/Build/game.data.gz");
        assert_eq!(res.encoding, Some(Encoding::Gzip));
        assert_eq!(res.content_type, Some("application/octet-stream"));
    }

    #[tokio::test]
    async fn test_legacy_alias_without_stem_variant_keeps_full_path() {
        let probe = FakeProbe::with(&["/Build/game.unityweb.gz"]);
        let res = run(&probe, "/Build/game.unityweb").await;

        assert_eq!(res.path, "/Build/game.unityweb.gz");
        assert_eq!(res.encoding, Some(Encoding::Gzip));
    }

    #[tokio::test]
    async fn test_passthrough_when_no_variant() {
        let probe = FakeProbe::with(&["/game.data", "/index.html"]);

        let res = run(&probe, "/game.data").await;
        assert_eq!(res, Resolution::passthrough("/game.data"));
        assert!(res.dir_listing);
        assert_eq!(res.encoding, None);

        let res = run(&probe, "/missing.js").await;
        assert_eq!(res.rule, Rule::Passthrough);
        assert_eq!(res.path, "/missing.js");
    }

    #[tokio::test]
    async fn test_permission_denied_is_treated_as_missing() {
        let probe = FakeProbe::with(&["/game.wasm.gz"]).deny("/game.wasm.br");
        let res = run(&probe, "/game.wasm").await;
        assert_eq!(res.encoding, Some(Encoding::Gzip));

        let probe = FakeProbe::default().deny("/game.wasm.br");
        let res = run(&probe, "/game.wasm.br").await;
        assert_eq!(res.rule, Rule::Passthrough);
    }

    #[tokio::test]
    async fn test_parent_components_are_never_probed() {
        let probe = FakeProbe::with(&["/../secret.br", "/Build/../secret.gz"]);

        let res = run(&probe, "/../secret").await;
        assert_eq!(res, Resolution::passthrough("/../secret"));

        let res = run(&probe, "/Build/../secret").await;
        assert_eq!(res.rule, Rule::Passthrough);

        let res = run(&probe, "/../secret.br").await;
        assert_eq!(res.encoding, None);
        assert_eq!(probe.probe_count(), 0);
    }

    #[test]
    fn test_escapes_root() {
        assert!(escapes_root("/../x"));
        assert!(escapes_root("/a/../../x"));
        assert!(!escapes_root("/a..b/c"));
        assert!(!escapes_root("/game.wasm"));
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent() {
        let probe = FakeProbe::with(&["/Build/game.br"]);
        let first = run(&probe, "/Build/game.unityweb").await;
        let second = run(&probe, "/Build/game.unityweb").await;
        assert_eq!(first, second);
    }

    #[test]
    fn test_content_type_tables() {
        assert_eq!(content_type_by_suffix("/a.wasm"), Some("application/wasm"));
        assert_eq!(content_type_by_suffix("/a.wasm.map"), None);
        assert_eq!(content_type_by_substring("/a.wasm.map"), Some("application/wasm"));
        assert_eq!(content_type_by_substring("/a.data.js"), Some("application/javascript"));
        assert_eq!(content_type_by_substring("/index.html"), None);
    }

    #[test]
    fn test_apply_overlays_headers() {
        let mut response = Response::builder()
            .header("Content-Type", "application/octet-stream")
            .body(())
            .unwrap();
        let res = Resolution {
            path: "/game.wasm.br".to_string(),
            encoding: Some(Encoding::Brotli),
            content_type: Some("application/wasm"),
            dir_listing: false,
            rule: Rule::Implicit,
        };
        res.apply(&mut response);

        assert_eq!(response.headers()["content-encoding"], "br");
        assert_eq!(response.headers()["content-type"], "application/wasm");
        assert_eq!(response.headers().get_all("content-type").iter().count(), 1);
    }

    #[test]
    fn test_apply_passthrough_leaves_headers() {
        let mut response = Response::builder()
            .header("Content-Type", "text/html; charset=utf-8")
            .body(())
            .unwrap();
        Resolution::passthrough("/index.html").apply(&mut response);

        assert!(response.headers().get("content-encoding").is_none());
        assert_eq!(response.headers()["content-type"], "text/html; charset=utf-8");
    }
}
