//! Filesystem existence probe
//!
//! The resolver only ever asks "does this path exist". Any status failure,
//! whatever its kind, answers no.

use std::future::Future;
use std::io;
use std::path::Path;

/// Source of file status answers
pub trait Probe {
    fn status(&self, path: &Path) -> impl Future<Output = io::Result<()>> + Send;
}

/// Probe backed by `tokio::fs::metadata`
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

impl Probe for FsProbe {
    async fn status(&self, path: &Path) -> io::Result<()> {
        tokio::fs::metadata(path).await.map(|_| ())
    }
}

/// Whether `path` exists according to `probe`
pub async fn exists<P: Probe + Sync>(probe: &P, path: &Path) -> bool {
    probe.status(path).await.is_ok()
}
