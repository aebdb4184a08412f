//! Test fixtures for the chromalign workspace
//!
//! Integration tests write their CSV and JSON artifacts under
//! `<workspace>/test_output/` so they can be inspected after a run, and use
//! throwaway scratch directories for anything that must start empty.

use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(thiserror::Error, Debug)]
pub enum TestHelperError {
    #[error("workspace root not found above {0}")]
    WorkspaceRootNotFound(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Walk up from the current directory to the `Cargo.toml` declaring
/// `[workspace]`.
pub fn find_workspace_root() -> Result<PathBuf, TestHelperError> {
    let start = std::env::current_dir()?;

    for dir in start.ancestors() {
        let manifest = dir.join("Cargo.toml");
        if manifest.is_file() && std::fs::read_to_string(&manifest)?.contains("[workspace]") {
            return Ok(dir.to_path_buf());
        }
    }

    Err(TestHelperError::WorkspaceRootNotFound(start))
}

static WORKSPACE_ROOT: Lazy<PathBuf> =
    Lazy::new(|| find_workspace_root().expect("tests must run inside the workspace"));

/// `<workspace>/test_output/`, created on first use
pub fn test_output_dir() -> PathBuf {
    let dir = WORKSPACE_ROOT.join("test_output");
    std::fs::create_dir_all(&dir).expect("failed to create test_output directory");
    dir
}

pub fn test_output_path<P: AsRef<Path>>(relative: P) -> PathBuf {
    test_output_dir().join(relative)
}

static SCRATCH_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Fresh, empty directory under the system temp dir.
///
/// The caller removes it when done.
pub fn scratch_dir(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let n = SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!(
        "chromalign_{tag}_{}_{nanos}_{n}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).expect("failed to create scratch directory");
    dir
}
