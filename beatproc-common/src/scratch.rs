//! Request-scoped scratch directories
//!
//! Every request that touches the filesystem gets its own directory. The
//! directory (and everything written into it) is removed when the returned
//! [`TempDir`] is dropped, on success and failure alike.

use std::path::Path;

use tempfile::TempDir;

use crate::Result;

const PREFIX: &str = "beatproc-";

/// Create a fresh scratch directory labelled for the operation using it.
///
/// `root` overrides the system temp directory; it must already exist.
pub fn scratch_dir(root: Option<&Path>, label: &str) -> Result<TempDir> {
    let prefix = format!("{PREFIX}{label}-");
    let mut builder = tempfile::Builder::new();
    builder.prefix(&prefix);

    let dir = match root {
        Some(root) => builder.tempdir_in(root)?,
        None => builder.tempdir()?,
    };

    tracing::debug!(path = %dir.path().display(), "Created scratch directory");
    Ok(dir)
}
