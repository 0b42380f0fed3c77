//! Processing services behind the HTTP handlers
//!
//! Each service owns one step of a request: fetching the input, producing
//! stems or the watermarked mix, packaging, uploading, and notifying.

pub mod callback;
pub mod fetcher;
pub mod packager;
pub mod separator;
pub mod uploader;
pub mod watermark;

pub use callback::{CallbackNotifier, CallbackPayload};
pub use fetcher::{FetchError, InputFetcher, InputSource};
pub use separator::{PlaceholderSeparator, Stem, StemSeparator};
pub use uploader::Uploader;
pub use watermark::{OverlayPlan, Watermarker};

use thiserror::Error;

/// Failures of the processing step (separator, external tools, packaging)
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// External binary missing from PATH or the configured location
    #[error("{0} not found; install it or point the service at it")]
    ToolNotFound(String),

    /// External binary ran and exited unsuccessfully
    #[error("{tool} failed ({status}): {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    /// Output of an external tool could not be interpreted
    #[error("Unexpected output from {tool}: {output:?}")]
    UnexpectedOutput { tool: String, output: String },

    /// Stem separator could not produce its stems
    #[error("Stem separation failed: {0}")]
    Separation(String),

    /// Archive could not be written
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Directory traversal failed while packaging
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    /// I/O error (file read/write)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Blocking task panicked or was cancelled
    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}
