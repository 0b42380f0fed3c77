//! Stem separation backends
//!
//! The HTTP layer only sees [`StemSeparator`]; a real model can replace
//! [`PlaceholderSeparator`] without touching the handlers.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::ProcessingError;

/// One isolated track written by a separator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stem {
    /// Stem name, e.g. "drums"
    pub name: String,
    /// File holding the stem audio
    pub path: PathBuf,
}

/// Stem separation backend
#[async_trait]
pub trait StemSeparator: Send + Sync {
    /// Split the audio at `input` into stem files under `output_dir`
    async fn separate(&self, input: &Path, output_dir: &Path) -> Result<Vec<Stem>, ProcessingError>;

    /// Name of this separator (for logging)
    fn name(&self) -> &'static str;
}

/// Stems the placeholder produces, in archive order
pub const PLACEHOLDER_STEMS: [&str; 4] = ["drums", "bass", "melody", "vocals"];

const PLACEHOLDER_CONTENT: &[u8] = b"fake stem data";

/// Stand-in separator writing fixed filler files instead of real audio
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderSeparator;

#[async_trait]
impl StemSeparator for PlaceholderSeparator {
    async fn separate(&self, input: &Path, output_dir: &Path) -> Result<Vec<Stem>, ProcessingError> {
        if !tokio::fs::try_exists(input).await? {
            return Err(ProcessingError::Separation(format!(
                "Input audio missing: {}",
                input.display()
            )));
        }

        tokio::fs::create_dir_all(output_dir).await?;

        let mut stems = Vec::with_capacity(PLACEHOLDER_STEMS.len());
        for name in PLACEHOLDER_STEMS {
            let path = output_dir.join(format!("{name}.wav"));
            tokio::fs::write(&path, PLACEHOLDER_CONTENT).await?;
            stems.push(Stem {
                name: name.to_string(),
                path,
            });
        }

        tracing::debug!(
            input = %input.display(),
            stems = stems.len(),
            "Placeholder stems written"
        );
        Ok(stems)
    }

    fn name(&self) -> &'static str {
        "placeholder"
    }
}
