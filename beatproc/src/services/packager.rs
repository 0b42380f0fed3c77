//! Stem archive packaging

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::ProcessingError;

/// Zip every file below `source_dir` into `archive`, deflated, with paths
/// relative to `source_dir`. Entries are sorted by path so the same inputs
/// always give the same entry order.
///
/// Returns the number of entries written.
pub async fn zip_directory(source_dir: &Path, archive: &Path) -> Result<usize, ProcessingError> {
    let source_dir = source_dir.to_path_buf();
    let archive = archive.to_path_buf();
    tokio::task::spawn_blocking(move || write_archive(&source_dir, &archive)).await?
}

fn write_archive(source_dir: &Path, archive: &Path) -> Result<usize, ProcessingError> {
    let mut entries: Vec<(String, PathBuf)> = Vec::new();
    for entry in WalkDir::new(source_dir).follow_links(false) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(|e| ProcessingError::Io(std::io::Error::other(e)))?;
        entries.push((archive_name(relative), entry.path().to_path_buf()));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(BufWriter::new(File::create(archive)?));
    for (name, path) in &entries {
        zip.start_file(name.as_str(), options)?;
        zip.write_all(&std::fs::read(path)?)?;
    }
    zip.finish()?.flush()?;

    tracing::debug!(
        archive = %archive.display(),
        entries = entries.len(),
        "Archive written"
    );
    Ok(entries.len())
}

/// Zip entry names always use `/`, whatever the host separator
fn archive_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
