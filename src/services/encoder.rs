//! Bulk bundle encoding
//!
//! Walks a bundle directory and returns every contained file as a base64
//! string, so the viewer can fetch a whole model in one response.

use base64::Engine;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Bulk encoding errors
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Bundle directory does not exist
    #[error("Folder not found: {0}")]
    NotFound(PathBuf),

    /// Walk failed partway through the tree
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// I/O error reading a file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One encoded file of a bundle
#[derive(Debug, Clone, Serialize)]
pub struct EncodedFile {
    /// File name (final path segment)
    pub name: String,
    /// Forward-slash path relative to the bundle root
    #[serde(rename = "relativePath")]
    pub relative_path: String,
    /// File content, standard-alphabet base64 without line wrapping
    pub buffer: String,
}

/// Encode every regular file under `bundle_dir`
///
/// The walk is lexicographic by file name so the result order is
/// deterministic. Directories are skipped, nested subdirectories (including
/// `*.mtkweb` scene folders) are descended into without special-casing.
/// Any file system error aborts the whole encoding; an existing-but-empty
/// bundle yields an empty vector.
pub fn encode_all(bundle_dir: &Path) -> Result<Vec<EncodedFile>, EncodeError> {
    if !bundle_dir.is_dir() {
        return Err(EncodeError::NotFound(bundle_dir.to_path_buf()));
    }

    let mut out = Vec::new();
    for entry in WalkDir::new(bundle_dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(bundle_dir)
            .expect("walkdir yields paths under its root");
        let relative_path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let name = entry.file_name().to_string_lossy().into_owned();

        let content = std::fs::read(entry.path())?;
        out.push(EncodedFile {
            name,
            relative_path,
            buffer: base64::engine::general_purpose::STANDARD.encode(content),
        });
    }

    Ok(out)
}
