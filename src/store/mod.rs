//! Bundle storage
//!
//! Owns the upload root directory. Each converted or uploaded model lives in
//! one immediate child directory named `<base>_mtk`. All paths handed out by
//! this module are verified to stay inside the store root.

use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Suffix every bundle directory name carries
pub const BUNDLE_SUFFIX: &str = "_mtk";

/// Bundle store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Bundle directory does not exist
    #[error("Folder not found: {0}")]
    NotFound(String),

    /// Relative path escapes the bundle root
    #[error("Path escapes bundle root: {0}")]
    PathTraversal(String),

    /// Bundle name is empty or not a single path component
    #[error("Invalid bundle name: {0}")]
    InvalidName(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One file to be written into a bundle
#[derive(Debug, Clone)]
pub struct BundleEntry {
    /// Path relative to the bundle root (forward-slash separated)
    pub relative_path: String,
    /// Raw file content
    pub content: Vec<u8>,
}

/// Bundle store rooted at the upload directory
#[derive(Debug, Clone)]
pub struct BundleStore {
    root: PathBuf,
}

impl BundleStore {
    /// Open a store, creating the root directory if missing
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Store root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Derive the bundle name from a source file name
    ///
    /// `part.step` -> `part_mtk`, `archive.tar.gz` -> `archive.tar_mtk`.
    /// A name without an extension is used as-is.
    pub fn bundle_name_for(source_file_name: &str) -> String {
        let stem = match source_file_name.rsplit_once('.') {
            Some((stem, _ext)) if !stem.is_empty() => stem,
            _ => source_file_name,
        };
        format!("{}{}", stem, BUNDLE_SUFFIX)
    }

    /// Create (or overwrite) the bundle `<name>` from the given entries
    ///
    /// The previous directory tree is removed first, so a re-upload never
    /// accumulates stale files. Every entry path is validated before any
    /// write; one bad path aborts the whole create.
    pub fn create(&self, name: &str, entries: &[BundleEntry]) -> Result<PathBuf, StoreError> {
        let bundle_dir = self.root.join(Self::validate_name(name)?);

        // Validate all paths up front so a traversal attempt writes nothing
        let mut resolved = Vec::with_capacity(entries.len());
        for entry in entries {
            resolved.push(sanitize_relative(&entry.relative_path)?);
        }

        if bundle_dir.exists() {
            info!(bundle = %name, "Overwriting existing bundle");
            std::fs::remove_dir_all(&bundle_dir)?;
        }
        std::fs::create_dir_all(&bundle_dir)?;

        for (entry, rel) in entries.iter().zip(resolved) {
            let target = bundle_dir.join(rel);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&target, &entry.content)?;
        }

        info!(bundle = %name, files = entries.len(), "Bundle written");
        Ok(bundle_dir)
    }

    /// Names of all bundle directories, lexicographically sorted
    ///
    /// Only immediate child directories whose name ends with `_mtk` are
    /// returned; plain files and other directories are skipped. The listing
    /// reads the file system fresh on every call.
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with(BUNDLE_SUFFIX) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Resolve a bundle name (and optional inner path) to an absolute path
    ///
    /// Fails with `NotFound` if the bundle directory does not exist and with
    /// `PathTraversal` if the inner path would leave the bundle directory.
    pub fn resolve(&self, name: &str, relative: Option<&str>) -> Result<PathBuf, StoreError> {
        let bundle_dir = self.root.join(Self::validate_name(name)?);
        if !bundle_dir.is_dir() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        match relative {
            None => Ok(bundle_dir),
            Some(rel) => Ok(bundle_dir.join(sanitize_relative(rel)?)),
        }
    }

    fn validate_name(name: &str) -> Result<&str, StoreError> {
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains('/')
            || name.contains('\\')
            || name.contains('\0')
        {
            warn!(name = %name, "Rejected bundle name");
            return Err(StoreError::InvalidName(name.to_string()));
        }
        Ok(name)
    }
}

/// Normalize a bundle-relative path, rejecting anything that could escape
///
/// Accepts forward-slash separated paths, drops `.` components and rejects
/// `..`, absolute paths, and embedded NUL bytes.
fn sanitize_relative(path: &str) -> Result<PathBuf, StoreError> {
    if path.contains('\0') {
        return Err(StoreError::PathTraversal(path.to_string()));
    }
    // Treat backslashes as separators so Windows-style upload paths cannot
    // smuggle a `..\` past the component check
    let normalized = path.replace('\\', "/");
    let mut out = PathBuf::new();
    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                warn!(path = %path, "Rejected relative path");
                return Err(StoreError::PathTraversal(path.to_string()));
            }
        }
    }
    if out.as_os_str().is_empty() {
        return Err(StoreError::PathTraversal(path.to_string()));
    }
    Ok(out)
}
