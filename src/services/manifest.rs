//! Viewer manifest synthesis
//!
//! The converter leaves one `*.mtkweb` scene folder inside each bundle,
//! holding the `scenegraph.mtkweb` entry file. The viewer does not know that
//! layout; it asks for `process_data.json` and receives this generated
//! manifest with one resolvable URL per part. Nothing here is persisted.

use crate::store::{BundleStore, StoreError, BUNDLE_SUFFIX};
use serde::Serialize;
use thiserror::Error;

/// Scene folder name suffix (case-sensitive)
pub const SCENE_FOLDER_SUFFIX: &str = ".mtkweb";

/// Entry file the viewer loads from the scene folder
pub const SCENE_GRAPH_FILE: &str = "scenegraph.mtkweb";

/// Manifest synthesis errors
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Bundle directory does not exist
    #[error("Folder not found: {0}")]
    NotFound(String),

    /// Bundle exists but contains no `*.mtkweb` subfolder
    #[error("No scene folder in bundle: {0}")]
    SceneFolderMissing(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for ManifestError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(name) | StoreError::InvalidName(name) => {
                ManifestError::NotFound(name)
            }
            StoreError::PathTraversal(path) => ManifestError::NotFound(path),
            StoreError::Io(err) => ManifestError::Io(err),
        }
    }
}

/// Generated manifest document
#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub version: String,
    pub parts: Vec<ManifestPart>,
}

/// One part entry of the manifest
#[derive(Debug, Clone, Serialize)]
pub struct ManifestPart {
    #[serde(rename = "partId")]
    pub part_id: String,
    pub files: Vec<ManifestFile>,
}

/// One viewer-resolvable file of a part
#[derive(Debug, Clone, Serialize)]
pub struct ManifestFile {
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
}

/// Build the manifest for `bundle_name`
///
/// Scene folder selection: immediate children are enumerated in lexicographic
/// order and the first directory ending in `.mtkweb` wins.
pub fn build_manifest(
    store: &BundleStore,
    bundle_name: &str,
    public_base_url: &str,
) -> Result<Manifest, ManifestError> {
    let bundle_dir = store.resolve(bundle_name, None)?;

    let mut scene_folders = Vec::new();
    for entry in std::fs::read_dir(&bundle_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if name.ends_with(SCENE_FOLDER_SUFFIX) {
                scene_folders.push(name.to_string());
            }
        }
    }
    scene_folders.sort();

    let scene_folder = scene_folders
        .into_iter()
        .next()
        .ok_or_else(|| ManifestError::SceneFolderMissing(bundle_name.to_string()))?;

    let part_id = bundle_name
        .strip_suffix(BUNDLE_SUFFIX)
        .unwrap_or(bundle_name)
        .to_string();

    let path = format!(
        "{}/uploads/{}/{}/{}",
        public_base_url.trim_end_matches('/'),
        bundle_name,
        scene_folder,
        SCENE_GRAPH_FILE
    );

    Ok(Manifest {
        version: "1".to_string(),
        parts: vec![ManifestPart {
            part_id,
            files: vec![ManifestFile {
                kind: "mtkweb".to_string(),
                path,
            }],
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::BundleEntry;
    use tempfile::TempDir;

    fn store_with(entries: &[(&str, &str)]) -> (TempDir, BundleStore) {
        let dir = TempDir::new().unwrap();
        let store = BundleStore::new(dir.path()).unwrap();
        let entries: Vec<BundleEntry> = entries
            .iter()
            .map(|(path, content)| BundleEntry {
                relative_path: path.to_string(),
                content: content.as_bytes().to_vec(),
            })
            .collect();
        store.create("part_mtk", &entries).unwrap();
        (dir, store)
    }

    #[test]
    fn manifest_points_at_scene_graph() {
        let (_dir, store) = store_with(&[("geom.mtkweb/scenegraph.mtkweb", "scene")]);

        let manifest = build_manifest(&store, "part_mtk", "http://localhost:5000").unwrap();

        assert_eq!(manifest.version, "1");
        assert_eq!(manifest.parts.len(), 1);
        assert_eq!(manifest.parts[0].part_id, "part");
        assert_eq!(manifest.parts[0].files.len(), 1);
        assert_eq!(manifest.parts[0].files[0].kind, "mtkweb");
        assert!(manifest.parts[0].files[0]
            .path
            .ends_with("part_mtk/geom.mtkweb/scenegraph.mtkweb"));
    }

    #[test]
    fn base_url_trailing_slash_does_not_double() {
        let (_dir, store) = store_with(&[("geom.mtkweb/scenegraph.mtkweb", "scene")]);

        let manifest = build_manifest(&store, "part_mtk", "http://host/").unwrap();
        assert_eq!(
            manifest.parts[0].files[0].path,
            "http://host/uploads/part_mtk/geom.mtkweb/scenegraph.mtkweb"
        );
    }

    #[test]
    fn missing_scene_folder_is_reported() {
        let (_dir, store) = store_with(&[("readme.txt", "no scene here")]);

        let result = build_manifest(&store, "part_mtk", "http://host");
        assert!(matches!(result, Err(ManifestError::SceneFolderMissing(_))));
    }

    #[test]
    fn first_scene_folder_lexicographic_wins() {
        let (_dir, store) = store_with(&[
            ("zeta.mtkweb/scenegraph.mtkweb", "z"),
            ("alpha.mtkweb/scenegraph.mtkweb", "a"),
        ]);

        let manifest = build_manifest(&store, "part_mtk", "http://host").unwrap();
        assert!(manifest.parts[0].files[0].path.contains("alpha.mtkweb"));
    }

    #[test]
    fn unsuffixed_bundle_name_is_used_unchanged() {
        let dir = TempDir::new().unwrap();
        let store = BundleStore::new(dir.path()).unwrap();
        store
            .create(
                "plain",
                &[BundleEntry {
                    relative_path: "geom.mtkweb/scenegraph.mtkweb".to_string(),
                    content: b"scene".to_vec(),
                }],
            )
            .unwrap();

        let manifest = build_manifest(&store, "plain", "http://host").unwrap();
        assert_eq!(manifest.parts[0].part_id, "plain");
    }

    #[test]
    fn missing_bundle_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = BundleStore::new(dir.path()).unwrap();

        let result = build_manifest(&store, "ghost_mtk", "http://host");
        assert!(matches!(result, Err(ManifestError::NotFound(_))));
    }

    #[test]
    fn scene_suffix_match_is_case_sensitive() {
        let (_dir, store) = store_with(&[("geom.MTKWEB/scenegraph.mtkweb", "scene")]);

        let result = build_manifest(&store, "part_mtk", "http://host");
        assert!(matches!(result, Err(ManifestError::SceneFolderMissing(_))));
    }
}
