// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Model loading from a manifest file.
//!
//! The image is memory-mapped and parsed in place, the way a firmware
//! build links the model into a read-only data section.

use crate::graph::Validated;
use crate::{ModelError, ModelGraph, ModelManifest};
use std::path::Path;

/// Loads a model image from disk into a validated [`ModelGraph`].
///
/// # Example
/// ```no_run
/// use model_ir::ModelLoader;
/// use std::path::Path;
///
/// let graph = ModelLoader::load(Path::new("./models/kws.json")).unwrap();
/// println!("Loaded {} nodes", graph.n_nodes());
/// ```
pub struct ModelLoader;

impl ModelLoader {
    /// Loads and validates a model image.
    ///
    /// Steps:
    /// 1. Map and parse the manifest, checking header and references.
    /// 2. Build node and tensor descriptors.
    /// 3. Validate the resulting graph.
    pub fn load(path: &Path) -> Result<ModelGraph<Validated>, ModelError> {
        let manifest = Self::load_manifest(path)?;
        Self::from_manifest(&manifest)
    }

    /// Builds a validated graph from an in-memory manifest.
    pub fn from_manifest(manifest: &ModelManifest) -> Result<ModelGraph<Validated>, ModelError> {
        manifest.validate()?;
        let graph = ModelGraph::from_manifest(manifest)?.validate()?;
        tracing::info!("{}", graph.summary());
        Ok(graph)
    }

    /// Parses the manifest at `path` without building a graph.
    pub fn load_manifest(path: &Path) -> Result<ModelManifest, ModelError> {
        let file = std::fs::File::open(path)?;
        // SAFETY: the mapping is read-only and dropped before this function
        // returns; concurrent truncation of the file is not supported.
        let mmap = unsafe { memmap2::Mmap::map(&file) }?;
        tracing::debug!(path = %path.display(), bytes = mmap.len(), "model image mapped");
        ModelManifest::from_slice(&mmap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::tests::sample_json;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(sample_json().as_bytes()).unwrap();
        let g = ModelLoader::load(file.path()).unwrap();
        assert_eq!(g.n_nodes(), 2);
        assert_eq!(g.header.macc, 336_000);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let res = ModelLoader::load(&dir.path().join("absent.json"));
        assert!(matches!(res, Err(ModelError::Io(_))));
    }

    #[test]
    fn test_version_mismatch_from_file() {
        let json = sample_json().replace("\"schema_version\": 1", "\"schema_version\": 2");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        assert!(matches!(
            ModelLoader::load(file.path()),
            Err(ModelError::VersionMismatch { found: 2, .. })
        ));
    }
}
