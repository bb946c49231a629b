//! JSON build manifests.
//!
//! `build` can emit a manifest describing every entry it packed; separate
//! build invocations (per-platform shards, incremental cooks) merge their
//! manifests with [`merge_manifests`]. A `(keyHash, stage)` collision
//! between different source paths is a real content conflict and fails
//! loudly, unlike the silent dedupe inside a single build.

use std::path::Path;

use serde::{Deserialize, Serialize};
use vshader_types::{Error, Result};

/// One packed library entry, as recorded by `build --manifest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub virtual_path: String,
    /// Stage token (`vert`, `frag`, …).
    pub stage: String,
    pub key_hash: u64,
    pub content_hash: u64,
    pub variant_hash: u64,
    pub shader_id_hash: u64,
}

/// A build manifest: the JSON shadow of a `.vshlib`'s table of contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildManifest {
    pub entries: Vec<ManifestEntry>,
}

impl BuildManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("failed to read manifest {}: {e}", path.display())))?;
        serde_json::from_str(&text).map_err(|e| {
            Error::deserialize(format!("failed to parse manifest {}: {e}", path.display()))
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::serialize(format!("failed to serialize manifest: {e}")))?;
        std::fs::write(path, json)
            .map_err(|e| Error::io(format!("failed to write manifest {}: {e}", path.display())))
    }

    /// Folds `other` into `self`.
    ///
    /// Entries identical in `(keyHash, stage)` and source path are
    /// deduplicated; the same key from a different path is a conflict.
    pub fn merge(&mut self, other: BuildManifest) -> Result<()> {
        for entry in other.entries {
            match self
                .entries
                .iter()
                .find(|e| e.key_hash == entry.key_hash && e.stage == entry.stage)
            {
                Some(existing) if existing.virtual_path == entry.virtual_path => {}
                Some(existing) => {
                    return Err(Error::invalid_argument(format!(
                        "manifest conflict: keyHash={:#018x} stage={} maps to both '{}' and '{}'",
                        entry.key_hash, entry.stage, existing.virtual_path, entry.virtual_path
                    )));
                }
                None => self.entries.push(entry),
            }
        }
        Ok(())
    }

    /// Canonical order: ascending `(keyHash, stage)`, like the library TOC.
    pub fn sort(&mut self) {
        self.entries
            .sort_by(|a, b| (a.key_hash, &a.stage).cmp(&(b.key_hash, &b.stage)));
    }
}

/// Loads and merges manifest files in order.
pub fn merge_manifests(paths: &[std::path::PathBuf]) -> Result<BuildManifest> {
    let mut merged = BuildManifest::default();
    for path in paths {
        let manifest = BuildManifest::load(path)?;
        merged
            .merge(manifest)
            .map_err(|e| e.with_context(path.display()))?;
    }
    merged.sort();
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(path: &str, stage: &str, key: u64) -> ManifestEntry {
        ManifestEntry {
            virtual_path: path.into(),
            stage: stage.into(),
            key_hash: key,
            content_hash: key ^ 1,
            variant_hash: key,
            shader_id_hash: 7,
        }
    }

    #[test]
    fn merge_unions_and_dedupes() {
        let mut a = BuildManifest {
            entries: vec![entry("pbr.frag.vshader", "frag", 1)],
        };
        let b = BuildManifest {
            entries: vec![
                entry("pbr.frag.vshader", "frag", 1),
                entry("sky.vert.vshader", "vert", 2),
            ],
        };
        a.merge(b).unwrap();
        assert_eq!(a.entries.len(), 2);
    }

    #[test]
    fn conflicting_paths_fail() {
        let mut a = BuildManifest {
            entries: vec![entry("pbr.frag.vshader", "frag", 1)],
        };
        let b = BuildManifest {
            entries: vec![entry("other.frag.vshader", "frag", 1)],
        };
        let err = a.merge(b).unwrap_err();
        assert_eq!(err.code(), vshader_types::ErrorCode::InvalidArgument);
    }

    #[test]
    fn same_key_different_stage_is_not_a_conflict() {
        let mut a = BuildManifest {
            entries: vec![entry("pbr.frag.vshader", "frag", 1)],
        };
        let b = BuildManifest {
            entries: vec![entry("pbr.vert.vshader", "vert", 1)],
        };
        a.merge(b).unwrap();
        assert_eq!(a.entries.len(), 2);
    }

    #[test]
    fn round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");

        let mut m = BuildManifest {
            entries: vec![entry("b", "frag", 2), entry("a", "vert", 1)],
        };
        m.sort();
        m.save(&path).unwrap();

        let back = BuildManifest::load(&path).unwrap();
        assert_eq!(back, m);
        assert_eq!(back.entries[0].key_hash, 1);
    }
}
