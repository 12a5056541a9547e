//! Rank coordination and compiled-artifact cache layout.
//!
//! A distributed run compiles each decomposition-specific code path once:
//! rank 0 records the designated compiling rank in the decomposition
//! descriptor, and every other rank with the same partition topology
//! redirects its artifact cache to the compiling rank's directory,
//! read-only. An external startup barrier guarantees rank 0 writes the
//! descriptor before any other rank reads it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::OrchestrateError;

/// The rank layout of the spatial partitioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionTopology {
    /// Ranks along each horizontal axis of a partition tile.
    pub layout: (u32, u32),
}

impl PartitionTopology {
    pub fn new(x: u32, y: u32) -> Self {
        Self { layout: (x, y) }
    }

    /// Stable decomposition key derived from the layout.
    pub fn signature(&self) -> String {
        format!("{}x{}", self.layout.0, self.layout.1)
    }
}

/// Persisted mapping from decomposition signature to the designated
/// compiling rank. Written only by rank 0, at most once per
/// decomposition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecompositionDescriptor {
    entries: BTreeMap<String, u32>,
}

impl DecompositionDescriptor {
    /// Path of the descriptor file under a cache root.
    pub fn path_under(cache_root: &Path) -> PathBuf {
        cache_root.join(".layout").join("decomposition.yml")
    }

    /// Loads a descriptor from disk.
    ///
    /// Returns `Ok(None)` if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Option<Self>, OrchestrateError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| OrchestrateError::cache_io(path, e.to_string()))?;

        let descriptor: Self = serde_yaml::from_str(&content)
            .map_err(|e| OrchestrateError::cache_io(path, format!("Failed to parse descriptor: {}", e)))?;

        Ok(Some(descriptor))
    }

    /// Saves the descriptor to disk, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), OrchestrateError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| OrchestrateError::cache_io(parent, e.to_string()))?;
        }

        let content = serde_yaml::to_string(self).map_err(|e| {
            OrchestrateError::DescriptorSerialize {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })?;

        std::fs::write(path, content)
            .map_err(|e| OrchestrateError::cache_io(path, e.to_string()))
    }

    /// The designated compiling rank for a decomposition signature.
    pub fn compiling_rank(&self, signature: &str) -> Option<u32> {
        self.entries.get(signature).copied()
    }

    /// Records the compiling rank for a decomposition signature.
    pub fn record(&mut self, signature: impl Into<String>, rank: u32) {
        self.entries.insert(signature.into(), rank);
    }
}

/// Resolves the rank this process should source compiled artifacts from.
///
/// A missing or unreadable descriptor, or one without an entry for this
/// topology, falls back to `rank` itself: on a first run every rank is
/// its own provisional compiler. Re-reads with an unchanged topology are
/// deterministic.
pub fn read_target_rank(rank: u32, topology: &PartitionTopology, cache_root: &Path) -> u32 {
    let path = DecompositionDescriptor::path_under(cache_root);
    match DecompositionDescriptor::load(&path) {
        Ok(Some(descriptor)) => descriptor
            .compiling_rank(&topology.signature())
            .unwrap_or(rank),
        // Absent or unreadable: treat self as the compiler, not an error
        Ok(None) | Err(_) => rank,
    }
}

/// Persists `{signature -> rank 0}` to the decomposition descriptor.
///
/// Only rank 0 calls this, and only when the mode compiles and the run
/// spans more than one rank, so no locking is needed. Entries for other
/// decompositions already in the file are kept.
pub fn write_decomposition(
    topology: &PartitionTopology,
    cache_root: &Path,
) -> Result<(), OrchestrateError> {
    let path = DecompositionDescriptor::path_under(cache_root);
    let mut descriptor = DecompositionDescriptor::load(&path)
        .unwrap_or(None)
        .unwrap_or_default();
    descriptor.record(topology.signature(), 0);
    descriptor.save(&path)
}

/// How a process may use its artifact cache directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAccess {
    /// This rank compiles; it owns the directory.
    ReadWrite,
    /// This rank reuses the compiling rank's artifacts.
    ReadOnly,
}

/// The resolved artifact cache location of one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayout {
    pub path: PathBuf,
    pub access: CacheAccess,
}

/// The rank-local artifact cache directory under a cache root.
pub fn rank_cache_dir(cache_root: &Path, rank: u32) -> PathBuf {
    cache_root.join(format!(".artifact_cache_{:06}", rank))
}

/// Resolves the cache layout for a rank, given the designated compiling
/// rank. Set once before any compilation or load occurs, never mutated
/// afterward.
pub fn resolve_cache_layout(rank: u32, target_rank: u32, cache_root: &Path) -> CacheLayout {
    if rank == target_rank {
        CacheLayout {
            path: rank_cache_dir(cache_root, rank),
            access: CacheAccess::ReadWrite,
        }
    } else {
        CacheLayout {
            path: rank_cache_dir(cache_root, target_rank),
            access: CacheAccess::ReadOnly,
        }
    }
}
