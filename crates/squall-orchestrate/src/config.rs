//! Orchestration configuration.
//!
//! One [`OrchestrationConfig`] is constructed per process at startup and
//! is immutable afterward: mode resolution, backend validation, rank and
//! target-rank lookup, and cache-layout resolution all happen here, in
//! dependency order, so nothing downstream needs ambient global state.

use std::fmt;
use std::path::Path;

use crate::distributed::{
    read_target_rank, resolve_cache_layout, write_decomposition, CacheLayout, PartitionTopology,
};
use crate::error::OrchestrateError;

/// Environment variable selecting the default orchestration mode.
pub const ORCHESTRATE_MODE_ENV: &str = "SQUALL_ORCHESTRATE";

/// Environment variable forcing artifact rebuilds.
pub const REBUILD_ENV: &str = "SQUALL_REBUILD";

/// Orchestration mode for the graph compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestrationMode {
    /// Immediate interpreted execution, no persisted artifact.
    Direct,
    /// Compile and persist the artifact only.
    BuildOnly,
    /// Compile, persist, then run.
    BuildAndRun,
    /// Load a previously persisted artifact and run; fails if absent.
    RunOnly,
}

impl OrchestrationMode {
    /// Parses a mode name. Returns `None` for unrecognized values.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Direct" => Some(Self::Direct),
            "BuildOnly" => Some(Self::BuildOnly),
            "BuildAndRun" => Some(Self::BuildAndRun),
            "RunOnly" => Some(Self::RunOnly),
            _ => None,
        }
    }

    /// Resolves the process-wide default mode from the environment.
    ///
    /// Unset or unrecognized values fall back to [`Self::Direct`]; mode
    /// selection never fails.
    pub fn from_env() -> Self {
        std::env::var(ORCHESTRATE_MODE_ENV)
            .ok()
            .and_then(|v| Self::parse(&v))
            .unwrap_or(Self::Direct)
    }

    /// Whether this mode compiles and persists an artifact.
    pub fn requires_build(&self) -> bool {
        matches!(self, Self::BuildOnly | Self::BuildAndRun)
    }
}

impl fmt::Display for OrchestrationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Direct => "Direct",
            Self::BuildOnly => "BuildOnly",
            Self::BuildAndRun => "BuildAndRun",
            Self::RunOnly => "RunOnly",
        };
        f.write_str(name)
    }
}

/// Backend tag identifying the device class and compiler path,
/// e.g. `graph:cpu`, `graph:gpu`, or `cpu-default`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend(String);

impl Backend {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Only graph-compiler backends produce persistable artifacts.
    pub fn is_orchestration_capable(&self) -> bool {
        self.0.contains("graph")
    }

    pub fn is_gpu(&self) -> bool {
        self.0.contains("gpu")
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The collective-communication capability of the external communication
/// layer, as far as orchestration needs it.
pub trait Communicator {
    /// This process's rank id.
    fn rank(&self) -> u32;
    /// Total rank count of the run.
    fn size(&self) -> u32;
    /// The spatial partition topology of the run.
    fn partition(&self) -> &PartitionTopology;
}

/// Process-wide build settings, resolved once from the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildSettings {
    /// Bypass caches and recompile even when artifacts exist.
    pub rebuild: bool,
    /// Validate stencil arguments on every call.
    pub validate_args: bool,
}

impl BuildSettings {
    pub fn from_env() -> Self {
        let rebuild = std::env::var(REBUILD_ENV)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        Self {
            rebuild,
            validate_args: true,
        }
    }
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            rebuild: false,
            validate_args: true,
        }
    }
}

/// Per-process orchestration state: resolved mode, backend, rank info,
/// designated compiling rank, and artifact cache layout.
#[derive(Debug, Clone)]
pub struct OrchestrationConfig {
    mode: OrchestrationMode,
    backend: Backend,
    rank: u32,
    rank_count: u32,
    compiling_rank: u32,
    cache_layout: CacheLayout,
}

impl OrchestrationConfig {
    /// Builds the orchestration config for this process.
    ///
    /// Mode resolution order: explicit `mode`, then the
    /// `SQUALL_ORCHESTRATE` environment default, then `Direct`. Any mode
    /// other than `Direct` on a backend that is not orchestration-capable
    /// is a fatal configuration error.
    ///
    /// With a communicator, the designated compiling rank is read from
    /// the decomposition descriptor, the cache layout is redirected
    /// accordingly, and rank 0 of a multi-rank compiling run persists the
    /// descriptor. Without one, this process is a single-rank run that
    /// compiles for itself.
    pub fn new(
        communicator: Option<&dyn Communicator>,
        backend: Backend,
        mode: Option<OrchestrationMode>,
        cache_root: &Path,
    ) -> Result<Self, OrchestrateError> {
        let mode = mode.unwrap_or_else(OrchestrationMode::from_env);

        if mode != OrchestrationMode::Direct && !backend.is_orchestration_capable() {
            return Err(OrchestrateError::NotOrchestratable {
                backend: backend.as_str().to_string(),
            });
        }

        let (rank, rank_count, compiling_rank) = match communicator {
            Some(comm) => {
                let rank = comm.rank();
                let target = read_target_rank(rank, comm.partition(), cache_root);
                (rank, comm.size(), target)
            }
            None => (0, 1, 0),
        };

        let cache_layout = resolve_cache_layout(rank, compiling_rank, cache_root);

        if let Some(comm) = communicator {
            if mode.requires_build() && rank == 0 && rank_count > 1 {
                write_decomposition(comm.partition(), cache_root)?;
            }
        }

        Ok(Self {
            mode,
            backend,
            rank,
            rank_count,
            compiling_rank,
            cache_layout,
        })
    }

    pub fn mode(&self) -> OrchestrationMode {
        self.mode
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Whether execution goes through a persisted compiled artifact.
    pub fn is_orchestrated(&self) -> bool {
        self.mode != OrchestrationMode::Direct
    }

    pub fn is_gpu_backend(&self) -> bool {
        self.backend.is_gpu()
    }

    pub fn rank(&self) -> u32 {
        self.rank
    }

    pub fn rank_count(&self) -> u32 {
        self.rank_count
    }

    /// The rank whose artifact cache this process uses.
    pub fn compiling_rank(&self) -> u32 {
        self.compiling_rank
    }

    pub fn cache_layout(&self) -> &CacheLayout {
        &self.cache_layout
    }
}
