//! # Squall Build Orchestration
//!
//! Distributed build orchestration for the squall graph compiler. A run
//! spans many cooperating processes, one per spatial partition, and every
//! rank sharing a decomposition shares one decomposition-specific code
//! path. Compiling it natively is expensive, so exactly one rank per
//! decomposition compiles and the rest reuse its artifact.
//!
//! ## Per-process startup sequence
//!
//! ```text
//! ┌─────────────────────┐
//! │ OrchestrationConfig │  Resolve mode + backend, validate the pair
//! └──────────┬──────────┘
//!            │ rank, topology
//!            ▼
//! ┌─────────────────────┐
//! │ distributed::       │  Designated compiling rank from the
//! │  read_target_rank   │  decomposition descriptor (rank 0 writes it)
//! └──────────┬──────────┘
//!            │ target rank
//!            ▼
//! ┌─────────────────────┐
//! │ distributed::       │  Own cache read-write, or the compiling
//! │  resolve_cache_layout│ rank's cache read-only
//! └─────────────────────┘
//! ```
//!
//! An external startup barrier orders rank 0's descriptor write before
//! any other rank's read; this crate assumes that contract rather than
//! implementing it. [`progress::BuildProgress`] wraps whichever build
//! phases occur, and [`pipeline::post_build_diagnostics`] runs the
//! squall-graph memory and NaN-check passes once a graph exists.

pub mod config;
pub mod distributed;
pub mod error;
pub mod pipeline;
pub mod progress;

pub use config::{
    Backend, BuildSettings, Communicator, OrchestrationConfig, OrchestrationMode,
};
pub use distributed::{CacheAccess, CacheLayout, PartitionTopology};
pub use error::OrchestrateError;
pub use progress::BuildProgress;
