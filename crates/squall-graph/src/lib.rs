//! # Squall Computation Graph
//!
//! This crate holds the hierarchical dataflow-graph representation produced
//! by the stencil compiler, together with the diagnostic passes that run
//! over it: per-storage-class memory accounting and automated NaN-check
//! instrumentation.
//!
//! ## Architecture
//!
//! ```text
//! Stencil compiler (external)
//!        │
//!        ▼
//! ┌──────────────────┐
//! │ ComputationGraph │  Arena of scopes, arrays, nodes, edges
//! │   (graph::*)     │
//! └──────┬───────────┘
//!        │
//!        ├──────────────────────────┐
//!        ▼                          ▼
//! ┌──────────────┐          ┌───────────────┐
//! │    memory    │          │    nancheck   │
//! │ (allocation  │          │ (validity-    │
//! │  report)     │          │  check pass)  │
//! └──────────────┘          └───────────────┘
//! ```
//!
//! Graphs are either handed over in memory by the compiler or loaded from
//! a persisted JSON file ([`graph::ComputationGraph::from_file`]). Both
//! passes are observational: the memory report is a build-time diagnostic
//! for catching unexpectedly large dead transients, and the NaN checks
//! print findings at run time without ever aborting.

pub mod error;
pub mod graph;
pub mod memory;
pub mod nancheck;

pub use error::GraphError;
pub use graph::ComputationGraph;
