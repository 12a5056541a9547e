//! Orchestration error types.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Errors that can occur while configuring a distributed build.
#[derive(Error, Diagnostic, Debug)]
pub enum OrchestrateError {
    #[error("Orchestration can only be leveraged on a graph-compiler backend, not on '{backend}'")]
    #[diagnostic(
        code(squall::orchestrate::not_orchestratable),
        help("Pick a graph backend (e.g. 'graph:cpu' or 'graph:gpu') or run with mode Direct")
    )]
    NotOrchestratable {
        backend: String,
    },

    #[error("Failed to access '{path}': {message}")]
    #[diagnostic(code(squall::orchestrate::cache_io))]
    CacheIo {
        path: PathBuf,
        message: String,
    },

    #[error("Failed to serialize decomposition descriptor '{}': {message}", path.display())]
    #[diagnostic(code(squall::orchestrate::descriptor_serialize))]
    DescriptorSerialize {
        path: PathBuf,
        message: String,
    },
}

impl OrchestrateError {
    /// Creates a cache IO error.
    pub fn cache_io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::CacheIo {
            path: path.into(),
            message: message.into(),
        }
    }
}
