//! Graph error types.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Errors that can occur while loading or persisting a computation graph.
#[derive(Error, Diagnostic, Debug)]
pub enum GraphError {
    #[error("Failed to read graph file '{path}': {message}")]
    #[diagnostic(code(squall::graph::io_error))]
    IoError {
        path: PathBuf,
        message: String,
    },

    #[error("Failed to parse graph file '{}': {message}", path.display())]
    #[diagnostic(
        code(squall::graph::parse_failed),
        help("Graph files are written by ComputationGraph::save; re-persist the graph with a matching compiler version")
    )]
    ParseFailed {
        path: PathBuf,
        message: String,
    },
}

impl GraphError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::IoError {
            path: path.into(),
            message: message.into(),
        }
    }
}
