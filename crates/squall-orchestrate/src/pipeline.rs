//! Post-build diagnostics over a compiled graph.
//!
//! The build driver calls this once per graph, after simplification and
//! before codegen, on whichever rank actually compiles. Both passes are
//! observational and leave run outcome untouched.

use squall_graph::{memory, nancheck, ComputationGraph};

use crate::config::OrchestrationConfig;
use crate::progress::BuildProgress;

/// What the diagnostics pass produced.
#[derive(Debug)]
pub struct DiagnosticsSummary {
    /// Rendered per-storage-class memory report.
    pub memory_report: String,
    /// Number of NaN checks inserted into the graph.
    pub nan_checks: usize,
}

/// Runs the memory report and the NaN-check insertion, each inside a
/// timed progress scope.
pub fn post_build_diagnostics(
    config: &OrchestrationConfig,
    graph: &mut ComputationGraph,
    detail_report: bool,
) -> DiagnosticsSummary {
    let memory_report = {
        let _progress = BuildProgress::new(config, "Counting memory allocations");
        memory::count_memory(graph, detail_report)
    };

    let nan_checks = {
        let _progress = BuildProgress::new(config, "Inserting NaN checks");
        nancheck::insert_validity_checks(graph)
    };

    DiagnosticsSummary {
        memory_report,
        nan_checks,
    }
}
