//! NaN-check instrumentation pass.
//!
//! Splices an elementwise validity check behind every eligible output of a
//! top-level parallel region. Runs after graph simplification. Checks are
//! observational: a NaN hit prints the array name and index tuple and the
//! value passes through unchanged, the run is never aborted.

use crate::graph::{
    ComputationGraph, EdgeId, Memlet, NodeId, NodeKind, Schedule, SubsetRange,
};
use crate::graph::IndexExpr;

/// Arrays whose name contains this tag hold the engine's own dissipation
/// estimate diagnostic; instrumenting them would check the checker's
/// output.
pub const DIAGNOSTIC_ARRAY_TAG: &str = "diss_est";

/// Inserts a NaN check after every top-level parallel region output.
///
/// An outgoing edge from a region exit to an access node is skipped when
/// the destination is a view, names the diagnostic array, or carries a
/// dynamic (region-bounded) write. For every remaining edge the
/// destination access node is duplicated, its outgoing edges move to the
/// duplicate, and an elementwise check region is spliced in between with
/// the edge subset as its iteration domain. Prints and returns the number
/// of checks added.
pub fn insert_validity_checks(graph: &mut ComputationGraph) -> usize {
    let checks = collect_checks(graph);
    for (node, edge) in &checks {
        splice_check(graph, *node, *edge);
    }
    println!("Added {} NaN checks", checks.len());
    checks.len()
}

/// Finds every (destination access node, exit edge) pair eligible for a
/// check.
fn collect_checks(graph: &ComputationGraph) -> Vec<(NodeId, EdgeId)> {
    let mut checks = Vec::new();

    let entries: Vec<NodeId> = graph
        .node_ids()
        .filter(|&id| matches!(graph.node(id).kind, NodeKind::RegionEntry { .. }))
        .filter(|&id| graph.enclosing_region(id).is_none())
        .collect();

    for entry in entries {
        let Some(exit) = graph.exit_of(entry) else {
            continue;
        };
        for edge_id in graph.out_edges(exit) {
            let edge = graph.edge(edge_id);
            let NodeKind::Access { array } = &graph.node(edge.dst).kind else {
                continue;
            };
            let Some(decl) = graph.resolve_array(graph.node(edge.dst).scope, array) else {
                continue;
            };
            if decl.view {
                // Views alias another array; skip for now
                continue;
            }
            if array.contains(DIAGNOSTIC_ARRAY_TAG) {
                continue;
            }
            if edge.memlet.dynamic {
                // Data-dependent writes: subset is an upper bound only
                continue;
            }
            checks.push((edge.dst, edge_id));
        }
    }

    checks
}

/// Splices one check region between `node` and a duplicate of it.
fn splice_check(graph: &mut ComputationGraph, node: NodeId, edge: EdgeId) {
    let scope = graph.node(node).scope;
    let NodeKind::Access { array } = graph.node(node).kind.clone() else {
        return;
    };
    let storage = graph
        .resolve_array(scope, &array)
        .map(|decl| decl.storage)
        .unwrap_or(crate::graph::StorageClass::Default);

    // Subset may carry floor-division expressions from views and
    // actively-read domains; resolve them before building ranges.
    let ranges: Vec<SubsetRange> = graph
        .edge(edge)
        .memlet
        .subset
        .iter()
        .map(SubsetRange::simplify)
        .collect();
    let dims = ranges.len();
    let params: Vec<String> = (0..dims).map(|i| format!("__i{}", i)).collect();

    // Duplicate of the destination node; all original outgoing edges move
    // to it so downstream consumers read the checked array.
    let duplicate = graph.add_access(scope, array.clone());
    let outgoing: Vec<EdgeId> = graph.out_edges(node).collect();
    for out_edge in outgoing {
        graph.redirect_source(out_edge, duplicate);
    }

    // Check region schedule follows the array's storage class.
    let schedule = if storage.is_gpu() {
        Schedule::GpuDevice
    } else {
        Schedule::Default
    };

    let index_expr = params.join(", ");
    let index_printf = vec!["%d"; dims].join(", ");
    let code = format!(
        "if (__inp != __inp) {{\n    \
         printf(\"NaN value found at {}, line %d, index {}\\n\", __LINE__, {});\n\
         }}\n\
         __out = __inp;",
        array, index_printf, index_expr,
    );

    let (entry, exit, body) = graph.add_region(
        scope,
        format!("nancheck_{}", array),
        schedule,
        params.clone(),
        ranges.clone(),
    );
    let tasklet = graph.add_node(
        body,
        NodeKind::Tasklet {
            label: "nancheck".to_string(),
            code,
        },
    );

    let element_subset: Vec<SubsetRange> = params
        .iter()
        .map(|p| SubsetRange {
            begin: IndexExpr::sym(p.clone()),
            end: IndexExpr::sym(p.clone()),
            step: IndexExpr::Const(1),
        })
        .collect();

    graph.add_edge(node, entry, Memlet::new(array.clone(), ranges.clone()));
    graph.add_edge(entry, tasklet, Memlet::new(array.clone(), element_subset.clone()));
    graph.add_edge(tasklet, exit, Memlet::new(array.clone(), element_subset));
    graph.add_edge(exit, duplicate, Memlet::new(array, ranges));
}
