//! Per-storage-class memory accounting for a computation graph.
//!
//! Build-time diagnostic for catching unexpectedly large dead transient
//! buffers left behind by the compiler pipeline. The "referenced" check is
//! a scope-local approximation: it only inspects the array's own owning
//! scope for access nodes, not cross-scope dataflow, so it may undercount
//! true usage across nested scopes.

use std::path::Path;

use crate::error::GraphError;
use crate::graph::{ComputationGraph, StorageClass};

/// Detail row for a single array.
#[derive(Debug, Clone, Default)]
pub struct ArrayReport {
    pub name: String,
    pub total_size_in_bytes: u64,
    pub referenced: bool,
    pub transient: bool,
    pub top_level: bool,
}

/// Accumulated allocation totals for one storage class.
#[derive(Debug, Clone, Default)]
pub struct StorageReport {
    pub referenced_in_bytes: u64,
    pub unreferenced_in_bytes: u64,
    pub top_level_in_bytes: u64,
    pub details: Vec<ArrayReport>,
}

/// Allocation totals per storage class, in [`StorageClass::ALL`] order.
#[derive(Debug, Clone, Default)]
pub struct AllocationReport {
    reports: [StorageReport; StorageClass::ALL.len()],
}

impl AllocationReport {
    /// The accumulated report for one storage class.
    pub fn storage(&self, storage: StorageClass) -> &StorageReport {
        let idx = StorageClass::ALL.iter().position(|s| *s == storage).unwrap();
        &self.reports[idx]
    }

    fn storage_mut(&mut self, storage: StorageClass) -> &mut StorageReport {
        let idx = StorageClass::ALL.iter().position(|s| *s == storage).unwrap();
        &mut self.reports[idx]
    }
}

/// Walks every array at every scope depth and buckets allocation sizes
/// per storage class.
///
/// Nested transient arrays land in the referenced or unreferenced bucket
/// of their storage class; root-scope arrays always count toward the
/// top-level bucket and additionally toward referenced/unreferenced.
/// Nested non-transient arrays alias memory owned elsewhere and are
/// skipped.
pub fn allocation_report(graph: &ComputationGraph) -> AllocationReport {
    let mut report = AllocationReport::default();

    for (scope, arr) in graph.arrays_recursive() {
        let size_in_bytes = arr.size_in_bytes();
        let referenced = graph.is_referenced(scope, &arr.name);

        if scope != graph.root() && arr.transient {
            let bucket = report.storage_mut(arr.storage);
            bucket.details.push(ArrayReport {
                name: arr.name.clone(),
                total_size_in_bytes: size_in_bytes,
                referenced,
                transient: arr.transient,
                top_level: false,
            });
            if referenced {
                bucket.referenced_in_bytes += size_in_bytes;
            } else {
                bucket.unreferenced_in_bytes += size_in_bytes;
            }
        } else if scope == graph.root() {
            let bucket = report.storage_mut(arr.storage);
            bucket.details.push(ArrayReport {
                name: arr.name.clone(),
                total_size_in_bytes: size_in_bytes,
                referenced,
                transient: arr.transient,
                top_level: true,
            });
            bucket.top_level_in_bytes += size_in_bytes;
            if referenced {
                bucket.referenced_in_bytes += size_in_bytes;
            } else {
                bucket.unreferenced_in_bytes += size_in_bytes;
            }
        }
    }

    report
}

fn in_mb(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

/// Renders the allocation report for `graph`.
///
/// One block per storage class with nonzero referenced or top-level
/// bytes; with `detail_report`, adds a per-array table.
pub fn count_memory(graph: &ComputationGraph, detail_report: bool) -> String {
    let allocations = allocation_report(graph);

    let mut report = format!("{}:\n", graph.name);
    for storage in StorageClass::ALL {
        let allocs = allocations.storage(storage);
        let alloc_in_mb = in_mb(allocs.referenced_in_bytes);
        let unref_alloc_in_mb = in_mb(allocs.unreferenced_in_bytes);
        let toplvl_alloc_in_mb = in_mb(allocs.top_level_in_bytes);
        if alloc_in_mb > 0.0 || toplvl_alloc_in_mb > 0.0 {
            report.push_str(&format!(
                "{:?}:\n  Alloc ref {:.2} mb\n  Alloc unref {:.2} mb\n  Top lvl alloc: {:.2}mb\n",
                storage, alloc_in_mb, unref_alloc_in_mb, toplvl_alloc_in_mb,
            ));
            if detail_report {
                report.push('\n');
                report.push_str("  Referenced\tTransient\tTotal size(mb)\tName\n");
                for detail in &allocs.details {
                    let size_in_mb = in_mb(detail.total_size_in_bytes);
                    let ref_str = if detail.referenced { "     X     " } else { "           " };
                    let transient_str = if detail.transient { "     X     " } else { "           " };
                    report.push_str(&format!(
                        " {}\t{}\t   {:.2}\t   {}\n",
                        ref_str, transient_str, size_in_mb, detail.name,
                    ));
                }
            }
        }
    }

    report
}

/// Loads a persisted graph and renders its allocation report.
pub fn count_memory_from_path(path: &Path, detail_report: bool) -> Result<String, GraphError> {
    let graph = ComputationGraph::from_file(path)?;
    Ok(count_memory(&graph, detail_report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ArrayDecl;

    const MB: u64 = 1024 * 1024;

    #[test]
    fn top_level_array_counts_in_both_buckets() {
        let mut g = ComputationGraph::new("toplevel");
        g.add_array(
            g.root(),
            ArrayDecl::new("u_wind", 3 * MB, 1).storage(StorageClass::CpuHeap),
        );

        let report = allocation_report(&g);
        let cpu = report.storage(StorageClass::CpuHeap);
        assert_eq!(cpu.top_level_in_bytes, 3 * MB);
        assert_eq!(cpu.referenced_in_bytes + cpu.unreferenced_in_bytes, 3 * MB);
    }

    #[test]
    fn nested_transients_split_by_reference() {
        let mut g = ComputationGraph::new("nested");
        let nested = g.add_nested_scope(g.root());
        g.add_array(
            nested,
            ArrayDecl::new("a_tmp", 4 * MB, 1)
                .storage(StorageClass::CpuHeap)
                .transient(true),
        );
        g.add_array(
            nested,
            ArrayDecl::new("b_tmp", 2 * MB, 1)
                .storage(StorageClass::CpuHeap)
                .transient(true),
        );
        g.add_access(nested, "a_tmp");

        let report = allocation_report(&g);
        let cpu = report.storage(StorageClass::CpuHeap);
        assert_eq!(cpu.referenced_in_bytes, 4 * MB);
        assert_eq!(cpu.unreferenced_in_bytes, 2 * MB);
        assert_eq!(cpu.top_level_in_bytes, 0);
    }

    #[test]
    fn nested_non_transients_are_skipped() {
        let mut g = ComputationGraph::new("skip");
        let nested = g.add_nested_scope(g.root());
        g.add_array(
            nested,
            ArrayDecl::new("borrowed", MB, 1).storage(StorageClass::CpuHeap),
        );

        let report = allocation_report(&g);
        let cpu = report.storage(StorageClass::CpuHeap);
        assert_eq!(cpu.referenced_in_bytes, 0);
        assert_eq!(cpu.unreferenced_in_bytes, 0);
        assert_eq!(cpu.top_level_in_bytes, 0);
        assert!(cpu.details.is_empty());
    }

    #[test]
    fn additivity_over_transients() {
        let mut g = ComputationGraph::new("additive");
        let nested = g.add_nested_scope(g.root());
        let sizes = [3 * MB, 5 * MB, 7 * MB];
        for (i, size) in sizes.iter().enumerate() {
            g.add_array(
                nested,
                ArrayDecl::new(format!("tmp_{}", i), *size, 1)
                    .storage(StorageClass::GpuGlobal)
                    .transient(true),
            );
        }
        g.add_access(nested, "tmp_1");

        let report = allocation_report(&g);
        let gpu = report.storage(StorageClass::GpuGlobal);
        assert_eq!(
            gpu.referenced_in_bytes + gpu.unreferenced_in_bytes,
            sizes.iter().sum::<u64>()
        );
    }

    #[test]
    fn report_text_rounds_to_two_decimals() {
        let mut g = ComputationGraph::new("dycore");
        g.add_array(
            g.root(),
            ArrayDecl::new("pkz", 3 * MB / 2, 1).storage(StorageClass::CpuHeap),
        );
        g.add_access(g.root(), "pkz");

        let text = count_memory(&g, false);
        assert!(text.starts_with("dycore:\n"));
        assert!(text.contains("CpuHeap:"));
        assert!(text.contains("Alloc ref 1.50 mb"));
        assert!(text.contains("Top lvl alloc: 1.50mb"));
    }

    #[test]
    fn detail_table_lists_each_array() {
        let mut g = ComputationGraph::new("detail");
        let nested = g.add_nested_scope(g.root());
        g.add_array(
            nested,
            ArrayDecl::new("heat_source_tmp", MB, 1)
                .storage(StorageClass::CpuHeap)
                .transient(true),
        );

        let text = count_memory(&g, true);
        assert!(text.contains("Referenced\tTransient\tTotal size(mb)\tName"));
        assert!(text.contains("heat_source_tmp"));
    }

    #[test]
    fn empty_storage_classes_are_omitted() {
        let g = ComputationGraph::new("empty");
        let text = count_memory(&g, false);
        assert_eq!(text, "empty:\n");
    }
}
