use std::path::Path;

use squall_orchestrate::{
    Backend, CacheAccess, Communicator, OrchestrationConfig, OrchestrationMode,
    PartitionTopology,
};
use squall_orchestrate::distributed::DecompositionDescriptor;

struct StaticCommunicator {
    rank: u32,
    size: u32,
    topology: PartitionTopology,
}

impl Communicator for StaticCommunicator {
    fn rank(&self) -> u32 {
        self.rank
    }
    fn size(&self) -> u32 {
        self.size
    }
    fn partition(&self) -> &PartitionTopology {
        &self.topology
    }
}

fn rank_config(rank: u32, size: u32, mode: OrchestrationMode, cache_root: &Path) -> OrchestrationConfig {
    let comm = StaticCommunicator {
        rank,
        size,
        topology: PartitionTopology::new(2, 2),
    };
    OrchestrationConfig::new(Some(&comm), Backend::new("graph:cpu"), Some(mode), cache_root)
        .unwrap()
}

#[test]
fn four_rank_build_and_run_converges_on_rank_zero() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path();

    // The external barrier guarantees rank 0 configures first.
    let rank0 = rank_config(0, 4, OrchestrationMode::BuildAndRun, root);
    assert_eq!(rank0.compiling_rank(), 0);
    assert_eq!(rank0.cache_layout().access, CacheAccess::ReadWrite);

    let descriptor_path = DecompositionDescriptor::path_under(root);
    assert!(descriptor_path.exists());

    for rank in 1..4 {
        let config = rank_config(rank, 4, OrchestrationMode::BuildAndRun, root);
        assert_eq!(config.rank(), rank);
        assert_eq!(config.rank_count(), 4);
        assert_eq!(config.compiling_rank(), 0);
        let layout = config.cache_layout();
        assert_eq!(layout.access, CacheAccess::ReadOnly);
        assert_eq!(layout.path, root.join(".artifact_cache_000000"));
    }

    // Exactly one descriptor entry was written for this decomposition.
    let descriptor = DecompositionDescriptor::load(&descriptor_path)
        .unwrap()
        .unwrap();
    assert_eq!(descriptor.compiling_rank("2x2"), Some(0));
}

#[test]
fn rereading_an_unchanged_decomposition_is_stable() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path();

    rank_config(0, 4, OrchestrationMode::BuildOnly, root);

    for _ in 0..3 {
        let config = rank_config(2, 4, OrchestrationMode::BuildOnly, root);
        assert_eq!(config.compiling_rank(), 0);
    }
}

#[test]
fn first_run_without_descriptor_treats_self_as_compiler() {
    let dir = tempfile::TempDir::new().unwrap();

    // RunOnly never writes; with no descriptor each rank provisionally
    // points at its own cache.
    let config = rank_config(3, 4, OrchestrationMode::RunOnly, dir.path());
    assert_eq!(config.compiling_rank(), 3);
    assert_eq!(config.cache_layout().access, CacheAccess::ReadWrite);
    assert!(!DecompositionDescriptor::path_under(dir.path()).exists());
}

#[test]
fn configuration_error_names_the_backend() {
    let dir = tempfile::TempDir::new().unwrap();
    let err = OrchestrationConfig::new(
        None,
        Backend::new("cpu-default"),
        Some(OrchestrationMode::BuildOnly),
        dir.path(),
    )
    .unwrap_err();

    assert!(err.to_string().contains("cpu-default"));
}
