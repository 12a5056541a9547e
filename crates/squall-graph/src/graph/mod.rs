//! Hierarchical dataflow-graph representation.
//!
//! A [`ComputationGraph`] is an arena of scopes, nodes, and edges keyed by
//! stable integer ids. Scope 0 is the graph root; nested sub-graph scopes
//! hang off it through parent links, and parallel regions own a body scope
//! through their entry node. Arrays are declared per scope, nodes reference
//! arrays by name, and edges carry a data-movement descriptor
//! ([`Memlet`]) with a subset range and a dynamic-write flag.
//!
//! Rewriting passes work through explicit arena operations
//! ([`ComputationGraph::redirect_source`], node/edge insertion) rather
//! than node aliasing, so "insert between" is remove-and-reconnect on ids.

mod expr;

pub use expr::{IndexExpr, SubsetRange};

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;

/// Identifies a scope in the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeId(pub usize);

/// Identifies a node in the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// Identifies an edge in the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub usize);

/// The memory space an array is allocated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageClass {
    Default,
    CpuHeap,
    CpuPinned,
    GpuGlobal,
    GpuShared,
    Register,
}

impl StorageClass {
    /// All storage classes, in report order.
    pub const ALL: [StorageClass; 6] = [
        StorageClass::Default,
        StorageClass::CpuHeap,
        StorageClass::CpuPinned,
        StorageClass::GpuGlobal,
        StorageClass::GpuShared,
        StorageClass::Register,
    ];

    /// True for device-resident storage.
    pub fn is_gpu(&self) -> bool {
        matches!(self, StorageClass::GpuGlobal | StorageClass::GpuShared)
    }
}

/// Execution schedule of a parallel region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Schedule {
    Default,
    Sequential,
    CpuParallel,
    GpuDevice,
}

/// An array declaration owned by a scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayDecl {
    pub name: String,
    pub element_count: u64,
    pub element_size: u64,
    pub storage: StorageClass,
    /// Temporary buffer internal to the graph, not an external input/output.
    pub transient: bool,
    /// Aliasing view over another array, owns no storage of its own.
    pub view: bool,
}

impl ArrayDecl {
    pub fn new(name: impl Into<String>, element_count: u64, element_size: u64) -> Self {
        Self {
            name: name.into(),
            element_count,
            element_size,
            storage: StorageClass::Default,
            transient: false,
            view: false,
        }
    }

    pub fn storage(mut self, storage: StorageClass) -> Self {
        self.storage = storage;
        self
    }

    pub fn transient(mut self, transient: bool) -> Self {
        self.transient = transient;
        self
    }

    pub fn view(mut self, view: bool) -> Self {
        self.view = view;
        self
    }

    /// Allocation size in bytes.
    pub fn size_in_bytes(&self) -> u64 {
        self.element_count * self.element_size
    }
}

/// A node in the graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Scope that owns this node.
    pub scope: ScopeId,
    pub kind: NodeKind,
}

/// The kinds of graph nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodeKind {
    /// A read or write reference to a named array.
    Access { array: String },
    /// Entry marker of a parallel region. Owns the region body scope and
    /// the iteration domain.
    RegionEntry {
        label: String,
        body: ScopeId,
        schedule: Schedule,
        params: Vec<String>,
        ranges: Vec<SubsetRange>,
    },
    /// Exit marker of a parallel region, paired with its entry.
    RegionExit { entry: NodeId },
    /// An elementwise code block inside a region body.
    Tasklet { label: String, code: String },
}

/// A data-movement descriptor attached to an edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memlet {
    /// Array the data moves through.
    pub array: String,
    /// Source/destination subset, one range per dimension.
    pub subset: Vec<SubsetRange>,
    /// Data-dependent (region-bounded) write: the subset is an upper
    /// bound, not a guarantee that every element is written.
    pub dynamic: bool,
}

impl Memlet {
    pub fn new(array: impl Into<String>, subset: Vec<SubsetRange>) -> Self {
        Self {
            array: array.into(),
            subset,
            dynamic: false,
        }
    }

    pub fn dynamic(mut self, dynamic: bool) -> Self {
        self.dynamic = dynamic;
        self
    }
}

/// An edge between two nodes of the same scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub src: NodeId,
    pub dst: NodeId,
    pub memlet: Memlet,
}

/// A scope in the hierarchy: the graph root, a nested sub-graph, or a
/// parallel-region body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scope {
    /// Enclosing scope; `None` only for the root.
    pub parent: Option<ScopeId>,
    /// Region entry whose body this scope is, if any.
    pub region: Option<NodeId>,
    arrays: Vec<ArrayDecl>,
    nodes: Vec<NodeId>,
}

/// The hierarchical dataflow graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationGraph {
    pub name: String,
    scopes: Vec<Scope>,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl ComputationGraph {
    /// Creates an empty graph with a root scope.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scopes: vec![Scope {
                parent: None,
                region: None,
                arrays: Vec::new(),
                nodes: Vec::new(),
            }],
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// The root scope id.
    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Adds a nested sub-graph scope under `parent`.
    pub fn add_nested_scope(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            parent: Some(parent),
            region: None,
            arrays: Vec::new(),
            nodes: Vec::new(),
        });
        id
    }

    /// Declares an array in `scope`.
    pub fn add_array(&mut self, scope: ScopeId, decl: ArrayDecl) {
        self.scopes[scope.0].arrays.push(decl);
    }

    /// Adds a node to `scope`.
    pub fn add_node(&mut self, scope: ScopeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { scope, kind });
        self.scopes[scope.0].nodes.push(id);
        id
    }

    /// Adds an access node referencing `array` to `scope`.
    pub fn add_access(&mut self, scope: ScopeId, array: impl Into<String>) -> NodeId {
        self.add_node(scope, NodeKind::Access { array: array.into() })
    }

    /// Adds a parallel region to `scope`: a fresh body scope plus paired
    /// entry/exit markers. Returns `(entry, exit, body)`.
    pub fn add_region(
        &mut self,
        scope: ScopeId,
        label: impl Into<String>,
        schedule: Schedule,
        params: Vec<String>,
        ranges: Vec<SubsetRange>,
    ) -> (NodeId, NodeId, ScopeId) {
        let body = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            parent: Some(scope),
            region: None,
            arrays: Vec::new(),
            nodes: Vec::new(),
        });
        let entry = self.add_node(
            scope,
            NodeKind::RegionEntry {
                label: label.into(),
                body,
                schedule,
                params,
                ranges,
            },
        );
        self.scopes[body.0].region = Some(entry);
        let exit = self.add_node(scope, NodeKind::RegionExit { entry });
        (entry, exit, body)
    }

    /// Adds an edge between two nodes.
    pub fn add_edge(&mut self, src: NodeId, dst: NodeId, memlet: Memlet) -> EdgeId {
        let id = EdgeId(self.edges.len());
        self.edges.push(Edge { src, dst, memlet });
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.0]
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    /// Re-points an edge's source to another node.
    pub fn redirect_source(&mut self, edge: EdgeId, new_src: NodeId) {
        self.edges[edge.0].src = new_src;
    }

    /// All node ids, in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    /// All scope ids, in insertion order (root first).
    pub fn scope_ids(&self) -> impl Iterator<Item = ScopeId> + '_ {
        (0..self.scopes.len()).map(ScopeId)
    }

    /// Outgoing edges of a node.
    pub fn out_edges(&self, node: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter(move |(_, e)| e.src == node)
            .map(|(i, _)| EdgeId(i))
    }

    /// Every array declaration at every scope depth, with its owning scope.
    pub fn arrays_recursive(&self) -> impl Iterator<Item = (ScopeId, &ArrayDecl)> + '_ {
        self.scopes
            .iter()
            .enumerate()
            .flat_map(|(i, s)| s.arrays.iter().map(move |a| (ScopeId(i), a)))
    }

    /// Resolves an array declaration by name, starting at `scope` and
    /// walking outward through enclosing scopes.
    pub fn resolve_array(&self, scope: ScopeId, name: &str) -> Option<&ArrayDecl> {
        let mut current = Some(scope);
        while let Some(s) = current {
            let scope = &self.scopes[s.0];
            if let Some(decl) = scope.arrays.iter().find(|a| a.name == name) {
                return Some(decl);
            }
            current = scope.parent;
        }
        None
    }

    /// The exit marker paired with a region entry.
    pub fn exit_of(&self, entry: NodeId) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| matches!(n.kind, NodeKind::RegionExit { entry: e } if e == entry))
            .map(NodeId)
    }

    /// The entry of the parallel region enclosing `node`, if any.
    ///
    /// Walks the owning-scope chain; a node whose chain never crosses a
    /// region body belongs to a top-level region context.
    pub fn enclosing_region(&self, node: NodeId) -> Option<NodeId> {
        let mut current = Some(self.nodes[node.0].scope);
        while let Some(s) = current {
            let scope = &self.scopes[s.0];
            if let Some(entry) = scope.region {
                return Some(entry);
            }
            current = scope.parent;
        }
        None
    }

    /// Whether any access node references `name` within `scope` itself,
    /// descending into region bodies but not into nested sub-graph scopes.
    pub fn is_referenced(&self, scope: ScopeId, name: &str) -> bool {
        let mut stack = vec![scope];
        while let Some(s) = stack.pop() {
            for &nid in &self.scopes[s.0].nodes {
                match &self.nodes[nid.0].kind {
                    NodeKind::Access { array } if array == name => return true,
                    NodeKind::RegionEntry { body, .. } => stack.push(*body),
                    _ => {}
                }
            }
        }
        false
    }

    /// Loads a persisted graph from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, GraphError> {
        let content = std::fs::read_to_string(path).map_err(|e| GraphError::IoError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| GraphError::ParseFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Persists the graph to a JSON file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), GraphError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| GraphError::IoError {
                path: parent.to_path_buf(),
                message: e.to_string(),
            })?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|e| GraphError::IoError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|e| GraphError::IoError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_array_walks_enclosing_scopes() {
        let mut g = ComputationGraph::new("resolve");
        g.add_array(g.root(), ArrayDecl::new("pt", 16, 8));
        let nested = g.add_nested_scope(g.root());
        g.add_array(nested, ArrayDecl::new("tmp", 4, 8).transient(true));

        assert_eq!(g.resolve_array(nested, "pt").unwrap().name, "pt");
        assert_eq!(g.resolve_array(nested, "tmp").unwrap().name, "tmp");
        assert!(g.resolve_array(g.root(), "tmp").is_none());
    }

    #[test]
    fn referenced_check_is_scope_local() {
        let mut g = ComputationGraph::new("ref");
        let nested = g.add_nested_scope(g.root());
        g.add_access(g.root(), "pt");

        assert!(g.is_referenced(g.root(), "pt"));
        // The check never crosses into other scopes.
        assert!(!g.is_referenced(nested, "pt"));
    }

    #[test]
    fn referenced_check_descends_into_region_bodies() {
        let mut g = ComputationGraph::new("ref_region");
        let (_, _, body) = g.add_region(
            g.root(),
            "advect",
            Schedule::CpuParallel,
            vec!["__i0".to_string()],
            vec![SubsetRange::new(0, 7)],
        );
        g.add_access(body, "delp");

        assert!(g.is_referenced(g.root(), "delp"));
    }

    #[test]
    fn enclosing_region_detects_nesting() {
        let mut g = ComputationGraph::new("nesting");
        let (outer_entry, _, body) = g.add_region(
            g.root(),
            "outer",
            Schedule::CpuParallel,
            vec!["__i0".to_string()],
            vec![SubsetRange::new(0, 7)],
        );
        let (inner_entry, _, _) = g.add_region(
            body,
            "inner",
            Schedule::Sequential,
            vec!["__i1".to_string()],
            vec![SubsetRange::new(0, 3)],
        );

        assert_eq!(g.enclosing_region(outer_entry), None);
        assert_eq!(g.enclosing_region(inner_entry), Some(outer_entry));
    }

    #[test]
    fn file_roundtrip() {
        let mut g = ComputationGraph::new("roundtrip");
        g.add_array(
            g.root(),
            ArrayDecl::new("u_wind", 1024, 8).storage(StorageClass::CpuHeap),
        );
        let a = g.add_access(g.root(), "u_wind");
        let b = g.add_access(g.root(), "u_wind");
        g.add_edge(a, b, Memlet::new("u_wind", vec![SubsetRange::new(0, 1023)]));

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("graphs").join("roundtrip.json");
        g.save(&path).unwrap();

        let loaded = ComputationGraph::from_file(&path).unwrap();
        assert_eq!(loaded.name, "roundtrip");
        assert_eq!(loaded.arrays_recursive().count(), 1);
        assert_eq!(loaded.node_ids().count(), 2);
    }

    #[test]
    fn from_file_missing_is_io_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = ComputationGraph::from_file(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, GraphError::IoError { .. }));
    }
}
