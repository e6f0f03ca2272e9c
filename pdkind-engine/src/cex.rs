use pdkind_ir::{CexNode, CexNodeId};
use pdkind_term::{RelocationMap, Term};
use rustc_hash::FxHashMap;

/// The counterexample DAG of spec.md §4.3: nodes are deduplicated by
/// `(generalization, frame)` so re-discovering the same cube at the same
/// frame (common once a few lemmas have been learned) reuses the existing
/// node instead of growing the DAG unboundedly.
#[derive(Default)]
pub struct CexManager {
    nodes: Vec<CexNode>,
    unreachable: Vec<bool>,
    index: FxHashMap<(Term, usize), CexNodeId>,
}

impl CexManager {
    pub fn new() -> Self {
        CexManager::default()
    }

    /// `add(G, k, parent)`: returns the existing node if `(G, k)` was seen
    /// before, otherwise allocates a new one (spec.md §4.3).
    pub fn add(&mut self, cube: Term, frame: usize, parent: Option<CexNodeId>, depth: usize) -> CexNodeId {
        if let Some(&existing) = self.index.get(&(cube, frame)) {
            return existing;
        }
        let id = CexNodeId(self.nodes.len());
        self.nodes.push(CexNode {
            cube,
            frame,
            parent,
            depth,
        });
        self.unreachable.push(false);
        self.index.insert((cube, frame), id);
        id
    }

    pub fn get(&self, id: CexNodeId) -> &CexNode {
        &self.nodes[id.0]
    }

    /// The path from the DAG root to `leaf`, root first (spec.md §4.3
    /// `trace_to`).
    pub fn trace_to(&self, leaf: CexNodeId) -> Vec<CexNodeId> {
        let mut path = vec![leaf];
        let mut current = leaf;
        while let Some(parent) = self.nodes[current.0].parent {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }

    pub fn mark_unreachable(&mut self, id: CexNodeId) {
        self.unreachable[id.0] = true;
    }

    pub fn is_unreachable(&self, id: CexNodeId) -> bool {
        self.unreachable[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every cube currently held by the DAG, for GC root collection
    /// (`pdkind-core` walks this alongside frames/obligations/provenance).
    pub fn cubes(&self) -> impl Iterator<Item = Term> + '_ {
        self.nodes.iter().map(|n| n.cube)
    }

    /// Rewrites every stored cube through a term-manager GC relocation
    /// (spec.md §9 "GC integration": every owner of a `Term` must
    /// relocate, the cex DAG included).
    pub fn relocate(&mut self, map: &RelocationMap) {
        for node in &mut self.nodes {
            node.cube = map.get(node.cube);
        }
        self.index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| ((n.cube, n.frame), CexNodeId(i)))
            .collect();
    }
}
