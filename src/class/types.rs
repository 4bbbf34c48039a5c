use crate::graph::{Graph, NodeId, NodeSet};
use crate::method::MethodId;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// Node value for the participating class hierarchy graph.
///
/// Slot-allocation bookkeeping (`next_slot`/`first_used_slot`) and the conforming set live
/// directly on the node, mirroring how montera's `VirtualClass` carries its own method list
/// rather than a side table, since both are populated once during `update` and read-only after.
pub struct ClassNode<D> {
    pub descriptor: D,
    pub name: String,
    pub is_concrete: bool,
    /// Self-or-derived classes, filled in by the conformance closure pass. Reflexive: always
    /// contains this node's own id.
    pub conforming: NodeSet,
    /// One past the highest slot reserved on this class.
    pub next_slot: u32,
    /// Lowest slot actually consumed, or `None` if this class participates in no method.
    pub first_used_slot: Option<u32>,
    /// (method, virtual-parameter-position) pairs for which this class is the declared type.
    pub method_params: Vec<(MethodId, usize)>,
    /// This class's compact index array: one group index per slot in
    /// `[first_used_slot, next_slot)`, filled in by the table builder at the end of `update`.
    /// Plays the role of a per-class region of the global index vector (GIV); kept as its own
    /// `Vec` per class rather than one shared arena, since Rust's allocator already gives each
    /// `Vec` contiguous storage and per-class regions need no manual offset bookkeeping to get
    /// the same cache-friendly locality the single-arena design exists for.
    pub index: Vec<u32>,
}

impl<D> ClassNode<D> {
    pub fn new(descriptor: D, name: String, is_concrete: bool) -> Self {
        Self {
            descriptor,
            name,
            is_concrete,
            conforming: NodeSet::new(),
            next_slot: 0,
            first_used_slot: None,
            method_params: vec![],
            index: vec![],
        }
    }

    /// Length of this class's compact index array, or 0 if it participates in no method.
    pub fn index_len(&self) -> u32 {
        match self.first_used_slot {
            Some(first) => self.next_slot - first,
            None => 0,
        }
    }
}

impl<D> fmt::Debug for ClassNode<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.is_concrete {
            write!(f, " (abstract)")?;
        }
        for (method, position) in &self.method_params {
            write!(f, "\\l{}@{}", method, position)?;
        }
        Ok(())
    }
}

/// The participating class hierarchy: a DAG of [`ClassNode`]s reachable from registered methods'
/// virtual parameter types, plus a lookup from the host's opaque descriptor to its [`NodeId`].
pub struct ClassGraph<D> {
    pub graph: Graph<ClassNode<D>>,
    by_descriptor: HashMap<D, NodeId>,
}

impl<D: Copy + Eq + Hash> Default for ClassGraph<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Copy + Eq + Hash> ClassGraph<D> {
    pub fn new() -> Self {
        Self {
            graph: Graph::new(),
            by_descriptor: HashMap::new(),
        }
    }

    pub fn node_of(&self, descriptor: D) -> Option<NodeId> {
        self.by_descriptor.get(&descriptor).copied()
    }

    pub fn contains(&self, descriptor: D) -> bool {
        self.by_descriptor.contains_key(&descriptor)
    }

    /// Inserts a class if not already present, returning its node id either way.
    pub fn get_or_insert(
        &mut self,
        descriptor: D,
        name: impl FnOnce() -> String,
        is_concrete: impl FnOnce() -> bool,
    ) -> NodeId {
        if let Some(&id) = self.by_descriptor.get(&descriptor) {
            return id;
        }
        let node = ClassNode::new(descriptor, name(), is_concrete());
        let id = self.graph.add_node(node);
        self.by_descriptor.insert(descriptor, id);
        id
    }

    pub fn class(&self, descriptor: D) -> &ClassNode<D> {
        &self.graph[self.node_of(descriptor).expect("class not in graph")].value
    }

    pub fn class_mut(&mut self, descriptor: D) -> &mut ClassNode<D> {
        let id = self.node_of(descriptor).expect("class not in graph");
        &mut self.graph[id].value
    }
}
