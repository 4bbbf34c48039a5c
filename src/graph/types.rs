use std::mem::take;
use std::{fmt, ops};

#[inline]
pub fn remove_element<T: PartialEq + Copy>(vec: &mut Vec<T>, value: T) {
    let index = vec.iter().position(|&x| x == value).expect("Not found");
    vec.remove(index);
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Node<T> {
    pub id: NodeId,
    pub value: T,
    pub predecessors: Vec<NodeId>, // Incoming (direct bases, for a class graph)
    pub successors: Vec<NodeId>,   // Outgoing (direct deriveds, for a class graph)
}

impl<T> Node<T> {
    #[inline]
    pub fn in_degree(&self) -> usize {
        self.predecessors.len()
    }

    #[inline]
    pub fn out_degree(&self) -> usize {
        self.successors.len()
    }
}

/// Arena-backed directed graph, indexed by [`NodeId`].
///
/// Deletions leave `None` tombstones so [`NodeId`]s remain stable and lookups stay O(1). This is
/// the representation used throughout the crate for the participating class hierarchy: nodes are
/// classes, edges point from a base to its direct deriveds.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Graph<T> {
    nodes: Vec<Option<Node<T>>>,
    pub entry: Option<NodeId>,
}

impl<T> Default for Graph<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ops::Index<NodeId> for Graph<T> {
    type Output = Node<T>;

    fn index(&self, index: NodeId) -> &Self::Output {
        self.nodes[index.0].as_ref().expect("Not found")
    }
}

impl<T> ops::IndexMut<NodeId> for Graph<T> {
    fn index_mut(&mut self, index: NodeId) -> &mut Self::Output {
        self.nodes[index.0].as_mut().expect("Not found")
    }
}

impl<T> IntoIterator for Graph<T> {
    type Item = Node<T>;
    type IntoIter = std::iter::FilterMap<
        std::vec::IntoIter<Option<Node<T>>>,
        fn(Option<Node<T>>) -> Option<Node<T>>,
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_iter().filter_map(|x| x)
    }
}

impl<T> Graph<T> {
    pub fn new() -> Self {
        Self {
            nodes: vec![],
            entry: None,
        }
    }

    pub fn add_node(&mut self, value: T) -> NodeId {
        let id = NodeId(self.nodes.len());
        let node = Node {
            id,
            value,
            predecessors: vec![],
            successors: vec![],
        };
        self.nodes.push(Some(node));

        // Set as entrypoint if this is the first inserted node. For class graphs with several
        // unrelated root hierarchies this is just the first one seeded, used only for diagnostics.
        self.entry.get_or_insert(id);

        id
    }

    pub fn add_edge(&mut self, source: NodeId, target: NodeId) {
        self[source].successors.push(target);
        self[target].predecessors.push(source);
    }

    pub fn remove_node(&mut self, id: NodeId) {
        let node = self.nodes[id.0].take().expect("Not found");
        for pred in node.predecessors {
            if pred != id {
                remove_element(&mut self[pred].successors, id);
            }
        }
        for succ in node.successors {
            if succ != id {
                remove_element(&mut self[succ].predecessors, id);
            }
        }
    }

    pub fn remove_edge(&mut self, source: NodeId, target: NodeId) {
        remove_element(&mut self[source].successors, target);
        remove_element(&mut self[target].predecessors, source);
    }

    pub fn remove_all_successors(&mut self, source: NodeId) {
        for succ in take(&mut self[source].successors) {
            remove_element(&mut self[succ].predecessors, source);
        }
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Node<T>> {
        self.nodes.iter().filter_map(Option::as_ref)
    }

    #[inline]
    pub fn iter_id(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.iter().map(|x| &x.id).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Upper bound on [`NodeId`]s ever issued, including tombstoned ones. Used to pre-size
    /// [`super::NodeSet`]/[`super::NodeMap`] without reallocating as they fill up.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    pub fn map<U, F: Fn(NodeId, &T) -> U>(&self, f: F) -> Graph<U> {
        let nodes = self
            .nodes
            .iter()
            .map(|maybe_node| {
                maybe_node.as_ref().map(|node| Node {
                    id: node.id,
                    value: f(node.id, &node.value),
                    predecessors: node.predecessors.clone(),
                    successors: node.successors.clone(),
                })
            })
            .collect();
        Graph {
            nodes,
            entry: self.entry,
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use itertools::Itertools;

    pub fn fixture_1() -> (
        Graph<usize>,
        (NodeId, NodeId, NodeId, NodeId, NodeId, NodeId),
    ) {
        let mut g = Graph::new();

        let n1 = g.add_node(1);
        let n2 = g.add_node(2);
        let n3 = g.add_node(3);
        let n4 = g.add_node(4);
        let n5 = g.add_node(5);
        let n6 = g.add_node(6);

        g.add_edge(n1, n2);
        g.add_edge(n2, n3);
        g.add_edge(n3, n4);
        g.add_edge(n4, n2);
        g.add_edge(n2, n5);
        g.add_edge(n5, n6);
        g.add_edge(n5, n1);

        (g, (n1, n2, n3, n4, n5, n6))
    }

    pub fn fixture_tree() -> (Graph<&'static str>, (NodeId, NodeId, NodeId, NodeId, NodeId)) {
        // Root -> A, Root -> B, A -> C, A -> D (a small class-graph-shaped DAG)
        let mut g = Graph::new();
        let root = g.add_node("Root");
        let a = g.add_node("A");
        let b = g.add_node("B");
        let c = g.add_node("C");
        let d = g.add_node("D");
        g.add_edge(root, a);
        g.add_edge(root, b);
        g.add_edge(a, c);
        g.add_edge(a, d);
        (g, (root, a, b, c, d))
    }

    #[test]
    fn test_add_nodes_edges() {
        let (g, (n1, n2, n3, n4, n5, _n6)) = fixture_1();
        assert_eq!(g.len(), 6);
        assert_eq!(g[n2].value, 2);
        assert_eq!(g[n2].predecessors, vec![n1, n4]);
        assert_eq!(g[n2].successors, vec![n3, n5]);
        assert_eq!(
            g.iter().map(|x| x.value).collect_vec(),
            vec![1, 2, 3, 4, 5, 6]
        );
    }

    #[test]
    fn test_remove_node() {
        let (mut g, (n1, n2, n3, n4, n5, n6)) = fixture_1();
        g.remove_node(n2);
        assert_eq!(g.len(), 5);
        assert_eq!(g[n1].successors, vec![]);
        assert_eq!(g[n3].predecessors, vec![]);
        assert_eq!(g[n4].successors, vec![]);
        assert_eq!(g[n5].predecessors, vec![]);
        g.remove_node(n6);
        assert_eq!(g.len(), 4);
        assert_eq!(g[n5].successors, vec![n1]);
    }

    #[test]
    fn test_capacity_survives_tombstones() {
        let (mut g, (_, n2, ..)) = fixture_1();
        g.remove_node(n2);
        assert_eq!(g.len(), 5);
        assert_eq!(g.capacity(), 6);
    }

    #[test]
    fn test_tree_fixture_shape() {
        let (g, (root, a, b, c, d)) = fixture_tree();
        assert_eq!(g[root].successors, vec![a, b]);
        assert_eq!(g[a].predecessors, vec![root]);
        assert_eq!(g[a].successors, vec![c, d]);
        assert_eq!(g[b].predecessors, vec![root]);
    }
}
