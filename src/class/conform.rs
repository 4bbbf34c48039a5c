//! Conformance closure: for each class `C`, the set of all classes assignable to `C` (itself and
//! every transitive derived class). Computed leaves-first so each merge only ever reads an
//! already-completed child set.

use crate::class::ClassGraph;
use crate::graph::{NodeId, NodeSet};
use std::hash::Hash;

pub fn compute_conforming_sets<D: Copy + Eq + Hash>(graph: &mut ClassGraph<D>, layers: &[NodeId]) {
    for &id in layers.iter().rev() {
        let mut conforming = NodeSet::with_capacity_for(&graph.graph);
        conforming.insert(id);
        for &succ in &graph.graph[id].successors {
            for member in graph.graph[succ].value.conforming.iter() {
                conforming.insert(member);
            }
        }
        graph.graph[id].value.conforming = conforming;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::build_class_graph;
    use crate::fixture::FixtureIntrospector;

    #[test]
    fn conforming_set_is_reflexive_and_covers_descendants() {
        let mut fx = FixtureIntrospector::new();
        let animal = fx.class("Animal", false, &[]);
        let dog = fx.class("Dog", true, &[animal]);
        let pitbull = fx.class("Pitbull", true, &[dog]);
        let cat = fx.class("Cat", true, &[animal]);

        let (mut graph, layers) = build_class_graph(&fx, &[animal]);
        compute_conforming_sets(&mut graph, &layers);

        let animal_conforming = &graph.class(animal).conforming;
        assert!(animal_conforming.contains(graph.node_of(animal).unwrap()));
        assert!(animal_conforming.contains(graph.node_of(dog).unwrap()));
        assert!(animal_conforming.contains(graph.node_of(pitbull).unwrap()));
        assert!(animal_conforming.contains(graph.node_of(cat).unwrap()));

        let dog_conforming = &graph.class(dog).conforming;
        assert!(dog_conforming.contains(graph.node_of(dog).unwrap()));
        assert!(dog_conforming.contains(graph.node_of(pitbull).unwrap()));
        assert!(!dog_conforming.contains(graph.node_of(cat).unwrap()));

        let pitbull_conforming = &graph.class(pitbull).conforming;
        assert_eq!(pitbull_conforming.iter().count(), 1);
    }
}
