//! Class graph construction: seeding from registered virtual parameter types, scooping their
//! transitive descendants via introspection, wiring edges between participating classes only,
//! and topologically layering the result for deterministic, bases-before-derived processing.
//!
//! There's no montera module that does exactly this (its `construct_inheritance_tree` builds a
//! tree rooted at a single `java/lang/Object`, not a DAG seeded from arbitrary scattered
//! classes), so the Kahn-style layering here is new code, grounded on general topological-sort
//! technique and the `NodeSet`/`NodeMap`/itertools idioms the rest of the crate already uses.

use crate::class::{ClassGraph, ClassIntrospector};
use crate::graph::{NodeId, NodeMap};
use itertools::Itertools;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

/// Builds the participating class graph and returns it alongside a bases-before-derived
/// layering of its nodes.
///
/// `seeds` are the classes declared as virtual parameter types by at least one registered
/// method; scooping then pulls in every transitive descendant of a seed, per the host's
/// `direct_bases` relation.
pub fn build_class_graph<D: Copy + Eq + Hash + Ord + Debug>(
    introspector: &dyn ClassIntrospector<D>,
    seeds: &[D],
) -> (ClassGraph<D>, Vec<NodeId>) {
    let seeded: HashSet<D> = seeds.iter().copied().collect();
    let all_classes = introspector.classes();

    // scoop: a class participates iff it is seeded or has a participating ancestor.
    let mut memo: HashMap<D, bool> = HashMap::new();
    for &class in &all_classes {
        scoop(class, introspector, &seeded, &mut memo);
    }

    let mut graph = ClassGraph::new();
    for &class in &all_classes {
        if memo.get(&class).copied().unwrap_or(false) {
            graph.get_or_insert(
                class,
                || introspector.name(class),
                || introspector.is_concrete(class),
            );
        }
    }

    // initBases: wire edges only between nodes that made it into the participating set.
    for &class in &all_classes {
        if !graph.contains(class) {
            continue;
        }
        for base in introspector.direct_bases(class) {
            if graph.contains(base) {
                let base_id = graph.node_of(base).unwrap();
                let derived_id = graph.node_of(class).unwrap();
                graph.graph.add_edge(base_id, derived_id);
            }
        }
    }

    let layers = layer(&graph, introspector);
    (graph, layers)
}

/// Returns `true` if `class` is seeded or transitively derived from a seeded class.
fn scoop<D: Copy + Eq + Hash>(
    class: D,
    introspector: &dyn ClassIntrospector<D>,
    seeded: &HashSet<D>,
    memo: &mut HashMap<D, bool>,
) -> bool {
    if let Some(&result) = memo.get(&class) {
        return result;
    }
    if seeded.contains(&class) {
        memo.insert(class, true);
        return true;
    }
    // Insert a provisional `false` before recursing to guard against cyclic base relations; the
    // host's type system precludes real cycles, but a defensive precondition costs nothing here.
    memo.insert(class, false);
    let participates = introspector
        .direct_bases(class)
        .into_iter()
        .any(|base| scoop(base, introspector, seeded, memo));
    memo.insert(class, participates);
    participates
}

/// Kahn-style topological layering: each layer holds every node whose direct bases have all
/// already been emitted in earlier layers. Within a layer, nodes are sorted by name, then by the
/// introspector's opaque class-id `Ord` to keep iteration order deterministic even across name
/// collisions.
fn layer<D: Copy + Eq + Hash + Ord + Debug>(
    graph: &ClassGraph<D>,
    introspector: &dyn ClassIntrospector<D>,
) -> Vec<NodeId> {
    let mut remaining_bases: NodeMap<usize> = NodeMap::with_capacity_for(&graph.graph);
    for node in graph.graph.iter() {
        remaining_bases.insert(node.id, node.in_degree());
    }

    let mut order = Vec::with_capacity(graph.graph.len());
    let mut frontier: Vec<NodeId> = graph
        .graph
        .iter()
        .filter(|node| node.in_degree() == 0)
        .map(|node| node.id)
        .collect();

    while !frontier.is_empty() {
        frontier.sort_by_key(|&id| {
            let descriptor = graph.graph[id].value.descriptor;
            (introspector.name(descriptor), descriptor)
        });
        let mut next_frontier = Vec::new();
        for id in frontier.drain(..) {
            order.push(id);
            for &succ in &graph.graph[id].successors {
                let remaining = remaining_bases.get(succ).copied().unwrap_or(0);
                let remaining = remaining.saturating_sub(1);
                remaining_bases.insert(succ, remaining);
                if remaining == 0 {
                    next_frontier.push(succ);
                }
            }
        }
        frontier = next_frontier;
    }

    debug_assert_eq!(
        order.len(),
        graph.graph.len(),
        "class graph layering did not visit every node; host's direct_bases must be acyclic"
    );
    order
}
