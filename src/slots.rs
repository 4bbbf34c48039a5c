//! Slot allocation: assigning one integer index per (method, virtual-parameter) to each
//! participating class, such that unrelated classes can share slot numbers while any class
//! reachable from a slot's declaring class — through bases *or* deriveds — is barred from
//! reusing it for a different (method, parameter) pair (invariant I5). Every concrete class
//! conforming to the declaring class also claims the slot as a `first_used_slot` candidate, since
//! the table builder will later need to store a group index there for each of them, not just for
//! the class that declared the virtual parameter.

use crate::class::ClassGraph;
use crate::graph::{NodeId, NodeSet};
use crate::method::MethodCore;
use std::hash::Hash;

pub fn allocate_slots<D: Copy + Eq + Hash>(
    graph: &mut ClassGraph<D>,
    layers: &[NodeId],
    methods: &mut [MethodCore<D>],
) {
    for &id in layers {
        let method_params = graph.graph[id].value.method_params.clone();
        for (method_id, position) in method_params {
            let slot = {
                let class = &mut graph.graph[id].value;
                let slot = class.next_slot;
                class.next_slot += 1;
                class.first_used_slot.get_or_insert(slot);
                slot
            };
            methods[method_id.0 as usize].slots[position] = slot;
            reserve_through_component(graph, id, slot);

            // Every concrete class conforming to the declaring class will later need a group
            // index written into its index array at this slot (see the table builder), even
            // though only the declaring class itself got its `next_slot` bumped above. Claim the
            // slot as their first-used one too, if they haven't already claimed an earlier slot.
            let conforming: Vec<NodeId> = graph.graph[id].value.conforming.iter().collect();
            for member in conforming {
                let node = &mut graph.graph[member].value;
                if node.is_concrete {
                    node.first_used_slot.get_or_insert(slot);
                }
            }
        }
    }
}

/// Bumps `next_slot` past `slot` on every class that could share a runtime instance with `start`:
/// `start`'s own conforming set (its concrete-or-not descendants, already computed), plus the
/// ancestors reachable from any member of that set. Ascent never re-descends into an ancestor's
/// other branches, so two classes that merely share a common, non-conforming ancestor (disjoint
/// sibling subtrees) are untouched by each other's reservations and may freely reuse `slot`; only
/// classes that are actually comparable to `start` — its ancestors, its descendants, or (through a
/// shared concrete descendant) its diamond-kin — are barred from reusing it for a different
/// (method, parameter) pair.
fn reserve_through_component<D>(graph: &mut ClassGraph<D>, start: NodeId, slot: u32) {
    let mut visited = NodeSet::with_capacity_for(&graph.graph);
    visited.insert(start);

    let mut frontier = vec![start];

    let downward: Vec<NodeId> = graph.graph[start].value.conforming.iter().collect();
    for id in downward {
        if visited.insert(id) {
            bump_next_slot(graph, id, slot);
            frontier.push(id);
        }
    }

    // Ascend only, from the downward closure (and `start` itself): never re-read `successors`,
    // so an ancestor's other, non-conforming branches are never visited.
    while let Some(id) = frontier.pop() {
        let predecessors: Vec<NodeId> = graph.graph[id].predecessors.iter().copied().collect();
        for pred in predecessors {
            if visited.insert(pred) {
                bump_next_slot(graph, pred, slot);
                frontier.push(pred);
            }
        }
    }
}

fn bump_next_slot<D>(graph: &mut ClassGraph<D>, id: NodeId, slot: u32) {
    let node = &mut graph.graph[id].value;
    if node.next_slot <= slot {
        node.next_slot = slot + 1;
    }
}
