//! Group builder: for a method's virtual parameter `i` with declared type `V`, partitions the
//! concrete classes conforming to `V` by the (identical) set of overrides applicable to them at
//! position `i`. Classes in the same group always pick the same dispatch-table coordinate on
//! this axis, which is what lets the table stay dense instead of one row per concrete class.

use crate::class::ClassGraph;
use crate::graph::NodeId;
use crate::method::MethodCore;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::Hash;

pub(crate) struct Dimension {
    pub group_of: HashMap<NodeId, u32>,
    /// Applicable-override index set for each group, indexed by group index.
    pub group_masks: Vec<BTreeSet<usize>>,
    pub num_groups: u32,
}

/// Builds one [`Dimension`] per virtual parameter of `method`.
///
/// Bucketing keys are `BTreeSet<usize>` (the set of applicable override indices) rather than raw
/// bitmasks so arity of overrides isn't bounded by a machine word, and so iteration order over
/// buckets — and therefore the assigned group indices — is deterministic without depending on
/// hash iteration order.
pub fn build_groups<D: Copy + Eq + Hash>(
    graph: &ClassGraph<D>,
    method: &MethodCore<D>,
) -> Vec<Dimension> {
    (0..method.arity())
        .map(|i| build_dimension(graph, method, i))
        .collect()
}

fn build_dimension<D: Copy + Eq + Hash>(
    graph: &ClassGraph<D>,
    method: &MethodCore<D>,
    position: usize,
) -> Dimension {
    let declared = method.virtual_params[position];
    let declared_node = graph
        .node_of(declared)
        .expect("declared virtual parameter type not present in class graph");

    let mut buckets: BTreeMap<BTreeSet<usize>, Vec<NodeId>> = BTreeMap::new();
    for member in graph.graph[declared_node].value.conforming.iter() {
        let class = &graph.graph[member].value;
        if !class.is_concrete {
            continue;
        }
        let applicable: BTreeSet<usize> = method
            .overrides
            .iter()
            .enumerate()
            .filter(|(_, ov)| {
                let param_node = graph
                    .node_of(ov.params[position])
                    .expect("override parameter type not present in class graph");
                graph.graph[param_node].value.conforming.contains(member)
            })
            .map(|(j, _)| j)
            .collect();
        buckets.entry(applicable).or_default().push(member);
    }

    let mut group_of = HashMap::new();
    let mut group_masks = Vec::new();
    let mut num_groups = 0u32;
    for (mask, members) in buckets {
        for member in members {
            group_of.insert(member, num_groups);
        }
        group_masks.push(mask);
        num_groups += 1;
    }
    Dimension {
        group_of,
        group_masks,
        num_groups,
    }
}
