//! Table builder: linearizes a method's dispatch tensor using per-dimension strides, resolves
//! the best override (or the undefined/ambiguous trampoline) for every coordinate, and fills in
//! each participating concrete class's compact index array.

use crate::class::ClassGraph;
use crate::groups::build_groups;
use crate::method::{MethodCore, TableEntry};
use crate::specificity::best;
use itertools::Itertools;
use std::hash::Hash;

pub fn build_table<D: Copy + Eq + Hash>(graph: &mut ClassGraph<D>, method: &mut MethodCore<D>) {
    let dims = build_groups(graph, method);
    let k = method.arity();

    let mut strides = vec![0u32; k];
    if k > 0 {
        strides[0] = 1;
        for i in 1..k {
            strides[i] = strides[i - 1] * dims[i - 1].num_groups;
        }
    }
    let total: usize = dims.iter().map(|d| d.num_groups as usize).product();

    let mut dispatch_table = vec![TableEntry::Undefined; total.max(1)];
    if total > 0 {
        let ranges: Vec<Vec<u32>> = dims.iter().map(|d| (0..d.num_groups).collect()).collect();
        for combo in ranges.iter().map(|r| r.iter().copied()).multi_cartesian_product() {
            let mut applicable = dims[0].group_masks[combo[0] as usize].clone();
            for (i, &g) in combo.iter().enumerate().skip(1) {
                let mask = &dims[i].group_masks[g as usize];
                applicable = applicable.intersection(mask).copied().collect();
            }
            let candidates: Vec<usize> = applicable.into_iter().collect();
            let chosen = best(graph, &candidates, &method.overrides);
            let offset: usize = combo
                .iter()
                .zip(strides.iter())
                .map(|(&g, &s)| g as usize * s as usize)
                .sum();
            dispatch_table[offset] = match chosen.as_slice() {
                [] => TableEntry::Undefined,
                [only] => TableEntry::Override(*only),
                _ => TableEntry::Ambiguous,
            };
        }
    }

    // Fill each concrete class's compact index array for this method's slots.
    for (i, dimension) in dims.iter().enumerate() {
        let slot = method.slots[i];
        for (&node, &group) in dimension.group_of.iter() {
            let class = &mut graph.graph[node].value;
            let local = (slot - class.first_used_slot.expect("class has a reserved slot")) as usize;
            class.index[local] = group;
        }
    }

    method.strides = strides;
    method.dispatch_table = dispatch_table;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{build_class_graph, compute_conforming_sets};
    use crate::fixture::FixtureIntrospector;
    use crate::method::{MethodId, OverrideCore};
    use crate::slots::allocate_slots;
    use std::any::Any;
    use std::sync::Arc;

    fn noop() -> crate::method::Thunk<crate::fixture::ClassKey> {
        Arc::new(
            |_: &[&dyn Any], _: &crate::method::NextCall<'_, crate::fixture::ClassKey>| -> Box<dyn Any> {
                Box::new(())
            },
        )
    }

    #[test]
    fn undefined_and_ambiguous_cells_land_in_the_right_place() {
        let mut fx = FixtureIntrospector::new();
        let matrix = fx.class("Matrix", false, &[]);
        let dense = fx.class("Dense", true, &[matrix]);
        let diag = fx.class("Diagonal", true, &[matrix]);

        let (mut graph, layers) = build_class_graph(&fx, &[matrix]);
        compute_conforming_sets(&mut graph, &layers);

        let matrix_node = graph.node_of(matrix).unwrap();
        graph.graph[matrix_node]
            .value
            .method_params
            .push((MethodId(0), 0));
        graph.graph[matrix_node]
            .value
            .method_params
            .push((MethodId(0), 1));

        let mut method = MethodCore {
            name: "plus".to_string(),
            virtual_params: vec![matrix, matrix],
            overrides: vec![
                OverrideCore {
                    params: vec![diag, dense],
                    func: noop(),
                    next: None,
                },
                OverrideCore {
                    params: vec![dense, diag],
                    func: noop(),
                    next: None,
                },
            ],
            slots: vec![0, 0],
            strides: vec![],
            dispatch_table: vec![],
        };

        allocate_slots(&mut graph, &layers, std::slice::from_mut(&mut method));

        for class in [dense, diag] {
            let node = graph.node_of(class).unwrap();
            let len = graph.graph[node].value.index_len();
            graph.graph[node].value.index = vec![u32::MAX; len as usize];
        }

        build_table(&mut graph, &mut method);

        // plus(Dense, Dense): no override applies -> undefined.
        let dense_node = graph.node_of(dense).unwrap();
        let diag_node = graph.node_of(diag).unwrap();
        let dense_first = graph.graph[dense_node].value.first_used_slot.unwrap();
        let diag_first = graph.graph[diag_node].value.first_used_slot.unwrap();

        let dense_group0 = graph.graph[dense_node].value.index
            [(method.slots[0] - dense_first) as usize];
        let dense_group1 = graph.graph[dense_node].value.index
            [(method.slots[1] - dense_first) as usize];
        let offset_dense_dense =
            dense_group0 as usize * method.strides[0] as usize
                + dense_group1 as usize * method.strides[1] as usize;
        assert!(matches!(
            method.dispatch_table[offset_dense_dense],
            TableEntry::Undefined
        ));

        // plus(Diag, Diag): both (Diag,Dense)-via-widening and (Dense,Diag) apply... actually
        // both overrides require one Diag and one Dense parameter, neither of which is more
        // specific than the other on a (Diag, Diag) call where both parameters coincide with the
        // Diag type on one side and widen on the other: both apply identically -> ambiguous.
        let diag_group0 =
            graph.graph[diag_node].value.index[(method.slots[0] - diag_first) as usize];
        let diag_group1 =
            graph.graph[diag_node].value.index[(method.slots[1] - diag_first) as usize];
        let offset_diag_diag = diag_group0 as usize * method.strides[0] as usize
            + diag_group1 as usize * method.strides[1] as usize;
        assert!(matches!(
            method.dispatch_table[offset_diag_diag],
            TableEntry::Ambiguous
        ));
    }
}
