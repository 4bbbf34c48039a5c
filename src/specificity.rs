//! Specificity engine: the partial order over parameter tuples that picks a call's best override,
//! flags ambiguity, and precomputes each override's "next most specific" link for `next!`-style
//! chaining.

use crate::class::ClassGraph;
use crate::method::OverrideCore;
use std::hash::Hash;

/// `a` is more specific than `b` iff `a`'s parameter classes are assignable to `b`'s at every
/// position, and strictly so (a proper subtype, not the same class) at at least one position.
pub fn more_specific<D: Copy + Eq + Hash>(graph: &ClassGraph<D>, a: &[D], b: &[D]) -> bool {
    debug_assert_eq!(a.len(), b.len());
    let mut any_strict = false;
    for (&pa, &pb) in a.iter().zip(b.iter()) {
        if pa == pb {
            continue;
        }
        let pa_node = graph.node_of(pa).expect("parameter type not in class graph");
        let pb_node = graph.node_of(pb).expect("parameter type not in class graph");
        if graph.graph[pb_node].value.conforming.contains(pa_node) {
            // pa is a (strict) subtype of pb at this position: a is strictly more specific here.
            any_strict = true;
        } else {
            // Either pb is a subtype of pa (b more specific here) or the two are incomparable;
            // either way a is not ≤ b at this position, so a cannot be more specific overall.
            return false;
        }
    }
    any_strict
}

/// Incremental maximal-antichain accumulation: returns the maximally-specific elements of
/// `candidates`, i.e. those not dominated by any other candidate.
pub fn best<D: Copy + Eq + Hash>(
    graph: &ClassGraph<D>,
    candidates: &[usize],
    overrides: &[OverrideCore<D>],
) -> Vec<usize> {
    let mut kept: Vec<usize> = Vec::new();
    for &candidate in candidates {
        let mut dominated = false;
        kept.retain(|&existing| {
            if more_specific(graph, &overrides[candidate].params, &overrides[existing].params) {
                false // existing is dominated by the new candidate, drop it
            } else {
                if more_specific(graph, &overrides[existing].params, &overrides[candidate].params)
                {
                    dominated = true;
                }
                true
            }
        });
        if !dominated {
            kept.push(candidate);
        }
    }
    kept
}

/// The unique override that `spec` should delegate to when its body calls `next!`, or `None` if
/// there isn't exactly one (no less-specific candidate, or more than one incomparable candidate).
pub fn find_next<D: Copy + Eq + Hash>(
    graph: &ClassGraph<D>,
    spec: usize,
    candidates: &[usize],
    overrides: &[OverrideCore<D>],
) -> Option<usize> {
    let less_specific: Vec<usize> = candidates
        .iter()
        .copied()
        .filter(|&other| {
            other != spec && more_specific(graph, &overrides[spec].params, &overrides[other].params)
        })
        .collect();
    let nearest = best(graph, &less_specific, overrides);
    match nearest.as_slice() {
        [only] => Some(*only),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{build_class_graph, compute_conforming_sets};
    use crate::fixture::FixtureIntrospector;
    use std::any::Any;
    use std::sync::Arc;

    fn dummy_override<D: 'static>(params: Vec<D>) -> OverrideCore<D> {
        OverrideCore {
            params,
            func: Arc::new(|_: &[&dyn Any], _: &crate::method::NextCall<'_, D>| -> Box<dyn Any> {
                Box::new(())
            }),
            next: None,
        }
    }

    #[test]
    fn pitbull_more_specific_than_dog() {
        let mut fx = FixtureIntrospector::new();
        let animal = fx.class("Animal", false, &[]);
        let dog = fx.class("Dog", true, &[animal]);
        let pitbull = fx.class("Pitbull", true, &[dog]);

        let (mut graph, layers) = build_class_graph(&fx, &[animal]);
        compute_conforming_sets(&mut graph, &layers);

        assert!(more_specific(&graph, &[pitbull], &[dog]));
        assert!(!more_specific(&graph, &[dog], &[pitbull]));
        assert!(!more_specific(&graph, &[dog], &[dog]));
    }

    #[test]
    fn best_picks_unique_maximum_and_keeps_incomparable_pair() {
        let mut fx = FixtureIntrospector::new();
        let matrix = fx.class("Matrix", false, &[]);
        let dense = fx.class("Dense", true, &[matrix]);
        let diag = fx.class("Diagonal", true, &[matrix]);

        let (mut graph, layers) = build_class_graph(&fx, &[matrix]);
        compute_conforming_sets(&mut graph, &layers);

        let overrides = vec![
            dummy_override(vec![diag, dense]), // 0
            dummy_override(vec![dense, diag]), // 1
        ];
        // Neither (Diag,Dense) nor (Dense,Diag) is more specific than the other on a (Diag,Diag)
        // call: both apply, both are maximal, so `best` reports both — ambiguity upstream.
        let chosen = best(&graph, &[0, 1], &overrides);
        assert_eq!(chosen.len(), 2);
    }

    #[test]
    fn find_next_chains_to_the_immediately_less_specific_override() {
        let mut fx = FixtureIntrospector::new();
        let animal = fx.class("Animal", false, &[]);
        let dog = fx.class("Dog", true, &[animal]);
        let pitbull = fx.class("Pitbull", true, &[dog]);

        let (mut graph, layers) = build_class_graph(&fx, &[animal]);
        compute_conforming_sets(&mut graph, &layers);

        let overrides = vec![
            dummy_override(vec![dog]),     // 0
            dummy_override(vec![pitbull]), // 1
        ];
        assert_eq!(find_next(&graph, 1, &[0, 1], &overrides), Some(0));
        assert_eq!(find_next(&graph, 0, &[0, 1], &overrides), None);
    }
}
