//! Runtime call-site code: per virtual argument, read the class-embedded index, compute the
//! flat offset, fetch the table entry, invoke or raise.

use crate::class::ClassGraph;
use crate::errors::DispatchError;
use crate::method::{MethodCore, NextCall, TableEntry};
use std::any::Any;
use std::hash::Hash;

/// Implemented by every value that can be passed as a virtual argument: exposes the dynamic
/// type's class descriptor so the dispatcher can look up its precomputed index array.
pub trait Virtual<D> {
    fn class_id(&self) -> D;
}

pub(crate) fn dispatch_offset<D: Copy + Eq + Hash>(
    graph: &ClassGraph<D>,
    method: &MethodCore<D>,
    classes: &[D],
) -> usize {
    debug_assert_eq!(classes.len(), method.arity());
    let mut offset = 0usize;
    for (i, &class_id) in classes.iter().enumerate() {
        let node = graph
            .node_of(class_id)
            .expect("dispatch: dynamic type not reachable from any registered method");
        let class = &graph.graph[node].value;
        let first = class
            .first_used_slot
            .expect("dispatch: dynamic type never reserved a slot for this method's position");
        let local = (method.slots[i] - first) as usize;
        let group = class.index[local];
        offset += group as usize * method.strides[i] as usize;
    }
    offset
}

pub(crate) fn dispatch_raw<D: Copy + Eq + Hash>(
    graph: &ClassGraph<D>,
    method: &MethodCore<D>,
    args: &[&dyn Any],
    classes: &[D],
) -> Result<Box<dyn Any>, DispatchError> {
    let offset = dispatch_offset(graph, method, classes);
    match &method.dispatch_table[offset] {
        TableEntry::Override(idx) => {
            let next = NextCall {
                overrides: &method.overrides,
                next: method.overrides[*idx].next,
            };
            Ok((method.overrides[*idx].func)(args, &next))
        }
        TableEntry::Undefined => Err(DispatchError::Undefined {
            method: method.name.clone(),
        }),
        TableEntry::Ambiguous => Err(DispatchError::Ambiguous {
            method: method.name.clone(),
        }),
    }
}
