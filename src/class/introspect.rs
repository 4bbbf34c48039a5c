use std::fmt::Debug;
use std::hash::Hash;

/// Abstract capability set the dispatch engine needs over a host's class system.
///
/// This is the only external collaborator the engine depends on: discovering declared methods,
/// parsing a front-end's syntax, and enumerating a module's types are all out of scope and live on
/// the other side of this trait. `D` is the host's opaque class descriptor type; the engine never
/// inspects it beyond the bounds required to use it as a map key and sort key.
pub trait ClassIntrospector<D: Copy + Eq + Hash + Ord + Debug> {
    /// Every class known to the host program, in no particular order.
    fn classes(&self) -> Vec<D>;

    /// Human-readable name, used only for diagnostics (logging, Graphviz labels) and as the
    /// primary tie-break key during deterministic layering.
    fn name(&self, class: D) -> String;

    /// Direct base class and directly implemented interfaces, in declaration order. Does not
    /// include `class` itself or any transitive ancestor.
    fn direct_bases(&self, class: D) -> Vec<D>;

    /// Whether `class` may appear as the dynamic type of an object (as opposed to an abstract
    /// class or interface, which can only appear as a *declared* virtual parameter type).
    fn is_concrete(&self, class: D) -> bool;
}
