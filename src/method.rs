//! Method and override registry entries.
//!
//! A registered method is type-erased internally (its overrides' bodies are stored behind
//! `dyn Any`), so the engine itself never needs to be generic over argument or return types —
//! only the convenience wrappers in [`crate::dispatch`] are. This mirrors how an open-method
//! runtime built without compile-time reflection over module members (see the "over-eager
//! specialization" design note) has to take each override as an opaque registration rather than
//! discovering it by scanning declarations.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Opaque handle to a registered method, returned by [`crate::Runtime::register_method`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct MethodId(pub(crate) u32);

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A type-erased override body: validates its own argument types via `Any::downcast_ref`, returns
/// a boxed result the typed dispatch wrapper downcasts back, and receives a [`NextCall`] so it can
/// delegate to the next-most-specific override ("super"-style chaining) without re-dispatching.
pub type Thunk<D> = Arc<dyn Fn(&[&dyn Any], &NextCall<'_, D>) -> Box<dyn Any> + Send + Sync>;

/// Handle an override body uses to invoke the unique next-most-specific override, precomputed by
/// the specificity engine's `find_next` pass during `update`.
pub struct NextCall<'a, D> {
    pub(crate) overrides: &'a [OverrideCore<D>],
    pub(crate) next: Option<usize>,
}

impl<'a, D> NextCall<'a, D> {
    pub fn is_available(&self) -> bool {
        self.next.is_some()
    }

    /// Invokes the next-most-specific override with the same erased arguments.
    ///
    /// Panics if there is no unique next override; callers should guard with
    /// [`NextCall::is_available`] first when the chain may legitimately end.
    pub fn call(&self, args: &[&dyn Any]) -> Box<dyn Any> {
        let idx = self
            .next
            .expect("next! called on an override with no unique next-most-specific override");
        let ov = &self.overrides[idx];
        let next = NextCall {
            overrides: self.overrides,
            next: ov.next,
        };
        (ov.func)(args, &next)
    }
}

#[derive(Clone)]
pub(crate) enum TableEntry {
    Override(usize),
    Undefined,
    Ambiguous,
}

pub(crate) struct OverrideCore<D> {
    pub params: Vec<D>,
    pub func: Thunk<D>,
    /// Index (within the owning method's `overrides`) of the unique next-most-specific override,
    /// filled in by the specificity engine during `update`. `None` means no unique next override.
    pub next: Option<usize>,
}

pub(crate) struct MethodCore<D> {
    pub name: String,
    pub virtual_params: Vec<D>,
    pub overrides: Vec<OverrideCore<D>>,
    /// Per virtual-parameter slot, filled in by the slot allocator. Length `k`.
    pub slots: Vec<u32>,
    /// Per-dimension stride into `dispatch_table`, filled in by the table builder. Length `k`.
    pub strides: Vec<u32>,
    pub dispatch_table: Vec<TableEntry>,
}

impl<D> MethodCore<D> {
    pub fn arity(&self) -> usize {
        self.virtual_params.len()
    }
}
