//! The crate's single owning facade: construction, registration, `update`, dispatch.
//!
//! Modeled on montera's top-level driver (`try_main` orchestrating class loading, virtual-table
//! construction, rendering) but collapsed into one value with an explicit lifecycle instead of a
//! sequence of free functions over process-wide state, per the "global mutable state" design note:
//! a fresh `Runtime` is constructed (and dropped) per caller or per test, never a static singleton.

use crate::class::{build_class_graph, compute_conforming_sets, ClassGraph, ClassIntrospector};
use crate::dispatch::{dispatch_raw, Virtual};
use crate::errors::DispatchResult;
use crate::graph::{run_graphviz, DotOptions};
use crate::method::{MethodCore, MethodId, NextCall, OverrideCore, Thunk};
use crate::options::EngineOptions;
use crate::slots::allocate_slots;
use crate::specificity::find_next;
use crate::table::build_table;
use std::any::Any;
use std::collections::HashSet;
use std::fmt::Debug;
use std::fs;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

/// Open multi-method engine: a registry of methods and overrides before [`Runtime::update`], a
/// sealed dispatcher after.
///
/// `D` is the host's opaque class descriptor type (see [`ClassIntrospector`]); `I` is the
/// introspector implementation the runtime was built against.
pub struct Runtime<D, I> {
    introspector: I,
    options: EngineOptions,
    methods: Vec<MethodCore<D>>,
    graph: ClassGraph<D>,
    sealed: bool,
}

impl<D, I> Runtime<D, I>
where
    D: Copy + Eq + Hash + Ord + Debug,
    I: ClassIntrospector<D>,
{
    pub fn new(introspector: I, options: EngineOptions) -> Self {
        Self {
            introspector,
            options,
            methods: Vec::new(),
            graph: ClassGraph::new(),
            sealed: false,
        }
    }

    /// Registers a new method, returning the handle later passed to `register_override` and the
    /// `dispatch*` wrappers.
    ///
    /// Panics if called after `update` (the registry is append-only pre-seal).
    pub fn register_method(&mut self, name: impl Into<String>, virtual_params: Vec<D>) -> MethodId {
        assert!(!self.sealed, "register_method called after update");
        assert!(
            !virtual_params.is_empty(),
            "a method must have at least one virtual parameter"
        );
        let id = MethodId(self.methods.len() as u32);
        let arity = virtual_params.len();
        self.methods.push(MethodCore {
            name: name.into(),
            virtual_params,
            overrides: Vec::new(),
            slots: vec![0; arity],
            strides: Vec::new(),
            dispatch_table: Vec::new(),
        });
        id
    }

    /// Registers an override for `method`, given a type-erased body.
    ///
    /// `params` must have the same length as the method's `virtual_params`, and each must be
    /// reachable (by conformance) from the corresponding declared virtual parameter type; this is
    /// checked during `update`, since the class graph doesn't exist yet at registration time.
    pub fn register_override(&mut self, method: MethodId, params: Vec<D>, body: Thunk<D>) {
        assert!(!self.sealed, "register_override called after update");
        let core = &mut self.methods[method.0 as usize];
        assert_eq!(
            params.len(),
            core.virtual_params.len(),
            "override for '{}' has the wrong arity",
            core.name
        );
        if self.options.deny_duplicate_overrides {
            let duplicate = core.overrides.iter().any(|ov| ov.params == params);
            assert!(
                !duplicate,
                "duplicate override registered for '{}' with the same parameter types",
                core.name
            );
        }
        core.overrides.push(OverrideCore {
            params,
            func: body,
            next: None,
        });
    }

    /// Builds the class graph, conformance closure, slot assignments, dispatch tables and
    /// next-pointers, then seals the runtime.
    ///
    /// Panics if called more than once.
    pub fn update(&mut self) {
        assert!(!self.sealed, "update called twice");

        let seeds: Vec<D> = dedup_preserving_first(
            self.methods
                .iter()
                .flat_map(|m| m.virtual_params.iter().copied()),
        );
        info!("Building class graph from {} seed type(s)...", seeds.len());
        let (mut graph, layers) = build_class_graph(&self.introspector, &seeds);
        compute_conforming_sets(&mut graph, &layers);

        for (method_id, method) in self.methods.iter().enumerate() {
            for (position, &declared) in method.virtual_params.iter().enumerate() {
                let node = graph
                    .node_of(declared)
                    .expect("seeded virtual parameter type missing from class graph");
                graph.graph[node]
                    .value
                    .method_params
                    .push((MethodId(method_id as u32), position));
            }
        }

        debug!("Allocating slots across {} layered classes...", layers.len());
        allocate_slots(&mut graph, &layers, &mut self.methods);

        for method in &self.methods {
            for ov in &method.overrides {
                for (position, &param) in ov.params.iter().enumerate() {
                    let declared = method.virtual_params[position];
                    let declared_node = graph
                        .node_of(declared)
                        .expect("declared virtual parameter type missing from class graph");
                    let param_node = graph.node_of(param).unwrap_or_else(|| {
                        panic!(
                            "override parameter type for '{}' is not in the class graph",
                            method.name
                        )
                    });
                    assert!(
                        graph.graph[declared_node].value.conforming.contains(param_node),
                        "override parameter type for '{}' at position {} is not reachable from \
                         its declared virtual parameter type",
                        method.name,
                        position
                    );
                }
            }
        }

        let concrete: Vec<_> = graph
            .graph
            .iter()
            .filter(|node| node.value.is_concrete)
            .map(|node| (node.id, node.value.index_len()))
            .collect();
        for (id, len) in concrete {
            graph.graph[id].value.index = vec![0; len as usize];
        }

        for method in &mut self.methods {
            debug!("Building dispatch table for '{}'...", method.name);
            build_table(&mut graph, method);
        }

        for method in &mut self.methods {
            let candidates: Vec<usize> = (0..method.overrides.len()).collect();
            let nexts: Vec<Option<usize>> = candidates
                .iter()
                .map(|&spec| find_next(&graph, spec, &candidates, &method.overrides))
                .collect();
            for (ov, next) in method.overrides.iter_mut().zip(nexts) {
                ov.next = next;
            }
        }

        if let Some(dir) = self.options.render_graphs.clone() {
            self.render_graphs(&graph, &dir);
        }

        self.graph = graph;
        self.sealed = true;
        info!("Runtime sealed with {} method(s).", self.methods.len());
    }

    fn render_graphs(&self, graph: &ClassGraph<D>, dir: &std::path::Path) {
        if let Err(err) = fs::create_dir_all(dir) {
            warn!("Unable to create graph directory {}: {err}", dir.display());
            return;
        }
        let dot = graph.graph.as_dot(&DotOptions::default());
        if let Err(err) = run_graphviz(&dot, dir.join("classes.png")) {
            warn!("Unable to render class graph: {err}");
        }
    }

    fn dispatch_erased(
        &self,
        method: MethodId,
        args: &[&dyn Any],
        classes: &[D],
    ) -> DispatchResult<Box<dyn Any>> {
        assert!(self.sealed, "dispatch called before update");
        dispatch_raw(&self.graph, &self.methods[method.0 as usize], args, classes)
    }

    /// Dispatches a unary multi-method.
    pub fn dispatch1<A, R>(&self, method: MethodId, a: &A) -> DispatchResult<R>
    where
        A: Virtual<D> + Any,
        R: 'static,
    {
        let classes = [a.class_id()];
        let result = self.dispatch_erased(method, &[a as &dyn Any], &classes)?;
        Ok(*result
            .downcast::<R>()
            .expect("override returned a value of the wrong type"))
    }

    /// Dispatches a binary multi-method.
    pub fn dispatch2<A, B, R>(&self, method: MethodId, a: &A, b: &B) -> DispatchResult<R>
    where
        A: Virtual<D> + Any,
        B: Virtual<D> + Any,
        R: 'static,
    {
        let classes = [a.class_id(), b.class_id()];
        let result = self.dispatch_erased(method, &[a as &dyn Any, b as &dyn Any], &classes)?;
        Ok(*result
            .downcast::<R>()
            .expect("override returned a value of the wrong type"))
    }

    /// Dispatches a ternary multi-method.
    pub fn dispatch3<A, B, C, R>(&self, method: MethodId, a: &A, b: &B, c: &C) -> DispatchResult<R>
    where
        A: Virtual<D> + Any,
        B: Virtual<D> + Any,
        C: Virtual<D> + Any,
        R: 'static,
    {
        let classes = [a.class_id(), b.class_id(), c.class_id()];
        let result = self.dispatch_erased(
            method,
            &[a as &dyn Any, b as &dyn Any, c as &dyn Any],
            &classes,
        )?;
        Ok(*result
            .downcast::<R>()
            .expect("override returned a value of the wrong type"))
    }

    /// Registers a unary override from a plain closure. The closure receives a [`Next`] handle so
    /// its body can delegate to the next-most-specific override, mirroring `next!` chaining.
    pub fn register_override1<A, R>(
        &mut self,
        method: MethodId,
        param: D,
        body: impl Fn(&A, &Next<'_, D, R>) -> R + Send + Sync + 'static,
    ) where
        A: 'static,
        R: 'static,
    {
        let thunk: Thunk<D> = Arc::new(move |args: &[&dyn Any], next: &NextCall<'_, D>| -> Box<dyn Any> {
            let a = args[0].downcast_ref::<A>().expect("argument type mismatch");
            Box::new(body(a, &Next::new(next)))
        });
        self.register_override(method, vec![param], thunk);
    }

    /// Registers a binary override from a plain closure.
    pub fn register_override2<A, B, R>(
        &mut self,
        method: MethodId,
        params: [D; 2],
        body: impl Fn(&A, &B, &Next<'_, D, R>) -> R + Send + Sync + 'static,
    ) where
        A: 'static,
        B: 'static,
        R: 'static,
    {
        let thunk: Thunk<D> = Arc::new(move |args: &[&dyn Any], next: &NextCall<'_, D>| -> Box<dyn Any> {
            let a = args[0].downcast_ref::<A>().expect("argument type mismatch");
            let b = args[1].downcast_ref::<B>().expect("argument type mismatch");
            Box::new(body(a, b, &Next::new(next)))
        });
        self.register_override(method, params.to_vec(), thunk);
    }

    /// Registers a ternary override from a plain closure.
    pub fn register_override3<A, B, C, R>(
        &mut self,
        method: MethodId,
        params: [D; 3],
        body: impl Fn(&A, &B, &C, &Next<'_, D, R>) -> R + Send + Sync + 'static,
    ) where
        A: 'static,
        B: 'static,
        C: 'static,
        R: 'static,
    {
        let thunk: Thunk<D> = Arc::new(move |args: &[&dyn Any], next: &NextCall<'_, D>| -> Box<dyn Any> {
            let a = args[0].downcast_ref::<A>().expect("argument type mismatch");
            let b = args[1].downcast_ref::<B>().expect("argument type mismatch");
            let c = args[2].downcast_ref::<C>().expect("argument type mismatch");
            Box::new(body(a, b, c, &Next::new(next)))
        });
        self.register_override(method, params.to_vec(), thunk);
    }
}

/// Typed view over a [`NextCall`], downcasting its erased result back to `R` for the typed
/// `register_override*` wrappers.
pub struct Next<'a, D, R> {
    inner: &'a NextCall<'a, D>,
    _marker: PhantomData<R>,
}

impl<'a, D, R: 'static> Next<'a, D, R> {
    fn new(inner: &'a NextCall<'a, D>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    /// Whether an override further down the specificity chain exists.
    pub fn is_available(&self) -> bool {
        self.inner.is_available()
    }

    /// Invokes the next-most-specific unary override.
    pub fn call1<A: 'static>(&self, a: &A) -> R {
        *self
            .inner
            .call(&[a as &dyn Any])
            .downcast::<R>()
            .expect("next override returned a value of the wrong type")
    }

    /// Invokes the next-most-specific binary override.
    pub fn call2<A: 'static, B: 'static>(&self, a: &A, b: &B) -> R {
        *self
            .inner
            .call(&[a as &dyn Any, b as &dyn Any])
            .downcast::<R>()
            .expect("next override returned a value of the wrong type")
    }

    /// Invokes the next-most-specific ternary override.
    pub fn call3<A: 'static, B: 'static, C: 'static>(&self, a: &A, b: &B, c: &C) -> R {
        *self
            .inner
            .call(&[a as &dyn Any, b as &dyn Any, c as &dyn Any])
            .downcast::<R>()
            .expect("next override returned a value of the wrong type")
    }
}

fn dedup_preserving_first<D: Copy + Eq + Hash>(iter: impl Iterator<Item = D>) -> Vec<D> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in iter {
        if seen.insert(item) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{ClassKey, FixtureIntrospector};

    struct Animal(ClassKey);

    impl Virtual<ClassKey> for Animal {
        fn class_id(&self) -> ClassKey {
            self.0
        }
    }

    #[test]
    fn kick_and_bite_scenario() {
        let mut fx = FixtureIntrospector::new();
        let animal = fx.class("Animal", false, &[]);
        let dog = fx.class("Dog", true, &[animal]);
        let pitbull = fx.class("Pitbull", true, &[dog]);

        let mut rt = Runtime::new(fx, EngineOptions::new());
        let kick = rt.register_method("kick", vec![animal]);

        rt.register_override1::<Animal, String>(kick, dog, |_, _next| "bark".to_string());
        rt.register_override1::<Animal, String>(kick, pitbull, |_, next: &Next<'_, ClassKey, String>| {
            format!("{} and bite", next.call1(&Animal(pitbull)))
        });

        rt.update();

        assert_eq!(rt.dispatch1::<Animal, String>(kick, &Animal(dog)).unwrap(), "bark");
        assert_eq!(
            rt.dispatch1::<Animal, String>(kick, &Animal(pitbull)).unwrap(),
            "bark and bite"
        );
    }

    #[test]
    fn meet_binary_dimension_scenario() {
        let mut fx = FixtureIntrospector::new();
        let animal = fx.class("Animal", false, &[]);
        let dog = fx.class("Dog", true, &[animal]);
        let pitbull = fx.class("Pitbull", true, &[dog]);
        let cat = fx.class("Cat", true, &[animal]);
        let dolphin = fx.class("Dolphin", true, &[animal]);

        let mut rt = Runtime::new(fx, EngineOptions::new());
        let meet = rt.register_method("meet", vec![animal, animal]);

        rt.register_override2::<Animal, Animal, String>(meet, [animal, animal], |_, _, _| {
            "ignore".to_string()
        });
        rt.register_override2::<Animal, Animal, String>(meet, [dog, dog], |_, _, _| {
            "wag tail".to_string()
        });
        rt.register_override2::<Animal, Animal, String>(meet, [dog, cat], |_, _, _| {
            "chase".to_string()
        });

        rt.update();

        assert_eq!(
            rt.dispatch2::<Animal, Animal, String>(meet, &Animal(pitbull), &Animal(cat))
                .unwrap(),
            "chase"
        );
        assert_eq!(
            rt.dispatch2::<Animal, Animal, String>(meet, &Animal(pitbull), &Animal(dog))
                .unwrap(),
            "wag tail"
        );
        assert_eq!(
            rt.dispatch2::<Animal, Animal, String>(meet, &Animal(pitbull), &Animal(dolphin))
                .unwrap(),
            "ignore"
        );
    }

    #[test]
    fn introduce_ternary_dimension_scenario() {
        let mut fx = FixtureIntrospector::new();
        let animal = fx.class("Animal", false, &[]);
        let dog = fx.class("Dog", true, &[animal]);
        let pitbull = fx.class("Pitbull", true, &[dog]);
        let cat = fx.class("Cat", true, &[animal]);

        let mut rt = Runtime::new(fx, EngineOptions::new());
        let introduce = rt.register_method("introduce", vec![animal, animal, animal]);

        rt.register_override3::<Animal, Animal, Animal, String>(
            introduce,
            [animal, animal, animal],
            |_, _, _, _| "nothing happens".to_string(),
        );
        rt.register_override3::<Animal, Animal, Animal, String>(
            introduce,
            [dog, cat, dog],
            |_, _, _, _| "the dogs corner the cat".to_string(),
        );

        rt.update();

        assert_eq!(
            rt.dispatch3::<Animal, Animal, Animal, String>(
                introduce,
                &Animal(pitbull),
                &Animal(cat),
                &Animal(pitbull)
            )
            .unwrap(),
            "the dogs corner the cat"
        );
        assert_eq!(
            rt.dispatch3::<Animal, Animal, Animal, String>(
                introduce,
                &Animal(cat),
                &Animal(cat),
                &Animal(cat)
            )
            .unwrap(),
            "nothing happens"
        );
    }

    #[test]
    fn undefined_and_ambiguous_matrix_scenario() {
        let mut fx = FixtureIntrospector::new();
        let matrix = fx.class("Matrix", false, &[]);
        let dense = fx.class("Dense", true, &[matrix]);
        let diag = fx.class("Diagonal", true, &[matrix]);

        let mut rt = Runtime::new(fx, EngineOptions::new());
        let plus = rt.register_method("plus", vec![matrix, matrix]);
        rt.register_override2::<Animal, Animal, ()>(plus, [diag, dense], |_, _, _| ());
        rt.register_override2::<Animal, Animal, ()>(plus, [dense, diag], |_, _, _| ());

        rt.update();

        let err = rt
            .dispatch2::<Animal, Animal, ()>(plus, &Animal(dense), &Animal(dense))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "this call to 'plus' is not implemented"
        );

        let err = rt
            .dispatch2::<Animal, Animal, ()>(plus, &Animal(diag), &Animal(diag))
            .unwrap_err();
        assert_eq!(err.to_string(), "this call to 'plus' is ambiguous");
    }

    #[test]
    #[should_panic(expected = "dispatch called before update")]
    fn dispatch_before_update_panics() {
        let mut fx = FixtureIntrospector::new();
        let animal = fx.class("Animal", false, &[]);
        fx.class("Dog", true, &[animal]);
        let rt = Runtime::new(fx, EngineOptions::new());
        let kick = MethodId(0);
        let _ = rt.dispatch1::<Animal, String>(kick, &Animal(animal));
    }
}
