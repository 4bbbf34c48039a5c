//! Open multi-method dispatch engine.
//!
//! Given a class introspection interface (see [`ClassIntrospector`]), a set of registered
//! methods and overrides, [`Runtime::update`] precomputes per-class index vectors and per-method
//! dispatch tables so that a call resolves in time proportional to its arity, without hashing or
//! linear search over candidate overrides.

#[macro_use]
extern crate log;

mod class;
mod dispatch;
mod errors;
#[cfg(any(test, feature = "testing"))]
pub mod fixture;
mod graph;
mod groups;
mod method;
mod options;
mod runtime;
mod slots;
mod specificity;
mod table;

pub use crate::class::ClassIntrospector;
pub use crate::dispatch::Virtual;
pub use crate::errors::{DispatchError, DispatchResult};
pub use crate::graph::DotOptions;
pub use crate::method::{MethodId, NextCall, Thunk};
pub use crate::options::EngineOptions;
pub use crate::runtime::{Next, Runtime};
