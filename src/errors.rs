//! The crate's public error type.
//!
//! Only the two call-time failure kinds described for the dispatcher get a `DispatchError`
//! variant. Everything else that can go wrong is a setup-time programming error (calling
//! `dispatch` before `update`, registering an override with a parameter outside its method's
//! virtual types, a non-concrete class used as a dynamic type) and is raised as a panic, the same
//! posture the rest of the crate takes for internal consistency violations (see the `expect`s in
//! `graph::types`).

use thiserror::Error;

/// A method call failed to resolve to a unique implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// No registered override applies to the dynamic argument tuple.
    #[error("this call to '{method}' is not implemented")]
    Undefined { method: String },

    /// More than one override applies and none is most specific.
    #[error("this call to '{method}' is ambiguous")]
    Ambiguous { method: String },
}

pub type DispatchResult<T> = Result<T, DispatchError>;
