#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

use itertools::Itertools;

use crate::name::Name;

//=================================================================================================|

/// The single error type surfaced by this crate's public API.
///
/// Every variant carries the offending resource name(s); [`ResourceCycle`](ComputeError::ResourceCycle)
/// and [`ModuleCycle`](ComputeError::ModuleCycle) additionally carry the full cycle path.
/// No operation in this crate swallows an error or retries silently — every failure here
/// propagates unchanged to the caller.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ComputeError {
    #[error("resource `{0}` is not declared")]
    UnknownResource(Name),

    #[error("resource `{0}` is already declared")]
    DuplicateDeclaration(Name),

    #[error("dependency cycle detected: {}", path.iter().map(Name::as_str).join(" -> "))]
    ResourceCycle { path: Vec<Name> },

    #[error("module cycle detected: {path}")]
    ModuleCycle { path: String },

    #[error(
        "resource `{0}` is uninitialized: it has no producer and has never been committed"
    )]
    UninitializedInput(Name),

    #[error(
        "producer failed to commit its declared output(s): {}",
        outputs.iter().map(Name::as_str).join(", ")
    )]
    ProducerDidNotCommit { outputs: Vec<Name> },

    #[error("producer for `{0}` does not list it among its declared outputs")]
    ProducerOutputNotOwned(Name),

    #[error("validation failed for `{name}`: {reason}")]
    ValidationFailed { name: Name, reason: String },

    /// Not part of the original error taxonomy: a module outlived the `World` that
    /// owns it (its `Weak` back-reference no longer upgrades). Only reachable if a
    /// caller retains a module `Rc` after dropping every handle to its `World`.
    #[error("world has been dropped; this module outlived its owning World")]
    WorldDropped,
}

pub type ComputeResult<T> = std::result::Result<T, ComputeError>;
