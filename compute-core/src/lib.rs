#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

//! A lazy, versioned resource/producer/module dataflow engine: a name-keyed resource
//! registry, dependency-signature freshness tracking, recursive `ensure` with cycle
//! detection, multi-output producers with commit enforcement, typed handles, and
//! scoped module composition with module-level cycle detection.
//!
//! The engine is single-threaded by design (see [`registry::Registry`] and
//! [`module::World`]): every type here is `!Send + !Sync`, and `ensure` runs
//! synchronously to completion or raises.

pub mod buffer;
pub mod element_type;
pub mod errors;
pub mod module;
pub mod name;
pub mod producer;
pub mod registry;
pub mod resource;
pub mod resource_ref;
pub mod resource_spec;

pub use buffer::{Buffer, OpaqueBuffer, PlainValue, ResourceKind, TypedArray};
pub use element_type::{ElementType, ElementTyped};
pub use errors::{ComputeError, ComputeResult};
pub use module::{ModuleBase, ModuleImpl, World, WorldConfig};
pub use name::Name;
pub use producer::{Producer, ProducerIo, WiredProducer};
pub use registry::{ExplainLine, ExplainTree, Registry};
pub use resource::{Resource, ResourceKey};
pub use resource_ref::ResourceRef;
pub use resource_spec::{ResourceSpec, ShapeSpec};
