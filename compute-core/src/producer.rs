#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

use std::rc::Rc;

use static_assertions::assert_obj_safe;

use crate::{errors::ComputeResult, name::Name, registry::Registry};

//=================================================================================================|

/// A computation node owning a fixed, non-empty, ordered set of output resources.
///
/// `outputs` is set at construction and is immutable thereafter; `compute` must, before
/// returning `Ok`, cause every name in `outputs` to be committed via the registry (see
/// [`Registry::ensure`](crate::registry::Registry::ensure) for the commit-enforcement
/// check performed around this call).
pub trait Producer: std::fmt::Debug {
    /// The resources this producer may commit, in declaration order.
    fn outputs(&self) -> &[Name];

    /// Runs the computation. Inputs are guaranteed fresh by the time this is called;
    /// see [`ResourceRef::peek`](crate::resource_ref::ResourceRef::peek) and
    /// `io.<field>.get(ensure=false)`-style reads in [`WiredProducer`] implementations.
    fn compute(&self, registry: &Registry) -> ComputeResult<()>;
}

assert_obj_safe!(Producer);

//=================================================================================================|

/// Implemented by a producer's IO record: a fixed collection of named
/// [`ResourceRef`](crate::resource_ref::ResourceRef) fields, a subset of which are
/// marked as outputs at construction (not inferred from field types).
pub trait ProducerIo {
    /// The output refs, in declaration order. Must be non-empty and name-distinct;
    /// [`WiredProducer::new`] enforces this.
    fn output_names(&self) -> Vec<Name>;
}

//=================================================================================================|

/// A [`Producer`] built from an [`IO`](ProducerIo) record plus a compute closure. This
/// is the standard way producer authors wire a computation: build the IO record from
/// [`ResourceRef`](crate::resource_ref::ResourceRef)s sourced from a module (and any
/// required sub-modules), then hand it here with the closure that reads inputs and
/// writes outputs through it.
pub struct WiredProducer<IO> {
    outputs: Vec<Name>,
    io: IO,
    compute: Box<dyn Fn(&IO, &Registry) -> ComputeResult<()>>,
}

impl<IO: ProducerIo> WiredProducer<IO> {
    /// Fails if the IO record's marked outputs are empty or contain a duplicate name;
    /// both are declaration-time bugs, not runtime conditions.
    pub fn new(
        io: IO,
        compute: impl Fn(&IO, &Registry) -> ComputeResult<()> + 'static,
    ) -> ComputeResult<Rc<Self>> {
        let outputs = io.output_names();

        if outputs.is_empty() {
            return Err(crate::errors::ComputeError::ValidationFailed {
                name: Name::from("<wired-producer>"),
                reason: "a WiredProducer must declare at least one output".to_string(),
            });
        }

        let mut seen = std::collections::HashSet::with_capacity(outputs.len());
        for name in &outputs {
            if !seen.insert(name.as_str().to_string()) {
                return Err(crate::errors::ComputeError::ValidationFailed {
                    name: name.clone(),
                    reason: "duplicate output name in WiredProducer's IO record".to_string(),
                });
            }
        }

        Ok(Rc::new(Self { outputs, io, compute: Box::new(compute) }))
    }

    pub fn io(&self) -> &IO {
        &self.io
    }
}

impl<IO> std::fmt::Debug for WiredProducer<IO> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WiredProducer").field("outputs", &self.outputs).finish_non_exhaustive()
    }
}

impl<IO> Producer for WiredProducer<IO> {
    fn outputs(&self) -> &[Name] {
        &self.outputs
    }

    fn compute(&self, registry: &Registry) -> ComputeResult<()> {
        (self.compute)(&self.io, registry)
    }
}
