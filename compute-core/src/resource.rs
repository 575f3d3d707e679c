#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

use std::{marker::PhantomData, rc::Rc};

use crate::{buffer::Buffer, name::Name, producer::Producer, resource_spec::ResourceSpec};

//=================================================================================================|

/// An entry owned by the [`Registry`](crate::registry::Registry). Pure data; all
/// mutation happens through [`ResourceRef`](crate::resource_ref::ResourceRef), which is
/// the only thing that knows how to enforce the invariants documented on each field.
#[derive(Debug)]
pub struct Resource {
    pub name: Name,
    pub buffer: Option<Box<dyn Buffer>>,

    /// Declared at creation or at [`declare_resource`](crate::module::ModuleBase::declare_resource)
    /// time; immutable thereafter.
    pub deps: Vec<Name>,

    /// `None` means a purely user-set input.
    pub producer: Option<Rc<dyn Producer>>,

    /// 0 means "never committed".
    pub version: u64,

    /// Snapshot of dependency versions observed at the most recent commit. Empty until
    /// the first commit.
    pub dep_sig: Vec<(Name, u64)>,

    pub description: String,
    pub spec: Option<ResourceSpec>,
}

impl Resource {
    pub fn new(
        name: Name,
        buffer: Option<Box<dyn Buffer>>,
        deps: Vec<Name>,
        producer: Option<Rc<dyn Producer>>,
        description: String,
        spec: Option<ResourceSpec>,
    ) -> Self {
        Self {
            name,
            buffer,
            deps,
            producer,
            version: 0,
            dep_sig: Vec::new(),
            description,
            spec,
        }
    }

    /// Whether this resource has ever been committed.
    pub fn is_initialized(&self) -> bool {
        self.version > 0
    }
}

//=================================================================================================|

/// An immutable `(full_name, spec)` pair. `T` flows the expected buffer type to call
/// sites via [`ResourceRef<T>`](crate::resource_ref::ResourceRef); it is never stored in
/// the registry itself, which is untyped.
pub struct ResourceKey<T> {
    pub name: Name,
    pub spec: Option<ResourceSpec>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ResourceKey<T> {
    pub fn new(name: Name, spec: Option<ResourceSpec>) -> Self {
        Self { name, spec, _marker: PhantomData }
    }
}

impl<T> Clone for ResourceKey<T> {
    fn clone(&self) -> Self {
        Self { name: self.name.clone(), spec: self.spec.clone(), _marker: PhantomData }
    }
}

impl<T> std::fmt::Debug for ResourceKey<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceKey").field("name", &self.name).finish()
    }
}

impl<T> PartialEq for ResourceKey<T> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<T> Eq for ResourceKey<T> {}
