#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

use crate::{buffer::Buffer, errors::ComputeResult, name::Name, registry::Registry, resource::ResourceKey};

//=================================================================================================|

/// A typed, non-owning handle to a resource: `(registry, key)`. The sole public
/// mutation surface; [`Resource`](crate::resource::Resource) itself is pure data that
/// callers never touch directly.
///
/// Cheap to copy/move — it always resolves through the registry by name, never by
/// pointer — and equality/identity are by fully-qualified name.
pub struct ResourceRef<T> {
    registry: Registry,
    key: ResourceKey<T>,
}

impl<T> ResourceRef<T> {
    pub(crate) fn new(registry: Registry, key: ResourceKey<T>) -> Self {
        Self { registry, key }
    }

    /// This ref's fully-qualified name. Exposed so [`ProducerIo`](crate::producer::ProducerIo)
    /// implementations can mark a field as an output; it is not a way to look a
    /// resource up by a hand-built string, since the only way to obtain a `Name` is to
    /// already hold the ref it names.
    pub fn name(&self) -> Name {
        self.key.name.clone()
    }

    pub(crate) fn spec(&self) -> Option<&crate::resource_spec::ResourceSpec> {
        self.key.spec.as_ref()
    }
}

impl<T> ResourceRef<T>
where
    T: Buffer + Clone + 'static,
{
    /// Makes this resource fresh; fails if it cannot be made fresh.
    pub fn ensure(&self) -> ComputeResult<()> {
        self.registry.ensure(&self.key.name)
    }

    /// `ensure()` then return the current buffer. `None` is a legal result only for
    /// resources whose spec sets `allow_null`.
    pub fn get(&self) -> ComputeResult<Option<T>> {
        self.registry.read::<T>(&self.key.name, true)
    }

    /// Returns the current buffer without ensuring; may be `None` or stale.
    pub fn peek(&self) -> ComputeResult<Option<T>> {
        self.registry.peek::<T>(&self.key.name)
    }

    /// Validates against spec, replaces the buffer, bumps version, recomputes
    /// `dep_sig`. Equivalent to `set_buffer(value, bump=true)`.
    pub fn set(&self, value: T) -> ComputeResult<()> {
        self.registry.set_buffer(&self.key.name, Some(value), true)
    }

    /// Sets the buffer to null. Only legal for specs with `allow_null`; otherwise
    /// rejected by validation, same as any other null write.
    pub fn set_null(&self) -> ComputeResult<()> {
        self.registry.set_buffer::<T>(&self.key.name, None, true)
    }

    /// Validates and replaces the buffer; bumps version and `dep_sig` only if `bump`.
    /// `bump=false` is the allocate-then-fill pattern: attach a freshly sized buffer,
    /// fill it, then [`commit`](Self::commit).
    pub fn set_buffer(&self, value: T, bump: bool) -> ComputeResult<()> {
        self.registry.set_buffer(&self.key.name, Some(value), bump)
    }

    /// Like [`set_buffer`](Self::set_buffer) but with a null payload.
    pub fn set_buffer_null(&self, bump: bool) -> ComputeResult<()> {
        self.registry.set_buffer::<T>(&self.key.name, None, bump)
    }

    /// Mutates the current buffer in place. Fails if there is no buffer or it is not of
    /// type `T`. Does not bump version; follow with [`commit`](Self::commit) or
    /// [`bump`](Self::bump).
    pub fn with_buffer_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> ComputeResult<R> {
        self.registry.with_buffer_mut(&self.key.name, f)
    }

    /// Bumps version and recomputes `dep_sig` to reflect current upstream versions;
    /// buffer unchanged.
    pub fn commit(&self) -> ComputeResult<()> {
        self.registry.commit(&self.key.name)
    }

    /// Alias of [`commit`](Self::commit).
    pub fn mark_fresh(&self) -> ComputeResult<()> {
        self.commit()
    }

    /// Alias of [`commit`](Self::commit).
    pub fn touch(&self) -> ComputeResult<()> {
        self.commit()
    }

    /// Bumps version **without** recomputing `dep_sig`.
    pub fn bump(&self) -> ComputeResult<()> {
        self.registry.bump(&self.key.name)
    }
}

impl<T> Clone for ResourceRef<T> {
    fn clone(&self) -> Self {
        Self { registry: self.registry.clone(), key: self.key.clone() }
    }
}

impl<T> std::fmt::Debug for ResourceRef<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRef").field("name", &self.key.name).finish()
    }
}

impl<T> PartialEq for ResourceRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key.name == other.key.name
    }
}

impl<T> Eq for ResourceRef<T> {}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod t {
    use super::*;
    use crate::{
        buffer::{PlainValue, ResourceKind},
        resource::ResourceKey,
        resource_spec::ResourceSpec,
    };

    #[test_log::test]
    fn set_null_then_commit_leaves_resource_fresh_but_null() {
        let registry = Registry::new();
        let name = Name::from("m.x");
        let spec = ResourceSpec::new(ResourceKind::PlainValue).allowing_null();
        registry.declare(name.clone(), None, vec![], None, "", Some(spec.clone())).unwrap();
        let r: ResourceRef<PlainValue<i64>> = ResourceRef::new(registry.clone(), ResourceKey::new(name.clone(), Some(spec)));

        r.set_null().unwrap();
        assert_eq!(r.get().unwrap(), None);
        let explanation = registry.explain(&name, 0).unwrap();
        assert!(explanation[0].fresh, "set_null should leave the resource fresh, not stale");
        assert!(explanation[0].version > 0);

        // The allocate-then-fill-style null entry point: attach a null buffer without
        // bumping, then commit separately.
        r.set_buffer_null(false).unwrap();
        r.commit().unwrap();
        assert_eq!(r.peek().unwrap(), None);
        let explanation = registry.explain(&name, 0).unwrap();
        assert!(explanation[0].fresh);
    }

    #[test_log::test]
    fn null_buffer_rejected_without_allow_null() {
        let registry = Registry::new();
        let name = Name::from("m.y");
        let spec = ResourceSpec::new(ResourceKind::PlainValue);
        let initial: Box<dyn Buffer> = Box::new(PlainValue(0i64));
        registry.declare(name.clone(), Some(initial), vec![], None, "", Some(spec.clone())).unwrap();
        let r: ResourceRef<PlainValue<i64>> = ResourceRef::new(registry.clone(), ResourceKey::new(name, Some(spec)));

        let err = r.set_null().unwrap_err();
        assert!(matches!(err, crate::errors::ComputeError::ValidationFailed { .. }));
    }
}
