#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

use std::{
    any::{Any, TypeId},
    cell::RefCell,
    collections::HashMap,
    rc::{Rc, Weak},
};

use crate::{
    buffer::Buffer,
    errors::{ComputeError, ComputeResult},
    name::Name,
    producer::Producer,
    registry::Registry,
    resource::ResourceKey,
    resource_ref::ResourceRef,
    resource_spec::ResourceSpec,
};

//=================================================================================================|

/// Implemented by every module type. `NAME` is the module's class identity label used
/// in qualified names and module-cycle diagnostics; `new` is invoked by
/// [`World::require`] at most once per `(scope, Self)`.
pub trait ModuleImpl: Sized + 'static {
    const NAME: &'static str;

    /// May itself call `world.require::<OtherModule>(scope)` (directly, or through a
    /// [`ModuleBase::require`] it embeds), causing nested construction; mutual
    /// `require` calls during construction are a module cycle and are detected.
    fn new(world: &World, scope: &str) -> ComputeResult<Self>;
}

//=================================================================================================|

/// The common state every [`ModuleImpl`] embeds as a field: a qualified namespace
/// prefix, a [`Registry`] handle, and a non-owning back-reference to the owning
/// [`World`]. Provides the helpers that turn attribute names into fully-qualified
/// [`ResourceRef`]s without exposing [`Name`] construction to module authors.
pub struct ModuleBase {
    scope: String,
    prefix: String,
    registry: Registry,
    world: Weak<RefCell<WorldInner>>,
}

impl ModuleBase {
    pub fn new(world: &World, scope: &str, name: &'static str) -> Self {
        Self {
            scope: scope.to_string(),
            prefix: Name::module_prefix(scope, name),
            registry: world.registry(),
            world: Rc::downgrade(&world.0),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Reserves a [`ResourceRef`] under this module's prefix without declaring it in
    /// the registry; wire it up later with [`declare_resource`](Self::declare_resource).
    pub fn resource<T>(&self, attr: &str, spec: Option<ResourceSpec>) -> ResourceRef<T> {
        let name = Name::qualify(&self.prefix, attr);
        ResourceRef::new(self.registry.clone(), ResourceKey::new(name, spec))
    }

    /// Declares `r` in the registry with the given wiring. Fails if `r`'s name was
    /// already declared.
    pub fn declare_resource<T>(
        &self,
        r: &ResourceRef<T>,
        buffer: Option<Box<dyn Buffer>>,
        deps: Vec<Name>,
        producer: Option<Rc<dyn Producer>>,
        description: impl Into<String>,
    ) -> ComputeResult<()> {
        self.registry.declare(r.name().clone(), buffer, deps, producer, description, r.spec().cloned())
    }

    /// Convenience: reserve then immediately declare, for the common case where wiring
    /// is known at the call site.
    pub fn resource_declared<T>(
        &self,
        attr: &str,
        spec: Option<ResourceSpec>,
        buffer: Option<Box<dyn Buffer>>,
        deps: Vec<Name>,
        producer: Option<Rc<dyn Producer>>,
        description: impl Into<String>,
    ) -> ComputeResult<ResourceRef<T>> {
        let r = self.resource::<T>(attr, spec);
        self.declare_resource(&r, buffer, deps, producer, description)?;
        Ok(r)
    }

    /// Delegates to [`World::require`] using this module's own scope.
    pub fn require<M: ModuleImpl>(&self) -> ComputeResult<Rc<M>> {
        let world = self.world.upgrade().ok_or(ComputeError::WorldDropped)?;
        World(world).require::<M>(&self.scope)
    }
}

//=================================================================================================|

/// Engine-wide knobs with no file-I/O surface, in the style of this codebase's
/// `EgConfig` builder. Currently controls only whether top-level [`Registry::ensure`]/
/// [`Registry::ensure_many`] calls emit an `info`-level span, which producer-dispatch
/// spans do regardless of this setting — useful when embedding the engine in a host
/// application that already has its own tracing noise budget.
#[derive(Clone, Debug, Default)]
pub struct WorldConfig {
    emit_top_level_span: bool,
}

impl WorldConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit_top_level_span(&mut self, enabled: bool) -> &mut Self {
        self.emit_top_level_span = enabled;
        self
    }
}

//=================================================================================================|

struct WorldInner {
    registry: Registry,
    module_cache: HashMap<(String, TypeId), Rc<dyn Any>>,
    constructing: Vec<(String, TypeId, &'static str)>,
}

/// The top-level container: owns one [`Registry`] and memoizes [`ModuleImpl`]
/// instances by `(scope, module type)`, enforcing "one instance per key" and detecting
/// module-level cycles arising from mutual `require` during construction.
///
/// Construction is never re-entered for a cached key; two worlds are fully isolated —
/// there is no process-wide state in this crate.
#[derive(Clone)]
pub struct World(Rc<RefCell<WorldInner>>);

impl World {
    pub fn new() -> Self {
        Self::with_config(WorldConfig::new())
    }

    pub fn with_config(config: WorldConfig) -> Self {
        let registry = Registry::new();
        registry.set_emit_top_level_span(config.emit_top_level_span);
        Self(Rc::new(RefCell::new(WorldInner {
            registry,
            module_cache: HashMap::new(),
            constructing: Vec::new(),
        })))
    }

    pub fn registry(&self) -> Registry {
        self.0.borrow().registry.clone()
    }

    /// Returns the cached instance for `(scope, M)` if one exists; otherwise
    /// constructs it via [`ModuleImpl::new`], caches it, and returns it. Raises
    /// [`ModuleCycle`](ComputeError::ModuleCycle) if `(scope, M)` is already under
    /// construction on the current call stack.
    pub fn require<M: ModuleImpl>(&self, scope: &str) -> ComputeResult<Rc<M>> {
        let key = (scope.to_string(), TypeId::of::<M>());

        if let Some(cached) = self.0.borrow().module_cache.get(&key).cloned() {
            return cached.downcast::<M>().map_err(|_| ComputeError::ValidationFailed {
                name: Name::from(scope),
                reason: "module cache entry was not of the expected type".to_string(),
            });
        }

        let already_constructing = self
            .0
            .borrow()
            .constructing
            .iter()
            .any(|(s, t, _)| s == scope && *t == key.1);
        if already_constructing {
            return Err(ComputeError::ModuleCycle { path: self.cycle_path(scope, M::NAME) });
        }

        self.0.borrow_mut().constructing.push((scope.to_string(), key.1, M::NAME));
        let built = M::new(self, scope);
        self.0.borrow_mut().constructing.pop();

        let instance = Rc::new(built?);
        self.0.borrow_mut().module_cache.insert(key, instance.clone() as Rc<dyn Any>);
        Ok(instance)
    }

    fn cycle_path(&self, scope: &str, closing_name: &'static str) -> String {
        let labels: Vec<String> = self
            .0
            .borrow()
            .constructing
            .iter()
            .map(|(s, _, n)| format!("{s}:{n}"))
            .chain(std::iter::once(format!("{scope}:{closing_name}")))
            .collect();
        labels.join(" -> ")
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod t {
    use super::*;

    struct Leaf {
        base: ModuleBase,
    }

    impl ModuleImpl for Leaf {
        const NAME: &'static str = "Leaf";

        fn new(world: &World, scope: &str) -> ComputeResult<Self> {
            Ok(Self { base: ModuleBase::new(world, scope, Self::NAME) })
        }
    }

    struct Root {
        base: ModuleBase,
        leaf: Rc<Leaf>,
    }

    impl ModuleImpl for Root {
        const NAME: &'static str = "Root";

        fn new(world: &World, scope: &str) -> ComputeResult<Self> {
            let base = ModuleBase::new(world, scope, Self::NAME);
            let leaf = base.require::<Leaf>()?;
            Ok(Self { base, leaf })
        }
    }

    #[test_log::test]
    fn require_returns_the_same_cached_instance() {
        let world = World::new();
        let a = world.require::<Root>("").unwrap();
        let b = world.require::<Root>("").unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        assert!(Rc::ptr_eq(&a.leaf, &b.leaf));
        assert_eq!(a.base.prefix, "Root");
    }

    #[test_log::test]
    fn with_config_enables_top_level_span_without_affecting_semantics() {
        let mut config = WorldConfig::new();
        config.emit_top_level_span(true);
        let world = World::with_config(config);
        let root = world.require::<Root>("").unwrap();
        assert_eq!(root.base.prefix, "Root");
    }

    #[test_log::test]
    fn require_after_world_dropped_reports_world_dropped() {
        let world = World::new();
        let base = ModuleBase::new(&world, "", Leaf::NAME);
        drop(world);
        let err = base.require::<Leaf>().unwrap_err();
        assert!(matches!(err, ComputeError::WorldDropped));
    }

    #[test_log::test]
    fn distinct_scopes_get_distinct_instances() {
        let world = World::new();
        let a = world.require::<Leaf>("sim1").unwrap();
        let b = world.require::<Leaf>("sim2").unwrap();
        assert!(!Rc::ptr_eq(&a, &b));
        assert_eq!(a.base.prefix, "sim1.Leaf");
        assert_eq!(b.base.prefix, "sim2.Leaf");
    }

    struct CycleA {
        base: ModuleBase,
        #[allow(dead_code)]
        b: Rc<CycleB>,
    }

    impl ModuleImpl for CycleA {
        const NAME: &'static str = "A";

        fn new(world: &World, scope: &str) -> ComputeResult<Self> {
            let base = ModuleBase::new(world, scope, Self::NAME);
            let b = base.require::<CycleB>()?;
            Ok(Self { base, b })
        }
    }

    struct CycleB {
        #[allow(dead_code)]
        base: ModuleBase,
        #[allow(dead_code)]
        a: Rc<CycleA>,
    }

    impl ModuleImpl for CycleB {
        const NAME: &'static str = "B";

        fn new(world: &World, scope: &str) -> ComputeResult<Self> {
            let base = ModuleBase::new(world, scope, Self::NAME);
            let a = base.require::<CycleA>()?;
            Ok(Self { base, a })
        }
    }

    #[test_log::test]
    fn mutual_require_during_construction_is_a_module_cycle() {
        let world = World::new();
        let err = world.require::<CycleA>("").unwrap_err();
        match err {
            ComputeError::ModuleCycle { path } => {
                assert_eq!(path, ":A -> :B -> :A");
            }
            other => panic!("expected ModuleCycle, got {other:?}"),
        }
    }
}
