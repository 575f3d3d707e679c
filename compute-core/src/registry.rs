#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

use std::{cell::RefCell, collections::HashSet, rc::Rc};

use indexmap::IndexMap;
use tracing::{debug, info_span, trace_span};

use crate::{
    buffer::Buffer,
    errors::{ComputeError, ComputeResult},
    name::Name,
    producer::Producer,
    resource::Resource,
    resource_spec::ResourceSpec,
};

//=================================================================================================|

struct RegistryState {
    resources: IndexMap<Name, Resource>,
    emit_top_level_span: bool,
}

/// The name-keyed store holding every [`Resource`] in a [`World`](crate::module::World).
///
/// A cheap-to-clone handle (`Rc<RefCell<_>>` under the hood) rather than the owner
/// itself — the [`World`] is the sole conceptual owner; everything else, including
/// every [`ResourceRef`](crate::resource_ref::ResourceRef), holds a clone of this handle
/// and resolves resources by name, never by pointer.
#[derive(Clone)]
pub struct Registry(Rc<RefCell<RegistryState>>);

/// Per-pass bookkeeping for [`Registry::ensure`]/[`Registry::ensure_many`]. Never
/// persisted on the registry itself: a fresh one is created per top-level call, and
/// `ensure_many` shares a single one across its whole list.
struct EnsureCtx {
    /// Names currently on the DFS stack, in stack order; doubles as the cycle-path
    /// evidence `ResourceCycle` reports.
    visiting: Vec<Name>,
    ensured: HashSet<Name>,
    ran_producers: HashSet<usize>,
}

impl EnsureCtx {
    fn new() -> Self {
        Self { visiting: Vec::new(), ensured: HashSet::new(), ran_producers: HashSet::new() }
    }
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self(Rc::new(RefCell::new(RegistryState { resources: IndexMap::new(), emit_top_level_span: false })))
    }

    /// Set by [`World::with_config`](crate::module::World::with_config); controls
    /// whether top-level [`ensure`](Self::ensure)/[`ensure_many`](Self::ensure_many)
    /// calls emit an `info`-level span (as opposed to the `debug`/`trace` spans every
    /// producer dispatch emits regardless of this setting).
    pub(crate) fn set_emit_top_level_span(&self, enabled: bool) {
        self.0.borrow_mut().emit_top_level_span = enabled;
    }

    //---------------------------------------------------------------------------------------|
    // Declaration
    //---------------------------------------------------------------------------------------|

    /// Fails with [`DuplicateDeclaration`](ComputeError::DuplicateDeclaration) if `name`
    /// is already present. `deps` may name resources that don't exist yet; unresolved
    /// deps are only fatal at [`ensure`](Self::ensure) time.
    pub fn declare(
        &self,
        name: Name,
        buffer: Option<Box<dyn Buffer>>,
        deps: Vec<Name>,
        producer: Option<Rc<dyn Producer>>,
        description: impl Into<String>,
        spec: Option<ResourceSpec>,
    ) -> ComputeResult<()> {
        if let Some(producer) = &producer {
            if !producer.outputs().iter().any(|output| output == &name) {
                return Err(ComputeError::ProducerOutputNotOwned(name));
            }
        }
        if let Some(spec) = &spec {
            spec.validate(&name, buffer.as_deref(), self)?;
        }

        let mut state = self.0.borrow_mut();
        if state.resources.contains_key(&name) {
            return Err(ComputeError::DuplicateDeclaration(name));
        }
        let resource = Resource::new(name.clone(), buffer, deps, producer, description.into(), spec);
        state.resources.insert(name, resource);
        Ok(())
    }

    //---------------------------------------------------------------------------------------|
    // Reads
    //---------------------------------------------------------------------------------------|

    pub fn read<T>(&self, name: &Name, ensure: bool) -> ComputeResult<Option<T>>
    where
        T: Buffer + Clone + 'static,
    {
        if ensure {
            self.ensure(name)?;
        }
        self.peek::<T>(name)
    }

    /// Returns the current buffer without ensuring; may be `None` or stale.
    pub fn peek<T>(&self, name: &Name) -> ComputeResult<Option<T>>
    where
        T: Buffer + Clone + 'static,
    {
        let state = self.0.borrow();
        let resource = state.resources.get(name).ok_or_else(|| ComputeError::UnknownResource(name.clone()))?;
        match &resource.buffer {
            None => Ok(None),
            Some(buffer) => {
                let concrete = buffer.downcast_ref::<T>().ok_or_else(|| ComputeError::ValidationFailed {
                    name: name.clone(),
                    reason: "committed buffer is not of the expected concrete type".to_string(),
                })?;
                Ok(Some(concrete.clone()))
            }
        }
    }

    //---------------------------------------------------------------------------------------|
    // Writes
    //---------------------------------------------------------------------------------------|

    /// Validates and replaces the buffer. If `bump`, also bumps version and recomputes
    /// `dep_sig`; equivalent to "set" in that case. If not, version and `dep_sig` are
    /// left untouched, supporting allocate-then-fill.
    pub fn set_buffer<T>(&self, name: &Name, value: Option<T>, bump: bool) -> ComputeResult<()>
    where
        T: Buffer + 'static,
    {
        self.set_buffer_dyn(name, value.map(|v| Box::new(v) as Box<dyn Buffer>), bump)
    }

    fn set_buffer_dyn(&self, name: &Name, buffer: Option<Box<dyn Buffer>>, bump: bool) -> ComputeResult<()> {
        let spec = {
            let state = self.0.borrow();
            state.resources.get(name).ok_or_else(|| ComputeError::UnknownResource(name.clone()))?.spec.clone()
        };
        if let Some(spec) = &spec {
            spec.validate(name, buffer.as_deref(), self)?;
        }

        let mut state = self.0.borrow_mut();
        let deps = state
            .resources
            .get(name)
            .ok_or_else(|| ComputeError::UnknownResource(name.clone()))?
            .deps
            .clone();

        let new_dep_sig = if bump { Some(Self::snapshot_dep_sig(&state, &deps)?) } else { None };

        let resource = state.resources.get_mut(name).ok_or_else(|| ComputeError::UnknownResource(name.clone()))?;
        resource.buffer = buffer;
        if let Some(sig) = new_dep_sig {
            resource.version += 1;
            resource.dep_sig = sig;
        }
        Ok(())
    }

    /// Mutates a committed buffer in place without replacing it, for producers updating
    /// an already-correctly-shaped output. Does not touch version or `dep_sig`; follow
    /// with [`commit`](Self::commit) or [`bump`](Self::bump).
    pub fn with_buffer_mut<T, R>(&self, name: &Name, f: impl FnOnce(&mut T) -> R) -> ComputeResult<R>
    where
        T: Buffer + 'static,
    {
        let mut state = self.0.borrow_mut();
        let resource = state.resources.get_mut(name).ok_or_else(|| ComputeError::UnknownResource(name.clone()))?;
        let buffer = resource.buffer.as_mut().ok_or_else(|| ComputeError::ValidationFailed {
            name: name.clone(),
            reason: "no buffer to mutate in place".to_string(),
        })?;
        let concrete = buffer.downcast_mut::<T>().ok_or_else(|| ComputeError::ValidationFailed {
            name: name.clone(),
            reason: "buffer is not of the expected concrete type".to_string(),
        })?;
        Ok(f(concrete))
    }

    /// Bumps version and recomputes `dep_sig`; buffer unchanged. Alias:
    /// [`mark_fresh`](Self::mark_fresh)/[`touch`](Self::touch) at the `ResourceRef` layer.
    pub fn commit(&self, name: &Name) -> ComputeResult<()> {
        self.commit_many(std::slice::from_ref(name))
    }

    /// Commits an entire output set atomically: validation for every provided buffer is
    /// checked before any resource is mutated.
    pub fn commit_many(&self, names: &[Name]) -> ComputeResult<()> {
        self.commit_many_with_buffers(names, None)
    }

    pub fn commit_many_with_buffers(
        &self,
        names: &[Name],
        buffers: Option<Vec<Option<Box<dyn Buffer>>>>,
    ) -> ComputeResult<()> {
        let mut buffers = buffers.unwrap_or_else(|| names.iter().map(|_| None).collect());
        if buffers.len() != names.len() {
            return Err(ComputeError::ValidationFailed {
                name: names.first().cloned().unwrap_or_else(|| Name::from("<commit_many>")),
                reason: "buffers length must match names length".to_string(),
            });
        }

        for (name, buffer) in names.iter().zip(buffers.iter()) {
            if buffer.is_none() {
                continue;
            }
            let spec = {
                let state = self.0.borrow();
                state.resources.get(name).ok_or_else(|| ComputeError::UnknownResource(name.clone()))?.spec.clone()
            };
            if let Some(spec) = &spec {
                spec.validate(name, buffer.as_deref(), self)?;
            }
        }

        let mut state = self.0.borrow_mut();
        for name in names {
            if !state.resources.contains_key(name) {
                return Err(ComputeError::UnknownResource(name.clone()));
            }
        }

        let mut new_dep_sigs = Vec::with_capacity(names.len());
        for name in names {
            let deps = state.resources.get(name).map(|r| r.deps.clone()).unwrap_or_default();
            new_dep_sigs.push(Self::snapshot_dep_sig(&state, &deps)?);
        }

        for ((name, buffer), sig) in names.iter().zip(buffers.drain(..)).zip(new_dep_sigs) {
            if let Some(resource) = state.resources.get_mut(name) {
                if buffer.is_some() {
                    resource.buffer = buffer;
                }
                resource.version += 1;
                resource.dep_sig = sig;
            }
        }
        Ok(())
    }

    /// Bumps version **without** recomputing `dep_sig`: "I re-validated this output;
    /// consider it updated" without changing the upstream baseline freshness is judged
    /// against.
    pub fn bump(&self, name: &Name) -> ComputeResult<()> {
        let mut state = self.0.borrow_mut();
        let resource = state.resources.get_mut(name).ok_or_else(|| ComputeError::UnknownResource(name.clone()))?;
        resource.version += 1;
        Ok(())
    }

    fn snapshot_dep_sig(state: &RegistryState, deps: &[Name]) -> ComputeResult<Vec<(Name, u64)>> {
        deps.iter()
            .map(|dep| {
                state
                    .resources
                    .get(dep)
                    .map(|r| (dep.clone(), r.version))
                    .ok_or_else(|| ComputeError::UnknownResource(dep.clone()))
            })
            .collect()
    }

    //---------------------------------------------------------------------------------------|
    // The ensure algorithm
    //---------------------------------------------------------------------------------------|

    pub fn ensure(&self, name: &Name) -> ComputeResult<()> {
        let _guard = self.top_level_span("ensure", std::slice::from_ref(name));
        let mut ctx = EnsureCtx::new();
        self.ensure_inner(name, &mut ctx)
    }

    /// Ensures each name in order, sharing one pass's `ensured`/`ran_producers` state —
    /// a producer whose outputs are reached from more than one name in the list still
    /// runs at most once.
    pub fn ensure_many(&self, names: &[Name]) -> ComputeResult<()> {
        let _guard = self.top_level_span("ensure_many", names);
        let mut ctx = EnsureCtx::new();
        for name in names {
            self.ensure_inner(name, &mut ctx)?;
        }
        Ok(())
    }

    /// Entered only around the whole top-level call, not per-resource recursion;
    /// a no-op unless [`WorldConfig::emit_top_level_span`](crate::module::WorldConfig::emit_top_level_span)
    /// was enabled.
    fn top_level_span(&self, call: &'static str, names: &[Name]) -> Option<tracing::span::EnteredSpan> {
        if !self.0.borrow().emit_top_level_span {
            return None;
        }
        Some(info_span!("registry.ensure", call, names = ?names).entered())
    }

    fn is_stale(&self, name: &Name) -> ComputeResult<bool> {
        let state = self.0.borrow();
        let resource = state.resources.get(name).ok_or_else(|| ComputeError::UnknownResource(name.clone()))?;
        if resource.version == 0 {
            return Ok(true);
        }
        for (dep_name, seen_version) in &resource.dep_sig {
            let dep = state.resources.get(dep_name).ok_or_else(|| ComputeError::UnknownResource(dep_name.clone()))?;
            if dep.version != *seen_version {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn current_version(&self, name: &Name) -> ComputeResult<u64> {
        let state = self.0.borrow();
        state.resources.get(name).map(|r| r.version).ok_or_else(|| ComputeError::UnknownResource(name.clone()))
    }

    fn ensure_inner(&self, name: &Name, ctx: &mut EnsureCtx) -> ComputeResult<()> {
        if ctx.visiting.contains(name) {
            let mut path = ctx.visiting.clone();
            path.push(name.clone());
            return Err(ComputeError::ResourceCycle { path });
        }
        if ctx.ensured.contains(name) {
            return Ok(());
        }

        let deps = {
            let state = self.0.borrow();
            state
                .resources
                .get(name)
                .ok_or_else(|| ComputeError::UnknownResource(name.clone()))?
                .deps
                .clone()
        };

        ctx.visiting.push(name.clone());

        for dep in &deps {
            self.ensure_inner(dep, ctx)?;
        }

        if !self.is_stale(name)? {
            ctx.visiting.pop();
            ctx.ensured.insert(name.clone());
            return Ok(());
        }

        let producer = {
            let state = self.0.borrow();
            state
                .resources
                .get(name)
                .ok_or_else(|| ComputeError::UnknownResource(name.clone()))?
                .producer
                .clone()
        };

        let Some(producer) = producer else {
            ctx.visiting.pop();
            return Err(ComputeError::UninitializedInput(name.clone()));
        };

        let producer_id = Rc::as_ptr(&producer) as *const () as usize;

        if ctx.ran_producers.contains(&producer_id) {
            if self.is_stale(name)? {
                ctx.visiting.pop();
                return Err(ComputeError::ProducerDidNotCommit { outputs: vec![name.clone()] });
            }
            ctx.visiting.pop();
            ctx.ensured.insert(name.clone());
            return Ok(());
        }

        let outputs = producer.outputs().to_vec();
        for output in &outputs {
            let output_deps = {
                let state = self.0.borrow();
                state
                    .resources
                    .get(output)
                    .ok_or_else(|| ComputeError::UnknownResource(output.clone()))?
                    .deps
                    .clone()
            };
            for dep in &output_deps {
                self.ensure_inner(dep, ctx)?;
            }
        }

        let pre_versions = outputs
            .iter()
            .map(|output| self.current_version(output))
            .collect::<ComputeResult<Vec<_>>>()?;

        let span = trace_span!("producer.compute", producer = ?producer, outputs = ?outputs);
        let _guard = span.enter();
        debug!("running producer");
        producer.compute(self)?;
        drop(_guard);

        let mut delinquent = Vec::new();
        for (output, pre) in outputs.iter().zip(pre_versions.iter()) {
            if self.current_version(output)? <= *pre {
                delinquent.push(output.clone());
            }
        }
        if !delinquent.is_empty() {
            ctx.visiting.pop();
            return Err(ComputeError::ProducerDidNotCommit { outputs: delinquent });
        }

        ctx.ran_producers.insert(producer_id);
        for output in &outputs {
            ctx.ensured.insert(output.clone());
        }

        ctx.visiting.pop();
        Ok(())
    }

    //---------------------------------------------------------------------------------------|
    // Diagnostics
    //---------------------------------------------------------------------------------------|

    /// Enumerates `name`'s transitive deps up to `depth` as structured data; no
    /// mutation. Render with [`ExplainTree`] for a human-readable tree, or consume
    /// the lines directly for tooling. The information content is an API contract
    /// (§7/§8 guarantees depend on it); the rendered text is not.
    pub fn explain(&self, name: &Name, depth: usize) -> ComputeResult<Vec<ExplainLine>> {
        let mut lines = Vec::new();
        self.explain_into(name, depth, 0, &mut lines)?;
        Ok(lines)
    }

    fn explain_into(&self, name: &Name, depth: usize, indent: usize, out: &mut Vec<ExplainLine>) -> ComputeResult<()> {
        let (line, deps) = {
            let state = self.0.borrow();
            let resource = state.resources.get(name).ok_or_else(|| ComputeError::UnknownResource(name.clone()))?;
            let stale_trigger = resource
                .dep_sig
                .iter()
                .find(|(dep, seen)| state.resources.get(dep).map(|r| r.version) != Some(*seen))
                .map(|(dep, seen)| (dep.clone(), *seen, state.resources.get(dep).map(|r| r.version)));
            let fresh = resource.version > 0 && stale_trigger.is_none();
            let producer = resource
                .producer
                .as_ref()
                .map(|p| util::text::truncate_text(format!("{p:?}").into(), 80).into_owned());
            let line = ExplainLine {
                name: name.clone(),
                depth: indent,
                version: resource.version,
                fresh,
                producer,
                stale_trigger,
            };
            (line, resource.deps.clone())
        };
        out.push(line);
        if depth > 0 {
            for dep in &deps {
                self.explain_into(dep, depth - 1, indent + 1, out)?;
            }
        }
        Ok(())
    }
}

//=================================================================================================|

/// One line of [`Registry::explain`]'s output: a resource's name, version,
/// freshness, owning producer (if any), and — when stale because of a dependency —
/// which dependency triggered it and what version it's now at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExplainLine {
    pub name: Name,
    pub depth: usize,
    pub version: u64,
    pub fresh: bool,
    pub producer: Option<String>,
    pub stale_trigger: Option<(Name, u64, Option<u64>)>,
}

/// Renders [`Registry::explain`]'s output as an indented tree. A debugging aid, not a
/// byte-stable format.
pub struct ExplainTree<'a>(pub &'a [ExplainLine]);

impl std::fmt::Display for ExplainTree<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for line in self.0 {
            let producer = line.producer.as_deref().unwrap_or("<input>");
            write!(
                f,
                "{}{} v{} [{}] producer={producer}",
                "  ".repeat(line.depth),
                line.name,
                line.version,
                if line.fresh { "fresh" } else { "stale" },
            )?;
            if let Some((dep, seen, now)) = &line.stale_trigger {
                write!(f, " trigger={dep}@{seen} now={now:?}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod t {
    use super::*;
    use crate::buffer::PlainValue;

    #[derive(Debug)]
    struct NoopProducer {
        outputs: Vec<Name>,
    }

    impl Producer for NoopProducer {
        fn outputs(&self) -> &[Name] {
            &self.outputs
        }

        fn compute(&self, registry: &Registry) -> ComputeResult<()> {
            registry.commit_many(&self.outputs)
        }
    }

    #[derive(Debug)]
    struct DelinquentProducer {
        outputs: Vec<Name>,
    }

    impl Producer for DelinquentProducer {
        fn outputs(&self) -> &[Name] {
            &self.outputs
        }

        fn compute(&self, _registry: &Registry) -> ComputeResult<()> {
            // Declares ownership of its outputs but never commits them.
            Ok(())
        }
    }

    #[test_log::test]
    fn declare_rejects_duplicate_names() {
        let registry = Registry::new();
        let name = Name::from("x");
        registry.declare(name.clone(), None, vec![], None, "", None).unwrap();
        let err = registry.declare(name, None, vec![], None, "", None).unwrap_err();
        assert!(matches!(err, ComputeError::DuplicateDeclaration(_)));
    }

    #[test_log::test]
    fn declare_rejects_producer_that_does_not_list_the_name() {
        let registry = Registry::new();
        let other = Name::from("other");
        let producer = Rc::new(NoopProducer { outputs: vec![other] }) as Rc<dyn Producer>;
        let err = registry.declare(Name::from("x"), None, vec![], Some(producer), "", None).unwrap_err();
        assert!(matches!(err, ComputeError::ProducerOutputNotOwned(_)));
    }

    #[test_log::test]
    fn ensure_on_unknown_name_fails() {
        let registry = Registry::new();
        let err = registry.ensure(&Name::from("ghost")).unwrap_err();
        assert!(matches!(err, ComputeError::UnknownResource(_)));
    }

    #[test_log::test]
    fn ensure_on_uninitialized_input_fails() {
        let registry = Registry::new();
        registry.declare(Name::from("x"), None, vec![], None, "", None).unwrap();
        let err = registry.ensure(&Name::from("x")).unwrap_err();
        assert!(matches!(err, ComputeError::UninitializedInput(_)));
    }

    #[test_log::test]
    fn producer_that_fails_to_commit_is_caught() {
        let registry = Registry::new();
        let name = Name::from("y");
        let producer = Rc::new(DelinquentProducer { outputs: vec![name.clone()] }) as Rc<dyn Producer>;
        registry.declare(name.clone(), None, vec![], Some(producer), "", None).unwrap();
        let err = registry.ensure(&name).unwrap_err();
        match err {
            ComputeError::ProducerDidNotCommit { outputs } => assert_eq!(outputs, vec![name]),
            other => panic!("expected ProducerDidNotCommit, got {other:?}"),
        }
    }

    #[test_log::test]
    fn bump_advances_version_without_touching_dep_sig() {
        let registry = Registry::new();
        let dep = Name::from("d");
        let name = Name::from("r");
        registry.declare(dep.clone(), None, vec![], None, "", None).unwrap();
        registry.set_buffer(&dep, Some(PlainValue(1i64)), true).unwrap();
        registry.declare(name.clone(), None, vec![dep.clone()], None, "", None).unwrap();
        registry.commit(&name).unwrap();
        assert_eq!(registry.current_version(&name).unwrap(), 1);
        let sig_before = registry.0.borrow().resources.get(&name).unwrap().dep_sig.clone();

        registry.bump(&name).unwrap();
        assert_eq!(registry.current_version(&name).unwrap(), 2);
        let sig_after = registry.0.borrow().resources.get(&name).unwrap().dep_sig.clone();
        assert_eq!(sig_before, sig_after);
    }

    #[test_log::test]
    fn explain_reports_stale_trigger() {
        let registry = Registry::new();
        let dep = Name::from("d");
        let name = Name::from("r");
        registry.declare(dep.clone(), None, vec![], None, "", None).unwrap();
        registry.set_buffer(&dep, Some(PlainValue(1i64)), true).unwrap();
        registry.declare(name.clone(), None, vec![dep.clone()], None, "", None).unwrap();
        registry.commit(&name).unwrap();

        registry.set_buffer(&dep, Some(PlainValue(2i64)), true).unwrap();

        let lines = registry.explain(&name, 1).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(!lines[0].fresh);
        assert_eq!(lines[0].stale_trigger.as_ref().map(|(d, _, _)| d.clone()), Some(dep));
    }
}
