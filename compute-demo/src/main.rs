#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

//! Walks through the "lazy square" and "allocate-then-fill" scenarios against a real
//! `World`, printing `explain()` output at each step. Not a test — a worked example for
//! anyone wiring up their own module.

use std::rc::Rc;

use anyhow::Context;
use compute_core::{
    ExplainTree, ModuleBase, ModuleImpl, Name, PlainValue, Producer, ProducerIo, ResourceRef,
    TypedArray, WiredProducer, World,
};
use tracing::{info, Level};

struct SquareModule {
    base: ModuleBase,
    x: ResourceRef<PlainValue<f64>>,
    y: ResourceRef<PlainValue<f64>>,
}

struct SquareIo {
    x: ResourceRef<PlainValue<f64>>,
    y: ResourceRef<PlainValue<f64>>,
}

impl ProducerIo for SquareIo {
    fn output_names(&self) -> Vec<Name> {
        vec![self.y.name()]
    }
}

impl ModuleImpl for SquareModule {
    const NAME: &'static str = "Square";

    fn new(world: &World, scope: &str) -> compute_core::ComputeResult<Self> {
        let base = ModuleBase::new(world, scope, Self::NAME);

        let x = base.resource_declared::<PlainValue<f64>>(
            "x",
            None,
            None,
            Vec::new(),
            None,
            "user-set input",
        )?;

        let y = base.resource::<PlainValue<f64>>("y", None);
        let io = SquareIo { x: x.clone(), y: y.clone() };
        let producer: Rc<dyn Producer> = WiredProducer::new(io, |io, registry| {
            let x = registry.read::<PlainValue<f64>>(&io.x.name(), false)?.map(|v| v.0).unwrap_or(0.0);
            io.y.set(PlainValue(x * x))?;
            Ok(())
        })?;

        base.declare_resource(&y, None, vec![x.name()], Some(producer), "x squared")?;

        Ok(Self { base, x, y })
    }
}

struct FillModule {
    base: ModuleBase,
    upstream: ResourceRef<PlainValue<Vec<f64>>>,
    scaled: ResourceRef<TypedArray<f64>>,
}

struct FillIo {
    upstream: ResourceRef<PlainValue<Vec<f64>>>,
    scaled: ResourceRef<TypedArray<f64>>,
}

impl ProducerIo for FillIo {
    fn output_names(&self) -> Vec<Name> {
        vec![self.scaled.name()]
    }
}

impl ModuleImpl for FillModule {
    const NAME: &'static str = "Fill";

    fn new(world: &World, scope: &str) -> compute_core::ComputeResult<Self> {
        let base = ModuleBase::new(world, scope, Self::NAME);

        let upstream = base.resource_declared::<PlainValue<Vec<f64>>>(
            "upstream",
            None,
            None,
            Vec::new(),
            None,
            "user-set input vector",
        )?;

        let scaled = base.resource::<TypedArray<f64>>("scaled", None);
        let io = FillIo { upstream: upstream.clone(), scaled: scaled.clone() };
        let producer: Rc<dyn Producer> = WiredProducer::new(io, |io, registry| {
            let values =
                registry.read::<PlainValue<Vec<f64>>>(&io.upstream.name(), false)?.unwrap_or(PlainValue(Vec::new()));
            let n = values.0.len();

            let needs_alloc = io.scaled.peek()?.map(|buf| buf.data.len() != n).unwrap_or(true);
            if needs_alloc {
                io.scaled.set_buffer(TypedArray::new(vec![0.0; n], vec![n]), false)?;
            }
            io.scaled.with_buffer_mut(|buf| {
                for (dst, src) in buf.data.iter_mut().zip(values.0.iter()) {
                    *dst = src * 2.0;
                }
            })?;
            io.scaled.commit()?;
            Ok(())
        })?;

        base.declare_resource(&scaled, None, vec![upstream.name()], Some(producer), "2x upstream")?;

        Ok(Self { base, upstream, scaled })
    }
}

fn run() -> anyhow::Result<()> {
    let world = World::new();

    let square = world.require::<SquareModule>("").context("constructing SquareModule")?;
    square.x.set(6.0).context("setting Square.x")?;
    let y = square.y.get().context("reading Square.y")?;
    info!(?y, "lazy square: 6 * 6");
    let explanation = square.base.registry().explain(&square.y.name(), 3)?;
    info!("{}", ExplainTree(&explanation));

    square.x.set(7.0).context("re-setting Square.x")?;
    let y = square.y.get().context("reading Square.y after invalidation")?;
    info!(?y, "lazy square after invalidation: 7 * 7");

    let fill = world.require::<FillModule>("").context("constructing FillModule")?;
    fill.upstream.set(PlainValue(vec![1.0, 2.0, 3.0])).context("setting Fill.upstream")?;
    let scaled = fill.scaled.get().context("reading Fill.scaled")?;
    info!(?scaled, "allocate-then-fill: 2x upstream");

    Ok(())
}

fn main() -> anyhow::Result<()> {
    util::tracing_init::init_stderr_logging(Level::INFO).ok();
    run()
}
