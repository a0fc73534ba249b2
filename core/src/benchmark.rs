use anyhow::{anyhow, bail, Context, Result};
use clap::ValueEnum;
use std::fmt;
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use crate::context::{self, ExecutionContext, Immediate, NewThread, TokioContext};
use crate::effect::{run, Effect, Val};

/// How long a single run may take before the benchmark gives up on it
const RUN_TIMEOUT: Duration = Duration::from_secs(600);

/// Chain layout under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shape {
    /// `pure(0).flat_map(|_| pure(1).flat_map(..))`, built lazily
    Bind,
    /// `pure(0).flat_map(..).flat_map(..)..`, built up front
    LeftBind,
    /// `pure(0).map(..).map(..)..`
    Map,
    /// Right-nested binds with a `Deferred` hop on every step
    Async,
}

/// Where the chain runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ContextKind {
    Immediate,
    Thread,
    Tokio,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Shape::Bind => "bind",
            Shape::LeftBind => "left-bind",
            Shape::Map => "map",
            Shape::Async => "async",
        };
        f.write_str(name)
    }
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContextKind::Immediate => "immediate",
            ContextKind::Thread => "thread",
            ContextKind::Tokio => "tokio",
        };
        f.write_str(name)
    }
}

pub struct BenchmarkParams {
    pub depth: usize,
    pub iterations: usize,
    pub shape: Shape,
    pub context: ContextKind,
    pub worker_threads: Option<usize>,
}

struct RunSample {
    elapsed: Duration,
    result: Val,
}

/// Run the benchmark, blocking the calling thread
///
/// Call from a blocking context (`spawn_blocking`), not from async code.
pub fn run_benchmark(params: BenchmarkParams) -> Result<()> {
    println!("🚀 Starting runloop benchmark");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    validate_params(&params)?;

    println!("\n📋 Configuration:");
    println!("   Shape: {}", params.shape);
    println!("   Context: {}", params.context);
    println!("   Depth: {}", params.depth);
    println!("   Iterations: {}", params.iterations);
    if let Some(threads) = params.worker_threads {
        println!("   Worker Threads: {}", threads);
    }

    let runtime = match params.context {
        ContextKind::Tokio => Some(build_runtime(params.worker_threads)?),
        _ => None,
    };
    let ctx: Arc<dyn ExecutionContext> = match (params.context, &runtime) {
        (ContextKind::Immediate, _) => context::shared(Immediate),
        (ContextKind::Thread, _) => context::shared(NewThread::named("runloop-bench")),
        (ContextKind::Tokio, Some(rt)) => context::shared(TokioContext::new(rt.handle().clone())),
        (ContextKind::Tokio, None) => bail!("tokio runtime was not created"),
    };

    println!("\n⏱  Running...");
    let mut samples = Vec::with_capacity(params.iterations);
    for i in 0..params.iterations {
        let sample = run_once(&params, Arc::clone(&ctx))
            .with_context(|| format!("iteration {} failed", i + 1))?;
        println!(
            "   #{:<3} {:>10.2} ms  {:>8.1} ns/step",
            i + 1,
            sample.elapsed.as_secs_f64() * 1000.0,
            per_step_ns(sample.elapsed, params.depth)
        );
        samples.push(sample);
    }

    if let Some(rt) = runtime {
        rt.shutdown_background();
    }

    display_report(&params, &samples)?;
    Ok(())
}

fn validate_params(params: &BenchmarkParams) -> Result<()> {
    if params.depth == 0 {
        return Err(anyhow!("Depth must be at least 1"));
    }
    if params.iterations == 0 {
        return Err(anyhow!("Must run at least 1 iteration"));
    }
    if params.shape == Shape::Async && params.context == ContextKind::Immediate {
        return Err(anyhow!(
            "The async shape needs a thread or tokio context; immediate resumptions nest on the caller's stack"
        ));
    }
    Ok(())
}

fn build_runtime(worker_threads: Option<usize>) -> Result<tokio::runtime::Runtime> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all().thread_name("runloop-tokio");
    if let Some(threads) = worker_threads {
        builder.worker_threads(threads);
    }
    builder.build().context("Failed to build tokio runtime")
}

fn run_once(params: &BenchmarkParams, ctx: Arc<dyn ExecutionContext>) -> Result<RunSample> {
    let chain = build_chain(params.shape, params.depth, Arc::clone(&ctx));
    let effect = Effect::unit().continue_on(ctx).flat_map(move |_| chain);

    let (tx, rx) = mpsc::channel();
    let started = Instant::now();
    run(effect, move |outcome| {
        let _ = tx.send(outcome);
    });
    let outcome = rx
        .recv_timeout(RUN_TIMEOUT)
        .context("Run did not complete in time")?;
    let elapsed = started.elapsed();

    let result = outcome.map_err(|e| anyhow!("Run failed: {}", e))?;
    Ok(RunSample { elapsed, result })
}

/// Chain of `depth` steps counting up from zero
pub fn build_chain(shape: Shape, depth: usize, ctx: Arc<dyn ExecutionContext>) -> Effect {
    match shape {
        Shape::Bind => bind_chain(0, depth),
        Shape::LeftBind => (0..depth).fold(Effect::pure(0.0), |effect, _| {
            effect.flat_map(|v| match v.expect_num() {
                Ok(n) => Effect::pure(n + 1.0),
                Err(e) => Effect::Fail(e),
            })
        }),
        Shape::Map => (0..depth).fold(Effect::pure(0.0), |effect, _| effect.map(increment)),
        Shape::Async => async_chain(ctx, 0, depth),
    }
}

fn bind_chain(i: usize, depth: usize) -> Effect {
    if i >= depth {
        return Effect::pure(i as f64);
    }
    Effect::pure(i as f64).flat_map(move |_| bind_chain(i + 1, depth))
}

fn async_chain(ctx: Arc<dyn ExecutionContext>, i: usize, depth: usize) -> Effect {
    if i >= depth {
        return Effect::pure(i as f64);
    }
    let next = Arc::clone(&ctx);
    Effect::deferred(ctx, move |cb| cb.succeed(i as f64))
        .flat_map(move |_| async_chain(next, i + 1, depth))
}

fn increment(v: Val) -> Val {
    Val::Num(v.as_num().unwrap_or(0.0) + 1.0)
}

fn per_step_ns(elapsed: Duration, depth: usize) -> f64 {
    elapsed.as_nanos() as f64 / depth as f64
}

fn display_report(params: &BenchmarkParams, samples: &[RunSample]) -> Result<()> {
    let total: Duration = samples.iter().map(|s| s.elapsed).sum();
    let best = samples.iter().map(|s| s.elapsed).min().unwrap_or_default();
    let mean = total / samples.len() as u32;

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📊 Results");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("   Total:     {:.2} ms", total.as_secs_f64() * 1000.0);
    println!(
        "   Mean:      {:.2} ms ({:.1} ns/step)",
        mean.as_secs_f64() * 1000.0,
        per_step_ns(mean, params.depth)
    );
    println!(
        "   Best:      {:.2} ms ({:.1} ns/step)",
        best.as_secs_f64() * 1000.0,
        per_step_ns(best, params.depth)
    );
    if let Some(last) = samples.last() {
        let rendered = serde_json::to_string(&last.result).context("Failed to render result")?;
        println!("   Result:    {}", rendered);
    }
    Ok(())
}
