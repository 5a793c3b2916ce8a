//! `dlsched run <manifest>` – drive the scheduler over a manifest of simulated tasks.

use anyhow::{Context, Result};
use dlsched_core::config::SchedulerConfig;
use dlsched_core::engine::Engine;
use dlsched_core::scheduler::Scheduler;
use dlsched_core::task::{Task, TaskHandle};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;

use crate::sim::{self, Manifest, SimTask, TickEngine};

const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// Command-line overrides for config values.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub max_concurrent: Option<usize>,
    pub tick_ms: Option<u64>,
}

/// Why the tick loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing left to run.
    Finished,
    /// Interrupted; every active task wound down.
    Halted,
    /// Only tasks whose dependencies can never resolve are left.
    Stalled,
}

pub async fn run_manifest(cfg: &SchedulerConfig, path: &Path, opts: &RunOptions) -> Result<()> {
    let manifest = Manifest::load(path)?;
    manifest
        .validate()
        .with_context(|| format!("invalid manifest: {}", path.display()))?;

    let max_concurrent = opts
        .max_concurrent
        .unwrap_or_else(|| cfg.effective_max_concurrent())
        .max(1);
    let tick = Duration::from_millis(opts.tick_ms.unwrap_or(cfg.tick_millis).max(1));
    let save_every = Duration::from_secs(cfg.save_interval_secs.max(1));

    let mut scheduler = Scheduler::new(max_concurrent);
    let tasks = sim::build_tasks(&manifest, &mut scheduler, cfg.progress_dir.as_deref(), tick);
    seed(&mut scheduler, tasks);
    tracing::info!(
        active = scheduler.count(),
        queued = scheduler.reserved_count(),
        max_concurrent,
        "starting run of {}",
        path.display()
    );

    let mut engine = TickEngine::default();
    let outcome = drive(&mut scheduler, &mut engine, tick, save_every, ctrl_c()).await;

    println!();
    scheduler
        .report(&mut std::io::stdout().lock())
        .context("write download results")?;

    let failed = scheduler.spent().filter(|t| !t.finished()).count();
    tracing::info!(?outcome, ticks = engine.ticks(), failed, "run ended");
    match outcome {
        Outcome::Halted => println!("\nInterrupted; progress saved for unfinished downloads."),
        Outcome::Stalled => anyhow::bail!(
            "{} task(s) wait on dependencies that can never complete",
            scheduler.reserved_count()
        ),
        Outcome::Finished => {}
    }
    if failed > 0 {
        anyhow::bail!("{} download(s) did not complete", failed);
    }
    Ok(())
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Seed the scheduler: ready tasks go active up to the ceiling, the rest are
/// queued. Destination collisions are caught when each task is started.
pub(crate) fn seed(scheduler: &mut Scheduler, tasks: Vec<Arc<SimTask>>) {
    for task in tasks {
        let ready = !task.has_dependencies() && scheduler.count() < scheduler.max_concurrent();
        let handle: TaskHandle = task;
        if ready {
            scheduler.add_task(handle);
        } else {
            scheduler.add_reserved(handle);
        }
    }
}

fn print_progress(scheduler: &Scheduler) {
    let stat = scheduler.aggregate_stat();
    let eta = stat
        .eta_secs()
        .map(|s| format!("{:.0}s", s))
        .unwrap_or_else(|| "?".to_string());
    println!(
        "  [{} active, {} queued] {:.1} / {:.1} MiB ({:.1}%)  {:.2} MiB/s  ETA {}",
        scheduler.count(),
        scheduler.reserved_count(),
        stat.bytes_done as f64 / 1_048_576.0,
        stat.total_bytes as f64 / 1_048_576.0,
        stat.fraction() * 100.0,
        stat.bytes_per_sec as f64 / 1_048_576.0,
        eta
    );
}

/// Tick loop: step the engine, retire and admit, checkpoint every
/// `save_every`. When `shutdown` resolves, active tasks are halted and the loop
/// only retires until none is left.
pub(crate) async fn drive<F>(
    scheduler: &mut Scheduler,
    engine: &mut TickEngine,
    tick: Duration,
    save_every: Duration,
    shutdown: F,
) -> Outcome
where
    F: Future<Output = ()>,
{
    let commands = scheduler.initial_commands(engine);
    engine.submit(commands);

    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut checkpoint =
        tokio::time::interval_at(tokio::time::Instant::now() + save_every, save_every);
    let mut last_progress = Instant::now();
    let mut halted = false;
    tokio::pin!(shutdown);

    let outcome = loop {
        tokio::select! {
            _ = ticker.tick() => {
                engine.tick();
                if halted {
                    scheduler.retire_stopped();
                    if scheduler.count() == 0 {
                        break Outcome::Halted;
                    }
                    continue;
                }
                scheduler.fill_from_reserve(engine);
                if scheduler.is_complete() {
                    scheduler.retire_stopped();
                    break Outcome::Finished;
                }
                if scheduler.count() == 0 {
                    tracing::warn!(
                        queued = scheduler.reserved_count(),
                        "no task can be admitted"
                    );
                    break Outcome::Stalled;
                }
                if last_progress.elapsed() >= PROGRESS_INTERVAL {
                    print_progress(scheduler);
                    last_progress = Instant::now();
                }
            }
            _ = checkpoint.tick() => {
                tracing::debug!("checkpoint");
                scheduler.save();
            }
            _ = &mut shutdown, if !halted => {
                tracing::info!("interrupted, halting active downloads");
                halted = true;
                scheduler.halt_all();
            }
        }
    };

    scheduler.save();
    scheduler.close_files();
    outcome
}
