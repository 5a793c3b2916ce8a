//! Simulated tasks and engine used by `dlsched run`.
//!
//! Turns a manifest into [`SimTask`]s with scheduler-assigned gids and wires up
//! their dependencies and follow-ups.

mod engine;
mod manifest;
mod task;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use dlsched_core::progress_file;
use dlsched_core::scheduler::Scheduler;
use dlsched_core::task::{Gid, TaskHandle};

pub use engine::TickEngine;
pub use manifest::{Manifest, ManifestError, TaskEntry};
pub use task::{SimSpec, SimTask};

fn sim_spec(entry: &TaskEntry, progress_dir: Option<&Path>, tick: Duration) -> SimSpec {
    SimSpec {
        label: entry.label(),
        uris: entry.uris.clone(),
        path: entry.path.clone(),
        progress_path: entry
            .path
            .as_deref()
            .map(|p| progress_file::progress_path_for(p, progress_dir)),
        size: entry.size,
        rate: entry.rate,
        fail_at: entry.fail_at,
        check_destination: entry.check_destination,
        tick,
    }
}

fn build_follow_ups(
    entries: &[TaskEntry],
    scheduler: &mut Scheduler,
    progress_dir: Option<&Path>,
    tick: Duration,
) -> Vec<TaskHandle> {
    entries
        .iter()
        .map(|entry| {
            let gid = scheduler.next_gid();
            let children = build_follow_ups(&entry.follow_up, scheduler, progress_dir, tick);
            let spec = sim_spec(entry, progress_dir, tick);
            SimTask::new(gid, spec, Vec::new(), children) as TaskHandle
        })
        .collect()
}

struct Builder<'a> {
    manifest: &'a Manifest,
    index_of: HashMap<&'a str, usize>,
    gids: Vec<Gid>,
    built: Vec<Option<Arc<SimTask>>>,
    progress_dir: Option<&'a Path>,
    tick: Duration,
}

impl Builder<'_> {
    /// Build entry `i`, building its prerequisites first.
    fn build(&mut self, i: usize, scheduler: &mut Scheduler) -> Arc<SimTask> {
        if let Some(task) = &self.built[i] {
            return Arc::clone(task);
        }
        let manifest = self.manifest;
        let entry = &manifest.tasks[i];
        let mut deps = Vec::with_capacity(entry.depends_on.len());
        for name in &entry.depends_on {
            if let Some(&j) = self.index_of.get(name.as_str()) {
                deps.push(self.build(j, scheduler));
            }
        }
        let follow_ups =
            build_follow_ups(&entry.follow_up, scheduler, self.progress_dir, self.tick);
        let task = SimTask::new(
            self.gids[i],
            sim_spec(entry, self.progress_dir, self.tick),
            deps,
            follow_ups,
        );
        self.built[i] = Some(Arc::clone(&task));
        task
    }
}

/// Build the top-level tasks of a validated manifest, in manifest order.
///
/// Top-level entries get the first gids; follow-ups are numbered after them.
/// The manifest must be acyclic (see [`Manifest::validate`]).
pub fn build_tasks(
    manifest: &Manifest,
    scheduler: &mut Scheduler,
    progress_dir: Option<&Path>,
    tick: Duration,
) -> Vec<Arc<SimTask>> {
    let mut builder = Builder {
        manifest,
        index_of: manifest
            .tasks
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.name.as_deref().map(|n| (n, i)))
            .collect(),
        gids: manifest.tasks.iter().map(|_| scheduler.next_gid()).collect(),
        built: vec![None; manifest.tasks.len()],
        progress_dir,
        tick,
    };
    (0..manifest.tasks.len())
        .map(|i| builder.build(i, scheduler))
        .collect()
}
