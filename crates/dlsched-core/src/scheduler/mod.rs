//! Admission-control scheduler.
//!
//! Owns three task containers and the concurrency ceiling:
//! - `active`: admitted tasks, in admission order.
//! - `reserved`: tasks waiting for a slot; FIFO, with deferred and follow-up
//!   tasks re-inserted at the front as an ordered block.
//! - `spent`: retired tasks, kept only for the final report.
//!
//! Every method runs to completion on the caller's thread. Task hook failures
//! are logged and never abort a sweep.

mod admit;
mod report;
mod retire;

#[cfg(test)]
mod fake;

use std::collections::VecDeque;

use crate::config::SchedulerConfig;
use crate::stat::TransferStat;
use crate::task::{Gid, GidGenerator, Task, TaskHandle};

pub struct Scheduler {
    active: Vec<TaskHandle>,
    reserved: VecDeque<TaskHandle>,
    spent: Vec<TaskHandle>,
    max_concurrent: usize,
    gids: GidGenerator,
}

impl Scheduler {
    /// Empty scheduler admitting at most `max_concurrent` tasks.
    ///
    /// A ceiling of 0 is raised to 1, same as
    /// [`SchedulerConfig::effective_max_concurrent`].
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            active: Vec::new(),
            reserved: VecDeque::new(),
            spent: Vec::new(),
            max_concurrent: max_concurrent.max(1),
            gids: GidGenerator::new(),
        }
    }

    pub fn from_config(cfg: &SchedulerConfig) -> Self {
        Self::new(cfg.effective_max_concurrent())
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Hands out the next group id for a task about to be created.
    pub fn next_gid(&mut self) -> Gid {
        self.gids.next()
    }

    /// Adds a task straight to the active set, ignoring the ceiling. Meant for
    /// seeding the initial batch before [`Scheduler::initial_commands`].
    pub fn add_task(&mut self, task: TaskHandle) {
        self.active.push(task);
        if self.active.len() > self.max_concurrent {
            tracing::debug!(
                active = self.active.len(),
                max = self.max_concurrent,
                "initial batch exceeds concurrency ceiling"
            );
        }
    }

    /// Queues a task at the back of the reserved queue.
    pub fn add_reserved(&mut self, task: TaskHandle) {
        self.reserved.push_back(task);
    }

    /// Queues several tasks at the back of the reserved queue, in order.
    pub fn add_reserved_all<I>(&mut self, tasks: I)
    where
        I: IntoIterator<Item = TaskHandle>,
    {
        self.reserved.extend(tasks);
    }

    /// Number of active tasks.
    pub fn count(&self) -> usize {
        self.active.len()
    }

    /// Active task at `index`, or None when out of range.
    pub fn by_index(&self, index: usize) -> Option<&TaskHandle> {
        self.active.get(index)
    }

    pub fn reserved_count(&self) -> usize {
        self.reserved.len()
    }

    pub fn spent_count(&self) -> usize {
        self.spent.len()
    }

    pub fn active(&self) -> impl Iterator<Item = &TaskHandle> {
        self.active.iter()
    }

    pub fn reserved(&self) -> impl Iterator<Item = &TaskHandle> {
        self.reserved.iter()
    }

    pub fn spent(&self) -> impl Iterator<Item = &TaskHandle> {
        self.spent.iter()
    }

    /// True when nothing is queued and every active task is stopped and finished.
    pub fn is_complete(&self) -> bool {
        self.reserved.is_empty()
            && self
                .active
                .iter()
                .all(|t| t.num_commands() == 0 && t.finished())
    }

    /// Checkpoint every active task: drop the progress state of fully finished
    /// ones, persist the rest. Nothing leaves the active set.
    pub fn save(&self) {
        for task in &self.active {
            retire::checkpoint(task.as_ref());
        }
    }

    pub fn close_files(&self) {
        for task in &self.active {
            task.close_file();
        }
    }

    /// True if `candidate` opted into the local file check and some other
    /// active task writes to the same destination.
    pub fn is_destination_in_use(&self, candidate: &dyn Task) -> bool {
        if !candidate.pre_local_file_check_enabled() {
            return false;
        }
        // Tasks without a destination yet cannot clobber anything.
        let Some(path) = candidate.destination_path() else {
            return false;
        };
        let gid = candidate.gid();
        self.active
            .iter()
            .any(|t| t.gid() != gid && t.destination_path().as_deref() == Some(path.as_path()))
    }

    /// Ask every active task to stop. Returns immediately; stopped tasks are
    /// picked up by the next retirement sweep.
    pub fn halt_all(&self) {
        for task in &self.active {
            task.set_halt_requested(true);
        }
        tracing::info!(active = self.active.len(), "halt requested");
    }

    /// Sum of the active tasks' transfer statistics.
    pub fn aggregate_stat(&self) -> TransferStat {
        self.active.iter().map(|t| t.transfer_stat()).sum()
    }

    /// Prepend `block` to the reserved queue, keeping its internal order.
    fn prepend_reserved(&mut self, mut block: VecDeque<TaskHandle>) {
        if block.is_empty() {
            return;
        }
        block.append(&mut self.reserved);
        self.reserved = block;
    }
}
