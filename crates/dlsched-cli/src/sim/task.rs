//! Simulated download task: moves `rate` bytes per tick, no network I/O.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use dlsched_core::engine::{BoxedCommand, Command, Engine, Step};
use dlsched_core::progress_file::{self, ProgressRecord};
use dlsched_core::stat::TransferStat;
use dlsched_core::task::{Gid, Task, TaskError, TaskHandle};

#[derive(Debug, Default)]
struct SimState {
    bytes_done: u64,
    started: bool,
    failed: bool,
    file_open: bool,
}

/// Static description of a simulated task.
#[derive(Debug, Clone, Default)]
pub struct SimSpec {
    pub label: String,
    pub uris: Vec<String>,
    pub path: Option<PathBuf>,
    pub progress_path: Option<PathBuf>,
    pub size: u64,
    pub rate: u64,
    pub fail_at: Option<u64>,
    pub check_destination: bool,
    pub tick: Duration,
}

pub struct SimTask {
    me: Weak<SimTask>,
    gid: Gid,
    spec: SimSpec,
    deps: Vec<Arc<SimTask>>,
    follow_ups: Mutex<Vec<TaskHandle>>,
    state: Mutex<SimState>,
    commands: AtomicUsize,
    halt: AtomicBool,
}

impl fmt::Debug for SimTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimTask")
            .field("gid", &self.gid)
            .field("label", &self.spec.label)
            .finish()
    }
}

impl SimTask {
    pub fn new(
        gid: Gid,
        spec: SimSpec,
        deps: Vec<Arc<SimTask>>,
        follow_ups: Vec<TaskHandle>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| SimTask {
            me: me.clone(),
            gid,
            spec,
            deps,
            follow_ups: Mutex::new(follow_ups),
            state: Mutex::new(SimState::default()),
            commands: AtomicUsize::new(0),
            halt: AtomicBool::new(false),
        })
    }

    pub fn label(&self) -> &str {
        &self.spec.label
    }

    pub fn has_dependencies(&self) -> bool {
        !self.deps.is_empty()
    }

    pub fn bytes_done(&self) -> u64 {
        self.state().bytes_done
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        // A panic while holding the lock cannot leave SimState inconsistent.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Started at some point and has nothing left in the engine.
    fn settled(&self) -> bool {
        self.state().started && self.num_commands() == 0
    }

    fn record(&self) -> ProgressRecord {
        ProgressRecord {
            gid: self.gid,
            bytes_done: self.bytes_done(),
            total_bytes: self.spec.size,
            uris: self.spec.uris.clone(),
        }
    }

    /// Pick up bytes from an earlier run, if its record matches this task.
    fn resume(&self) -> Result<(), TaskError> {
        let Some(path) = &self.spec.progress_path else {
            return Ok(());
        };
        if let Some(record) = progress_file::load(path)? {
            if record.total_bytes == self.spec.size {
                tracing::info!(gid = %self.gid, bytes = record.bytes_done, "resuming from progress file");
                self.state().bytes_done = record.bytes_done.min(self.spec.size);
            } else {
                tracing::warn!(gid = %self.gid, "progress file size mismatch, starting over");
            }
        }
        Ok(())
    }

    /// One tick of transfer. Returns Done when the command should retire.
    fn advance(&self) -> Step {
        if self.halt.load(Ordering::Relaxed) {
            tracing::debug!(gid = %self.gid, "halted");
            return Step::Done;
        }
        let mut state = self.state();
        let next = state.bytes_done.saturating_add(self.spec.rate).min(self.spec.size);
        if let Some(fail_at) = self.spec.fail_at {
            if next >= fail_at && fail_at < self.spec.size {
                state.bytes_done = fail_at.max(state.bytes_done);
                state.failed = true;
                tracing::warn!(gid = %self.gid, at = fail_at, "simulated transfer error");
                return Step::Done;
            }
        }
        state.bytes_done = next;
        if next >= self.spec.size {
            Step::Done
        } else {
            Step::Pending
        }
    }
}

impl Task for SimTask {
    fn gid(&self) -> Gid {
        self.gid
    }

    fn source_locators(&self) -> Vec<String> {
        self.spec.uris.clone()
    }

    fn destination_path(&self) -> Option<PathBuf> {
        self.spec.path.clone()
    }

    fn num_commands(&self) -> usize {
        self.commands.load(Ordering::Acquire)
    }

    fn finished(&self) -> bool {
        let state = self.state();
        !state.failed && state.bytes_done >= self.spec.size
    }

    fn all_finished(&self) -> bool {
        self.finished()
    }

    fn pre_local_file_check_enabled(&self) -> bool {
        self.spec.check_destination
    }

    fn dependency_resolved(&self) -> bool {
        self.deps.iter().all(|d| d.settled())
    }

    fn close_file(&self) {
        let mut state = self.state();
        if state.file_open {
            tracing::trace!(gid = %self.gid, "file closed");
            state.file_open = false;
        }
    }

    fn persist_progress(&self) -> Result<(), TaskError> {
        match &self.spec.progress_path {
            Some(path) => progress_file::save(path, &self.record()),
            None => Ok(()),
        }
    }

    fn discard_progress(&self) -> Result<(), TaskError> {
        match &self.spec.progress_path {
            Some(path) => progress_file::remove(path),
            None => Ok(()),
        }
    }

    fn run_post_processing(&self) -> Vec<TaskHandle> {
        if !self.finished() {
            return Vec::new();
        }
        std::mem::take(&mut *self.follow_ups.lock().unwrap_or_else(|e| e.into_inner()))
    }

    fn release_runtime_resources(&self) {
        self.state().file_open = false;
    }

    fn create_initial_commands(
        &self,
        _engine: &mut dyn Engine,
    ) -> Result<Vec<BoxedCommand>, TaskError> {
        self.state().started = true;
        if self.halt.load(Ordering::Relaxed) {
            self.state().failed = true;
            return Err(TaskError::CannotStart("halt requested".to_string()));
        }
        if let Some(dep) = self.deps.iter().find(|d| !d.finished()) {
            self.state().failed = true;
            return Err(TaskError::DependencyFailed(dep.gid));
        }
        if self.spec.uris.is_empty() {
            self.state().failed = true;
            return Err(TaskError::CannotStart("no URI".to_string()));
        }
        self.resume()?;

        self.state().file_open = true;
        if self.finished() {
            return Ok(Vec::new());
        }
        let Some(me) = self.me.upgrade() else {
            return Err(TaskError::CannotStart("task dropped".to_string()));
        };
        self.commands.fetch_add(1, Ordering::AcqRel);
        Ok(vec![Box::new(TransferCommand { task: me })])
    }

    fn set_halt_requested(&self, halt: bool) {
        self.halt.store(halt, Ordering::Relaxed);
    }

    fn transfer_stat(&self) -> TransferStat {
        let running = self.num_commands() > 0;
        let ticks_per_sec = 1000 / self.spec.tick.as_millis().clamp(1, 1000) as u64;
        TransferStat {
            bytes_per_sec: if running {
                self.spec.rate.saturating_mul(ticks_per_sec)
            } else {
                0
            },
            bytes_done: self.bytes_done(),
            total_bytes: self.spec.size,
        }
    }
}

/// The single transfer command of a [`SimTask`].
pub struct TransferCommand {
    task: Arc<SimTask>,
}

impl fmt::Debug for TransferCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferCommand")
            .field("gid", &self.task.gid)
            .finish()
    }
}

impl Command for TransferCommand {
    fn gid(&self) -> Gid {
        self.task.gid
    }

    fn step(&mut self) -> Step {
        let step = self.task.advance();
        if step == Step::Done {
            self.task.commands.fetch_sub(1, Ordering::AcqRel);
        }
        step
    }
}
