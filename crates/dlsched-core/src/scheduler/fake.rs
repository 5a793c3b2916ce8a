//! Scriptable task and engine doubles for scheduler tests.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::engine::{BoxedCommand, Command, Engine, Step};
use crate::stat::TransferStat;
use crate::task::{Gid, Task, TaskError, TaskHandle};

#[derive(Debug)]
pub(super) struct FakeCommand(Gid);

impl Command for FakeCommand {
    fn gid(&self) -> Gid {
        self.0
    }

    fn step(&mut self) -> Step {
        Step::Done
    }
}

/// Engine that only remembers which task each submitted command belongs to.
#[derive(Default)]
pub(super) struct RecordingEngine {
    pub submitted: Vec<Gid>,
}

impl Engine for RecordingEngine {
    fn submit(&mut self, commands: Vec<BoxedCommand>) {
        self.submitted.extend(commands.iter().map(|c| c.gid()));
    }
}

pub(super) struct FakeTask {
    gid: Gid,
    uris: Vec<String>,
    path: Option<PathBuf>,
    commands: AtomicUsize,
    finished: AtomicBool,
    all_finished: AtomicBool,
    resolved: AtomicBool,
    check_destination: bool,
    fail_persist: bool,
    fail_create: bool,
    halted: AtomicBool,
    stat: TransferStat,
    follow_ups: Mutex<Vec<TaskHandle>>,
    calls: Mutex<Vec<&'static str>>,
}

impl FakeTask {
    /// Stopped, unfinished, resolved task with no destination or URIs.
    pub fn new(gid: u64) -> Self {
        Self {
            gid: Gid::new(gid),
            uris: Vec::new(),
            path: None,
            commands: AtomicUsize::new(0),
            finished: AtomicBool::new(false),
            all_finished: AtomicBool::new(false),
            resolved: AtomicBool::new(true),
            check_destination: false,
            fail_persist: false,
            fail_create: false,
            halted: AtomicBool::new(false),
            stat: TransferStat::default(),
            follow_ups: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_uris(mut self, uris: &[&str]) -> Self {
        self.uris = uris.iter().map(|u| u.to_string()).collect();
        self
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.path = Some(PathBuf::from(path));
        self
    }

    pub fn with_commands(self, n: usize) -> Self {
        self.commands.store(n, Ordering::SeqCst);
        self
    }

    pub fn with_finished(self, finished: bool, all_finished: bool) -> Self {
        self.finished.store(finished, Ordering::SeqCst);
        self.all_finished.store(all_finished, Ordering::SeqCst);
        self
    }

    pub fn unresolved(self) -> Self {
        self.resolved.store(false, Ordering::SeqCst);
        self
    }

    pub fn with_destination_check(mut self) -> Self {
        self.check_destination = true;
        self
    }

    pub fn failing_persist(mut self) -> Self {
        self.fail_persist = true;
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn with_stat(mut self, stat: TransferStat) -> Self {
        self.stat = stat;
        self
    }

    pub fn with_follow_ups(self, tasks: Vec<TaskHandle>) -> Self {
        *self.follow_ups.lock().unwrap() = tasks;
        self
    }

    pub fn arc(self) -> Arc<FakeTask> {
        Arc::new(self)
    }

    pub fn set_commands(&self, n: usize) {
        self.commands.store(n, Ordering::SeqCst);
    }

    pub fn set_resolved(&self, resolved: bool) {
        self.resolved.store(resolved, Ordering::SeqCst);
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called(&self, name: &str) -> bool {
        self.calls().contains(&name)
    }

    fn record(&self, name: &'static str) {
        self.calls.lock().unwrap().push(name);
    }

    fn progress_error(&self) -> TaskError {
        TaskError::Progress {
            path: PathBuf::from(format!("/nonexistent/{}.dlsched", self.gid)),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        }
    }
}

impl Task for FakeTask {
    fn gid(&self) -> Gid {
        self.gid
    }

    fn source_locators(&self) -> Vec<String> {
        self.uris.clone()
    }

    fn destination_path(&self) -> Option<PathBuf> {
        self.path.clone()
    }

    fn num_commands(&self) -> usize {
        self.commands.load(Ordering::SeqCst)
    }

    fn finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    fn all_finished(&self) -> bool {
        self.all_finished.load(Ordering::SeqCst)
    }

    fn pre_local_file_check_enabled(&self) -> bool {
        self.check_destination
    }

    fn dependency_resolved(&self) -> bool {
        self.resolved.load(Ordering::SeqCst)
    }

    fn close_file(&self) {
        self.record("close");
    }

    fn persist_progress(&self) -> Result<(), TaskError> {
        self.record("persist");
        if self.fail_persist {
            return Err(self.progress_error());
        }
        Ok(())
    }

    fn discard_progress(&self) -> Result<(), TaskError> {
        self.record("discard");
        if self.fail_persist {
            return Err(self.progress_error());
        }
        Ok(())
    }

    fn run_post_processing(&self) -> Vec<TaskHandle> {
        self.record("post");
        std::mem::take(&mut *self.follow_ups.lock().unwrap())
    }

    fn release_runtime_resources(&self) {
        self.record("release");
    }

    fn create_initial_commands(
        &self,
        _engine: &mut dyn Engine,
    ) -> Result<Vec<BoxedCommand>, TaskError> {
        self.record("create");
        if self.fail_create {
            return Err(TaskError::CannotStart("no usable URI".to_string()));
        }
        self.commands.store(1, Ordering::SeqCst);
        Ok(vec![Box::new(FakeCommand(self.gid))])
    }

    fn set_halt_requested(&self, halt: bool) {
        self.halted.store(halt, Ordering::SeqCst);
    }

    fn transfer_stat(&self) -> TransferStat {
        self.stat
    }
}
