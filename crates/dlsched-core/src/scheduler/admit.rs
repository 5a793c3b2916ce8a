//! Admission: move ready tasks from reserved to active and start them.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::engine::{BoxedCommand, Engine};
use crate::task::{Task, TaskError, TaskHandle};

use super::Scheduler;

impl Scheduler {
    /// Retire stopped tasks, then admit reserved tasks into the freed slots.
    ///
    /// A task whose dependency is unresolved is skipped without using a slot,
    /// so it cannot hold back ready tasks queued behind it. Skipped tasks go
    /// back to the front of the queue in their original order. Returns the
    /// number of tasks admitted.
    pub fn fill_from_reserve(&mut self, engine: &mut dyn Engine) -> usize {
        self.retire_stopped();

        let mut slots = self.max_concurrent.saturating_sub(self.active.len());
        let mut deferred = VecDeque::new();
        let mut admitted = 0usize;

        while slots > 0 {
            let Some(task) = self.reserved.pop_front() else {
                break;
            };
            if !task.dependency_resolved() {
                tracing::trace!(gid = %task.gid(), "dependency unresolved, deferring");
                deferred.push_back(task);
                continue;
            }
            let started = self
                .claim_destination(task.as_ref())
                .and_then(|()| task.create_initial_commands(engine));
            match started {
                Ok(commands) => {
                    tracing::debug!(gid = %task.gid(), commands = commands.len(), "admitted");
                    self.active.push(Arc::clone(&task));
                    engine.submit(commands);
                    slots -= 1;
                    admitted += 1;
                }
                Err(e) => {
                    tracing::error!(gid = %task.gid(), error = %e, "could not start task");
                    self.abandon(task);
                }
            }
        }

        self.prepend_reserved(deferred);

        if admitted > 0 {
            tracing::debug!("{} task(s) admitted", admitted);
        }
        admitted
    }

    /// One-time startup pass over the initial active set.
    ///
    /// Collects the initial commands of every resolved task, in active order,
    /// for the caller to submit. Unresolved tasks move to the front of the
    /// reserved queue (keeping their order); tasks that fail to start, or
    /// whose destination an earlier task already claimed, are dropped from
    /// the active set.
    pub fn initial_commands(&mut self, engine: &mut dyn Engine) -> Vec<BoxedCommand> {
        let mut commands = Vec::new();
        let mut deferred: VecDeque<TaskHandle> = VecDeque::new();

        for task in std::mem::take(&mut self.active) {
            if !task.dependency_resolved() {
                deferred.push_back(task);
                continue;
            }
            let started = self
                .claim_destination(task.as_ref())
                .and_then(|()| task.create_initial_commands(engine));
            match started {
                Ok(next) => {
                    commands.extend(next);
                    self.active.push(task);
                }
                Err(e) => {
                    tracing::error!(gid = %task.gid(), error = %e, "could not start task");
                    self.abandon(task);
                }
            }
        }

        if !deferred.is_empty() {
            tracing::debug!("{} task(s) waiting on dependencies", deferred.len());
        }
        self.prepend_reserved(deferred);
        commands
    }

    /// Fails if `task` opted into the local file check and an active task
    /// already writes its destination.
    fn claim_destination(&self, task: &dyn Task) -> Result<(), TaskError> {
        match task.destination_path() {
            Some(path) if self.is_destination_in_use(task) => {
                Err(TaskError::DestinationInUse(path))
            }
            _ => Ok(()),
        }
    }
}
