//! Retirement sweep: move stopped tasks from active to spent.

use std::collections::VecDeque;

use crate::task::{Task, TaskHandle};

use super::Scheduler;

/// Discard progress of a fully finished task, persist anyone else's.
/// Failures are logged; the caller's sweep always continues.
pub(super) fn checkpoint(task: &dyn Task) {
    let (result, action) = if task.all_finished() {
        (task.discard_progress(), "discard")
    } else {
        (task.persist_progress(), "save")
    };
    if let Err(e) = result {
        tracing::error!(gid = %task.gid(), error = %e, "could not {} progress", action);
    }
}

fn persist(task: &dyn Task) {
    if let Err(e) = task.persist_progress() {
        tracing::error!(gid = %task.gid(), error = %e, "could not save progress");
    }
}

fn display_destination(task: &dyn Task) -> String {
    task.destination_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "n/a".to_string())
}

impl Scheduler {
    /// Retire every active task with no outstanding commands. Running tasks
    /// stay in admission order. Returns the number retired.
    pub fn retire_stopped(&mut self) -> usize {
        let (running, stopped): (Vec<TaskHandle>, Vec<TaskHandle>) =
            std::mem::take(&mut self.active)
                .into_iter()
                .partition(|t| t.num_commands() > 0);
        self.active = running;

        let count = stopped.len();
        for task in stopped {
            task.close_file();
            if task.finished() {
                tracing::info!(
                    gid = %task.gid(),
                    "download completed: {}",
                    display_destination(task.as_ref())
                );
                checkpoint(task.as_ref());
            } else {
                persist(task.as_ref());
            }

            let follow_ups = task.run_post_processing();
            if !follow_ups.is_empty() {
                tracing::debug!(
                    gid = %task.gid(),
                    "adding {} task(s) from post-processing",
                    follow_ups.len()
                );
                self.prepend_reserved(VecDeque::from(follow_ups));
            }

            task.release_runtime_resources();
            self.spent.push(task);
        }

        if count > 0 {
            tracing::debug!("{} task(s) retired", count);
        }
        count
    }

    /// Record a task that never got going (command creation failed) so the
    /// report still lists it.
    pub(super) fn abandon(&mut self, task: TaskHandle) {
        task.close_file();
        task.release_runtime_resources();
        self.spent.push(task);
    }
}
