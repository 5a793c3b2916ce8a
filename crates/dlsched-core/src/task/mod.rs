//! Task collaborator: one download unit as seen by the scheduler.
//!
//! The scheduler only queries and notifies tasks through this trait; the
//! transfer itself (protocol state, retries, file layout) is the task's own
//! business. Handles are shared (`Arc<dyn Task>`), so every hook takes `&self`
//! and implementations keep their mutable state behind atomics or locks.

mod error;
mod gid;

use std::path::PathBuf;
use std::sync::Arc;

use crate::engine::{BoxedCommand, Engine};
use crate::stat::TransferStat;

pub use error::TaskError;
pub use gid::{Gid, GidGenerator};

/// Shared handle the scheduler keeps in its containers.
pub type TaskHandle = Arc<dyn Task>;

pub trait Task: Send + Sync {
    fn gid(&self) -> Gid;

    /// Candidate source URIs, in preference order. May be empty.
    fn source_locators(&self) -> Vec<String>;

    /// Output file, if one has been decided.
    fn destination_path(&self) -> Option<PathBuf>;

    /// Number of commands still outstanding in the engine; 0 means stopped.
    fn num_commands(&self) -> usize;

    /// This task's own transfer completed.
    fn finished(&self) -> bool;

    /// This task and every piece/file it represents completed, so its
    /// progress state is no longer needed.
    fn all_finished(&self) -> bool;

    /// Opt-in flag for refusing a second download to the same destination.
    fn pre_local_file_check_enabled(&self) -> bool;

    /// Prerequisite tasks (if any) have completed.
    fn dependency_resolved(&self) -> bool;

    fn close_file(&self);

    /// Write resumable progress state.
    fn persist_progress(&self) -> Result<(), TaskError>;

    /// Remove persisted progress state.
    fn discard_progress(&self) -> Result<(), TaskError>;

    /// Runs once the task is retired; returns follow-up tasks (e.g. the
    /// payload of a downloaded manifest) to be scheduled next.
    fn run_post_processing(&self) -> Vec<TaskHandle>;

    /// Drop buffers and handles. Called on retirement regardless of whether
    /// progress could be saved.
    fn release_runtime_resources(&self);

    /// Build the commands that start this task's transfer.
    fn create_initial_commands(
        &self,
        engine: &mut dyn Engine,
    ) -> Result<Vec<BoxedCommand>, TaskError>;

    /// Cooperative shutdown flag; the task winds down on its own.
    fn set_halt_requested(&self, halt: bool);

    fn transfer_stat(&self) -> TransferStat;
}
