//! Engine collaborator: receives commands created by tasks and ticks them.
//!
//! The scheduler never runs commands itself. It hands each admitted task's
//! initial command set to whatever [`Engine`] drives the tick loop.

use std::fmt;

use crate::task::Gid;

/// Outcome of one engine tick for a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The command wants to be ticked again.
    Pending,
    /// The command is done and can be dropped by the engine.
    Done,
}

/// Unit of work owned by the engine on behalf of a task.
pub trait Command: Send + fmt::Debug {
    /// Group id of the task that created this command.
    fn gid(&self) -> Gid;

    /// Advance by one tick.
    fn step(&mut self) -> Step;
}

pub type BoxedCommand = Box<dyn Command>;

pub trait Engine {
    /// Accept newly created commands; they are ticked from the next tick on.
    fn submit(&mut self, commands: Vec<BoxedCommand>);
}
