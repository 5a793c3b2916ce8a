//! Minimal tick engine: every tick steps each pending command once.

use dlsched_core::engine::{BoxedCommand, Engine, Step};

#[derive(Debug, Default)]
pub struct TickEngine {
    commands: Vec<BoxedCommand>,
    ticks: u64,
}

impl TickEngine {
    /// Step every command once and drop the ones that are done.
    pub fn tick(&mut self) {
        self.ticks += 1;
        self.commands.retain_mut(|c| c.step() == Step::Pending);
    }

    pub fn pending(&self) -> usize {
        self.commands.len()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl Engine for TickEngine {
    fn submit(&mut self, commands: Vec<BoxedCommand>) {
        if !commands.is_empty() {
            tracing::trace!(count = commands.len(), "commands submitted");
        }
        self.commands.extend(commands);
    }
}
