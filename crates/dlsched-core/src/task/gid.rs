//! Group ids: unique, immutable task identities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric group id of a task. Assigned once by a [`GidGenerator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Gid(u64);

impl Gid {
    pub const fn new(raw: u64) -> Self {
        Gid(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Gid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Forward so width/alignment flags apply to the number.
        fmt::Display::fmt(&self.0, f)
    }
}

/// Monotonic id source. The first id handed out is 1.
#[derive(Debug, Default)]
pub struct GidGenerator {
    last: u64,
}

impl GidGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next id; strictly greater than every id returned before.
    pub fn next(&mut self) -> Gid {
        self.last += 1;
        Gid(self.last)
    }
}
