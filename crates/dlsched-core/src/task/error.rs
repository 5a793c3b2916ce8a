//! Recoverable task errors.

use std::io;
use std::path::PathBuf;

use super::Gid;

/// Error returned by the task hooks the scheduler calls (progress persistence,
/// initial command creation). The scheduler logs these and carries on; they
/// never escape a sweep.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Progress file could not be written, read or removed.
    #[error("progress file {}: {source}", .path.display())]
    Progress {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Progress state could not be encoded or decoded.
    #[error("progress state in {}: {source}", .path.display())]
    Codec {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// A prerequisite task stopped without finishing.
    #[error("dependency gid {0} did not complete")]
    DependencyFailed(Gid),
    /// Another active task already writes to this destination.
    #[error("destination {} is already being downloaded", .0.display())]
    DestinationInUse(PathBuf),
    /// The task cannot produce commands (no locator, halted, ...).
    #[error("cannot start download: {0}")]
    CannotStart(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let err = TaskError::Progress {
            path: PathBuf::from("/tmp/x.iso.dlsched"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "progress file /tmp/x.iso.dlsched: denied");
        assert!(std::error::Error::source(&err).is_some());

        let err = TaskError::DependencyFailed(Gid::new(3));
        assert_eq!(err.to_string(), "dependency gid 3 did not complete");
    }
}
