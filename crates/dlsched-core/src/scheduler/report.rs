//! End-of-run "Download Results" table.

use std::io;

use crate::task::Task;

use super::Scheduler;

const HEADER: &str = concat!(
    "Download Results:\n",
    " (OK):download completed.(ERR):error occurred.(INPR):download in-progress.\n",
    "gid|stat|path/URI\n",
    "===+====+======================================================================\n",
);

/// Path if finished, else the first URI (with a count of the others), else the
/// path if one is set, else `n/a`.
fn path_or_uri(task: &dyn Task) -> String {
    let path = task.destination_path();
    if task.finished() {
        if let Some(path) = &path {
            return path.display().to_string();
        }
    }
    let uris = task.source_locators();
    match uris.split_first() {
        Some((first, [])) => first.clone(),
        Some((first, rest)) => format!("{} ({} more)", first, rest.len()),
        None => path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "n/a".to_string()),
    }
}

fn format_result(status: &str, task: &dyn Task) -> String {
    format!("{:>3}|{:<4}|{}", task.gid(), status, path_or_uri(task))
}

impl Scheduler {
    /// Write the results table: retired tasks first (`OK`/`ERR`), then the
    /// tasks still active (`OK`/`INPR`).
    pub fn report<W: io::Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(HEADER.as_bytes())?;
        for task in &self.spent {
            let status = if task.finished() { "OK" } else { "ERR" };
            writeln!(out, "{}", format_result(status, task.as_ref()))?;
        }
        for task in &self.active {
            let status = if task.finished() { "OK" } else { "INPR" };
            writeln!(out, "{}", format_result(status, task.as_ref()))?;
        }
        Ok(())
    }

    /// [`Scheduler::report`] rendered into a string.
    pub fn report_string(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.report(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}
