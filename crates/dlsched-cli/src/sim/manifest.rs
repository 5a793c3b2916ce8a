//! TOML manifest of simulated downloads.
//!
//! ```toml
//! [[task]]
//! name = "iso"
//! uris = ["https://a.example/debian.iso", "https://b.example/debian.iso"]
//! path = "debian.iso"
//! size = 4_194_304
//! rate = 262_144            # bytes per tick
//!
//! [[task]]
//! name = "sums"
//! uris = ["https://a.example/SHA256SUMS"]
//! size = 4096
//! depends_on = ["iso"]
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Bytes per tick when an entry gives no rate.
pub const DEFAULT_RATE: u64 = 64 * 1024;

fn default_rate() -> u64 {
    DEFAULT_RATE
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default, rename = "task")]
    pub tasks: Vec<TaskEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskEntry {
    /// Name other entries use in `depends_on`.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub uris: Vec<String>,
    #[serde(default)]
    pub path: Option<PathBuf>,
    pub size: u64,
    #[serde(default = "default_rate")]
    pub rate: u64,
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Simulate a transfer error once this many bytes are done.
    #[serde(default)]
    pub fail_at: Option<u64>,
    /// Refuse to start if another active task writes the same path.
    #[serde(default)]
    pub check_destination: bool,
    /// Tasks started once this one finishes.
    #[serde(default)]
    pub follow_up: Vec<TaskEntry>,
}

impl TaskEntry {
    /// Name for logs: explicit name, else destination, else first URI.
    pub fn label(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        if let Some(path) = &self.path {
            return path.display().to_string();
        }
        self.uris.first().cloned().unwrap_or_else(|| "-".to_string())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("duplicate task name {0:?}")]
    DuplicateName(String),
    #[error("task {task:?} depends on unknown task {dependency:?}")]
    UnknownDependency { task: String, dependency: String },
    #[error("dependency cycle through task {0:?}")]
    Cycle(String),
    #[error("follow-up task {0:?} cannot declare dependencies")]
    NestedDependency(String),
    #[error("task {0:?} has a zero rate")]
    ZeroRate(String),
}

impl Manifest {
    pub fn parse(text: &str) -> Result<Self> {
        let manifest: Manifest = toml::from_str(text).context("parse manifest")?;
        Ok(manifest)
    }

    /// Read a manifest and resolve relative destinations against its directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read manifest: {}", path.display()))?;
        let mut manifest =
            Self::parse(&text).with_context(|| format!("in {}", path.display()))?;
        if let Some(base) = path.parent() {
            manifest.rebase(base);
        }
        Ok(manifest)
    }

    fn rebase(&mut self, base: &Path) {
        fn walk(entries: &mut [TaskEntry], base: &Path) {
            for entry in entries {
                if let Some(path) = entry.path.take() {
                    entry.path = Some(base.join(path));
                }
                walk(&mut entry.follow_up, base);
            }
        }
        walk(&mut self.tasks, base);
    }

    /// Names unique, dependencies known and acyclic, rates non-zero.
    pub fn validate(&self) -> Result<(), ManifestError> {
        let mut by_name: HashMap<&str, &TaskEntry> = HashMap::new();
        for entry in &self.tasks {
            if let Some(name) = &entry.name {
                if by_name.insert(name.as_str(), entry).is_some() {
                    return Err(ManifestError::DuplicateName(name.clone()));
                }
            }
        }

        fn check_nested(entries: &[TaskEntry]) -> Result<(), ManifestError> {
            for entry in entries {
                if entry.rate == 0 {
                    return Err(ManifestError::ZeroRate(entry.label()));
                }
                if !entry.depends_on.is_empty() {
                    return Err(ManifestError::NestedDependency(entry.label()));
                }
                check_nested(&entry.follow_up)?;
            }
            Ok(())
        }

        for entry in &self.tasks {
            if entry.rate == 0 {
                return Err(ManifestError::ZeroRate(entry.label()));
            }
            for dep in &entry.depends_on {
                if !by_name.contains_key(dep.as_str()) {
                    return Err(ManifestError::UnknownDependency {
                        task: entry.label(),
                        dependency: dep.clone(),
                    });
                }
            }
            check_nested(&entry.follow_up)?;
        }

        // Depth-first search; a name seen again while still on the stack is a cycle.
        fn visit<'a>(
            name: &'a str,
            by_name: &HashMap<&'a str, &'a TaskEntry>,
            on_stack: &mut HashSet<&'a str>,
            done: &mut HashSet<&'a str>,
        ) -> Result<(), ManifestError> {
            if done.contains(name) {
                return Ok(());
            }
            if !on_stack.insert(name) {
                return Err(ManifestError::Cycle(name.to_string()));
            }
            if let Some(&entry) = by_name.get(name) {
                for dep in &entry.depends_on {
                    visit(dep.as_str(), by_name, on_stack, done)?;
                }
            }
            on_stack.remove(name);
            done.insert(name);
            Ok(())
        }

        let mut on_stack = HashSet::new();
        let mut done = HashSet::new();
        for &name in by_name.keys() {
            visit(name, &by_name, &mut on_stack, &mut done)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_entries_with_defaults() {
        let m = Manifest::parse(
            r#"
            [[task]]
            name = "iso"
            uris = ["https://a.example/debian.iso", "https://b.example/debian.iso"]
            path = "debian.iso"
            size = 1024

            [[task]]
            uris = ["https://a.example/SHA256SUMS"]
            size = 10
            rate = 5
            depends_on = ["iso"]
            fail_at = 7
            check_destination = true

            [[task.follow_up]]
            uris = ["https://a.example/extra"]
            size = 1
            "#,
        )
        .unwrap();
        assert_eq!(m.tasks.len(), 2);
        assert_eq!(m.tasks[0].rate, DEFAULT_RATE);
        assert_eq!(m.tasks[0].label(), "iso");
        assert_eq!(m.tasks[1].depends_on, vec!["iso".to_string()]);
        assert_eq!(m.tasks[1].fail_at, Some(7));
        assert!(m.tasks[1].check_destination);
        assert_eq!(m.tasks[1].follow_up.len(), 1);
        assert_eq!(m.tasks[1].label(), "https://a.example/SHA256SUMS");
        m.validate().unwrap();
    }

    #[test]
    fn unknown_field_is_rejected() {
        assert!(Manifest::parse("[[task]]\nsize = 1\nspeed = 3\n").is_err());
    }

    #[test]
    fn rejects_duplicate_names() {
        let m = Manifest::parse(
            "[[task]]\nname = \"a\"\nsize = 1\n[[task]]\nname = \"a\"\nsize = 1\n",
        )
        .unwrap();
        assert_eq!(m.validate(), Err(ManifestError::DuplicateName("a".into())));
    }

    #[test]
    fn rejects_unknown_dependency() {
        let m = Manifest::parse("[[task]]\nname = \"a\"\nsize = 1\ndepends_on = [\"b\"]\n").unwrap();
        assert_eq!(
            m.validate(),
            Err(ManifestError::UnknownDependency {
                task: "a".into(),
                dependency: "b".into()
            })
        );
    }

    #[test]
    fn rejects_cycles() {
        let m = Manifest::parse(
            r#"
            [[task]]
            name = "a"
            size = 1
            depends_on = ["b"]
            [[task]]
            name = "b"
            size = 1
            depends_on = ["a"]
            "#,
        )
        .unwrap();
        assert!(matches!(m.validate(), Err(ManifestError::Cycle(_))));
    }

    #[test]
    fn rejects_dependencies_on_follow_ups_and_zero_rate() {
        let m = Manifest::parse(
            r#"
            [[task]]
            name = "a"
            size = 1
            [[task.follow_up]]
            name = "b"
            size = 1
            depends_on = ["a"]
            "#,
        )
        .unwrap();
        assert_eq!(m.validate(), Err(ManifestError::NestedDependency("b".into())));

        let m = Manifest::parse("[[task]]\nname = \"z\"\nsize = 1\nrate = 0\n").unwrap();
        assert_eq!(m.validate(), Err(ManifestError::ZeroRate("z".into())));
    }

    #[test]
    fn load_rebases_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.toml");
        std::fs::write(
            &path,
            "[[task]]\npath = \"out/a.bin\"\nsize = 1\n[[task.follow_up]]\npath = \"b.bin\"\nsize = 1\n",
        )
        .unwrap();
        let m = Manifest::load(&path).unwrap();
        assert_eq!(m.tasks[0].path.as_deref(), Some(dir.path().join("out/a.bin").as_path()));
        assert_eq!(
            m.tasks[0].follow_up[0].path.as_deref(),
            Some(dir.path().join("b.bin").as_path())
        );
    }
}
