use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Global configuration loaded from `~/.config/dlsched/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum number of downloads the admission loop keeps active at once.
    pub max_concurrent_downloads: usize,
    /// Engine tick period in milliseconds.
    pub tick_millis: u64,
    /// How often active tasks are checkpointed to their progress files.
    pub save_interval_secs: u64,
    /// Directory for progress files (None = next to each destination).
    #[serde(default)]
    pub progress_dir: Option<PathBuf>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: 5,
            tick_millis: 200,
            save_interval_secs: 60,
            progress_dir: None,
        }
    }
}

impl SchedulerConfig {
    /// Ceiling used by the scheduler; never below one.
    pub fn effective_max_concurrent(&self) -> usize {
        self.max_concurrent_downloads.max(1)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("dlsched")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<SchedulerConfig> {
    load_or_init_at(&config_path()?)
}

/// Same as [`load_or_init`] but for an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<SchedulerConfig> {
    if !path.exists() {
        let default_cfg = SchedulerConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create config dir: {}", parent.display()))?;
        }
        fs::write(path, toml).with_context(|| format!("write config: {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data =
        fs::read_to_string(path).with_context(|| format!("read config: {}", path.display()))?;
    let cfg: SchedulerConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = SchedulerConfig::default();
        assert_eq!(cfg.max_concurrent_downloads, 5);
        assert_eq!(cfg.tick_millis, 200);
        assert_eq!(cfg.save_interval_secs, 60);
        assert!(cfg.progress_dir.is_none());
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            max_concurrent_downloads = 2
            tick_millis = 50
            save_interval_secs = 10
            progress_dir = "/var/tmp/dlsched"
        "#;
        let cfg: SchedulerConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.max_concurrent_downloads, 2);
        assert_eq!(cfg.tick_millis, 50);
        assert_eq!(cfg.save_interval_secs, 10);
        assert_eq!(cfg.progress_dir.as_deref(), Some(Path::new("/var/tmp/dlsched")));
    }

    #[test]
    fn zero_ceiling_is_clamped() {
        let cfg = SchedulerConfig {
            max_concurrent_downloads: 0,
            ..SchedulerConfig::default()
        };
        assert_eq!(cfg.effective_max_concurrent(), 1);
    }

    #[test]
    fn load_or_init_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = load_or_init_at(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.max_concurrent_downloads, 5);

        let reloaded = load_or_init_at(&path).unwrap();
        assert_eq!(reloaded.tick_millis, cfg.tick_millis);
    }
}
