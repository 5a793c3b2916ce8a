//! `dlsched check <manifest>` – validate a manifest and list its tasks.

use anyhow::{Context, Result};
use std::path::Path;

use crate::sim::Manifest;

pub fn run_check(path: &Path) -> Result<()> {
    let manifest = Manifest::load(path)?;
    manifest
        .validate()
        .with_context(|| format!("invalid manifest: {}", path.display()))?;

    if manifest.tasks.is_empty() {
        println!("No tasks in manifest.");
        return Ok(());
    }
    println!("{:<4} {:<20} {:<12} {:<16} {}", "#", "NAME", "SIZE", "AFTER", "URI");
    for (i, entry) in manifest.tasks.iter().enumerate() {
        let after = if entry.depends_on.is_empty() {
            "-".to_string()
        } else {
            entry.depends_on.join(",")
        };
        let uri = match entry.uris.len() {
            0 => "n/a".to_string(),
            1 => entry.uris[0].clone(),
            n => format!("{} ({} more)", entry.uris[0], n - 1),
        };
        println!(
            "{:<4} {:<20} {:<12} {:<16} {}",
            i + 1,
            entry.label(),
            entry.size,
            after,
            uri
        );
        if !entry.follow_up.is_empty() {
            println!("     +{} follow-up task(s)", entry.follow_up.len());
        }
    }
    Ok(())
}
