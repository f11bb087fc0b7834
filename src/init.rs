use crate::config::Config;
use crate::{logi, logw};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use walkdir::WalkDir;

pub fn required_dirs(config: &Config) -> Vec<PathBuf> {
    let mut dirs = vec![config.temp_images_dir.clone(), config.outputs_dir.clone()];
    if let Some(parent) = config.font_path.parent() {
        if !parent.as_os_str().is_empty() {
            dirs.push(parent.to_path_buf());
        }
    }
    dirs
}

pub async fn ensure_directories(config: &Config) -> Result<()> {
    for dir in required_dirs(config) {
        if !dir.exists() {
            fs::create_dir_all(&dir).await?;
            logi(format!("Created directory: {}", dir.display()));
        }
    }
    Ok(())
}

pub async fn check_ffmpeg() -> bool {
    match tokio::process::Command::new("ffmpeg")
        .arg("-version")
        .output()
        .await
    {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

/// Deletes files under `dir` last modified more than `max_age` ago.
pub async fn sweep_stale_files(dir: &Path, max_age: Duration) -> Result<usize> {
    if !dir.is_dir() {
        return Ok(0);
    }

    let now = SystemTime::now();
    let mut removed = 0usize;
    for entry in WalkDir::new(dir).min_depth(1).contents_first(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let modified = match entry.metadata().ok().and_then(|m| m.modified().ok()) {
            Some(t) => t,
            None => continue,
        };
        let age = now.duration_since(modified).unwrap_or_default();
        if age > max_age && fs::remove_file(entry.path()).await.is_ok() {
            removed += 1;
        }
    }

    if removed > 0 {
        logi(format!("Swept {} stale file(s) from {}", removed, dir.display()));
    }
    Ok(removed)
}

pub async fn sweep_configured_dirs(config: &Config) {
    let Some(max_age) = config.output_retention() else {
        return;
    };
    for dir in [&config.temp_images_dir, &config.outputs_dir] {
        if let Err(err) = sweep_stale_files(dir, max_age).await {
            logw(format!("Stale file sweep failed for {}: {}", dir.display(), err));
        }
    }
}
