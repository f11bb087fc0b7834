use crate::retry::{Backoff, RetryOn, RetryPolicy};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Upper bound for `primary_backoff_secs`.
pub const MAX_BACKOFF_SECS: f64 = 3600.0;
/// Upper bound for `output_retention_hours` (ten years).
pub const MAX_RETENTION_HOURS: u64 = 24 * 365 * 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Prefix of every `video_url` handed back to clients.
    pub public_base_url: String,
    pub temp_images_dir: PathBuf,
    pub outputs_dir: PathBuf,
    pub font_path: PathBuf,

    pub primary_image_host: String,
    pub image_model: String,
    pub fallback_image_host: String,

    pub primary_max_attempts: u32,
    pub primary_timeout_secs: u64,
    pub primary_backoff_secs: f64,
    /// Grow the backoff exponentially instead of waiting a fixed delay.
    pub primary_backoff_exponential: bool,
    /// Stop retrying the primary service on client errors (4xx except 408/429).
    pub classify_errors: bool,
    pub fallback_timeout_secs: u64,

    pub scene_duration_secs: f64,
    pub honor_estimated_duration: bool,

    pub max_concurrent_jobs: usize,
    pub cleanup_temp_files: bool,
    /// Files older than this are swept at startup; 0 disables the sweep.
    pub output_retention_hours: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            public_base_url: "http://127.0.0.1:8000".to_string(),
            temp_images_dir: PathBuf::from("temp_images"),
            outputs_dir: PathBuf::from("outputs"),
            font_path: PathBuf::from("resources/Inter-Bold.ttf"),
            primary_image_host: "https://image.pollinations.ai".to_string(),
            image_model: "flux".to_string(),
            fallback_image_host: "https://picsum.photos".to_string(),
            primary_max_attempts: 3,
            primary_timeout_secs: 60,
            primary_backoff_secs: 2.0,
            primary_backoff_exponential: false,
            classify_errors: false,
            fallback_timeout_secs: 10,
            scene_duration_secs: 5.0,
            honor_estimated_duration: false,
            max_concurrent_jobs: 2,
            cleanup_temp_files: true,
            output_retention_hours: 72,
        }
    }
}

impl Config {
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` when it exists, otherwise falls back to the defaults.
    pub async fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if fs::metadata(&path).await.is_ok() {
            Self::load(path).await
        } else {
            let config = Self::default();
            config.validate()?;
            Ok(config)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.primary_image_host.is_empty() {
            anyhow::bail!("config: primary_image_host missing");
        }
        if self.fallback_image_host.is_empty() {
            anyhow::bail!("config: fallback_image_host missing");
        }
        if self.public_base_url.is_empty() {
            anyhow::bail!("config: public_base_url missing");
        }
        if self.primary_max_attempts == 0 {
            anyhow::bail!("config: primary_max_attempts must be at least 1");
        }
        if !(self.primary_backoff_secs >= 0.0 && self.primary_backoff_secs <= MAX_BACKOFF_SECS) {
            anyhow::bail!(
                "config: primary_backoff_secs must be between 0 and {}",
                MAX_BACKOFF_SECS
            );
        }
        if self.output_retention_hours > MAX_RETENTION_HOURS {
            anyhow::bail!(
                "config: output_retention_hours must be at most {}",
                MAX_RETENTION_HOURS
            );
        }
        if !(self.scene_duration_secs > 0.0 && self.scene_duration_secs.is_finite()) {
            anyhow::bail!("config: scene_duration_secs must be positive");
        }
        if self.max_concurrent_jobs == 0 {
            anyhow::bail!("config: max_concurrent_jobs must be at least 1");
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn primary_retry_policy(&self) -> RetryPolicy {
        let base = Duration::from_secs_f64(self.primary_backoff_secs);
        let backoff = if self.primary_backoff_exponential {
            Backoff::Exponential {
                base,
                max: Duration::from_secs(60),
            }
        } else {
            Backoff::Fixed(base)
        };

        RetryPolicy {
            max_attempts: self.primary_max_attempts,
            timeout: Duration::from_secs(self.primary_timeout_secs),
            backoff,
            retry_on: if self.classify_errors {
                RetryOn::TransientOnly
            } else {
                RetryOn::AnyFailure
            },
        }
    }

    pub fn fallback_timeout(&self) -> Duration {
        Duration::from_secs(self.fallback_timeout_secs)
    }

    pub fn output_retention(&self) -> Option<Duration> {
        if self.output_retention_hours == 0 {
            return None;
        }
        self.output_retention_hours
            .checked_mul(3600)
            .map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.primary_max_attempts, 3);
        assert_eq!(cfg.primary_timeout_secs, 60);
        assert_eq!(cfg.fallback_timeout_secs, 10);
        assert_eq!(cfg.scene_duration_secs, 5.0);
        assert!(!cfg.honor_estimated_duration);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: Config =
            serde_json::from_str(r#"{"port": 9100, "image_model": "turbo"}"#).unwrap();
        assert_eq!(cfg.port, 9100);
        assert_eq!(cfg.image_model, "turbo");
        assert_eq!(cfg.outputs_dir, PathBuf::from("outputs"));
        assert_eq!(cfg.bind_addr(), "127.0.0.1:9100");
    }

    #[test]
    fn demo_config_parses() {
        let cfg: Config = serde_json::from_str(include_str!("../demos/config.json")).unwrap();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.image_model, "flux");
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let cfg = Config {
            primary_max_attempts: 0,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn retry_policy_reflects_flags() {
        let cfg = Config {
            classify_errors: true,
            primary_backoff_exponential: true,
            ..Config::default()
        };
        let policy = cfg.primary_retry_policy();
        assert_eq!(policy.retry_on, RetryOn::TransientOnly);
        assert!(matches!(policy.backoff, Backoff::Exponential { .. }));

        let policy = Config::default().primary_retry_policy();
        assert_eq!(policy.retry_on, RetryOn::AnyFailure);
        assert_eq!(policy.backoff, Backoff::Fixed(Duration::from_secs(2)));
    }

    #[test]
    fn retention_zero_disables_sweep() {
        let cfg = Config {
            output_retention_hours: 0,
            ..Config::default()
        };
        assert!(cfg.output_retention().is_none());
        assert_eq!(
            Config::default().output_retention(),
            Some(Duration::from_secs(72 * 3600))
        );
    }

    #[test]
    fn out_of_range_durations_are_rejected() {
        for backoff in [f64::MAX, f64::INFINITY, f64::NAN, -1.0, MAX_BACKOFF_SECS + 1.0] {
            let cfg = Config {
                primary_backoff_secs: backoff,
                ..Config::default()
            };
            assert!(cfg.validate().is_err(), "backoff {} accepted", backoff);
        }
        let cfg = Config {
            output_retention_hours: u64::MAX,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
        // unvalidated values must not overflow either
        assert!(cfg.output_retention().is_none());
    }

    #[tokio::test]
    async fn load_or_default_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_or_default(dir.path().join("missing.json"))
            .await
            .unwrap();
        assert_eq!(cfg.port, 8000);
    }

    #[tokio::test]
    async fn load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        tokio::fs::write(&path, r#"{"max_concurrent_jobs": 0}"#)
            .await
            .unwrap();
        assert!(Config::load(&path).await.is_err());
    }
}
