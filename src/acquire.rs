//! Image acquisition: primary generator with retries, placeholder fallback.

use crate::api::fetch_image_bytes;
use crate::api::picsum::PicsumService;
use crate::api::pollinations::PollinationsService;
use crate::config::Config;
use crate::retry::{FetchError, RetryPolicy};
use crate::{logi, logok, logw};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use tokio::fs;

/// Where a successfully acquired image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    Primary { attempt: u32 },
    Fallback,
    Failed,
}

impl AcquireOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, AcquireOutcome::Failed)
    }
}

/// Something that can put an image for a prompt at a path.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    async fn acquire_with_outcome(&self, prompt: &str, dest: &Path) -> AcquireOutcome;

    /// `true` when `dest` now holds an image.
    async fn acquire(&self, prompt: &str, dest: &Path) -> bool {
        self.acquire_with_outcome(prompt, dest).await.is_success()
    }
}

pub struct ImageAcquirer {
    client: Client,
    primary: PollinationsService,
    fallback: PicsumService,
    primary_policy: RetryPolicy,
    fallback_policy: RetryPolicy,
}

impl ImageAcquirer {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            primary: PollinationsService::new(&config.primary_image_host, &config.image_model),
            fallback: PicsumService::new(&config.fallback_image_host),
            primary_policy: config.primary_retry_policy(),
            fallback_policy: RetryPolicy::single(config.fallback_timeout()),
        }
    }

    pub fn with_services(
        client: Client,
        primary: PollinationsService,
        fallback: PicsumService,
        primary_policy: RetryPolicy,
        fallback_policy: RetryPolicy,
    ) -> Self {
        Self {
            client,
            primary,
            fallback,
            primary_policy,
            fallback_policy,
        }
    }

    pub fn primary_policy(&self) -> &RetryPolicy {
        &self.primary_policy
    }

    async fn try_primary(&self, prompt: &str, dest: &Path) -> Option<u32> {
        let url = self.primary.prompt_url(prompt);
        let policy = &self.primary_policy;

        for attempt in 1..=policy.max_attempts {
            let result = match fetch_image_bytes(&self.client, &url, policy.timeout).await {
                Ok(bytes) => write_image(dest, &bytes).await,
                Err(err) => Err(err),
            };

            let err = match result {
                Ok(()) => return Some(attempt),
                Err(err) => err,
            };

            logw(format!(
                "Primary image attempt {}/{} failed: {}",
                attempt, policy.max_attempts, err
            ));

            if !policy.should_retry(&err) {
                logw(format!("Not retrying primary image service after {}", err));
                return None;
            }
            if attempt < policy.max_attempts {
                let delay = policy.delay_after(attempt);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }

        None
    }

    async fn try_fallback(&self, prompt: &str, dest: &Path) -> bool {
        let url = self.fallback.placeholder_url(prompt);
        let policy = &self.fallback_policy;

        for attempt in 1..=policy.max_attempts {
            let result = match fetch_image_bytes(&self.client, &url, policy.timeout).await {
                Ok(bytes) => write_image(dest, &bytes).await,
                Err(err) => Err(err),
            };
            match result {
                Ok(()) => return true,
                Err(err) => {
                    logw(format!("Placeholder image attempt {} failed: {}", attempt, err));
                    if !policy.should_retry(&err) {
                        break;
                    }
                    if attempt < policy.max_attempts {
                        tokio::time::sleep(policy.delay_after(attempt)).await;
                    }
                }
            }
        }

        false
    }
}

#[async_trait]
impl ImageProvider for ImageAcquirer {
    async fn acquire_with_outcome(&self, prompt: &str, dest: &Path) -> AcquireOutcome {
        let preview: String = prompt.chars().take(40).collect();
        logi(format!("Generating image for: {}", preview));

        if let Some(attempt) = self.try_primary(prompt, dest).await {
            logok(format!("Image generated (attempt {})", attempt));
            return AcquireOutcome::Primary { attempt };
        }

        logw("Primary image service exhausted, trying placeholder".to_string());
        if self.try_fallback(prompt, dest).await {
            logok(format!("Placeholder image saved: {}", dest.display()));
            return AcquireOutcome::Fallback;
        }

        logw(format!("No image available for: {}", preview));
        remove_partial(dest).await;
        AcquireOutcome::Failed
    }
}

async fn write_image(dest: &Path, bytes: &[u8]) -> Result<(), FetchError> {
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    if let Err(err) = fs::write(dest, bytes).await {
        remove_partial(dest).await;
        return Err(err.into());
    }
    Ok(())
}

async fn remove_partial(dest: &Path) {
    if fs::metadata(dest).await.is_ok() {
        let _ = fs::remove_file(dest).await;
    }
}

pub fn build_http_client() -> Result<Client> {
    Client::builder()
        .user_agent(concat!("scene-shorts/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}
