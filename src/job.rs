//! Job identity, job-scoped file layout and the in-memory job registry.

use crate::logi;
use anyhow::Result;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::fs;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Four random bytes as lowercase hex.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 4];
        rand::thread_rng().fill(&mut bytes);
        Self(bytes.iter().map(|b| format!("{:02x}", b)).collect())
    }

    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() || raw.len() > 64 || !raw.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct JobWorkspace {
    id: JobId,
    temp_dir: PathBuf,
    outputs_dir: PathBuf,
}

impl JobWorkspace {
    pub fn new(id: JobId, temp_dir: impl Into<PathBuf>, outputs_dir: impl Into<PathBuf>) -> Self {
        Self {
            id,
            temp_dir: temp_dir.into(),
            outputs_dir: outputs_dir.into(),
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    pub fn outputs_dir(&self) -> &Path {
        &self.outputs_dir
    }

    fn prefix(&self) -> String {
        format!("{}_", self.id)
    }

    pub fn scene_image_path(&self, index: usize) -> PathBuf {
        self.temp_dir.join(format!("{}_scene_{}.png", self.id, index))
    }

    pub fn segment_file_name(&self, index: usize) -> String {
        format!("{}_scene_{}.mp4", self.id, index)
    }

    pub fn segment_path(&self, index: usize) -> PathBuf {
        self.temp_dir.join(self.segment_file_name(index))
    }

    pub fn concat_list_path(&self) -> PathBuf {
        self.temp_dir.join(format!("{}_concat.txt", self.id))
    }

    pub fn output_path(&self) -> PathBuf {
        self.outputs_dir.join(format!("video_{}.mp4", self.id))
    }

    /// Removes every temp file that belongs to this job. Returns the count.
    pub async fn cleanup_temp(&self) -> Result<usize> {
        if fs::metadata(&self.temp_dir).await.is_err() {
            return Ok(0);
        }

        let prefix = self.prefix();
        let mut removed = 0usize;
        for entry in WalkDir::new(&self.temp_dir).min_depth(1).max_depth(1) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let owned = entry
                .file_name()
                .to_str()
                .map(|name| name.starts_with(&prefix))
                .unwrap_or(false);
            if owned && fs::remove_file(entry.path()).await.is_ok() {
                removed += 1;
            }
        }

        if removed > 0 {
            logi(format!("Removed {} temp file(s) of job {}", removed, self.id));
        }
        Ok(removed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Done,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub id: JobId,
    pub state: JobState,
    pub scene_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Tracks jobs of this process and bounds how many run at once.
pub struct JobRegistry {
    jobs: Mutex<HashMap<JobId, JobRecord>>,
    slots: Arc<Semaphore>,
    retention: Option<Duration>,
}

impl JobRegistry {
    pub fn new(max_concurrent_jobs: usize) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            slots: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
            retention: None,
        }
    }

    /// Finished records older than `retention` are dropped on the next
    /// `register`. `None` keeps them for the life of the process.
    pub fn with_retention(mut self, retention: Option<Duration>) -> Self {
        self.retention = retention;
        self
    }

    pub fn register(&self, scene_count: usize) -> JobId {
        let mut guard = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(cutoff) = self.retention_cutoff(Utc::now()) {
            evict_finished(&mut guard, cutoff);
        }
        let mut id = JobId::generate();
        while guard.contains_key(&id) {
            id = JobId::generate();
        }
        let now = Utc::now();
        guard.insert(
            id.clone(),
            JobRecord {
                id: id.clone(),
                state: JobState::Pending,
                scene_count,
                created_at: now,
                updated_at: now,
                video_url: None,
                message: None,
            },
        );
        id
    }

    /// Waits for a free slot. The slot is released when the permit drops.
    pub async fn acquire_slot(&self) -> Result<OwnedSemaphorePermit> {
        Ok(Arc::clone(&self.slots).acquire_owned().await?)
    }

    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    fn update(&self, id: &JobId, apply: impl FnOnce(&mut JobRecord)) {
        let mut guard = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(record) = guard.get_mut(id) {
            apply(record);
            record.updated_at = Utc::now();
        }
    }

    pub fn mark_running(&self, id: &JobId) {
        self.update(id, |r| r.state = JobState::Running);
    }

    pub fn mark_done(&self, id: &JobId, video_url: &str) {
        self.update(id, |r| {
            r.state = JobState::Done;
            r.video_url = Some(video_url.to_string());
        });
    }

    pub fn mark_failed(&self, id: &JobId, message: &str) {
        self.update(id, |r| {
            r.state = JobState::Failed;
            r.message = Some(message.to_string());
        });
    }

    pub fn get(&self, id: &JobId) -> Option<JobRecord> {
        let guard = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        guard.get(id).cloned()
    }

    fn retention_cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let retention = chrono::Duration::from_std(self.retention?).ok()?;
        now.checked_sub_signed(retention)
    }

    /// Drops done and failed records last updated at or before `cutoff`.
    pub fn evict_finished_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut guard = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        evict_finished(&mut guard, cutoff)
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn evict_finished(jobs: &mut HashMap<JobId, JobRecord>, cutoff: DateTime<Utc>) -> usize {
    let before = jobs.len();
    jobs.retain(|_, r| {
        !matches!(r.state, JobState::Done | JobState::Failed) || r.updated_at > cutoff
    });
    let evicted = before - jobs.len();
    if evicted > 0 {
        logi(format!("Evicted {} finished job record(s)", evicted));
    }
    evicted
}
