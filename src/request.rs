use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub voice_off_text: String,
    pub visual_prompt: String,
    /// Not used for timing unless `honor_estimated_duration` is set.
    pub estimated_duration: f64,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRequest {
    pub scenes: Vec<Scene>,
    /// Accepted for compatibility; no narration audio is produced.
    #[serde(default = "default_true")]
    pub include_voice: bool,
    #[serde(default = "default_true")]
    pub include_subtitles: bool,
}

impl VideoRequest {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).with_context(|| "Failed to parse video request JSON")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum VideoResponse {
    Done {
        video_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        job_id: Option<String>,
    },
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        job_id: Option<String>,
    },
}

impl VideoResponse {
    pub fn is_done(&self) -> bool {
        matches!(self, VideoResponse::Done { .. })
    }

    pub fn video_url(&self) -> Option<&str> {
        match self {
            VideoResponse::Done { video_url, .. } => Some(video_url),
            VideoResponse::Error { .. } => None,
        }
    }

    pub fn job_id(&self) -> Option<&str> {
        match self {
            VideoResponse::Done { job_id, .. } | VideoResponse::Error { job_id, .. } => {
                job_id.as_deref()
            }
        }
    }
}
