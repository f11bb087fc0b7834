#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use scene_shorts::acquire::{AcquireOutcome, ImageProvider};
use scene_shorts::config::Config;
use scene_shorts::ffmpeg::VideoEngine;
use scene_shorts::render::{ClipSource, VisualClip};
use scene_shorts::request::{Scene, VideoRequest};
use std::path::Path;
use std::sync::Mutex;
use tokio::fs;

/// Writes a one-line description per segment; concat joins them in list order.
#[derive(Default)]
pub struct RecordingEngine {
    pub rendered: Mutex<Vec<VisualClip>>,
    pub fail_concat: bool,
    /// Behaves like an ffmpeg build without the drawtext filter.
    pub reject_captions: bool,
    /// Behaves like an image input ffmpeg cannot decode.
    pub reject_images: bool,
    pub fail_segments: bool,
    pub attempts: Mutex<usize>,
}

impl RecordingEngine {
    pub fn failing_concat() -> Self {
        Self {
            fail_concat: true,
            ..Self::default()
        }
    }

    pub fn without_drawtext() -> Self {
        Self {
            reject_captions: true,
            ..Self::default()
        }
    }

    pub fn undecodable_images() -> Self {
        Self {
            reject_images: true,
            ..Self::default()
        }
    }

    pub fn failing_segments() -> Self {
        Self {
            fail_segments: true,
            ..Self::default()
        }
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }

    pub fn rendered(&self) -> Vec<VisualClip> {
        self.rendered.lock().unwrap().clone()
    }
}

pub fn describe(clip: &VisualClip) -> String {
    let source = match &clip.source {
        ClipSource::Image(path) => format!(
            "image:{}",
            path.file_name().unwrap().to_string_lossy()
        ),
        ClipSource::Solid([r, g, b]) => format!("solid:{},{},{}", r, g, b),
    };
    let caption = clip
        .caption
        .as_ref()
        .map(|c| c.text().replace('\n', " "))
        .unwrap_or_else(|| "-".to_string());
    format!("{}|{}|{}x{}|{}", source, clip.duration_secs, clip.frame.width, clip.frame.height, caption)
}

#[async_trait]
impl VideoEngine for RecordingEngine {
    async fn render_segment(&self, clip: &VisualClip, out_mp4: &Path) -> Result<()> {
        *self.attempts.lock().unwrap() += 1;
        if self.fail_segments {
            anyhow::bail!("Conversion failed!");
        }
        if self.reject_captions && clip.caption.is_some() {
            anyhow::bail!("No such filter: 'drawtext'");
        }
        if self.reject_images && !clip.is_filler() {
            anyhow::bail!("Invalid data found when processing input");
        }
        self.rendered.lock().unwrap().push(clip.clone());
        fs::write(out_mp4, format!("{}\n", describe(clip))).await?;
        Ok(())
    }

    async fn concat(&self, list_txt: &Path, out_mp4: &Path) -> Result<()> {
        if self.fail_concat {
            fs::write(out_mp4, b"partial").await?;
            anyhow::bail!("encoder crashed");
        }
        let dir = list_txt.parent().unwrap();
        let list = fs::read_to_string(list_txt).await?;
        let mut joined = String::new();
        for line in list.lines() {
            let name = line
                .trim_start_matches("file '")
                .trim_end_matches('\'');
            joined.push_str(&fs::read_to_string(dir.join(name)).await?);
        }
        fs::write(out_mp4, joined).await?;
        Ok(())
    }
}

/// Succeeds for prompts not listed in `failing`.
pub struct StubImages {
    pub failing: Vec<String>,
}

impl StubImages {
    pub fn all_ok() -> Self {
        Self { failing: Vec::new() }
    }
}

#[async_trait]
impl ImageProvider for StubImages {
    async fn acquire_with_outcome(&self, prompt: &str, dest: &Path) -> AcquireOutcome {
        if self.failing.iter().any(|p| p == prompt) {
            return AcquireOutcome::Failed;
        }
        fs::write(dest, prompt.as_bytes()).await.unwrap();
        AcquireOutcome::Primary { attempt: 1 }
    }
}

pub fn test_config(root: &Path) -> Config {
    let font = root.join("resources").join("Inter-Bold.ttf");
    std::fs::create_dir_all(font.parent().unwrap()).unwrap();
    std::fs::write(&font, b"font").unwrap();
    Config {
        temp_images_dir: root.join("temp_images"),
        outputs_dir: root.join("outputs"),
        font_path: font,
        public_base_url: "http://127.0.0.1:8000".to_string(),
        primary_backoff_secs: 0.0,
        ..Config::default()
    }
}

pub fn scene(text: &str, prompt: &str) -> Scene {
    Scene {
        voice_off_text: text.to_string(),
        visual_prompt: prompt.to_string(),
        estimated_duration: 7.5,
    }
}

pub fn request(scenes: Vec<Scene>, include_subtitles: bool) -> VideoRequest {
    VideoRequest {
        scenes,
        include_voice: true,
        include_subtitles,
    }
}

pub fn files_in(dir: &Path) -> Vec<String> {
    match std::fs::read_dir(dir) {
        Ok(entries) => {
            let mut names: Vec<String> = entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect();
            names.sort();
            names
        }
        Err(_) => Vec::new(),
    }
}
