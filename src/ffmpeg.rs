use crate::caption::Caption;
use crate::render::{ClipSource, VisualClip};
use crate::{logi, logw};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

pub const OUTPUT_FPS: u32 = 24;
pub const VIDEO_CODEC: &str = "libx264";
/// Fastest x264 preset; output size is not a concern.
pub const ENCODE_PRESET: &str = "ultrafast";

/// The encoder seam. Segments are rendered one per clip, then joined.
#[async_trait]
pub trait VideoEngine: Send + Sync {
    async fn render_segment(&self, clip: &VisualClip, out_mp4: &Path) -> Result<()>;

    /// `list_txt` is an ffmpeg concat list, entries relative to its directory.
    async fn concat(&self, list_txt: &Path, out_mp4: &Path) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct FfmpegEngine;

impl FfmpegEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl VideoEngine for FfmpegEngine {
    async fn render_segment(&self, clip: &VisualClip, out_mp4: &Path) -> Result<()> {
        run_cmd(&segment_args(clip, out_mp4)).await?;
        if !out_mp4.exists() {
            anyhow::bail!("ffmpeg produced no segment at {}", out_mp4.display());
        }
        Ok(())
    }

    async fn concat(&self, list_txt: &Path, out_mp4: &Path) -> Result<()> {
        run_cmd(&concat_args(list_txt, out_mp4)).await?;
        if !out_mp4.exists() {
            anyhow::bail!("ffmpeg produced no output at {}", out_mp4.display());
        }
        match ffprobe_duration_seconds(out_mp4).await {
            Ok(dur) => logi(format!("Output duration: {:.2} seconds", dur)),
            Err(err) => logw(format!("Could not probe output duration: {}", err)),
        }
        Ok(())
    }
}

async fn run_cmd(args: &[String]) -> Result<()> {
    if args.is_empty() {
        return Ok(());
    }

    let output = Command::new(&args[0])
        .args(&args[1..])
        .output()
        .await
        .with_context(|| format!("Failed to run {}", args[0]))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow::anyhow!(
            "Command failed ({}): {}",
            output.status,
            stderr.trim()
        ));
    }

    Ok(())
}

pub async fn ffprobe_duration_seconds(path: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .await
        .context("ffprobe duration failed")?;

    if !output.status.success() {
        return Err(anyhow::anyhow!("ffprobe failed"));
    }

    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let duration = text.parse::<f64>().unwrap_or(-1.0);
    if duration <= 0.0 {
        return Err(anyhow::anyhow!("Invalid duration"));
    }
    Ok(duration)
}

/// Escapes a value for use inside a filtergraph option. Backslash, colon and
/// quote are escaped for both the option and the graph level.
pub fn escape_filter_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\\\\\"),
            ':' => out.push_str("\\\\:"),
            '\'' => out.push_str("\\\\\\'"),
            ',' | '[' | ']' | ';' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}

fn caption_filters(caption: &Caption) -> Vec<String> {
    let style = &caption.style;
    let block = caption.block_height();
    let line_height = style.line_height();
    let font = escape_filter_value(&style.font_path.to_string_lossy());

    caption
        .lines
        .iter()
        .enumerate()
        .map(|(idx, line)| {
            format!(
                "drawtext=fontfile={}:textfile={}:expansion=none:fontsize={}:fontcolor={}:borderw={}:bordercolor={}:x=(w-text_w)/2:y=(h-{})/2+{}",
                font,
                escape_filter_value(&line.text_file.to_string_lossy()),
                style.font_size,
                style.color,
                style.stroke_width,
                style.stroke_color,
                block,
                line_height * idx as u32,
            )
        })
        .collect()
}

pub fn segment_filter(clip: &VisualClip) -> String {
    let (w, h) = (clip.frame.width, clip.frame.height);
    let mut filters = Vec::new();
    if let ClipSource::Image(_) = clip.source {
        filters.push(format!(
            "scale={}:{}:force_original_aspect_ratio=increase",
            w, h
        ));
        filters.push(format!("crop={}:{}", w, h));
    }
    filters.push("setsar=1".to_string());
    if let Some(caption) = &clip.caption {
        filters.extend(caption_filters(caption));
    }
    filters.join(",")
}

pub fn segment_args(clip: &VisualClip, out_mp4: &Path) -> Vec<String> {
    let duration = format!("{:.3}", clip.duration_secs);
    let mut args = vec![
        "ffmpeg".to_string(),
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
    ];

    match &clip.source {
        ClipSource::Image(path) => {
            args.extend([
                "-loop".to_string(),
                "1".to_string(),
                "-framerate".to_string(),
                OUTPUT_FPS.to_string(),
                "-i".to_string(),
                path.display().to_string(),
            ]);
        }
        ClipSource::Solid([r, g, b]) => {
            args.extend([
                "-f".to_string(),
                "lavfi".to_string(),
                "-i".to_string(),
                format!(
                    "color=c=0x{:02x}{:02x}{:02x}:s={}x{}:r={}:d={}",
                    r, g, b, clip.frame.width, clip.frame.height, OUTPUT_FPS, duration
                ),
            ]);
        }
    }

    args.extend([
        "-t".to_string(),
        duration,
        "-vf".to_string(),
        segment_filter(clip),
        "-r".to_string(),
        OUTPUT_FPS.to_string(),
        "-c:v".to_string(),
        VIDEO_CODEC.to_string(),
        "-preset".to_string(),
        ENCODE_PRESET.to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-an".to_string(),
        out_mp4.display().to_string(),
    ]);
    args
}

pub fn concat_args(list_txt: &Path, out_mp4: &Path) -> Vec<String> {
    vec![
        "ffmpeg".to_string(),
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        list_txt.display().to_string(),
        "-r".to_string(),
        OUTPUT_FPS.to_string(),
        "-c:v".to_string(),
        VIDEO_CODEC.to_string(),
        "-preset".to_string(),
        ENCODE_PRESET.to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-an".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        out_mp4.display().to_string(),
    ]
}

/// One `file '<name>'` line per entry, in order.
pub fn concat_list_body<S: AsRef<str>>(entries: &[S]) -> String {
    let mut body = String::new();
    for entry in entries {
        let escaped = entry.as_ref().replace('\'', "'\\''");
        body.push_str(&format!("file '{}'\n", escaped));
    }
    body
}
