//! Caption layout: wraps narration into a fixed-width box and writes one text
//! resource per line for the encoder to draw.

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use regex::Regex;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Average glyph advance as a fraction of the font size.
const GLYPH_WIDTH_RATIO: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct CaptionStyle {
    pub font_path: PathBuf,
    pub font_size: u32,
    pub color: String,
    pub stroke_color: String,
    pub stroke_width: u32,
    pub box_width: u32,
}

impl CaptionStyle {
    pub fn with_font(font_path: impl Into<PathBuf>) -> Self {
        Self {
            font_path: font_path.into(),
            font_size: 60,
            color: "white".to_string(),
            stroke_color: "black".to_string(),
            stroke_width: 3,
            box_width: 900,
        }
    }

    pub fn line_height(&self) -> u32 {
        self.font_size * 5 / 4
    }

    pub fn max_chars_per_line(&self) -> usize {
        let glyph = (self.font_size as f64 * GLYPH_WIDTH_RATIO).max(1.0);
        ((self.box_width as f64 / glyph).floor() as usize).max(1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptionLine {
    pub text: String,
    pub text_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Caption {
    pub lines: Vec<CaptionLine>,
    pub style: CaptionStyle,
}

impl Caption {
    pub fn block_height(&self) -> u32 {
        self.style.line_height() * self.lines.len() as u32
    }

    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn whitespace_regex() -> Result<&'static Regex> {
    static WS_RE: OnceCell<Regex> = OnceCell::new();
    WS_RE.get_or_try_init(|| Regex::new(r"\s+").context("failed to compile whitespace regex"))
}

pub fn normalize_text(text: &str) -> Result<String> {
    Ok(whitespace_regex()?.replace_all(text.trim(), " ").into_owned())
}

/// Greedy word wrap. Words longer than a line are split.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let mut chars: Vec<char> = word.chars().collect();

        while chars.len() > max_chars {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = chars.split_off(max_chars);
            lines.push(chars.into_iter().collect());
            chars = rest;
        }

        let word_len = chars.len();
        if word_len == 0 {
            continue;
        }
        let needed = if current_len == 0 { word_len } else { current_len + 1 + word_len };
        if needed > max_chars {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(chars);
        current_len += word_len;
    }

    if current_len > 0 {
        lines.push(current);
    }
    lines
}

/// `<dir>/<stem>_caption_<n>.txt` next to the scene image.
pub fn caption_line_path(image_path: &Path, line: usize) -> PathBuf {
    let stem = image_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "scene".to_string());
    let name = format!("{}_caption_{}.txt", stem, line);
    match image_path.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

/// Lays out `text` and writes its line resources next to `image_path`.
pub async fn render_caption(text: &str, style: &CaptionStyle, image_path: &Path) -> Result<Caption> {
    let meta = fs::metadata(&style.font_path)
        .await
        .with_context(|| format!("caption font not found: {}", style.font_path.display()))?;
    if !meta.is_file() {
        anyhow::bail!("caption font is not a file: {}", style.font_path.display());
    }

    let normalized = normalize_text(text)?;
    if normalized.is_empty() {
        anyhow::bail!("caption text is empty");
    }

    let mut lines = Vec::new();
    for (idx, line) in wrap_text(&normalized, style.max_chars_per_line())
        .into_iter()
        .enumerate()
    {
        let text_file = caption_line_path(image_path, idx);
        fs::write(&text_file, line.as_bytes())
            .await
            .with_context(|| format!("write caption line: {}", text_file.display()))?;
        lines.push(CaptionLine { text: line, text_file });
    }

    Ok(Caption {
        lines,
        style: style.clone(),
    })
}
