//! Scene rendering: one scene becomes one fixed-duration vertical clip.

use crate::acquire::ImageProvider;
use crate::caption::{Caption, CaptionStyle, render_caption};
use crate::config::Config;
use crate::request::Scene;
use crate::{logi, logw};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const FRAME_WIDTH: u32 = 1080;
pub const FRAME_HEIGHT: u32 = 1920;

/// Filler colour for scenes without an image.
pub const FILLER_RGB: [u8; 3] = [50, 50, 50];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub const VERTICAL: Frame = Frame {
        width: FRAME_WIDTH,
        height: FRAME_HEIGHT,
    };
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClipSource {
    /// Scaled to cover the frame, then centre-cropped.
    Image(PathBuf),
    Solid([u8; 3]),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisualClip {
    pub source: ClipSource,
    pub frame: Frame,
    pub duration_secs: f64,
    pub caption: Option<Caption>,
}

impl VisualClip {
    pub fn is_filler(&self) -> bool {
        matches!(self.source, ClipSource::Solid(_))
    }

    pub fn without_caption(&self) -> VisualClip {
        VisualClip {
            caption: None,
            ..self.clone()
        }
    }

    /// Same frame, duration and caption over the filler colour.
    pub fn as_filler(&self) -> VisualClip {
        VisualClip {
            source: ClipSource::Solid(FILLER_RGB),
            ..self.clone()
        }
    }

    /// Progressively simpler versions of this clip to encode when the
    /// previous one is rejected: first without the caption, then over the
    /// filler colour. The clip itself comes first.
    pub fn degraded_variants(&self) -> Vec<VisualClip> {
        let mut variants = vec![self.clone()];
        if self.caption.is_some() {
            variants.push(self.without_caption());
        }
        if !self.is_filler() {
            let filler = self.as_filler();
            let bare = filler.without_caption();
            if filler.caption.is_some() {
                variants.push(filler);
            }
            variants.push(bare);
        }
        variants
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    pub include_subtitles: bool,
}

pub struct SceneRenderer {
    images: Arc<dyn ImageProvider>,
    caption_style: CaptionStyle,
    scene_duration_secs: f64,
    honor_estimated_duration: bool,
}

impl SceneRenderer {
    pub fn new(images: Arc<dyn ImageProvider>, config: &Config) -> Self {
        Self {
            images,
            caption_style: CaptionStyle::with_font(&config.font_path),
            scene_duration_secs: config.scene_duration_secs,
            honor_estimated_duration: config.honor_estimated_duration,
        }
    }

    pub fn with_caption_style(mut self, style: CaptionStyle) -> Self {
        self.caption_style = style;
        self
    }

    pub fn clip_duration(&self, scene: &Scene) -> f64 {
        if self.honor_estimated_duration
            && scene.estimated_duration.is_finite()
            && scene.estimated_duration > 0.0
        {
            scene.estimated_duration
        } else {
            self.scene_duration_secs
        }
    }

    /// Never fails: a missing image becomes a filler clip and a failed
    /// caption is dropped.
    pub async fn render(&self, scene: &Scene, dest_image_path: &Path, opts: RenderOptions) -> VisualClip {
        let duration_secs = self.clip_duration(scene);

        let source = if self.images.acquire(&scene.visual_prompt, dest_image_path).await {
            ClipSource::Image(dest_image_path.to_path_buf())
        } else {
            logw(format!(
                "Using filler clip for {}",
                dest_image_path.display()
            ));
            ClipSource::Solid(FILLER_RGB)
        };

        let caption = if opts.include_subtitles {
            match render_caption(&scene.voice_off_text, &self.caption_style, dest_image_path).await {
                Ok(caption) => {
                    logi(format!("Caption laid out in {} line(s)", caption.lines.len()));
                    Some(caption)
                }
                Err(err) => {
                    logw(format!("Caption skipped: {:#}", err));
                    None
                }
            }
        } else {
            None
        };

        VisualClip {
            source,
            frame: Frame::VERTICAL,
            duration_secs,
            caption,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquire::AcquireOutcome;
    use async_trait::async_trait;

    struct StubImages {
        succeed: bool,
    }

    #[async_trait]
    impl ImageProvider for StubImages {
        async fn acquire_with_outcome(&self, _prompt: &str, dest: &Path) -> AcquireOutcome {
            if self.succeed {
                tokio::fs::write(dest, b"png").await.unwrap();
                AcquireOutcome::Primary { attempt: 1 }
            } else {
                AcquireOutcome::Failed
            }
        }
    }

    fn scene(estimated: f64) -> Scene {
        Scene {
            voice_off_text: "Every harbour has a story".to_string(),
            visual_prompt: "foggy harbour".to_string(),
            estimated_duration: estimated,
        }
    }

    fn renderer(dir: &Path, succeed: bool, cfg: Config) -> SceneRenderer {
        let font = dir.join("font.ttf");
        std::fs::write(&font, b"font").unwrap();
        SceneRenderer::new(Arc::new(StubImages { succeed }), &Config { font_path: font, ..cfg })
    }

    #[tokio::test]
    async fn failed_acquisition_yields_filler_of_full_size() {
        let dir = tempfile::tempdir().unwrap();
        let r = renderer(dir.path(), false, Config::default());
        let clip = r
            .render(&scene(3.0), &dir.path().join("j_scene_0.png"), RenderOptions::default())
            .await;
        assert_eq!(clip.source, ClipSource::Solid([50, 50, 50]));
        assert_eq!(clip.frame, Frame { width: 1080, height: 1920 });
        assert_eq!(clip.duration_secs, 5.0);
        assert!(clip.is_filler());
    }

    #[tokio::test]
    async fn estimated_duration_is_ignored_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let r = renderer(dir.path(), true, Config::default());
        let clip = r
            .render(&scene(12.0), &dir.path().join("j_scene_0.png"), RenderOptions::default())
            .await;
        assert_eq!(clip.duration_secs, 5.0);
        assert_eq!(clip.source, ClipSource::Image(dir.path().join("j_scene_0.png")));
    }

    #[tokio::test]
    async fn estimated_duration_used_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            honor_estimated_duration: true,
            ..Config::default()
        };
        let r = renderer(dir.path(), true, cfg);
        assert_eq!(r.clip_duration(&scene(12.0)), 12.0);
        assert_eq!(r.clip_duration(&scene(0.0)), 5.0);
        assert_eq!(r.clip_duration(&scene(f64::NAN)), 5.0);
    }

    #[tokio::test]
    async fn caption_only_when_requested() {
        let dir = tempfile::tempdir().unwrap();
        let r = renderer(dir.path(), true, Config::default());
        let dest = dir.path().join("j_scene_0.png");

        let plain = r.render(&scene(5.0), &dest, RenderOptions { include_subtitles: false }).await;
        assert!(plain.caption.is_none());

        let captioned = r.render(&scene(5.0), &dest, RenderOptions { include_subtitles: true }).await;
        let caption = captioned.caption.expect("caption");
        assert_eq!(caption.text(), "Every harbour has a story");
    }

    #[tokio::test]
    async fn caption_failure_keeps_the_clip() {
        let dir = tempfile::tempdir().unwrap();
        let r = renderer(dir.path(), false, Config::default())
            .with_caption_style(CaptionStyle::with_font(dir.path().join("missing.ttf")));
        let clip = r
            .render(&scene(5.0), &dir.path().join("j_scene_0.png"), RenderOptions { include_subtitles: true })
            .await;
        assert!(clip.caption.is_none());
        assert!(clip.is_filler());
    }

    #[test]
    fn degraded_variants_drop_caption_then_image() {
        let captioned = VisualClip {
            source: ClipSource::Image(PathBuf::from("t/a_scene_0.png")),
            frame: Frame::VERTICAL,
            duration_secs: 5.0,
            caption: Some(Caption {
                lines: Vec::new(),
                style: CaptionStyle::with_font("f.ttf"),
            }),
        };
        let variants = captioned.degraded_variants();
        assert_eq!(variants.len(), 4);
        assert_eq!(variants[0], captioned);
        assert!(!variants[1].is_filler() && variants[1].caption.is_none());
        assert!(variants[2].is_filler() && variants[2].caption.is_some());
        assert!(variants[3].is_filler() && variants[3].caption.is_none());
        assert!(variants.iter().all(|v| v.duration_secs == 5.0 && v.frame == Frame::VERTICAL));

        let plain = captioned.without_caption();
        assert_eq!(plain.degraded_variants(), vec![plain.clone(), plain.as_filler()]);

        let filler = plain.as_filler();
        assert_eq!(filler.source, ClipSource::Solid(FILLER_RGB));
        assert_eq!(filler.degraded_variants(), vec![filler.clone()]);
    }
}
