//! Joins rendered scene clips into the final video.

use crate::ffmpeg::{VideoEngine, concat_list_body};
use crate::job::JobWorkspace;
use crate::render::VisualClip;
use crate::{logi, logok, logw};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("No clips generated")]
    NoClips,

    #[error("failed to render segment {index}: {source:#}")]
    Segment {
        index: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to concatenate segments: {0:#}")]
    Concat(#[source] anyhow::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssembledVideo {
    pub path: PathBuf,
    pub url: String,
    pub segments: usize,
}

pub struct VideoAssembler {
    engine: Arc<dyn VideoEngine>,
    public_base_url: String,
}

impl VideoAssembler {
    pub fn new(engine: Arc<dyn VideoEngine>, public_base_url: impl Into<String>) -> Self {
        Self {
            engine,
            public_base_url: public_base_url.into(),
        }
    }

    /// `<public_base_url>/outputs/<path relative to the outputs dir>`.
    pub fn public_url(&self, outputs_dir: &Path, file: &Path) -> String {
        let relative = pathdiff::diff_paths(file, outputs_dir)
            .unwrap_or_else(|| PathBuf::from(file.file_name().unwrap_or_default()));
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!(
            "{}/outputs/{}",
            self.public_base_url.trim_end_matches('/'),
            relative
        )
    }

    /// A clip the encoder rejects is retried without its caption, then over
    /// the filler colour. Only a clip that fails in every form is an error.
    async fn render_with_degradation(
        &self,
        index: usize,
        clip: &VisualClip,
        segment: &Path,
    ) -> Result<(), AssembleError> {
        let mut last_err = None;
        for (step, variant) in clip.degraded_variants().iter().enumerate() {
            if step > 0 {
                logw(format!(
                    "Segment {} retrying with {}{}",
                    index,
                    if variant.is_filler() { "filler" } else { "image" },
                    if variant.caption.is_some() { " and caption" } else { ", no caption" }
                ));
            }
            match self.engine.render_segment(variant, segment).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    logw(format!("Segment {} failed: {:#}", index, err));
                    last_err = Some(err);
                }
            }
        }
        if fs::metadata(segment).await.is_ok() {
            let _ = fs::remove_file(segment).await;
        }
        Err(AssembleError::Segment {
            index,
            source: last_err.unwrap_or_else(|| anyhow::anyhow!("no renderable variant")),
        })
    }

    /// Clips are joined in the order given.
    pub async fn assemble(
        &self,
        clips: &[VisualClip],
        workspace: &JobWorkspace,
    ) -> Result<AssembledVideo, AssembleError> {
        if clips.is_empty() {
            return Err(AssembleError::NoClips);
        }

        fs::create_dir_all(workspace.temp_dir()).await?;
        fs::create_dir_all(workspace.outputs_dir()).await?;

        let mut entries = Vec::with_capacity(clips.len());
        for (index, clip) in clips.iter().enumerate() {
            let segment = workspace.segment_path(index);
            logi(format!(
                "Rendering segment {}/{} -> {}",
                index + 1,
                clips.len(),
                segment.display()
            ));
            self.render_with_degradation(index, clip, &segment).await?;
            entries.push(workspace.segment_file_name(index));
        }

        let list = workspace.concat_list_path();
        fs::write(&list, concat_list_body(&entries)).await?;

        let output = workspace.output_path();
        logi(format!("Concatenating {} segment(s) -> {}", entries.len(), output.display()));
        if let Err(err) = self.engine.concat(&list, &output).await {
            if fs::metadata(&output).await.is_ok() {
                let _ = fs::remove_file(&output).await;
            }
            return Err(AssembleError::Concat(err));
        }

        let url = self.public_url(workspace.outputs_dir(), &output);
        logok(format!("Wrote video: {}", output.display()));
        Ok(AssembledVideo {
            path: output,
            url,
            segments: entries.len(),
        })
    }
}
