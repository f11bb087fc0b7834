use crate::acquire::{ImageAcquirer, ImageProvider, build_http_client};
use crate::assemble::VideoAssembler;
use crate::config::Config;
use crate::ffmpeg::{FfmpegEngine, VideoEngine};
use crate::job::{JobId, JobRecord, JobRegistry, JobWorkspace};
use crate::render::{RenderOptions, SceneRenderer};
use crate::request::{VideoRequest, VideoResponse};
use crate::{logd, logi, logok, logw};
use anyhow::Result;
use std::sync::Arc;

pub const NO_CLIPS_MESSAGE: &str = "No clips generated";

/// Runs whole requests: scenes in order, then assembly, then cleanup.
pub struct VideoGenerator {
    config: Config,
    renderer: SceneRenderer,
    assembler: VideoAssembler,
    registry: JobRegistry,
}

impl VideoGenerator {
    pub fn new(config: Config, images: Arc<dyn ImageProvider>, engine: Arc<dyn VideoEngine>) -> Self {
        let renderer = SceneRenderer::new(images, &config);
        let assembler = VideoAssembler::new(engine, config.public_base_url.clone());
        let registry = JobRegistry::new(config.max_concurrent_jobs)
            .with_retention(config.output_retention());
        Self {
            config,
            renderer,
            assembler,
            registry,
        }
    }

    /// Real HTTP image services and the ffmpeg engine.
    pub fn from_config(config: Config) -> Result<Self> {
        let client = build_http_client()?;
        let images = Arc::new(ImageAcquirer::new(client, &config));
        Ok(Self::new(config, images, Arc::new(FfmpegEngine::new())))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn job(&self, id: &JobId) -> Option<JobRecord> {
        self.registry.get(id)
    }

    pub async fn generate(&self, request: &VideoRequest) -> VideoResponse {
        let job_id = self.registry.register(request.scenes.len());

        if request.scenes.is_empty() {
            logw(format!("Job {}: request has no scenes", job_id));
            self.registry.mark_failed(&job_id, NO_CLIPS_MESSAGE);
            return VideoResponse::Error {
                message: NO_CLIPS_MESSAGE.to_string(),
                job_id: Some(job_id.to_string()),
            };
        }

        let _slot = match self.registry.acquire_slot().await {
            Ok(slot) => slot,
            Err(err) => return self.fail(&job_id, format!("no worker slot: {}", err)),
        };
        self.registry.mark_running(&job_id);

        if request.include_voice {
            logd(format!("Job {}: voice-over requested but not supported, ignoring", job_id));
        }

        let workspace = JobWorkspace::new(
            job_id.clone(),
            &self.config.temp_images_dir,
            &self.config.outputs_dir,
        );
        let response = self.run(request, &workspace).await;

        if self.config.cleanup_temp_files {
            if let Err(err) = workspace.cleanup_temp().await {
                logw(format!("Job {}: temp cleanup failed: {}", job_id, err));
            }
        }

        response
    }

    async fn run(&self, request: &VideoRequest, workspace: &JobWorkspace) -> VideoResponse {
        let job_id = workspace.id();
        logi(format!("=== Job {}: {} scene(s) ===", job_id, request.scenes.len()));

        if let Err(err) = tokio::fs::create_dir_all(workspace.temp_dir()).await {
            return self.fail(job_id, format!("cannot create temp dir: {}", err));
        }

        let opts = RenderOptions {
            include_subtitles: request.include_subtitles,
        };
        let mut clips = Vec::with_capacity(request.scenes.len());
        for (index, scene) in request.scenes.iter().enumerate() {
            logi(format!("Job {}: scene {}/{}", job_id, index + 1, request.scenes.len()));
            let image_path = workspace.scene_image_path(index);
            clips.push(self.renderer.render(scene, &image_path, opts).await);
        }

        match self.assembler.assemble(&clips, workspace).await {
            Ok(video) => {
                self.registry.mark_done(job_id, &video.url);
                logok(format!("Job {} done: {}", job_id, video.url));
                VideoResponse::Done {
                    video_url: video.url,
                    job_id: Some(job_id.to_string()),
                }
            }
            Err(err) => self.fail(job_id, err.to_string()),
        }
    }

    fn fail(&self, job_id: &JobId, message: String) -> VideoResponse {
        logw(format!("Job {} failed: {}", job_id, message));
        self.registry.mark_failed(job_id, &message);
        VideoResponse::Error {
            message,
            job_id: Some(job_id.to_string()),
        }
    }
}
