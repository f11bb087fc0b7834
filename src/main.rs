use anyhow::{Context, Result};
use clap::Parser;
use scene_shorts::config::Config;
use scene_shorts::generator::VideoGenerator;
use scene_shorts::init;
use scene_shorts::server::{AppState, create_router};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scene-shorts", version, about = "Vertical short-video generation server")]
struct Args {
    /// JSON config file; defaults apply when it does not exist
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("scene_shorts=info,tower_http=info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::load_or_default(&args.config).await?;

    // Initialize directories first
    init::ensure_directories(&config).await?;

    if !init::check_ffmpeg().await {
        warn!("FFmpeg not found in PATH. Please install FFmpeg.");
    }
    if !config.font_path.exists() {
        warn!(
            "Caption font not found at {}, captions will be skipped",
            config.font_path.display()
        );
    }
    init::sweep_configured_dirs(&config).await;

    let addr = config.bind_addr();
    let generator = Arc::new(VideoGenerator::from_config(config)?);
    let app = create_router(AppState::new(generator));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Received shutdown signal");
    }
}
