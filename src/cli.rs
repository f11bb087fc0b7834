use anyhow::{Context, Result};
use clap::Parser;
use scene_shorts::config::Config;
use scene_shorts::generator::VideoGenerator;
use scene_shorts::init;
use scene_shorts::request::VideoRequest;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "scene-shorts-cli", version, about = "Render a video request file without the server")]
struct Args {
    /// Video request JSON (scenes, include_voice, include_subtitles)
    request: PathBuf,

    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::load_or_default(&args.config).await?;

    // Initialize directories first
    init::ensure_directories(&config).await?;

    if !init::check_ffmpeg().await {
        eprintln!("[WARNING] FFmpeg not found in PATH. Please install FFmpeg.");
    }

    let text = tokio::fs::read_to_string(&args.request)
        .await
        .with_context(|| format!("Failed to read request: {}", args.request.display()))?;
    let request = VideoRequest::from_json(&text)?;

    let generator = VideoGenerator::from_config(config)?;
    let response = generator.generate(&request).await;
    println!("{}", serde_json::to_string_pretty(&response)?);

    std::process::exit(if response.is_done() { 0 } else { 1 });
}
