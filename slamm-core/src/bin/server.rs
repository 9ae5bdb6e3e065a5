use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use slamm_core::server::SegmentServer;
use slamm_core::ServerConfig;

#[derive(Parser)]
#[command(name = "slamm-server")]
#[command(about = "SLAMM server — sign language segment classification and sentence summarization")]
struct Cli {
    /// Address to bind.
    #[arg(long, env = "SLAMM_HOST", default_value = "0.0.0.0")]
    host: String,

    /// HTTP port.
    #[arg(long, env = "SLAMM_PORT", default_value_t = 8000)]
    port: u16,

    /// Largest accepted upload, in megabytes.
    #[arg(long, env = "SLAMM_MAX_UPLOAD_MB", default_value_t = 64)]
    max_upload_mb: usize,

    /// Class list file (`<index> <label>` per line).
    #[arg(long, env = "SLAMM_VOCABULARY", default_value = "wlasl_class_list.txt")]
    vocabulary: PathBuf,

    /// Model server endpoint returning per-class logits.
    #[arg(long, env = "SLAMM_CLASSIFIER_URL", default_value = "http://127.0.0.1:8080/classify")]
    classifier_url: String,

    /// Classifier request timeout in seconds.
    #[arg(long, env = "SLAMM_CLASSIFIER_TIMEOUT_SECS", default_value_t = 30)]
    classifier_timeout_secs: u64,

    /// Base URL of an OpenAI-compatible chat API.
    #[arg(long, env = "SLAMM_SUMMARIZER_URL", default_value = "http://127.0.0.1:4891/v1")]
    summarizer_url: String,

    /// Language model used for summarization.
    #[arg(long, env = "SLAMM_SUMMARIZER_MODEL", default_value = "Meta-Llama-3-8B-Instruct.Q4_0.gguf")]
    summarizer_model: String,

    /// Bearer token for the summarizer API, if it needs one.
    #[arg(long, env = "SLAMM_SUMMARIZER_API_KEY", hide_env_values = true)]
    summarizer_api_key: Option<String>,

    #[arg(long, env = "SLAMM_SUMMARIZER_MAX_TOKENS", default_value_t = 1024)]
    summarizer_max_tokens: u32,

    /// Summarizer request timeout in seconds.
    #[arg(long, env = "SLAMM_SUMMARIZER_TIMEOUT_SECS", default_value_t = 120)]
    summarizer_timeout_secs: u64,

    /// ffmpeg executable used to decode segments.
    #[arg(long, env = "SLAMM_FFMPEG", default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// Frames are scaled to a square of this size.
    #[arg(long, env = "SLAMM_FRAME_SIZE", default_value_t = 224)]
    frame_size: usize,

    /// Directory for staging uploads (defaults to the system temp dir).
    #[arg(long, env = "SLAMM_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// Seconds of inactivity before a partial utterance is dropped (0 = never).
    #[arg(long, env = "SLAMM_UTTERANCE_TTL_SECS", default_value_t = 300)]
    utterance_ttl_secs: u64,

    /// Seconds between sweeps for idle sessions.
    #[arg(long, env = "SLAMM_SWEEP_INTERVAL_SECS", default_value_t = 30)]
    sweep_interval_secs: u64,
}

impl Cli {
    fn into_config(self) -> Result<ServerConfig> {
        let max_upload_bytes = self
            .max_upload_mb
            .checked_mul(1024 * 1024)
            .with_context(|| format!("--max-upload-mb {} is too large", self.max_upload_mb))?;

        Ok(ServerConfig {
            host: self.host,
            port: self.port,
            max_upload_bytes,
            vocabulary_path: self.vocabulary,
            classifier_url: self.classifier_url,
            classifier_timeout: Duration::from_secs(self.classifier_timeout_secs),
            summarizer_url: self.summarizer_url,
            summarizer_model: self.summarizer_model,
            summarizer_api_key: self.summarizer_api_key,
            summarizer_max_tokens: self.summarizer_max_tokens,
            summarizer_timeout: Duration::from_secs(self.summarizer_timeout_secs),
            ffmpeg: self.ffmpeg,
            frame_size: self.frame_size,
            scratch_dir: self.scratch_dir,
            utterance_ttl: (self.utterance_ttl_secs > 0)
                .then(|| Duration::from_secs(self.utterance_ttl_secs)),
            sweep_interval: Duration::from_secs(self.sweep_interval_secs),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Cli::parse().into_config()?;
    let addr = config.addr()?;

    let router = Arc::new(
        config
            .build_router()
            .context("Failed to assemble segment pipeline")?,
    );
    info!(
        classifier = %config.classifier_url,
        summarizer = %config.summarizer_url,
        model = %config.summarizer_model,
        "Pipeline ready"
    );

    let sweeper = router.sessions().spawn_sweeper(config.sweep_interval);

    let server = SegmentServer::new(addr, router).with_max_upload_bytes(config.max_upload_bytes);
    server.run().await.context("HTTP server failed")?;

    sweeper.abort();
    info!("SLAMM server shut down cleanly.");
    Ok(())
}
