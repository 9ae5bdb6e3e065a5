use anyhow::{bail, Context};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::classifier::{RemoteClassifier, Vocabulary};
use crate::router::RequestRouter;
use crate::segment::{FfmpegDecoder, SegmentProcessor};
use crate::summarizer::ChatSummarizer;
use crate::utterance::SessionRegistry;

/// Everything needed to assemble the server. Filled in by the binary.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,

    /// Class list file, one `<index> <label>` per line.
    pub vocabulary_path: PathBuf,
    pub classifier_url: String,
    pub classifier_timeout: Duration,

    /// Base URL of an OpenAI-compatible API (ending in `/v1`).
    pub summarizer_url: String,
    pub summarizer_model: String,
    pub summarizer_api_key: Option<String>,
    pub summarizer_max_tokens: u32,
    pub summarizer_timeout: Duration,

    pub ffmpeg: PathBuf,
    pub frame_size: usize,
    pub scratch_dir: Option<PathBuf>,

    /// Idle time after which a partial utterance is dropped. `None` disables expiry.
    pub utterance_ttl: Option<Duration>,
    pub sweep_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_bytes: 64 * 1024 * 1024,
            vocabulary_path: PathBuf::from("wlasl_class_list.txt"),
            classifier_url: "http://127.0.0.1:8080/classify".to_string(),
            classifier_timeout: Duration::from_secs(30),
            summarizer_url: "http://127.0.0.1:4891/v1".to_string(),
            summarizer_model: "Meta-Llama-3-8B-Instruct.Q4_0.gguf".to_string(),
            summarizer_api_key: None,
            summarizer_max_tokens: 1024,
            summarizer_timeout: Duration::from_secs(120),
            ffmpeg: PathBuf::from("ffmpeg"),
            frame_size: 224,
            scratch_dir: None,
            utterance_ttl: Some(Duration::from_secs(300)),
            sweep_interval: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.frame_size == 0 {
            bail!("frame size must be positive");
        }
        if self.sweep_interval.is_zero() {
            bail!("sweep interval must be positive");
        }
        if self.max_upload_bytes == 0 {
            bail!("upload limit must be positive");
        }
        if self.classifier_url.trim().is_empty() {
            bail!("classifier URL is required");
        }
        if self.summarizer_url.trim().is_empty() {
            bail!("summarizer URL is required");
        }
        Ok(())
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .with_context(|| format!("Invalid host address '{}'", self.host))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Wire decoder, classifier, summarizer and session store into a router.
    pub fn build_router(&self) -> anyhow::Result<RequestRouter> {
        self.validate()?;

        let vocabulary = Vocabulary::from_file(&self.vocabulary_path)?;
        if vocabulary.is_empty() {
            bail!("Vocabulary {} is empty", self.vocabulary_path.display());
        }
        info!(
            path = %self.vocabulary_path.display(),
            classes = vocabulary.len(),
            "Vocabulary loaded"
        );

        let decoder = FfmpegDecoder::new(&self.ffmpeg, self.frame_size);
        let classifier =
            RemoteClassifier::new(&self.classifier_url, vocabulary, self.classifier_timeout)?;
        let mut processor = SegmentProcessor::new(Arc::new(decoder), Arc::new(classifier));
        if let Some(dir) = &self.scratch_dir {
            processor = processor.with_scratch_dir(dir);
        }

        let summarizer = ChatSummarizer::new(
            &self.summarizer_url,
            &self.summarizer_model,
            self.summarizer_timeout,
        )?
        .with_api_key(self.summarizer_api_key.clone())
        .with_max_tokens(self.summarizer_max_tokens);

        let sessions = Arc::new(SessionRegistry::new(self.utterance_ttl));

        Ok(RequestRouter::new(processor, Arc::new(summarizer), sessions))
    }
}
