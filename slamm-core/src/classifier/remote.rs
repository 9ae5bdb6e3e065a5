use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{FrameClassifier, Vocabulary};
use crate::error::{PipelineError, Result};
use crate::segment::types::{ClassificationResult, FrameSequence};

/// Header carrying the `[C, T, H, W]` shape of the uploaded tensor.
pub const TENSOR_SHAPE_HEADER: &str = "x-tensor-shape";

#[derive(Deserialize)]
struct LogitsResponse {
    logits: Vec<f32>,
}

/// Classifier backed by a model server.
///
/// The segment is sent as little-endian `f32` in channels-first layout; the server
/// answers `{"logits": [...]}` with one score per vocabulary class.
pub struct RemoteClassifier {
    endpoint: String,
    vocabulary: Vocabulary,
    client: reqwest::Client,
}

impl RemoteClassifier {
    pub fn new(
        endpoint: impl Into<String>,
        vocabulary: Vocabulary,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Internal(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            endpoint: endpoint.into(),
            vocabulary,
            client,
        })
    }
}

fn encode_tensor(frames: &FrameSequence) -> (String, Vec<u8>) {
    let shape = frames
        .channels_first_shape()
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(",");
    let body = frames
        .to_channels_first()
        .into_iter()
        .flat_map(f32::to_le_bytes)
        .collect();
    (shape, body)
}

#[async_trait]
impl FrameClassifier for RemoteClassifier {
    async fn classify(&self, frames: &FrameSequence) -> Result<ClassificationResult> {
        let (shape, body) = encode_tensor(frames);

        let res = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/octet-stream")
            .header(TENSOR_SHAPE_HEADER, &shape)
            .body(body)
            .send()
            .await
            .map_err(|e| PipelineError::Classification(format!("request failed: {}", e)))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(PipelineError::Classification(format!(
                "model server returned {}: {}",
                status, text
            )));
        }

        let parsed: LogitsResponse = res
            .json()
            .await
            .map_err(|e| PipelineError::Classification(format!("bad model response: {}", e)))?;

        let result = self.vocabulary.resolve(&parsed.logits)?;
        debug!(
            label = %result.label,
            confidence = result.confidence,
            shape = %shape,
            "Classified segment"
        );
        Ok(result)
    }
}
