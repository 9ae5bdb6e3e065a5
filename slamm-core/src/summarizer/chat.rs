use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{build_prompt, Summarizer};
use crate::error::{PipelineError, Result};

const SYSTEM_PROMPT: &str = "You translate American Sign Language (ASL) glosses into English. \
    Reply with exactly one simple, concise sentence and nothing else.";

// OpenAI-compatible chat completion request/response
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

/// Summarizer backed by an OpenAI-compatible `/chat/completions` endpoint
/// (GPT4All, llama.cpp server, Ollama, hosted APIs).
pub struct ChatSummarizer {
    base_url: String,
    model: String,
    api_key: Option<String>,
    max_tokens: u32,
    client: reqwest::Client,
}

impl ChatSummarizer {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Internal(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: None,
            max_tokens: 1024,
            client,
        })
    }

    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn request(&self, words: &[String]) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: build_prompt(words),
                },
            ],
            temperature: Some(0.2),
            max_tokens: Some(self.max_tokens),
        }
    }
}

#[async_trait]
impl Summarizer for ChatSummarizer {
    async fn summarize(&self, words: &[String]) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut req = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&self.request(words));
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }

        let res = req
            .send()
            .await
            .map_err(|e| PipelineError::Summarization(format!("request failed: {}", e)))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(PipelineError::Summarization(format!(
                "language model returned {}: {}",
                status, body
            )));
        }

        let parsed: ChatResponse = res
            .json()
            .await
            .map_err(|e| PipelineError::Summarization(format!("bad response: {}", e)))?;

        let sentence = parsed
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PipelineError::Summarization("empty completion".to_string()))?;

        debug!(words = words.len(), sentence = %sentence, "Summarized utterance");
        Ok(sentence)
    }
}
