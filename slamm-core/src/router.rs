//! Drives one request through classification, buffering and summarization.

use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::segment::types::{ClassificationResult, Continuation, Segment};
use crate::segment::SegmentProcessor;
use crate::summarizer::Summarizer;
use crate::utterance::{transition, Event, SessionRegistry, Step, UtteranceBuffer};

/// Result of a completed utterance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalResult {
    /// Words in arrival order, space separated.
    pub transcript: String,
    pub mean_confidence: f32,
    /// Sentence produced by the summarizer.
    pub summary: String,
}

/// Reply to one segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SegmentOutcome {
    /// More segments expected; carries this segment's own result only.
    Partial(ClassificationResult),
    Final(FinalResult),
}

pub struct RequestRouter {
    processor: SegmentProcessor,
    summarizer: Arc<dyn Summarizer>,
    sessions: Arc<SessionRegistry>,
}

impl RequestRouter {
    pub fn new(
        processor: SegmentProcessor,
        summarizer: Arc<dyn Summarizer>,
        sessions: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            processor,
            summarizer,
            sessions,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    /// Handle one segment of the utterance owned by `session_id`.
    ///
    /// The session stays locked until the reply is ready, so requests for the same
    /// utterance are applied in the order they acquire it. A failed request leaves
    /// the buffer as it found it.
    pub async fn handle(&self, session_id: &str, segment: Segment) -> Result<SegmentOutcome> {
        let mut session = self.sessions.acquire(session_id).await;

        let event = self.intake(segment).await;
        let (step, next) = transition(session.buffer.phase(), event);

        let outcome = match step {
            Step::Reject(err) => {
                info!(
                    session = session_id,
                    code = err.code(),
                    buffered = session.buffer.len(),
                    "Segment rejected"
                );
                return Err(err);
            }
            Step::FailEmpty => return Err(PipelineError::EmptyUtterance),
            Step::AppendAndReply(result) => {
                session.buffer.append(result.clone());
                info!(
                    session = session_id,
                    label = %result.label,
                    confidence = result.confidence,
                    buffered = session.buffer.len(),
                    "Partial result"
                );
                SegmentOutcome::Partial(result)
            }
            Step::AppendAndFlush(result) => {
                let kept = session.buffer.len();
                session.buffer.append(result);
                SegmentOutcome::Final(self.complete(&mut session.buffer, kept).await?)
            }
            Step::Flush => {
                let kept = session.buffer.len();
                SegmentOutcome::Final(self.complete(&mut session.buffer, kept).await?)
            }
        };

        debug_assert_eq!(session.buffer.phase(), next);
        Ok(outcome)
    }

    /// Abandon whatever `session_id` has buffered.
    pub async fn reset(&self, session_id: &str) -> bool {
        let existed = self.sessions.remove(session_id).await;
        if existed {
            info!(session = session_id, "Session reset");
        }
        existed
    }

    async fn intake(&self, segment: Segment) -> Event {
        match (segment.payload, segment.continuation) {
            (Some(payload), continuation) => match self.processor.process(&payload).await {
                Ok(result) => Event::Classified(result, continuation),
                Err(err) => Event::Rejected(err),
            },
            (None, Continuation::More) => Event::Rejected(PipelineError::Decode(
                "segment payload missing".to_string(),
            )),
            (None, Continuation::Complete) => Event::Close,
        }
    }

    /// Flush and summarize. On summarizer failure the buffer is put back to its
    /// first `kept` words, undoing this request.
    async fn complete(&self, buffer: &mut UtteranceBuffer, kept: usize) -> Result<FinalResult> {
        let flushed = buffer.flush()?;
        let words = flushed.words();

        match self.summarizer.summarize(&words).await {
            Ok(summary) => {
                let result = FinalResult {
                    transcript: flushed.transcript(),
                    mean_confidence: flushed.mean_confidence(),
                    summary,
                };
                info!(
                    words = words.len(),
                    mean_confidence = result.mean_confidence,
                    transcript = %result.transcript,
                    "Utterance complete"
                );
                Ok(result)
            }
            Err(err) => {
                let mut results = flushed.into_results();
                results.truncate(kept);
                buffer.restore(results);
                Err(err)
            }
        }
    }
}
