use std::path::PathBuf;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::decoder::FrameDecoder;
use super::types::ClassificationResult;
use crate::classifier::FrameClassifier;
use crate::error::{PipelineError, Result};

/// Decodes one uploaded segment and classifies it.
///
/// The upload is staged in a scratch file that is removed when this call
/// returns, on success and on failure alike.
pub struct SegmentProcessor {
    decoder: Arc<dyn FrameDecoder>,
    classifier: Arc<dyn FrameClassifier>,
    scratch_dir: Option<PathBuf>,
}

impl SegmentProcessor {
    pub fn new(decoder: Arc<dyn FrameDecoder>, classifier: Arc<dyn FrameClassifier>) -> Self {
        Self {
            decoder,
            classifier,
            scratch_dir: None,
        }
    }

    /// Stage uploads in `dir` instead of the system temp directory.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    fn scratch_file(&self) -> Result<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("segment-").suffix(".video");
        let file = match &self.scratch_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        Ok(file)
    }

    /// Decode `payload` and return the classifier's label and confidence unchanged.
    pub async fn process(&self, payload: &[u8]) -> Result<ClassificationResult> {
        if payload.is_empty() {
            return Err(PipelineError::Decode("empty segment payload".to_string()));
        }

        let scratch = self.scratch_file()?;
        tokio::fs::write(scratch.path(), payload).await?;
        debug!(path = %scratch.path().display(), bytes = payload.len(), "Staged segment");

        let frames = self.decoder.decode(scratch.path()).await?;
        if frames.is_empty() {
            return Err(PipelineError::Decode("no frames extracted".to_string()));
        }
        drop(scratch);

        let result = self.classifier.classify(&frames).await?;
        if !(0.0..=1.0).contains(&result.confidence) {
            return Err(PipelineError::Classification(format!(
                "confidence {} outside [0, 1]",
                result.confidence
            )));
        }

        info!(
            label = %result.label,
            confidence = result.confidence,
            frames = frames.frames,
            "Segment classified"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::types::FrameSequence;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;

    /// Records the path it was given and whether the file existed at that point.
    #[derive(Default)]
    struct RecordingDecoder {
        seen: Mutex<Option<(PathBuf, bool)>>,
        fail: bool,
    }

    #[async_trait]
    impl FrameDecoder for RecordingDecoder {
        async fn decode(&self, path: &Path) -> Result<FrameSequence> {
            *self.seen.lock().unwrap() = Some((path.to_path_buf(), path.exists()));
            if self.fail {
                return Err(PipelineError::Decode("corrupt".into()));
            }
            Ok(FrameSequence::from_rgb24(&[0; 3], 1, 1))
        }
    }

    struct FixedClassifier(f32);

    #[async_trait]
    impl FrameClassifier for FixedClassifier {
        async fn classify(&self, _frames: &FrameSequence) -> Result<ClassificationResult> {
            Ok(ClassificationResult::new("HELLO", self.0))
        }
    }

    fn processor(decoder: Arc<RecordingDecoder>, confidence: f32) -> SegmentProcessor {
        SegmentProcessor::new(decoder, Arc::new(FixedClassifier(confidence)))
    }

    #[tokio::test]
    async fn returns_classifier_output_unchanged() {
        let decoder = Arc::new(RecordingDecoder::default());
        let result = processor(decoder, 0.12).process(b"video").await.unwrap();
        assert_eq!(result, ClassificationResult::new("HELLO", 0.12));
    }

    #[tokio::test]
    async fn scratch_file_is_removed_after_success() {
        let dir = tempfile::tempdir().unwrap();
        let decoder = Arc::new(RecordingDecoder::default());
        processor(decoder.clone(), 0.5)
            .with_scratch_dir(dir.path())
            .process(b"video")
            .await
            .unwrap();

        let (path, existed) = decoder.seen.lock().unwrap().clone().unwrap();
        assert!(existed);
        assert!(path.starts_with(dir.path()));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn scratch_file_is_removed_after_decode_failure() {
        let dir = tempfile::tempdir().unwrap();
        let decoder = Arc::new(RecordingDecoder {
            fail: true,
            ..Default::default()
        });
        let err = processor(decoder.clone(), 0.5)
            .with_scratch_dir(dir.path())
            .process(b"garbage")
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Decode(_)));
        let (path, _) = decoder.seen.lock().unwrap().clone().unwrap();
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn empty_payload_never_reaches_decoder() {
        let decoder = Arc::new(RecordingDecoder::default());
        let err = processor(decoder.clone(), 0.5).process(b"").await.unwrap_err();
        assert!(matches!(err, PipelineError::Decode(_)));
        assert!(decoder.seen.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn out_of_range_confidence_is_rejected() {
        let decoder = Arc::new(RecordingDecoder::default());
        let err = processor(decoder, 1.5).process(b"video").await.unwrap_err();
        assert!(matches!(err, PipelineError::Classification(_)));
    }
}
