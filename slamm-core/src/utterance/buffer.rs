use crate::error::{PipelineError, Result};
use crate::segment::types::ClassificationResult;

use super::state::Phase;

/// Accumulates classified words for one in-flight utterance.
///
/// `append` is cheap and frequent; `flush` hands the whole utterance over and
/// leaves the buffer empty for the next one. The buffer never decides when an
/// utterance is done.
#[derive(Debug, Default)]
pub struct UtteranceBuffer {
    results: Vec<ClassificationResult>,
}

/// Everything collected for one utterance, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct FlushedUtterance {
    results: Vec<ClassificationResult>,
    mean_confidence: f32,
}

impl FlushedUtterance {
    pub fn words(&self) -> Vec<String> {
        self.results.iter().map(|r| r.label.clone()).collect()
    }

    /// Words joined with single spaces.
    pub fn transcript(&self) -> String {
        self.words().join(" ")
    }

    pub fn mean_confidence(&self) -> f32 {
        self.mean_confidence
    }

    pub fn into_results(self) -> Vec<ClassificationResult> {
        self.results
    }
}

impl UtteranceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, result: ClassificationResult) {
        self.results.push(result);
    }

    /// Take every accumulated word and the arithmetic mean of their confidences.
    ///
    /// Fails with [`PipelineError::EmptyUtterance`] and leaves the buffer untouched
    /// when nothing has been appended.
    pub fn flush(&mut self) -> Result<FlushedUtterance> {
        if self.results.is_empty() {
            return Err(PipelineError::EmptyUtterance);
        }

        let results = std::mem::take(&mut self.results);
        let sum: f64 = results.iter().map(|r| r.confidence as f64).sum();
        let mean_confidence = (sum / results.len() as f64) as f32;

        Ok(FlushedUtterance {
            results,
            mean_confidence,
        })
    }

    /// Put previously flushed words back, ahead of anything appended since.
    pub fn restore(&mut self, mut results: Vec<ClassificationResult>) {
        results.append(&mut self.results);
        self.results = results;
    }

    /// Discard the in-flight utterance.
    pub fn reset(&mut self) {
        self.results.clear();
    }

    pub fn phase(&self) -> Phase {
        if self.results.is_empty() {
            Phase::Idle
        } else {
            Phase::Collecting
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.results.iter().map(|r| r.label.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(items: &[(&str, f32)]) -> UtteranceBuffer {
        let mut buffer = UtteranceBuffer::new();
        for (label, confidence) in items {
            buffer.append(ClassificationResult::new(*label, *confidence));
        }
        buffer
    }

    #[test]
    fn flush_preserves_order_and_averages() {
        let mut buffer = filled(&[("HELLO", 0.9), ("MY", 0.8), ("NAME", 0.95)]);
        let flushed = buffer.flush().unwrap();

        assert_eq!(flushed.words(), vec!["HELLO", "MY", "NAME"]);
        assert_eq!(flushed.transcript(), "HELLO MY NAME");
        assert!((flushed.mean_confidence() - 0.883_333).abs() < 1e-5);
    }

    #[test]
    fn flush_resets_to_idle() {
        let mut buffer = filled(&[("A", 0.5)]);
        assert_eq!(buffer.phase(), Phase::Collecting);

        buffer.flush().unwrap();
        assert!(buffer.is_empty());
        assert_eq!(buffer.phase(), Phase::Idle);
        assert!(matches!(buffer.flush(), Err(PipelineError::EmptyUtterance)));
    }

    #[test]
    fn empty_flush_fails() {
        let mut buffer = UtteranceBuffer::new();
        assert!(matches!(buffer.flush(), Err(PipelineError::EmptyUtterance)));
        assert_eq!(buffer.phase(), Phase::Idle);
    }

    #[test]
    fn low_confidence_words_are_kept() {
        let mut buffer = filled(&[("A", 0.0), ("B", 0.01)]);
        let flushed = buffer.flush().unwrap();
        assert_eq!(flushed.transcript(), "A B");
        assert!((flushed.mean_confidence() - 0.005).abs() < 1e-6);
    }

    #[test]
    fn restore_puts_words_back_in_front() {
        let mut buffer = filled(&[("A", 0.5), ("B", 0.5)]);
        let flushed = buffer.flush().unwrap();
        buffer.append(ClassificationResult::new("C", 0.5));
        buffer.restore(flushed.into_results());

        assert_eq!(buffer.labels().collect::<Vec<_>>(), vec!["A", "B", "C"]);
    }

    #[test]
    fn reset_discards_everything() {
        let mut buffer = filled(&[("A", 0.5)]);
        buffer.reset();
        assert_eq!(buffer.len(), 0);
    }
}
