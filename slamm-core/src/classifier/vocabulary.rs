use anyhow::{bail, Context};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{PipelineError, Result};
use crate::segment::types::ClassificationResult;

/// Closed set of words the classifier can emit, keyed by class index.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    labels: HashMap<usize, String>,
}

impl Vocabulary {
    /// Load a class list file (`<index> <label>` per line).
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read vocabulary {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid vocabulary {}", path.display()))
    }

    /// Parse class list text. Labels may span two tokens ("thank you").
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let mut labels = HashMap::new();
        for (line_no, line) in text.lines().enumerate() {
            let mut parts = line.split_whitespace();
            let Some(index) = parts.next() else {
                continue;
            };
            let index: usize = index
                .parse()
                .with_context(|| format!("line {}: bad class index '{}'", line_no + 1, index))?;
            let label = parts.collect::<Vec<_>>().join(" ");
            if label.is_empty() {
                bail!("line {}: class {} has no label", line_no + 1, index);
            }
            labels.insert(index, label);
        }
        Ok(Self { labels })
    }

    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels
                .into_iter()
                .enumerate()
                .map(|(i, l)| (i, l.into()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(&index).map(String::as_str)
    }

    /// Resolve class logits to the arg-max word and its softmax probability.
    pub fn resolve(&self, logits: &[f32]) -> Result<ClassificationResult> {
        if logits.is_empty() {
            return Err(PipelineError::Classification(
                "model returned no logits".to_string(),
            ));
        }
        if logits.iter().any(|v| !v.is_finite()) {
            return Err(PipelineError::Classification(
                "model returned non-finite logits".to_string(),
            ));
        }

        let (best, max) = logits
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |acc, (i, v)| {
                if v > acc.1 {
                    (i, v)
                } else {
                    acc
                }
            });
        let denom: f32 = logits.iter().map(|v| (v - max).exp()).sum();
        let confidence = (1.0 / denom).clamp(0.0, 1.0);

        let label = self.label(best).ok_or_else(|| {
            PipelineError::Classification(format!("class {} is not in the vocabulary", best))
        })?;

        Ok(ClassificationResult::new(label.trim(), confidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_and_two_word_labels() {
        let vocab = Vocabulary::parse("0 book\n1 drink\n\n2 thank you\n").unwrap();
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.label(0), Some("book"));
        assert_eq!(vocab.label(2), Some("thank you"));
        assert_eq!(vocab.label(3), None);
    }

    #[test]
    fn rejects_bad_index() {
        assert!(Vocabulary::parse("zero book\n").is_err());
        assert!(Vocabulary::parse("4\n").is_err());
    }

    #[test]
    fn resolve_picks_argmax_with_softmax_confidence() {
        let vocab = Vocabulary::from_labels(["hello", "my", "name"]);
        let result = vocab.resolve(&[0.0, 2.0, 0.0]).unwrap();
        assert_eq!(result.label, "my");
        let expected = 2f32.exp() / (2.0 + 2f32.exp());
        assert!((result.confidence - expected).abs() < 1e-6);
    }

    #[test]
    fn uniform_logits_split_confidence() {
        let vocab = Vocabulary::from_labels(["a", "b", "c", "d"]);
        let result = vocab.resolve(&[1.0; 4]).unwrap();
        assert_eq!(result.label, "a");
        assert!((result.confidence - 0.25).abs() < 1e-6);
    }

    #[test]
    fn unknown_class_is_a_classification_error() {
        let vocab = Vocabulary::from_labels(["a"]);
        let err = vocab.resolve(&[0.0, 5.0]).unwrap_err();
        assert!(matches!(err, PipelineError::Classification(_)));
    }

    #[test]
    fn empty_or_nan_logits_are_rejected() {
        let vocab = Vocabulary::from_labels(["a"]);
        assert!(vocab.resolve(&[]).is_err());
        assert!(vocab.resolve(&[f32::NAN]).is_err());
    }
}
