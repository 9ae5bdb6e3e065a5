//! Frame classification seam.
//!
//! The pipeline only sees [`FrameClassifier`]; the model itself lives behind it.
//! [`RemoteClassifier`] talks to a model server that returns per-class logits and
//! resolves them to a word with [`Vocabulary`].

pub mod remote;
pub mod vocabulary;

use async_trait::async_trait;

use crate::error::Result;
use crate::segment::types::{ClassificationResult, FrameSequence};

pub use remote::RemoteClassifier;
pub use vocabulary::Vocabulary;

#[async_trait]
pub trait FrameClassifier: Send + Sync {
    /// Classify a decoded segment into one word with a confidence in [0, 1].
    async fn classify(&self, frames: &FrameSequence) -> Result<ClassificationResult>;
}
