//! SLAMM core: turns a stream of single-word sign language clips into one sentence.
//!
//! Each uploaded segment is decoded and classified into a word
//! ([`segment`], [`classifier`]). Words accumulate per session until the client
//! marks the utterance complete, at which point the buffer is flushed and the
//! word list is summarized into a sentence ([`utterance`], [`router`],
//! [`summarizer`]). [`server`] exposes this over HTTP.

pub mod classifier;
pub mod config;
pub mod error;
pub mod router;
pub mod segment;
pub mod server;
pub mod summarizer;
pub mod utterance;

pub use config::ServerConfig;
pub use error::{PipelineError, Result};
pub use router::{FinalResult, RequestRouter, SegmentOutcome};
