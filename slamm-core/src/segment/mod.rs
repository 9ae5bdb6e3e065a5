pub mod decoder;
pub mod processor;
pub mod types;

pub use decoder::{FfmpegDecoder, FrameDecoder};
pub use processor::SegmentProcessor;
pub use types::{ClassificationResult, Continuation, FrameSequence, Segment};
