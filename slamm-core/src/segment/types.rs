use bytes::Bytes;
use serde::Serialize;

/// Whether more segments of the current utterance will follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// More segments are coming; reply with this segment's own result.
    More,
    /// Last segment of the utterance; flush and summarize.
    Complete,
}

impl Continuation {
    /// Parse the wire form of the flag (`1`/`0`, also `true`/`false`).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "1" | "true" => Some(Self::More),
            "0" | "false" => Some(Self::Complete),
            _ => None,
        }
    }
}

/// One uploaded clip representing a single signed word.
///
/// `payload` is `None` when the request carried no video at all, which is how a
/// client closes an utterance without sending another word.
#[derive(Debug, Clone)]
pub struct Segment {
    pub payload: Option<Bytes>,
    pub continuation: Continuation,
}

impl Segment {
    pub fn new(payload: impl Into<Bytes>, continuation: Continuation) -> Self {
        Self {
            payload: Some(payload.into()),
            continuation,
        }
    }

    /// A payload-less segment that only closes the utterance.
    pub fn close() -> Self {
        Self {
            payload: None,
            continuation: Continuation::Complete,
        }
    }
}

/// Label and confidence produced for one segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    /// Word from the closed vocabulary.
    pub label: String,
    /// Confidence in [0, 1].
    pub confidence: f32,
}

impl ClassificationResult {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Decoded, resized and normalized RGB frames.
///
/// `data` is frame-major (`[T, H, W, C]`) with values in [-1, 1].
#[derive(Debug, Clone)]
pub struct FrameSequence {
    pub frames: usize,
    pub height: usize,
    pub width: usize,
    pub data: Vec<f32>,
}

pub const CHANNELS: usize = 3;

impl FrameSequence {
    /// Build a sequence from raw `rgb24` bytes, mapping each byte to `(v / 255) * 2 - 1`.
    ///
    /// Trailing bytes that do not fill a whole frame are ignored.
    pub fn from_rgb24(raw: &[u8], height: usize, width: usize) -> Self {
        let frame_len = height * width * CHANNELS;
        let frames = if frame_len == 0 { 0 } else { raw.len() / frame_len };
        let data = raw[..frames * frame_len]
            .iter()
            .map(|&v| (v as f32 / 255.0) * 2.0 - 1.0)
            .collect();
        Self {
            frames,
            height,
            width,
            data,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }

    /// Shape of the channels-first layout: `[C, T, H, W]`.
    pub fn channels_first_shape(&self) -> [usize; 4] {
        [CHANNELS, self.frames, self.height, self.width]
    }

    /// Transpose from `[T, H, W, C]` to `[C, T, H, W]`.
    pub fn to_channels_first(&self) -> Vec<f32> {
        let pixels = self.frames * self.height * self.width;
        let mut out = vec![0.0f32; self.data.len()];
        for (pixel, rgb) in self.data.chunks_exact(CHANNELS).enumerate() {
            for (channel, &val) in rgb.iter().enumerate() {
                out[channel * pixels + pixel] = val;
            }
        }
        out
    }
}
