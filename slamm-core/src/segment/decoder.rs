use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use super::types::FrameSequence;
use crate::error::{PipelineError, Result};

/// Turns a video file into a normalized frame sequence.
#[async_trait]
pub trait FrameDecoder: Send + Sync {
    async fn decode(&self, path: &Path) -> Result<FrameSequence>;
}

/// Decoder that shells out to `ffmpeg`, scaling every frame to a square
/// `frame_size` and reading raw `rgb24` from stdout.
#[derive(Debug, Clone)]
pub struct FfmpegDecoder {
    program: PathBuf,
    frame_size: usize,
}

impl FfmpegDecoder {
    pub fn new(program: impl Into<PathBuf>, frame_size: usize) -> Self {
        Self {
            program: program.into(),
            frame_size,
        }
    }

    fn command(&self, path: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-v")
            .arg("error")
            .arg("-i")
            .arg(path)
            .arg("-vf")
            .arg(format!("scale={0}:{0}", self.frame_size))
            .arg("-pix_fmt")
            .arg("rgb24")
            .arg("-f")
            .arg("rawvideo")
            .arg("pipe:1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl Default for FfmpegDecoder {
    fn default() -> Self {
        Self::new("ffmpeg", 224)
    }
}

#[async_trait]
impl FrameDecoder for FfmpegDecoder {
    async fn decode(&self, path: &Path) -> Result<FrameSequence> {
        let output = self.command(path).output().await.map_err(|e| {
            PipelineError::Decode(format!(
                "failed to run {}: {}",
                self.program.display(),
                e
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::Decode(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let frames = FrameSequence::from_rgb24(&output.stdout, self.frame_size, self.frame_size);
        if frames.is_empty() {
            return Err(PipelineError::Decode("no frames extracted".to_string()));
        }

        debug!(frames = frames.frames, size = self.frame_size, "Decoded segment");
        Ok(frames)
    }
}
