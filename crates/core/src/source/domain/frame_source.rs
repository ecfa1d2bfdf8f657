use std::fmt;
use std::num::NonZeroU32;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::decoded_image::{DecodedImage, NormalizeError};
use crate::shared::source_info::SourceInfo;

/// Which kind of file-backed input a worker reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// A directory of still images played in file-name order.
    ImageSequence,
    #[default]
    VideoFile,
}

impl SourceKind {
    pub const ALL: &[SourceKind] = &[SourceKind::ImageSequence, SourceKind::VideoFile];
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::ImageSequence => write!(f, "image sequence"),
            SourceKind::VideoFile => write!(f, "video file"),
        }
    }
}

/// Reference point of a seek request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOrigin {
    /// Offset from the first frame.
    Start,
    /// Offset from the most recently delivered frame.
    Current,
    /// Offset from the last frame.
    End,
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("input not found: {0}")]
    NotFound(PathBuf),
    #[error("image sequence path is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("no image files in {0}")]
    NoImages(PathBuf),
    #[error("no video stream in {0}")]
    NoVideoStream(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("ffmpeg: {0}")]
    Ffmpeg(#[from] ffmpeg_next::Error),
    #[error("malformed frame: {0}")]
    Frame(#[from] NormalizeError),
}

/// A frame as delivered by a source, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFrame {
    pub image: DecodedImage,
    pub frame_index: usize,
    pub frame_count: Option<usize>,
    /// File name for image sequences, frame index for video.
    pub name: String,
}

/// Outcome of one [`FrameSource::process`] step. Both fields may be set.
#[derive(Debug, Default)]
pub struct ProcessResult {
    pub new_error: Option<String>,
    pub new_frame: Option<SourceFrame>,
}

impl ProcessResult {
    pub fn frame(frame: SourceFrame) -> Self {
        Self {
            new_error: None,
            new_frame: Some(frame),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            new_error: Some(message.into()),
            new_frame: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.new_error.is_none() && self.new_frame.is_none()
    }
}

/// A decoder that yields frames from a file-backed input on demand.
///
/// Each `process()` call does a bounded amount of work and returns at most one
/// frame, so a cooperative scheduler can call it from a tick. Resources are
/// released explicitly with `dispose()`; a disposed source returns empty
/// results.
pub trait FrameSource: Send {
    fn info(&self) -> &SourceInfo;

    /// Resize delivered frames to this width, keeping aspect ratio.
    /// `None` restores native size. Idempotent.
    fn set_target_width(&mut self, width: Option<NonZeroU32>);

    /// The next `process()` delivers the frame at the resolved position.
    fn request_seek(&mut self, offset: i64, origin: SeekOrigin);

    fn process(&mut self) -> ProcessResult;

    /// Releases decoder resources. Idempotent.
    fn dispose(&mut self);
}

/// Output dimensions for a target width, preserving aspect ratio.
pub fn target_dimensions(width: u32, height: u32, target_width: Option<NonZeroU32>) -> (u32, u32) {
    match target_width {
        Some(tw) if width > 0 => {
            let tw = tw.get();
            let th = (height as f64 * tw as f64 / width as f64).round() as u32;
            (tw, th.max(1))
        }
        _ => (width, height),
    }
}
