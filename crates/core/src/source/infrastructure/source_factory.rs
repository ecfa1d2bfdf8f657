use std::path::Path;

use crate::source::domain::frame_source::{FrameSource, SourceError, SourceKind};
use crate::source::infrastructure::image_sequence_source::ImageSequenceSource;
use crate::source::infrastructure::video_file_source::VideoFileSource;

/// Builds a live [`FrameSource`] for a path and kind.
///
/// The worker only talks to this trait, so hosts can plug in other decoders
/// and tests can hand out scripted sources.
pub trait SourceFactory: Send {
    fn open(&self, kind: SourceKind, path: &Path) -> Result<Box<dyn FrameSource>, SourceError>;
}

/// Opens the built-in ffmpeg and image-sequence sources.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultSourceFactory;

impl SourceFactory for DefaultSourceFactory {
    fn open(&self, kind: SourceKind, path: &Path) -> Result<Box<dyn FrameSource>, SourceError> {
        open_source(kind, path)
    }
}

pub fn open_source(kind: SourceKind, path: &Path) -> Result<Box<dyn FrameSource>, SourceError> {
    match kind {
        SourceKind::ImageSequence => Ok(Box::new(ImageSequenceSource::open(path)?)),
        SourceKind::VideoFile => Ok(Box::new(VideoFileSource::open(path)?)),
    }
}
