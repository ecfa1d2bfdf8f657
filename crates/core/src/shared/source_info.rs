use std::path::PathBuf;

/// Static description of an opened frame source.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceInfo {
    /// Native frame width, before any target-width resize.
    pub width: u32,
    pub height: u32,
    /// Nominal playback rate; 0 for image sequences without timing.
    pub fps: f64,
    /// Total frames, when the container reports it.
    pub frame_count: Option<usize>,
    pub source_path: Option<PathBuf>,
}
