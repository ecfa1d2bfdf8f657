use std::path::Path;

use crate::shared::frame::Frame;

/// Writes a single normalized frame to a file.
pub trait FrameExporter: Send {
    fn export(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;
}
