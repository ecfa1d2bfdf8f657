use std::path::Path;

use image::{DynamicImage, GrayAlphaImage, GrayImage, RgbImage, RgbaImage};

use crate::export::domain::frame_exporter::FrameExporter;
use crate::shared::frame::Frame;

/// Writes frames with the `image` crate; the format follows the file
/// extension.
#[derive(Default)]
pub struct ImageFileExporter;

impl ImageFileExporter {
    pub fn new() -> Self {
        Self
    }
}

fn to_dynamic(frame: &Frame) -> Option<DynamicImage> {
    let (w, h) = (frame.width(), frame.height());
    let data = frame.data().to_vec();
    match frame.channels() {
        1 => GrayImage::from_raw(w, h, data).map(DynamicImage::ImageLuma8),
        2 => GrayAlphaImage::from_raw(w, h, data).map(DynamicImage::ImageLumaA8),
        3 => RgbImage::from_raw(w, h, data).map(DynamicImage::ImageRgb8),
        4 => RgbaImage::from_raw(w, h, data).map(DynamicImage::ImageRgba8),
        _ => None,
    }
}

impl FrameExporter for ImageFileExporter {
    fn export(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let img = to_dynamic(frame).ok_or_else(|| {
            format!(
                "Cannot export {}x{} frame with {} channels",
                frame.width(),
                frame.height(),
                frame.channels()
            )
        })?;

        img.save(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn make_frame(width: u32, height: u32, channels: u8, value: u8) -> Frame {
        let len = (width * height) as usize * channels as usize;
        Frame::new(vec![value; len], width, height, channels)
    }

    #[rstest]
    #[case::gray(1)]
    #[case::gray_alpha(2)]
    #[case::rgb(3)]
    #[case::rgba(4)]
    fn test_export_creates_file(#[case] channels: u8) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        ImageFileExporter::new()
            .export(&path, &make_frame(6, 4, channels, 90))
            .unwrap();
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_roundtrip_preserves_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let mut frame = make_frame(5, 3, 3, 0);
        frame.data_mut()[0] = 200;
        ImageFileExporter::new().export(&path, &frame).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (5, 3));
        assert_eq!(img.get_pixel(0, 0)[0], 200);
        assert_eq!(img.get_pixel(1, 0)[0], 0);
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("out.png");
        ImageFileExporter::new()
            .export(&path, &make_frame(2, 2, 3, 10))
            .unwrap();
        assert!(path.exists());
    }
}
