use std::fs;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use ndarray::Array3;

use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::decoded_image::{AxisLayout, DecodedImage, PixelData};
use crate::shared::source_info::SourceInfo;
use crate::source::domain::frame_source::{
    target_dimensions, FrameSource, ProcessResult, SeekOrigin, SourceError, SourceFrame,
};
use crate::source::domain::playback_cursor::PlaybackCursor;

/// Plays a directory of still images as a frame sequence.
///
/// Files are ordered by name and decoded lazily, one per `process()` call,
/// with the `image` crate. Bit depth is preserved (8-bit, 16-bit or float)
/// and left to the worker's normalization step.
pub struct ImageSequenceSource {
    files: Vec<PathBuf>,
    info: SourceInfo,
    cursor: PlaybackCursor,
    target_width: Option<NonZeroU32>,
    disposed: bool,
}

impl ImageSequenceSource {
    pub fn open(dir: &Path) -> Result<Self, SourceError> {
        if !dir.exists() {
            return Err(SourceError::NotFound(dir.to_path_buf()));
        }
        if !dir.is_dir() {
            return Err(SourceError::NotADirectory(dir.to_path_buf()));
        }

        let files = list_images(dir)?;
        if files.is_empty() {
            return Err(SourceError::NoImages(dir.to_path_buf()));
        }

        // Dimensions are informational; a broken first file surfaces on decode.
        let (width, height) = image::image_dimensions(&files[0]).unwrap_or((0, 0));
        let info = SourceInfo {
            width,
            height,
            fps: 0.0,
            frame_count: Some(files.len()),
            source_path: Some(dir.to_path_buf()),
        };

        log::debug!("Image sequence {} has {} files", dir.display(), files.len());

        Ok(Self {
            cursor: PlaybackCursor::new(Some(files.len())),
            files,
            info,
            target_width: None,
            disposed: false,
        })
    }
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>, SourceError> {
    let io_err = |source| SourceError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && is_image(&path) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn decode(
    path: &Path,
    target_width: Option<NonZeroU32>,
) -> Result<DecodedImage, Box<dyn std::error::Error>> {
    let mut img = image::open(path)?;

    let (w, h) = target_dimensions(img.width(), img.height(), target_width);
    if (w, h) != (img.width(), img.height()) {
        img = img.resize_exact(w, h, image::imageops::FilterType::Triangle);
    }

    let (w, h) = (img.width() as usize, img.height() as usize);
    let image = match img {
        image::DynamicImage::ImageLuma8(buf) => u8_image(buf.into_raw(), w, h, 1)?,
        image::DynamicImage::ImageLumaA8(buf) => u8_image(buf.into_raw(), w, h, 2)?,
        image::DynamicImage::ImageRgb8(buf) => u8_image(buf.into_raw(), w, h, 3)?,
        image::DynamicImage::ImageRgba8(buf) => u8_image(buf.into_raw(), w, h, 4)?,
        image::DynamicImage::ImageLuma16(buf) => {
            let arr = Array3::from_shape_vec((h, w, 1), buf.into_raw())?;
            DecodedImage::new(PixelData::U16(arr), AxisLayout::Hwc)
        }
        image::DynamicImage::ImageRgb16(buf) => {
            let arr = Array3::from_shape_vec((h, w, 3), buf.into_raw())?;
            DecodedImage::new(PixelData::U16(arr), AxisLayout::Hwc)
        }
        image::DynamicImage::ImageRgba16(buf) => {
            let arr = Array3::from_shape_vec((h, w, 4), buf.into_raw())?;
            DecodedImage::new(PixelData::U16(arr), AxisLayout::Hwc)
        }
        image::DynamicImage::ImageRgb32F(buf) => {
            let arr = Array3::from_shape_vec((h, w, 3), buf.into_raw())?;
            DecodedImage::new(PixelData::F32(arr), AxisLayout::Hwc)
        }
        image::DynamicImage::ImageRgba32F(buf) => {
            let arr = Array3::from_shape_vec((h, w, 4), buf.into_raw())?;
            DecodedImage::new(PixelData::F32(arr), AxisLayout::Hwc)
        }
        other => u8_image(other.to_rgb8().into_raw(), w, h, 3)?,
    };
    Ok(image)
}

fn u8_image(
    data: Vec<u8>,
    width: usize,
    height: usize,
    channels: usize,
) -> Result<DecodedImage, ndarray::ShapeError> {
    let arr = Array3::from_shape_vec((height, width, channels), data)?;
    Ok(DecodedImage::new(PixelData::U8(arr), AxisLayout::Hwc))
}

impl FrameSource for ImageSequenceSource {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn set_target_width(&mut self, width: Option<NonZeroU32>) {
        self.target_width = width;
    }

    fn request_seek(&mut self, offset: i64, origin: SeekOrigin) {
        self.cursor.request_seek(offset, origin);
    }

    fn process(&mut self) -> ProcessResult {
        if self.disposed {
            return ProcessResult::default();
        }

        self.cursor.take_seek();
        if self.cursor.is_exhausted() {
            return ProcessResult::default();
        }

        let frame_index = self.cursor.advance();
        let path = &self.files[frame_index];
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| frame_index.to_string());

        match decode(path, self.target_width) {
            Ok(image) => ProcessResult::frame(SourceFrame {
                image,
                frame_index,
                frame_count: self.cursor.frame_count(),
                name,
            }),
            Err(e) => ProcessResult::error(format!("{}: {e}", path.display())),
        }
    }

    fn dispose(&mut self) {
        self.files.clear();
        self.disposed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_rgb(dir: &Path, name: &str, width: u32, height: u32, value: u8) -> PathBuf {
        let path = dir.join(name);
        let mut img = image::RgbImage::new(width, height);
        for pixel in img.pixels_mut() {
            *pixel = image::Rgb([value, value, value]);
        }
        img.save(&path).unwrap();
        path
    }

    fn sequence(dir: &Path) {
        write_rgb(dir, "frame_002.png", 8, 4, 20);
        write_rgb(dir, "frame_000.png", 8, 4, 0);
        write_rgb(dir, "frame_001.png", 8, 4, 10);
        std::fs::write(dir.join("notes.txt"), "not an image").unwrap();
    }

    fn frames(source: &mut ImageSequenceSource) -> Vec<SourceFrame> {
        std::iter::from_fn(|| source.process().new_frame).collect()
    }

    #[test]
    fn test_open_nonexistent_is_not_found() {
        let result = ImageSequenceSource::open(Path::new("/nonexistent/frames"));
        assert!(matches!(result, Err(SourceError::NotFound(_))));
    }

    #[test]
    fn test_open_file_is_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_rgb(dir.path(), "single.png", 2, 2, 0);
        let result = ImageSequenceSource::open(&path);
        assert!(matches!(result, Err(SourceError::NotADirectory(_))));
    }

    #[test]
    fn test_open_empty_directory_has_no_images() {
        let dir = tempfile::tempdir().unwrap();
        let result = ImageSequenceSource::open(dir.path());
        assert!(matches!(result, Err(SourceError::NoImages(_))));
    }

    #[test]
    fn test_info_reports_count_and_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        sequence(dir.path());
        let source = ImageSequenceSource::open(dir.path()).unwrap();
        let info = source.info();
        assert_eq!(info.frame_count, Some(3));
        assert_eq!((info.width, info.height), (8, 4));
        assert_eq!(info.source_path.as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_frames_are_name_ordered() {
        let dir = tempfile::tempdir().unwrap();
        sequence(dir.path());
        let mut source = ImageSequenceSource::open(dir.path()).unwrap();

        let frames = frames(&mut source);
        let names: Vec<_> = frames.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["frame_000.png", "frame_001.png", "frame_002.png"]);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.frame_index, i);
            assert_eq!(frame.frame_count, Some(3));
        }

        let pixels = frames[1].image.clone().into_frame(Vec::new()).unwrap();
        assert_eq!(pixels.data()[0], 10);
    }

    #[test]
    fn test_exhausted_source_returns_empty_results() {
        let dir = tempfile::tempdir().unwrap();
        write_rgb(dir.path(), "a.png", 2, 2, 0);
        let mut source = ImageSequenceSource::open(dir.path()).unwrap();
        assert!(source.process().new_frame.is_some());
        assert!(source.process().is_empty());
        assert!(source.process().is_empty());
    }

    #[test]
    fn test_seek_replays_from_position() {
        let dir = tempfile::tempdir().unwrap();
        sequence(dir.path());
        let mut source = ImageSequenceSource::open(dir.path()).unwrap();
        let _ = frames(&mut source);

        source.request_seek(1, SeekOrigin::Start);
        let replay = frames(&mut source);
        assert_eq!(replay.len(), 2);
        assert_eq!(replay[0].frame_index, 1);
    }

    #[test]
    fn test_target_width_resizes_keeping_aspect() {
        let dir = tempfile::tempdir().unwrap();
        write_rgb(dir.path(), "a.png", 8, 4, 0);
        let mut source = ImageSequenceSource::open(dir.path()).unwrap();
        source.set_target_width(NonZeroU32::new(4));

        let frame = source.process().new_frame.unwrap();
        let pixels = frame.image.into_frame(Vec::new()).unwrap();
        assert_eq!((pixels.width(), pixels.height()), (4, 2));
    }

    #[test]
    fn test_sixteen_bit_images_keep_depth() {
        let dir = tempfile::tempdir().unwrap();
        let mut img: image::ImageBuffer<image::Rgb<u16>, Vec<u16>> = image::ImageBuffer::new(2, 2);
        for pixel in img.pixels_mut() {
            *pixel = image::Rgb([0xABCD, 0, 0xFFFF]);
        }
        img.save(dir.path().join("deep.png")).unwrap();

        let mut source = ImageSequenceSource::open(dir.path()).unwrap();
        let frame = source.process().new_frame.unwrap();
        assert!(matches!(frame.image.pixels(), PixelData::U16(_)));
        let pixels = frame.image.into_frame(Vec::new()).unwrap();
        assert_eq!(&pixels.data()[..3], &[0xAB, 0, 0xFF]);
    }

    #[test]
    fn test_corrupt_file_is_reported_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), b"garbage").unwrap();
        write_rgb(dir.path(), "b.png", 2, 2, 0);
        let mut source = ImageSequenceSource::open(dir.path()).unwrap();

        let first = source.process();
        assert!(first.new_error.unwrap().contains("a.png"));
        assert!(first.new_frame.is_none());

        let second = source.process().new_frame.unwrap();
        assert_eq!(second.name, "b.png");
        assert_eq!(second.frame_index, 1);
    }

    #[test]
    fn test_dispose_is_idempotent_and_stops_output() {
        let dir = tempfile::tempdir().unwrap();
        sequence(dir.path());
        let mut source = ImageSequenceSource::open(dir.path()).unwrap();
        source.dispose();
        source.dispose();
        assert!(source.process().is_empty());
    }
}
