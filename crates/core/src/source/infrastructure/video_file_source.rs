use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use crate::shared::decoded_image::DecodedImage;
use crate::shared::source_info::SourceInfo;
use crate::source::domain::frame_source::{
    target_dimensions, FrameSource, ProcessResult, SeekOrigin, SourceError, SourceFrame,
};
use crate::source::domain::playback_cursor::PlaybackCursor;

type ScalerKey = (ffmpeg_next::format::Pixel, u32, u32, u32, u32);

/// Decodes a video file via ffmpeg-next, one frame per `process()` call.
///
/// Frames are converted to RGB24 by the ffmpeg scaler, which also applies
/// the target width. Seeking backwards reopens the container and decodes
/// forward to the requested frame, so positions are frame-exact.
pub struct VideoFileSource {
    path: PathBuf,
    input: Option<ffmpeg_next::format::context::Input>,
    decoder: Option<ffmpeg_next::decoder::Video>,
    scaler: Option<(ScalerKey, ffmpeg_next::software::scaling::Context)>,
    video_stream_index: usize,
    info: SourceInfo,
    cursor: PlaybackCursor,
    target_width: Option<NonZeroU32>,
    /// Index of the frame the decoder will hand out next.
    decoded_index: usize,
    eof_sent: bool,
    ended: bool,
}

// Safety: VideoFileSource is owned by exactly one worker thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for VideoFileSource {}

impl VideoFileSource {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        ffmpeg_next::init()?;

        if !path.exists() {
            return Err(SourceError::NotFound(path.to_path_buf()));
        }

        let (input, decoder, video_stream_index, info) = open_input(path)?;
        log::debug!(
            "Opened {} ({}x{}, {:.2} fps, {:?} frames)",
            path.display(),
            info.width,
            info.height,
            info.fps,
            info.frame_count
        );

        Ok(Self {
            path: path.to_path_buf(),
            input: Some(input),
            decoder: Some(decoder),
            scaler: None,
            video_stream_index,
            cursor: PlaybackCursor::new(info.frame_count),
            info,
            target_width: None,
            decoded_index: 0,
            eof_sent: false,
            ended: false,
        })
    }

    fn is_disposed(&self) -> bool {
        self.input.is_none()
    }

    fn rewind(&mut self) -> Result<(), SourceError> {
        let (input, decoder, video_stream_index, _) = open_input(&self.path)?;
        self.input = Some(input);
        self.decoder = Some(decoder);
        self.video_stream_index = video_stream_index;
        self.decoded_index = 0;
        self.eof_sent = false;
        self.ended = false;
        Ok(())
    }

    /// Positions the decoder so the next decoded frame is `target`.
    fn seek_to(&mut self, target: usize) -> Result<(), SourceError> {
        if target < self.decoded_index || self.ended {
            self.rewind()?;
        }
        while self.decoded_index < target {
            if self.decode_next()?.is_none() {
                self.ended = true;
                self.cursor.mark_end(self.decoded_index);
                break;
            }
            self.decoded_index += 1;
        }
        Ok(())
    }

    fn decode_next(&mut self) -> Result<Option<ffmpeg_next::util::frame::video::Video>, SourceError> {
        let (Some(input), Some(decoder)) = (self.input.as_mut(), self.decoder.as_mut()) else {
            return Ok(None);
        };

        loop {
            let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
            if decoder.receive_frame(&mut decoded).is_ok() {
                return Ok(Some(decoded));
            }
            if self.eof_sent {
                return Ok(None);
            }

            match input.packets().next() {
                Some((stream, packet)) => {
                    if stream.index() != self.video_stream_index {
                        continue;
                    }
                    if let Err(e) = decoder.send_packet(&packet) {
                        log::debug!("Dropping undecodable packet: {e}");
                    }
                }
                None => {
                    decoder.send_eof()?;
                    self.eof_sent = true;
                }
            }
        }
    }

    fn to_rgb(
        &mut self,
        decoded: &ffmpeg_next::util::frame::video::Video,
    ) -> Result<DecodedImage, SourceError> {
        let (width, height) = target_dimensions(decoded.width(), decoded.height(), self.target_width);
        let key = (
            decoded.format(),
            decoded.width(),
            decoded.height(),
            width,
            height,
        );

        let mut scaler = match self.scaler.take() {
            Some((k, scaler)) if k == key => scaler,
            _ => ffmpeg_next::software::scaling::Context::get(
                decoded.format(),
                decoded.width(),
                decoded.height(),
                ffmpeg_next::format::Pixel::RGB24,
                width,
                height,
                ffmpeg_next::software::scaling::Flags::BILINEAR,
            )?,
        };

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        let result = scaler.run(decoded, &mut rgb_frame);
        self.scaler = Some((key, scaler));
        result?;

        let pixels = extract_rgb_pixels(&rgb_frame, width, height);
        Ok(DecodedImage::from_hwc_u8(pixels, width, height, 3)?)
    }
}

type OpenedInput = (
    ffmpeg_next::format::context::Input,
    ffmpeg_next::decoder::Video,
    usize,
    SourceInfo,
);

fn open_input(path: &Path) -> Result<OpenedInput, SourceError> {
    let input = ffmpeg_next::format::input(path)?;

    let stream = input
        .streams()
        .best(ffmpeg_next::media::Type::Video)
        .ok_or_else(|| SourceError::NoVideoStream(path.to_path_buf()))?;

    let video_stream_index = stream.index();
    let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
    let decoder = codec_ctx.decoder().video()?;

    let rate = stream.rate();
    let fps = if rate.denominator() != 0 {
        rate.numerator() as f64 / rate.denominator() as f64
    } else {
        0.0
    };
    let frames = stream.frames();

    let info = SourceInfo {
        width: decoder.width(),
        height: decoder.height(),
        fps,
        frame_count: (frames > 0).then_some(frames as usize),
        source_path: Some(path.to_path_buf()),
    };

    Ok((input, decoder, video_stream_index, info))
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer.
///
/// ffmpeg frames may have padding bytes at the end of each row (stride > width*3).
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}

impl FrameSource for VideoFileSource {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn set_target_width(&mut self, width: Option<NonZeroU32>) {
        self.target_width = width;
    }

    fn request_seek(&mut self, offset: i64, origin: SeekOrigin) {
        if self.cursor.request_seek(offset, origin).is_none() {
            log::warn!(
                "Ignoring seek from end of {}: frame count unknown",
                self.path.display()
            );
        }
    }

    fn process(&mut self) -> ProcessResult {
        if self.is_disposed() {
            return ProcessResult::default();
        }

        if let Some(target) = self.cursor.take_seek() {
            if let Err(e) = self.seek_to(target) {
                return ProcessResult::error(e.to_string());
            }
        }
        if self.ended {
            return ProcessResult::default();
        }

        let decoded = match self.decode_next() {
            Ok(Some(decoded)) => decoded,
            Ok(None) => {
                self.ended = true;
                self.cursor.mark_end(self.decoded_index);
                log::debug!("Reached end of {}", self.path.display());
                return ProcessResult::default();
            }
            Err(e) => return ProcessResult::error(e.to_string()),
        };
        self.decoded_index += 1;
        let frame_index = self.cursor.advance();

        match self.to_rgb(&decoded) {
            Ok(image) => ProcessResult::frame(SourceFrame {
                image,
                frame_index,
                frame_count: self.cursor.frame_count(),
                name: frame_index.to_string(),
            }),
            Err(e) => ProcessResult::error(e.to_string()),
        }
    }

    fn dispose(&mut self) {
        self.scaler = None;
        self.decoder = None;
        self.input = None;
    }
}
