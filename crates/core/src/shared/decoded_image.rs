use ndarray::{Array2, Array3, ArrayView3, Axis};
use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("image has no pixels")]
    Empty,
    #[error("unsupported channel count: {0}")]
    Channels(usize),
    #[error("image dimension {0} exceeds u32")]
    Dimension(usize),
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    BufferLength { expected: usize, actual: usize },
}

/// Element depth of a decoder's output buffer.
#[derive(Clone, Debug, PartialEq)]
pub enum PixelData {
    U8(Array3<u8>),
    U16(Array3<u16>),
    /// Normalized floats, nominally in `[0, 1]`.
    F32(Array3<f32>),
}

/// Axis order of the 3-D buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AxisLayout {
    Hwc,
    Chw,
}

/// Raw decoder output, before conversion to an 8-bit HWC [`Frame`].
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedImage {
    pixels: PixelData,
    layout: AxisLayout,
}

impl DecodedImage {
    pub fn new(pixels: PixelData, layout: AxisLayout) -> Self {
        Self { pixels, layout }
    }

    /// Tightly packed 8-bit HWC bytes, as produced by most decoders.
    pub fn from_hwc_u8(
        data: Vec<u8>,
        width: u32,
        height: u32,
        channels: u8,
    ) -> Result<Self, NormalizeError> {
        let shape = (height as usize, width as usize, channels as usize);
        let expected = shape.0 * shape.1 * shape.2;
        let actual = data.len();
        let pixels = Array3::from_shape_vec(shape, data)
            .map_err(|_| NormalizeError::BufferLength { expected, actual })?;
        Ok(Self::new(PixelData::U8(pixels), AxisLayout::Hwc))
    }

    /// Single-channel image; becomes HWC with one channel.
    pub fn from_gray(pixels: Array2<u8>) -> Self {
        Self::new(PixelData::U8(pixels.insert_axis(Axis(2))), AxisLayout::Hwc)
    }

    pub fn layout(&self) -> AxisLayout {
        self.layout
    }

    pub fn pixels(&self) -> &PixelData {
        &self.pixels
    }

    /// Converts to an 8-bit HWC frame, writing into `buffer` (its contents are
    /// discarded, its allocation reused).
    ///
    /// u16 keeps the high byte; f32 is clamped to `[0, 1]` and scaled to 255.
    pub fn into_frame(self, mut buffer: Vec<u8>) -> Result<Frame, NormalizeError> {
        let (h, w, c) = match &self.pixels {
            PixelData::U8(arr) => fill(arr.view(), self.layout, &mut buffer, |v| v),
            PixelData::U16(arr) => fill(arr.view(), self.layout, &mut buffer, |v| (v >> 8) as u8),
            PixelData::F32(arr) => fill(arr.view(), self.layout, &mut buffer, |v| {
                (v.clamp(0.0, 1.0) * 255.0).round() as u8
            }),
        };

        if h == 0 || w == 0 || c == 0 {
            return Err(NormalizeError::Empty);
        }
        let channels = u8::try_from(c).map_err(|_| NormalizeError::Channels(c))?;
        if channels > 4 {
            return Err(NormalizeError::Channels(c));
        }
        let width = u32::try_from(w).map_err(|_| NormalizeError::Dimension(w))?;
        let height = u32::try_from(h).map_err(|_| NormalizeError::Dimension(h))?;

        Ok(Frame::new(buffer, width, height, channels))
    }
}

fn fill<T: Copy>(
    view: ArrayView3<'_, T>,
    layout: AxisLayout,
    buffer: &mut Vec<u8>,
    convert: impl Fn(T) -> u8,
) -> (usize, usize, usize) {
    let hwc = match layout {
        AxisLayout::Hwc => view,
        AxisLayout::Chw => view.permuted_axes([1, 2, 0]),
    };
    let (h, w, c) = hwc.dim();

    buffer.clear();
    buffer.reserve(h * w * c);
    // Logical-order iteration, so permuted views come out row-major HWC.
    buffer.extend(hwc.iter().map(|&v| convert(v)));
    (h, w, c)
}
