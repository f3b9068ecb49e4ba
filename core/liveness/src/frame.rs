use image::RgbImage;

use crate::error::LivenessError;

/// Byte length of a 4:2:0 chroma-subsampled frame: one luma byte per pixel
/// plus one chroma byte per two pixels. `None` if the size overflows.
pub fn expected_frame_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(3)
        .map(|n| n / 2)
}

/// Check that `data` holds exactly one `width` × `height` YUV 4:2:0 frame.
///
/// A mismatch means the caller paired the buffer with the wrong dimensions;
/// the buffer is never truncated or padded to fit.
pub fn validate_frame(data: &[u8], width: u32, height: u32) -> Result<(), LivenessError> {
    match expected_frame_len(width, height) {
        Some(expected) if expected == data.len() => Ok(()),
        expected => Err(LivenessError::SizeMismatch {
            expected: expected.unwrap_or(usize::MAX),
            actual: data.len(),
            width,
            height,
        }),
    }
}

/// A validated camera frame borrowed for the duration of one detection.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    orientation: i32,
}

impl<'a> Frame<'a> {
    /// Wrap a YUV 4:2:0 buffer, rejecting it if its length does not match
    /// the declared geometry. `orientation` is passed through to the engine.
    pub fn new(
        data: &'a [u8],
        width: u32,
        height: u32,
        orientation: i32,
    ) -> Result<Self, LivenessError> {
        validate_frame(data, width, height)?;
        Ok(Self {
            data,
            width,
            height,
            orientation,
        })
    }

    /// Raw YUV bytes.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Sensor orientation code forwarded to the engine.
    pub fn orientation(&self) -> i32 {
        self.orientation
    }
}

/// Convert an RGB image to YUV 4:2:0 semi-planar bytes (BT.601, limited range).
///
/// Layout: the full-resolution Y plane, then one interleaved U,V pair per
/// 2×2 pixel block. Every pixel writes its block's chroma in row order, so
/// the block keeps the value of its last pixel (bottom-right when the block
/// is complete). The output is always [`expected_frame_len`] bytes long;
/// chroma that would fall past the end is dropped.
pub fn rgb_to_yuv420sp(image: &RgbImage) -> Vec<u8> {
    let (width, height) = image.dimensions();
    let luma_len = width as usize * height as usize;
    let total = luma_len * 3 / 2;

    let mut yuv = vec![128u8; total];
    for (x, y, pixel) in image.enumerate_pixels() {
        let [r, g, b] = pixel.0.map(i32::from);
        let luma = ((66 * r + 129 * g + 25 * b + 128) >> 8) + 16;
        yuv[y as usize * width as usize + x as usize] = luma.clamp(16, 255) as u8;

        let u = ((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128;
        let v = ((112 * r - 94 * g - 18 * b + 128) >> 8) + 128;
        let offset = luma_len + (y as usize / 2) * width as usize + (x & !1) as usize;
        if offset + 1 < total {
            yuv[offset] = u.clamp(0, 255) as u8;
            yuv[offset + 1] = v.clamp(0, 255) as u8;
        }
    }
    yuv
}
