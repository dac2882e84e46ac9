//! In-memory image buffers shared by every engine.
//!
//! ## Layout
//!
//! | Type | Shape | Element | Range |
//! |------|-------|---------|-------|
//! | [`RasterBuffer`] | (H, W, 3) | u8 | 0-255 |
//! | [`WorkingBuffer`] | (H, W, 3) | f32 | unbounded |
//!
//! Channels are stored in RGB order. Engines never mutate their input: each
//! call produces a fresh buffer with the same width, height and channel order.

use image::{Rgb, RgbImage};
use ndarray::{Array3, ArrayView3};

use crate::error::{EnhanceError, Result};

/// Number of color channels in every raster.
pub const CHANNELS: usize = 3;

/// Higher-precision scratch representation used inside engines that could
/// overflow in 8-bit arithmetic. Never returned to callers.
pub type WorkingBuffer = Array3<f32>;

/// Fixed-size 3-channel 8-bit image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterBuffer {
    data: Array3<u8>,
}

impl RasterBuffer {
    /// Wrap an existing (height, width, 3) array.
    pub fn from_array(data: Array3<u8>) -> Result<Self> {
        let channels = data.dim().2;
        if channels != CHANNELS {
            return Err(EnhanceError::ChannelCount { channels });
        }
        Ok(Self { data })
    }

    /// Create a buffer where every pixel has the same color.
    pub fn filled(width: usize, height: usize, rgb: [u8; 3]) -> Self {
        let data = Array3::from_shape_fn((height, width, CHANNELS), |(_, _, c)| rgb[c]);
        Self { data }
    }

    /// Create a buffer from a per-pixel generator `f(x, y) -> [r, g, b]`.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> [u8; 3]) -> Self {
        let mut data = Array3::<u8>::zeros((height, width, CHANNELS));
        for y in 0..height {
            for x in 0..width {
                let px = f(x, y);
                for c in 0..CHANNELS {
                    data[[y, x, c]] = px[c];
                }
            }
        }
        Self { data }
    }

    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    pub fn channels(&self) -> usize {
        self.data.dim().2
    }

    pub fn view(&self) -> ArrayView3<'_, u8> {
        self.data.view()
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        [
            self.data[[y, x, 0]],
            self.data[[y, x, 1]],
            self.data[[y, x, 2]],
        ]
    }

    /// Largest channel value anywhere in the image.
    pub fn max_value(&self) -> u8 {
        self.data.iter().copied().max().unwrap_or(0)
    }

    /// Mean over all channels of all pixels.
    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().map(|&v| v as f64).sum::<f64>() / self.data.len() as f64
    }

    /// Promote to a floating-point working buffer.
    pub fn to_working(&self) -> WorkingBuffer {
        self.data.mapv(|v| v as f32)
    }

    /// Round and clamp a working buffer back to 8-bit.
    pub fn from_working(working: &WorkingBuffer) -> Self {
        Self {
            data: working.mapv(|v| v.round().clamp(0.0, 255.0) as u8),
        }
    }

    /// Apply a 256-entry lookup table to every channel of every pixel.
    pub fn map_lut(&self, lut: &[u8; 256]) -> Self {
        Self {
            data: self.data.mapv(|v| lut[v as usize]),
        }
    }

    pub fn from_rgb_image(img: &RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self::from_fn(width as usize, height as usize, |x, y| {
            img.get_pixel(x as u32, y as u32).0
        })
    }

    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width() as u32, self.height() as u32, |x, y| {
            Rgb(self.pixel(x as usize, y as usize))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_array_rejects_rgba() {
        let rgba = Array3::<u8>::zeros((2, 2, 4));
        let err = RasterBuffer::from_array(rgba).unwrap_err();
        assert!(matches!(err, EnhanceError::ChannelCount { channels: 4 }));
    }

    #[test]
    fn test_dimensions() {
        let img = RasterBuffer::filled(5, 3, [1, 2, 3]);
        assert_eq!(img.width(), 5);
        assert_eq!(img.height(), 3);
        assert_eq!(img.channels(), 3);
        assert_eq!(img.pixel(4, 2), [1, 2, 3]);
    }

    #[test]
    fn test_working_roundtrip_clamps() {
        let img = RasterBuffer::filled(2, 2, [10, 20, 30]);
        let mut working = img.to_working();
        working[[0, 0, 0]] = 300.0;
        working[[0, 0, 1]] = -12.0;
        working[[0, 0, 2]] = 29.6;
        let back = RasterBuffer::from_working(&working);
        assert_eq!(back.pixel(0, 0), [255, 0, 30]);
        assert_eq!(back.pixel(1, 1), [10, 20, 30]);
    }

    #[test]
    fn test_rgb_image_conversion() {
        let img = RasterBuffer::from_fn(3, 2, |x, y| [x as u8, y as u8, 7]);
        let rgb = img.to_rgb_image();
        assert_eq!(rgb.get_pixel(2, 1).0, [2, 1, 7]);
        assert_eq!(RasterBuffer::from_rgb_image(&rgb), img);
    }
}
