//! Luma/chroma decomposition used by the equalization filters.
//!
//! Uses the ITU-R BT.601 YUV transform:
//!
//! ```text
//! Y = 0.299 R + 0.587 G + 0.114 B
//! U = 0.492 (B - Y) + 128
//! V = 0.877 (R - Y) + 128
//! ```
//!
//! Luma is quantized to u8 so it can be histogrammed; chroma stays in f32
//! so channels that pass through unmodified are not requantized.

use ndarray::Array2;

use crate::raster::RasterBuffer;

/// ITU-R BT.601 luma coefficients
const LUMA_R: f32 = 0.299;
const LUMA_G: f32 = 0.587;
const LUMA_B: f32 = 0.114;

const U_SCALE: f32 = 0.492;
const V_SCALE: f32 = 0.877;
const CHROMA_OFFSET: f32 = 128.0;

/// A raster split into one luma plane and two chroma planes.
///
/// Created and consumed within a single equalization call.
#[derive(Debug, Clone)]
pub struct LumaChromaView {
    luma: Array2<u8>,
    chroma_u: Array2<f32>,
    chroma_v: Array2<f32>,
}

impl LumaChromaView {
    /// Forward transform: RGB raster to Y/U/V planes.
    pub fn from_raster(image: &RasterBuffer) -> Self {
        let (width, height) = (image.width(), image.height());
        let input = image.view();

        let mut luma = Array2::<u8>::zeros((height, width));
        let mut chroma_u = Array2::<f32>::zeros((height, width));
        let mut chroma_v = Array2::<f32>::zeros((height, width));

        for y in 0..height {
            for x in 0..width {
                let r = input[[y, x, 0]] as f32;
                let g = input[[y, x, 1]] as f32;
                let b = input[[y, x, 2]] as f32;

                let l = LUMA_R * r + LUMA_G * g + LUMA_B * b;

                luma[[y, x]] = l.round().clamp(0.0, 255.0) as u8;
                chroma_u[[y, x]] = U_SCALE * (b - l) + CHROMA_OFFSET;
                chroma_v[[y, x]] = V_SCALE * (r - l) + CHROMA_OFFSET;
            }
        }

        Self {
            luma,
            chroma_u,
            chroma_v,
        }
    }

    pub fn luma(&self) -> &Array2<u8> {
        &self.luma
    }

    /// Inverse transform with a replacement luma plane and the original chroma.
    ///
    /// # Panics
    /// If `luma` does not have the same shape as the view.
    pub fn recombine(&self, luma: &Array2<u8>) -> RasterBuffer {
        assert_eq!(luma.dim(), self.luma.dim(), "luma plane shape mismatch");
        let (height, width) = luma.dim();

        RasterBuffer::from_fn(width, height, |x, y| {
            let l = luma[[y, x]] as f32;
            let u = self.chroma_u[[y, x]] - CHROMA_OFFSET;
            let v = self.chroma_v[[y, x]] - CHROMA_OFFSET;

            let r = l + 1.140 * v;
            let g = l - 0.395 * u - 0.581 * v;
            let b = l + 2.032 * u;

            [to_u8(r), to_u8(g), to_u8(b)]
        })
    }

    /// Inverse transform with the unmodified luma plane.
    pub fn to_raster(&self) -> RasterBuffer {
        self.recombine(&self.luma)
    }
}

#[inline]
fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gray_luma_equals_value() {
        let img = RasterBuffer::filled(2, 2, [100, 100, 100]);
        let view = LumaChromaView::from_raster(&img);
        assert!(view.luma().iter().all(|&l| l == 100));
    }

    #[test]
    fn test_pure_red_luma() {
        let img = RasterBuffer::filled(1, 1, [255, 0, 0]);
        let view = LumaChromaView::from_raster(&img);
        // 0.299 * 255 ≈ 76
        assert_eq!(view.luma()[[0, 0]], 76);
    }

    #[test]
    fn test_roundtrip_within_tolerance() {
        let img = RasterBuffer::from_fn(16, 16, |x, y| {
            [(x * 13) as u8, (y * 11) as u8, ((x + y) * 7) as u8]
        });
        let back = LumaChromaView::from_raster(&img).to_raster();
        for y in 0..16 {
            for x in 0..16 {
                let a = img.pixel(x, y);
                let b = back.pixel(x, y);
                for c in 0..3 {
                    assert!((a[c] as i32 - b[c] as i32).abs() <= 2, "{a:?} vs {b:?}");
                }
            }
        }
    }

    #[test]
    fn test_recombine_keeps_gray_neutral() {
        let img = RasterBuffer::filled(3, 3, [40, 40, 40]);
        let view = LumaChromaView::from_raster(&img);
        let brighter = view.luma().mapv(|_| 200u8);
        let out = view.recombine(&brighter);
        assert_eq!(out.pixel(1, 1), [200, 200, 200]);
    }
}
