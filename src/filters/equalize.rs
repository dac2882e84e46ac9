//! Histogram equalization filters: Global and Contrast-Limited Adaptive (CLAHE).
//!
//! Both operate on the luma plane of a [`LumaChromaView`]; chroma passes
//! through unmodified.
//!
//! ## CLAHE
//!
//! The luma plane is split into a grid of tiles (default 8x8). When the image
//! size is not a multiple of the grid, tiles are sized up and the missing
//! border is read mirrored (reflect-101). Each tile gets its own
//! equalization table built from a clipped histogram; every output pixel
//! blends the tables of the four nearest tile centres bilinearly so no seam
//! appears at tile boundaries. Pixels outside the outermost centres reuse
//! the nearest table.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::core::{build_lut, reflect_101};
use super::grayscale::LumaChromaView;
use crate::error::{EnhanceError, Result};
use crate::raster::RasterBuffer;

/// Number of histogram bins for 8-bit data.
pub const HIST_BINS: usize = 256;

// ============================================================================
// Histograms
// ============================================================================

/// Compute the 256-bin histogram of a luma plane.
pub fn luma_histogram(luma: &Array2<u8>) -> [u32; HIST_BINS] {
    let mut hist = [0u32; HIST_BINS];
    for &v in luma.iter() {
        hist[v as usize] += 1;
    }
    hist
}

/// Equalization table `round(255 * cdf(v) / total)`.
///
/// An empty histogram yields the identity table.
pub fn cdf_lut(hist: &[u32; HIST_BINS]) -> [u8; 256] {
    let total: u64 = hist.iter().map(|&c| c as u64).sum();
    if total == 0 {
        return build_lut(|i| i as f64);
    }

    let mut cdf = [0u64; HIST_BINS];
    let mut sum = 0u64;
    for (i, &count) in hist.iter().enumerate() {
        sum += count as u64;
        cdf[i] = sum;
    }

    build_lut(|i| 255.0 * cdf[i] as f64 / total as f64)
}

// ============================================================================
// Global
// ============================================================================

/// Equalize the luma histogram of the whole image.
///
/// Stretches global contrast; near-uniform regions can pick up amplified
/// noise.
pub fn equalize_global(image: &RasterBuffer) -> RasterBuffer {
    let view = LumaChromaView::from_raster(image);
    let luma = equalize_luma(view.luma());
    view.recombine(&luma)
}

/// Global equalization of a single luma plane.
pub fn equalize_luma(luma: &Array2<u8>) -> Array2<u8> {
    let lut = cdf_lut(&luma_histogram(luma));
    luma.mapv(|v| lut[v as usize])
}

// ============================================================================
// CLAHE
// ============================================================================

/// Number of tile columns and rows used by [`equalize_adaptive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileGrid {
    pub cols: usize,
    pub rows: usize,
}

impl TileGrid {
    pub const fn new(cols: usize, rows: usize) -> Self {
        Self { cols, rows }
    }

    pub fn validate(&self) -> Result<()> {
        if self.cols == 0 {
            return Err(EnhanceError::invalid("tile_grid.cols", self.cols as f64, "must be >= 1"));
        }
        if self.rows == 0 {
            return Err(EnhanceError::invalid("tile_grid.rows", self.rows as f64, "must be >= 1"));
        }
        Ok(())
    }
}

impl Default for TileGrid {
    fn default() -> Self {
        Self::new(8, 8)
    }
}

/// Clip every bin at `limit` and spread the excess evenly over all bins.
///
/// Whatever does not divide evenly is handed out one count at a time with
/// a stride so it lands across the whole range instead of the low end.
pub fn clip_histogram(hist: &mut [u32; HIST_BINS], limit: u32) {
    let mut clipped = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            clipped += *bin - limit;
            *bin = limit;
        }
    }

    let batch = clipped / HIST_BINS as u32;
    let mut residual = clipped as usize - batch as usize * HIST_BINS;
    for bin in hist.iter_mut() {
        *bin += batch;
    }

    if residual != 0 {
        let step = (HIST_BINS / residual).max(1);
        let mut i = 0;
        while i < HIST_BINS && residual > 0 {
            hist[i] += 1;
            i += step;
            residual -= 1;
        }
    }
}

/// Absolute per-bin clip threshold for a tile of `tile_area` pixels.
pub fn clip_threshold(clip_limit: f32, tile_area: usize) -> u32 {
    ((clip_limit * tile_area as f32 / HIST_BINS as f32) as u32).max(1)
}

/// Per-tile equalization tables, row-major over the grid.
struct TileLuts {
    grid: TileGrid,
    tile_w: usize,
    tile_h: usize,
    luts: Vec<[u8; 256]>,
}

impl TileLuts {
    fn compute(luma: &Array2<u8>, clip_limit: f32, grid: TileGrid) -> Self {
        let (height, width) = luma.dim();
        let tile_w = width.div_ceil(grid.cols);
        let tile_h = height.div_ceil(grid.rows);
        let tile_area = tile_w * tile_h;
        let limit = clip_threshold(clip_limit, tile_area);

        trace!(tile_w, tile_h, limit, "computing CLAHE tile tables");

        let mut luts = Vec::with_capacity(grid.cols * grid.rows);
        for ty in 0..grid.rows {
            for tx in 0..grid.cols {
                let mut hist = [0u32; HIST_BINS];
                for dy in 0..tile_h {
                    let sy = reflect_101((ty * tile_h + dy) as isize, height);
                    for dx in 0..tile_w {
                        let sx = reflect_101((tx * tile_w + dx) as isize, width);
                        hist[luma[[sy, sx]] as usize] += 1;
                    }
                }
                clip_histogram(&mut hist, limit);
                luts.push(cdf_lut(&hist));
            }
        }

        Self {
            grid,
            tile_w,
            tile_h,
            luts,
        }
    }

    fn lut(&self, tx: usize, ty: usize) -> &[u8; 256] {
        &self.luts[ty * self.grid.cols + tx]
    }
}

/// Neighbouring tile indices and the weight of the second one along an axis.
#[derive(Debug, Clone, Copy)]
struct AxisWeight {
    lo: usize,
    hi: usize,
    frac: f32,
}

fn axis_weights(len: usize, tile: usize, tiles: usize) -> Vec<AxisWeight> {
    let inv = 1.0 / tile as f32;
    (0..len)
        .map(|p| {
            let f = p as f32 * inv - 0.5;
            let lo = f.floor();
            let frac = f - lo;
            let lo = lo as isize;
            AxisWeight {
                lo: lo.max(0) as usize,
                hi: ((lo + 1) as usize).min(tiles - 1),
                frac,
            }
        })
        .collect()
}

/// CLAHE on a single luma plane.
pub fn equalize_adaptive_luma(
    luma: &Array2<u8>,
    clip_limit: f32,
    grid: TileGrid,
) -> Result<Array2<u8>> {
    if !(clip_limit > 0.0 && clip_limit.is_finite()) {
        return Err(EnhanceError::invalid(
            "clip_limit",
            clip_limit,
            "must be a finite value > 0",
        ));
    }
    grid.validate()?;

    let (height, width) = luma.dim();
    if width == 0 || height == 0 {
        return Ok(luma.clone());
    }

    let tiles = TileLuts::compute(luma, clip_limit, grid);
    let xs = axis_weights(width, tiles.tile_w, grid.cols);
    let ys = axis_weights(height, tiles.tile_h, grid.rows);

    let mut output = Array2::<u8>::zeros((height, width));
    for (y, wy) in ys.iter().enumerate() {
        for (x, wx) in xs.iter().enumerate() {
            let v = luma[[y, x]] as usize;

            let top = tiles.lut(wx.lo, wy.lo)[v] as f32 * (1.0 - wx.frac)
                + tiles.lut(wx.hi, wy.lo)[v] as f32 * wx.frac;
            let bottom = tiles.lut(wx.lo, wy.hi)[v] as f32 * (1.0 - wx.frac)
                + tiles.lut(wx.hi, wy.hi)[v] as f32 * wx.frac;
            let blended = top * (1.0 - wy.frac) + bottom * wy.frac;

            output[[y, x]] = blended.round().clamp(0.0, 255.0) as u8;
        }
    }

    Ok(output)
}

/// Apply contrast-limited adaptive histogram equalization.
///
/// # Arguments
/// * `image` - 3-channel 8-bit image
/// * `clip_limit` - Relative clip limit (> 0); larger values allow stronger
///   local contrast at a higher noise risk
/// * `grid` - Tile columns and rows
pub fn equalize_adaptive(
    image: &RasterBuffer,
    clip_limit: f32,
    grid: TileGrid,
) -> Result<RasterBuffer> {
    let view = LumaChromaView::from_raster(image);
    let luma = equalize_adaptive_luma(view.luma(), clip_limit, grid)?;
    Ok(view.recombine(&luma))
}
