//! Intensity transforms: Gamma correction and Log transform.
//!
//! These are pixel-wise operations that don't require spatial context.
//! Every channel of every pixel is remapped independently, and the output
//! always has the same shape and channel order as the input.

use tracing::trace;

use crate::error::{EnhanceError, Result};
use crate::filters::core::build_lut;
use crate::raster::RasterBuffer;

// ============================================================================
// Gamma
// ============================================================================

/// Build the 256-entry gamma table `round(255 * (i / 255) ^ gamma)`.
pub fn gamma_lut(gamma: f64) -> Result<[u8; 256]> {
    if !(gamma > 0.0 && gamma.is_finite()) {
        return Err(EnhanceError::invalid("gamma", gamma, "must be a finite value > 0"));
    }
    Ok(build_lut(|i| 255.0 * (i as f64 / 255.0).powf(gamma)))
}

/// Apply gamma correction.
///
/// # Arguments
/// * `image` - 3-channel 8-bit image
/// * `gamma` - Gamma value: < 1.0 brightens, > 1.0 darkens, 1.0 = no change
///
/// # Returns
/// Gamma-corrected image, or `InvalidParameter` if `gamma <= 0`
pub fn gamma_correct(image: &RasterBuffer, gamma: f32) -> Result<RasterBuffer> {
    let lut = gamma_lut(gamma as f64)?;
    Ok(image.map_lut(&lut))
}

// ============================================================================
// Log
// ============================================================================

/// Apply a logarithmic remap normalized to the full output range.
///
/// `c = 255 / ln(1 + max)` and `out = c * ln(1 + v)`, then min-max
/// stretched to 0-255. An all-zero image is returned unchanged. When the
/// scaled values are constant there is no range to stretch and every value
/// collapses to the lower bound, 0.
pub fn log_transform(image: &RasterBuffer) -> RasterBuffer {
    let max_value = image.max_value();
    if max_value == 0 {
        trace!("log transform on an all-zero image, returning input");
        return image.clone();
    }

    let c = 255.0 / (1.0 + max_value as f32).ln();
    let mut working = image.to_working();
    working.mapv_inplace(|v| c * (v + 1.0).ln());

    let (lo, hi) = working
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    let range = hi - lo;
    if range > f32::EPSILON {
        let scale = 255.0 / range;
        working.mapv_inplace(|v| (v - lo) * scale);
    } else {
        trace!("log transform on a constant image, collapsing to 0");
        working.fill(0.0);
    }

    RasterBuffer::from_working(&working)
}
