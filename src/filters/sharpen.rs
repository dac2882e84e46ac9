//! Sharpen filters: Gaussian blur and Unsharp Mask.
//!
//! Blurring is a separable two-pass convolution in f32 with mirrored
//! borders. Unsharp masking combines the original with its blurred copy
//! in floating point and clamps once at the end, so overshoot near hard
//! edges saturates instead of wrapping.

use crate::error::{EnhanceError, Result};
use crate::raster::{RasterBuffer, WorkingBuffer};

use super::core::{convolve_separable, gaussian_kernel_1d};

fn check_sigma(sigma: f32) -> Result<()> {
    if !(sigma > 0.0 && sigma.is_finite()) {
        return Err(EnhanceError::invalid("sigma", sigma, "must be a finite value > 0"));
    }
    Ok(())
}

/// Blur into a working buffer without requantizing.
fn blur_working(image: &RasterBuffer, sigma: f32) -> WorkingBuffer {
    let kernel = gaussian_kernel_1d(sigma);
    convolve_separable(&image.to_working(), &kernel)
}

/// Apply Gaussian blur.
///
/// # Arguments
/// * `image` - 3-channel 8-bit image
/// * `sigma` - Standard deviation of the kernel (> 0); the kernel spans
///   `ceil(6 * sigma)` taps rounded up to odd
pub fn gaussian_blur(image: &RasterBuffer, sigma: f32) -> Result<RasterBuffer> {
    check_sigma(sigma)?;
    Ok(RasterBuffer::from_working(&blur_working(image, sigma)))
}

/// Apply unsharp mask.
///
/// `output = image * (1 + strength) - blurred * strength`, per channel.
///
/// # Arguments
/// * `image` - 3-channel 8-bit image
/// * `sigma` - Blur standard deviation for the mask (> 0)
/// * `strength` - Detail gain (>= 0, 0.0 = no change)
///
/// # Returns
/// Sharpened image with same dimensions
pub fn unsharp_mask(image: &RasterBuffer, sigma: f32, strength: f32) -> Result<RasterBuffer> {
    check_sigma(sigma)?;
    if !(strength >= 0.0 && strength.is_finite()) {
        return Err(EnhanceError::invalid(
            "strength",
            strength,
            "must be a finite value >= 0",
        ));
    }

    let blurred = blur_working(image, sigma);
    let mut working = image.to_working();
    working.zip_mut_with(&blurred, |orig, &blur| {
        *orig = *orig * (1.0 + strength) - blur * strength;
    });

    Ok(RasterBuffer::from_working(&working))
}
