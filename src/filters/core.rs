//! Core utilities for image processing filters.
//!
//! This module provides shared functionality used by multiple filters:
//! - Gaussian kernel generation
//! - Reflect-101 border indexing
//! - Separable convolution on working buffers
//! - Lookup table construction

use ndarray::{Array3, Axis};
use rayon::prelude::*;

use crate::raster::WorkingBuffer;

/// Generate a 1D Gaussian kernel.
///
/// # Arguments
/// * `sigma` - Standard deviation of the Gaussian
///
/// # Returns
/// Normalized 1D kernel as Vec<f32>
pub fn gaussian_kernel_1d(sigma: f32) -> Vec<f32> {
    if sigma <= 0.0 {
        return vec![1.0];
    }

    // Kernel size = 6 sigma (covers 99.7% of distribution), ensure odd
    let kernel_size = ((sigma * 6.0).ceil() as usize) | 1;
    let half = kernel_size / 2;

    let mut kernel: Vec<f32> = (0..kernel_size)
        .map(|i| {
            let x = i as f32 - half as f32;
            (-x * x / (2.0 * sigma * sigma)).exp()
        })
        .collect();

    // Normalize
    let sum: f32 = kernel.iter().sum();
    for v in kernel.iter_mut() {
        *v /= sum;
    }

    kernel
}

/// Map a possibly out-of-range coordinate into `0..len` by mirroring
/// around the edge pixels without repeating them (`dcb|abcd|cba`).
pub fn reflect_101(index: isize, len: usize) -> usize {
    if len <= 1 {
        return 0;
    }
    let last = len as isize - 1;
    let mut i = index;
    // Loop handles kernels wider than the image.
    while i < 0 || i > last {
        if i < 0 {
            i = -i;
        }
        if i > last {
            i = 2 * last - i;
        }
    }
    i as usize
}

/// Separable convolution of every channel with the same 1D kernel.
///
/// Horizontal pass then vertical pass, borders mirrored with [`reflect_101`].
/// Parallelized over output rows with Rayon.
pub fn convolve_separable(input: &WorkingBuffer, kernel: &[f32]) -> WorkingBuffer {
    let (height, width, channels) = input.dim();
    let half = (kernel.len() / 2) as isize;

    // Pass 1: Horizontal
    let mut temp = Array3::<f32>::zeros((height, width, channels));
    temp.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(y, mut row)| {
            for x in 0..width {
                for c in 0..channels {
                    let mut sum = 0.0f32;
                    for (ki, &kv) in kernel.iter().enumerate() {
                        let sx = reflect_101(x as isize + ki as isize - half, width);
                        sum += input[[y, sx, c]] * kv;
                    }
                    row[[x, c]] = sum;
                }
            }
        });

    // Pass 2: Vertical
    let mut result = Array3::<f32>::zeros((height, width, channels));
    result
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(y, mut row)| {
            for x in 0..width {
                for c in 0..channels {
                    let mut sum = 0.0f32;
                    for (ki, &kv) in kernel.iter().enumerate() {
                        let sy = reflect_101(y as isize + ki as isize - half, height);
                        sum += temp[[sy, x, c]] * kv;
                    }
                    row[[x, c]] = sum;
                }
            }
        });

    result
}

/// Build a 256-entry table from a per-level function, rounding and clamping
/// each entry into the u8 range.
pub fn build_lut(f: impl Fn(usize) -> f64) -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (i, entry) in lut.iter_mut().enumerate() {
        *entry = f(i).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gaussian_kernel_normalized() {
        let kernel = gaussian_kernel_1d(2.0);
        assert_eq!(kernel.len(), 13);
        let sum: f32 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(kernel[6] > kernel[5]);
        assert!((kernel[0] - kernel[12]).abs() < 1e-7);
    }

    #[test]
    fn test_gaussian_kernel_zero_sigma() {
        assert_eq!(gaussian_kernel_1d(0.0), vec![1.0]);
    }

    #[test]
    fn test_reflect_101() {
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(-2, 5), 2);
        assert_eq!(reflect_101(0, 5), 0);
        assert_eq!(reflect_101(4, 5), 4);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(6, 5), 2);
        assert_eq!(reflect_101(7, 1), 0);
        // Wider than the image
        assert_eq!(reflect_101(-5, 3), 1);
        assert_eq!(reflect_101(9, 3), 1);
    }

    #[test]
    fn test_convolve_constant_unchanged() {
        let input = Array3::<f32>::from_elem((4, 6, 3), 42.0);
        let out = convolve_separable(&input, &gaussian_kernel_1d(1.5));
        for &v in out.iter() {
            assert!((v - 42.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_convolve_impulse_spreads_symmetrically() {
        let kernel = [0.25f32, 0.5, 0.25];
        let mut input = Array3::<f32>::zeros((5, 5, 3));
        input[[2, 2, 1]] = 16.0;
        let out = convolve_separable(&input, &kernel);

        // Outer product of the kernel scaled by the impulse
        assert!((out[[2, 2, 1]] - 4.0).abs() < 1e-6);
        assert!((out[[1, 2, 1]] - 2.0).abs() < 1e-6);
        assert!((out[[2, 3, 1]] - 2.0).abs() < 1e-6);
        assert!((out[[1, 1, 1]] - 1.0).abs() < 1e-6);
        assert_eq!(out[[0, 0, 1]], 0.0);
        assert!(out.index_axis(Axis(2), 0).iter().all(|&v| v == 0.0));
        let total: f32 = out.iter().sum();
        assert!((total - 16.0).abs() < 1e-5);
    }

    #[test]
    fn test_convolve_reflects_at_border() {
        let kernel = [0.25f32, 0.5, 0.25];
        let mut input = Array3::<f32>::zeros((1, 4, 3));
        input[[0, 1, 0]] = 8.0;
        let out = convolve_separable(&input, &kernel);
        // x = 0 sees index -1 mirrored onto index 1
        assert!((out[[0, 0, 0]] - 4.0).abs() < 1e-6);
        assert!((out[[0, 1, 0]] - 4.0).abs() < 1e-6);
        assert!((out[[0, 2, 0]] - 2.0).abs() < 1e-6);
        assert_eq!(out[[0, 3, 0]], 0.0);
    }

    #[test]
    fn test_build_lut_clamps() {
        let lut = build_lut(|i| i as f64 * 2.0 - 10.0);
        assert_eq!(lut[0], 0);
        assert_eq!(lut[10], 10);
        assert_eq!(lut[255], 255);
    }
}
