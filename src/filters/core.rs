//! Core utilities shared by the filters.
//!
//! This module provides:
//! - Gaussian kernel generation (sigma-driven and size-driven)
//! - Border index mapping
//! - Separable convolution for single-channel and RGB rasters

use ndarray::{Array2, Array3, ArrayView2, ArrayView3};
use rayon::prelude::*;

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

/// Generate a 1D Gaussian kernel of a fixed odd size.
///
/// With `sigma <= 0` the sigma is derived from the size as
/// `0.3 * ((ksize - 1) * 0.5 - 1) + 0.8`, and sizes 1, 3, 5 and 7 use the
/// usual binomial-style tables (size 3 is `[0.25, 0.5, 0.25]`).
///
/// # Arguments
/// * `ksize` - Kernel size, forced odd
/// * `sigma` - Standard deviation, or `<= 0` to derive it
pub fn gaussian_kernel_sized(ksize: usize, sigma: f32) -> Vec<f32> {
    let ksize = ksize.max(1) | 1;

    if sigma <= 0.0 {
        match ksize {
            1 => return vec![1.0],
            3 => return vec![0.25, 0.5, 0.25],
            5 => return vec![0.0625, 0.25, 0.375, 0.25, 0.0625],
            7 => {
                return vec![
                    0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125,
                ]
            }
            _ => {}
        }
    }

    let sigma = if sigma > 0.0 {
        sigma
    } else {
        0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8
    };
    let half = (ksize / 2) as f32;

    let mut kernel: Vec<f32> = (0..ksize)
        .map(|i| {
            let x = i as f32 - half;
            (-x * x / (2.0 * sigma * sigma)).exp()
        })
        .collect();

    let sum: f32 = kernel.iter().sum();
    for v in kernel.iter_mut() {
        *v /= sum;
    }

    kernel
}

/// Map an out-of-range index back into `0..n` by mirroring around the
/// edge pixels without repeating them (`gfedcb|abcdefgh|gfedcba`).
///
/// Handles offsets larger than the image by repeated reflection.
#[inline]
pub fn reflect_101(i: isize, n: usize) -> usize {
    if n <= 1 {
        return 0;
    }
    let n = n as isize;
    let period = 2 * n - 2;
    let mut m = i.rem_euclid(period);
    if m >= n {
        m = period - m;
    }
    m as usize
}

/// Apply a separable kernel to a single-channel u8 raster.
///
/// Both passes run in f32; the result is rounded and saturated to u8.
/// Rows are processed in parallel, each output value depends only on its
/// own neighbourhood so results do not depend on the thread count.
pub fn convolve_separable_u8(input: ArrayView2<u8>, kernel_x: &[f32], kernel_y: &[f32]) -> Array2<u8> {
    let (height, width) = input.dim();
    if height == 0 || width == 0 {
        return Array2::<u8>::zeros((height, width));
    }
    let half_x = (kernel_x.len() / 2) as isize;
    let half_y = (kernel_y.len() / 2) as isize;

    // Horizontal pass
    let mut temp = vec![0.0f32; height * width];
    temp.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        for (x, out) in row.iter_mut().enumerate() {
            let mut sum = 0.0f32;
            for (ki, &kv) in kernel_x.iter().enumerate() {
                let sx = reflect_101(x as isize + ki as isize - half_x, width);
                sum += input[[y, sx]] as f32 * kv;
            }
            *out = sum;
        }
    });

    // Vertical pass
    let mut result = vec![0u8; height * width];
    result.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        for (x, out) in row.iter_mut().enumerate() {
            let mut sum = 0.0f32;
            for (ki, &kv) in kernel_y.iter().enumerate() {
                let sy = reflect_101(y as isize + ki as isize - half_y, height);
                sum += temp[sy * width + x] * kv;
            }
            *out = sum.round().clamp(0.0, 255.0) as u8;
        }
    });

    Array2::from_shape_vec((height, width), result)
        .unwrap_or_else(|_| Array2::<u8>::zeros((height, width)))
}

/// Apply a separable kernel to every channel of a (H, W, C) raster.
///
/// Returns f32 values without rounding so callers can combine the blurred
/// result with the original before quantizing.
pub fn convolve_separable_rgb_f32(input: ArrayView3<u8>, kernel: &[f32]) -> Array3<f32> {
    let (height, width, channels) = input.dim();
    let mut result = Array3::<f32>::zeros((height, width, channels));
    if height == 0 || width == 0 {
        return result;
    }
    let half = (kernel.len() / 2) as isize;
    let row_len = width * channels;

    let mut temp = vec![0.0f32; height * row_len];
    temp.par_chunks_mut(row_len).enumerate().for_each(|(y, row)| {
        for x in 0..width {
            for c in 0..channels {
                let mut sum = 0.0f32;
                for (ki, &kv) in kernel.iter().enumerate() {
                    let sx = reflect_101(x as isize + ki as isize - half, width);
                    sum += input[[y, sx, c]] as f32 * kv;
                }
                row[x * channels + c] = sum;
            }
        }
    });

    let mut out = vec![0.0f32; height * row_len];
    out.par_chunks_mut(row_len).enumerate().for_each(|(y, row)| {
        for (i, value) in row.iter_mut().enumerate() {
            let mut sum = 0.0f32;
            for (ki, &kv) in kernel.iter().enumerate() {
                let sy = reflect_101(y as isize + ki as isize - half, height);
                sum += temp[sy * row_len + i] * kv;
            }
            *value = sum;
        }
    });

    for ((y, x, c), v) in result.indexed_iter_mut() {
        *v = out[y * row_len + x * channels + c];
    }
    result
}
