//! Edge detection: Sobel gradients, gradient magnitude, normalization.
//!
//! Gradients are computed in f64 on a single luma plane. Borders are
//! mirrored (without repeating the edge pixel) so the output keeps the
//! input dimensions and flat borders produce zero gradient.

use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;

use super::core::reflect_101;

// ============================================================================
// Sobel Edge Detection
// ============================================================================

/// Horizontal derivative kernel (d/dx)
const KERNEL_X: [[f64; 3]; 3] = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
/// Vertical derivative kernel (d/dy)
const KERNEL_Y: [[f64; 3]; 3] = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];

/// Compute 3x3 Sobel derivatives of a grayscale image.
///
/// # Arguments
/// * `input` - Grayscale image (height, width)
///
/// # Returns
/// `(grad_x, grad_y)` as f64 arrays of the same shape
pub fn sobel_f64(input: ArrayView2<u8>) -> (Array2<f64>, Array2<f64>) {
    let (height, width) = input.dim();
    if height == 0 || width == 0 {
        return (
            Array2::<f64>::zeros((height, width)),
            Array2::<f64>::zeros((height, width)),
        );
    }

    let mut gx = vec![0.0f64; height * width];
    let mut gy = vec![0.0f64; height * width];

    gx.par_chunks_mut(width)
        .zip(gy.par_chunks_mut(width))
        .enumerate()
        .for_each(|(y, (row_x, row_y))| {
            for x in 0..width {
                let mut sx = 0.0f64;
                let mut sy = 0.0f64;
                for ky in 0..3 {
                    let py = reflect_101(y as isize + ky as isize - 1, height);
                    for kx in 0..3 {
                        let px = reflect_101(x as isize + kx as isize - 1, width);
                        let v = input[[py, px]] as f64;
                        sx += v * KERNEL_X[ky][kx];
                        sy += v * KERNEL_Y[ky][kx];
                    }
                }
                row_x[x] = sx;
                row_y[x] = sy;
            }
        });

    let grad_x = Array2::from_shape_vec((height, width), gx)
        .unwrap_or_else(|_| Array2::<f64>::zeros((height, width)));
    let grad_y = Array2::from_shape_vec((height, width), gy)
        .unwrap_or_else(|_| Array2::<f64>::zeros((height, width)));
    (grad_x, grad_y)
}

/// Per-pixel Euclidean magnitude of two gradient components.
pub fn magnitude(grad_x: ArrayView2<f64>, grad_y: ArrayView2<f64>) -> Array2<f64> {
    let mut out = grad_x.to_owned();
    out.zip_mut_with(&grad_y, |gx, &gy| *gx = gx.hypot(gy));
    out
}

/// Rescale a non-negative map so its maximum becomes 255.
///
/// Values are truncated toward zero. An all-zero (or empty) map has no
/// scale to recover and is returned as all zeros.
pub fn normalize_to_u8(input: ArrayView2<f64>) -> Array2<u8> {
    let max = input.iter().cloned().fold(0.0f64, f64::max);
    if max > 0.0 {
        input.mapv(|v| (255.0 * (v / max)).clamp(0.0, 255.0) as u8)
    } else {
        input.mapv(|_| 0u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertical_step(height: usize, width: usize, split: usize) -> Array2<u8> {
        Array2::from_shape_fn((height, width), |(_, x)| if x < split { 0 } else { 255 })
    }

    #[test]
    fn test_sobel_flat_is_zero() {
        let img = Array2::<u8>::from_elem((5, 5), 90);
        let (gx, gy) = sobel_f64(img.view());
        assert!(gx.iter().all(|&v| v == 0.0));
        assert!(gy.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_sobel_vertical_step_is_horizontal_gradient() {
        let img = vertical_step(5, 6, 3);
        let (gx, gy) = sobel_f64(img.view());

        assert_eq!(gx[[2, 2]], 1020.0);
        assert_eq!(gx[[2, 3]], 1020.0);
        assert_eq!(gx[[2, 0]], 0.0);
        assert_eq!(gx[[2, 5]], 0.0);
        assert!(gy.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_magnitude_is_euclidean() {
        let gx = Array2::from_elem((1, 1), 3.0);
        let gy = Array2::from_elem((1, 1), 4.0);
        let m = magnitude(gx.view(), gy.view());
        assert_eq!(m[[0, 0]], 5.0);
    }

    #[test]
    fn test_normalize_scales_max_to_255() {
        let mut m = Array2::<f64>::zeros((1, 3));
        m[[0, 1]] = 10.0;
        m[[0, 2]] = 20.0;
        let n = normalize_to_u8(m.view());
        assert_eq!(n[[0, 0]], 0);
        assert_eq!(n[[0, 1]], 127);
        assert_eq!(n[[0, 2]], 255);
    }

    #[test]
    fn test_normalize_all_zero_stays_zero() {
        let m = Array2::<f64>::zeros((4, 4));
        let n = normalize_to_u8(m.view());
        assert!(n.iter().all(|&v| v == 0));
    }
}
