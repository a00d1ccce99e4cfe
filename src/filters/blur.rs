//! Gaussian blur for single-channel rasters.
//!
//! Used twice by the edge pipeline: on the luma plane before
//! differentiation and on the binary edge mask to soften its seams.

use ndarray::{Array2, ArrayView2};

use super::core::{convolve_separable_u8, gaussian_kernel_sized};

/// Apply Gaussian blur to a single-channel u8 image.
///
/// Uses separable 2-pass convolution with mirrored borders.
///
/// # Arguments
/// * `input` - Grayscale image (height, width)
/// * `ksize` - Kernel size (odd, e.g. 3)
/// * `sigma` - Standard deviation, or `<= 0` to derive it from `ksize`
///
/// # Returns
/// Blurred image with same dimensions
pub fn gaussian_blur_u8(input: ArrayView2<u8>, ksize: usize, sigma: f32) -> Array2<u8> {
    if ksize <= 1 {
        return input.to_owned();
    }
    let kernel = gaussian_kernel_sized(ksize, sigma);
    convolve_separable_u8(input, &kernel, &kernel)
}
