//! Unsharp mask sharpening.

use ndarray::{Array3, ArrayView3};

use super::core::{convolve_separable_rgb_f32, gaussian_kernel_1d};

/// Apply an unsharp mask - u8 version.
///
/// The image is blurred with a Gaussian of standard deviation `radius`.
/// Where a channel differs from its blurred value by at least `threshold`,
/// the difference is amplified by `percent / 100` and added back.
///
/// # Arguments
/// * `input` - Image with any channel count (height, width, channels)
/// * `radius` - Blur standard deviation in pixels
/// * `percent` - Sharpening strength (150 = add 1.5x the detail)
/// * `threshold` - Minimum difference before sharpening kicks in
///
/// # Returns
/// Sharpened image with same shape
pub fn unsharp_mask_u8(input: ArrayView3<u8>, radius: f32, percent: f32, threshold: u8) -> Array3<u8> {
    if radius <= 0.0 {
        return input.to_owned();
    }
    let kernel = gaussian_kernel_1d(radius);
    let blurred = convolve_separable_rgb_f32(input, &kernel);
    let amount = percent / 100.0;

    let mut output = input.to_owned();
    output.zip_mut_with(&blurred, |v, &b| {
        let orig = *v as f32;
        let detail = orig - b.round();
        if detail.abs() >= threshold as f32 {
            *v = (orig + detail * amount).round().clamp(0.0, 255.0) as u8;
        }
    });
    output
}
