//! Binary threshold for single-channel masks.

use ndarray::{Array2, ArrayView2};

/// Apply a binary threshold - u8 version.
///
/// Pixels at or above `threshold` become `max_value`, everything else 0.
///
/// # Arguments
/// * `input` - Grayscale image (height, width)
/// * `threshold` - Cut-off value (0-255)
/// * `max_value` - Value written for pixels that pass
pub fn threshold_binary_u8(input: ArrayView2<u8>, threshold: u8, max_value: u8) -> Array2<u8> {
    input.mapv(|v| if v >= threshold { max_value } else { 0 })
}
