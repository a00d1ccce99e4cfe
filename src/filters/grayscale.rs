//! Grayscale conversion filter.
//!
//! Uses ITU-R BT.601 luma coefficients, the weighting most codecs and
//! vision libraries apply when collapsing RGB to a single plane.

use ndarray::{Array2, ArrayView3};

/// ITU-R BT.601 luma coefficients
const LUMA_R: f32 = 0.299;
const LUMA_G: f32 = 0.587;
const LUMA_B: f32 = 0.114;

/// Convert an RGB u8 image to a single luma plane.
///
/// # Arguments
/// * `input` - 3D array view of shape (height, width, 3) with RGB u8 values (0-255)
///
/// # Returns
/// 2D array (height, width) of rounded luma values
pub fn rgb_to_gray_u8(input: ArrayView3<u8>) -> Array2<u8> {
    let (height, width, channels) = input.dim();
    let mut output = Array2::<u8>::zeros((height, width));

    if channels < 3 {
        // Already single channel
        for y in 0..height {
            for x in 0..width {
                output[[y, x]] = input[[y, x, 0]];
            }
        }
        return output;
    }

    for y in 0..height {
        for x in 0..width {
            let r = input[[y, x, 0]] as f32;
            let g = input[[y, x, 1]] as f32;
            let b = input[[y, x, 2]] as f32;

            let gray = LUMA_R * r + LUMA_G * g + LUMA_B * b;
            output[[y, x]] = gray.round().clamp(0.0, 255.0) as u8;
        }
    }

    output
}
