//! Color space conversion between RGB and CIE L*a*b*.
//!
//! Lab separates lightness from chromaticity, so contrast work can touch
//! L alone without shifting hue. Images are stored as 8-bit Lab:
//!
//! | Channel | Range | Encoding |
//! |---------|-------|----------|
//! | L | 0-255 | `L * 255 / 100` |
//! | a | 0-255 | `a + 128` |
//! | b | 0-255 | `b + 128` |
//!
//! The white point is D65.

use ndarray::{Array3, ArrayView3};

/// How 8-bit RGB values relate to linear light.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    /// Values are sRGB-encoded and get linearized before conversion
    Srgb,
    /// Values are treated as already linear
    Linear,
}

// D65 reference white
const WHITE_X: f32 = 0.950456;
const WHITE_Z: f32 = 1.088754;

const EPSILON: f32 = 0.008856;
const KAPPA: f32 = 903.3;

// ============================================================================
// Per-pixel Conversions
// ============================================================================

#[inline]
fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[inline]
fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.0031308 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

#[inline]
fn lab_f(t: f32) -> f32 {
    if t > EPSILON {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

#[inline]
fn lab_f_inv(f: f32) -> f32 {
    let cube = f * f * f;
    if cube > EPSILON {
        cube
    } else {
        (f - 16.0 / 116.0) / 7.787
    }
}

/// Convert linear RGB (0.0-1.0) to (L, a, b) with L in 0-100.
#[inline]
fn linear_rgb_to_lab(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let x = (0.412453 * r + 0.357580 * g + 0.180423 * b) / WHITE_X;
    let y = 0.212671 * r + 0.715160 * g + 0.072169 * b;
    let z = (0.019334 * r + 0.119193 * g + 0.950227 * b) / WHITE_Z;

    let fx = lab_f(x);
    let fy = lab_f(y);
    let fz = lab_f(z);

    let l = if y > EPSILON { 116.0 * fy - 16.0 } else { KAPPA * y };
    (l, 500.0 * (fx - fy), 200.0 * (fy - fz))
}

/// Convert (L, a, b) with L in 0-100 back to linear RGB (unclamped).
#[inline]
fn lab_to_linear_rgb(l: f32, a: f32, b: f32) -> (f32, f32, f32) {
    let (y, fy) = if l <= KAPPA * EPSILON {
        let y = l / KAPPA;
        (y, 7.787 * y + 16.0 / 116.0)
    } else {
        let fy = (l + 16.0) / 116.0;
        (fy * fy * fy, fy)
    };
    let x = lab_f_inv(fy + a / 500.0) * WHITE_X;
    let z = lab_f_inv(fy - b / 200.0) * WHITE_Z;

    let r = 3.240479 * x - 1.537150 * y - 0.498535 * z;
    let g = -0.969256 * x + 1.875992 * y + 0.041556 * z;
    let bl = 0.055648 * x - 0.204043 * y + 1.057311 * z;
    (r, g, bl)
}

#[inline]
fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

// ============================================================================
// Image Conversions
// ============================================================================

/// Convert an RGB u8 image to 8-bit Lab.
///
/// # Arguments
/// * `input` - Image (height, width, 3) in RGB order
/// * `transfer` - Whether the input is sRGB-encoded or linear
///
/// # Returns
/// Image (height, width, 3) holding L, a, b
pub fn rgb_to_lab_u8(input: ArrayView3<u8>, transfer: Transfer) -> Array3<u8> {
    let (height, width, _) = input.dim();
    let mut output = Array3::<u8>::zeros((height, width, 3));

    for y in 0..height {
        for x in 0..width {
            let mut rgb = [0.0f32; 3];
            for (c, v) in rgb.iter_mut().enumerate() {
                let n = input[[y, x, c]] as f32 / 255.0;
                *v = match transfer {
                    Transfer::Srgb => srgb_to_linear(n),
                    Transfer::Linear => n,
                };
            }

            let (l, a, b) = linear_rgb_to_lab(rgb[0], rgb[1], rgb[2]);
            output[[y, x, 0]] = to_u8(l * 255.0 / 100.0);
            output[[y, x, 1]] = to_u8(a + 128.0);
            output[[y, x, 2]] = to_u8(b + 128.0);
        }
    }

    output
}

/// Convert an 8-bit Lab image back to RGB u8.
///
/// # Arguments
/// * `input` - Image (height, width, 3) holding L, a, b
/// * `transfer` - Encoding of the produced RGB values
pub fn lab_to_rgb_u8(input: ArrayView3<u8>, transfer: Transfer) -> Array3<u8> {
    let (height, width, _) = input.dim();
    let mut output = Array3::<u8>::zeros((height, width, 3));

    for y in 0..height {
        for x in 0..width {
            let l = input[[y, x, 0]] as f32 * 100.0 / 255.0;
            let a = input[[y, x, 1]] as f32 - 128.0;
            let b = input[[y, x, 2]] as f32 - 128.0;

            let (r, g, bl) = lab_to_linear_rgb(l, a, b);
            for (c, v) in [r, g, bl].into_iter().enumerate() {
                let v = v.clamp(0.0, 1.0);
                let encoded = match transfer {
                    Transfer::Srgb => linear_to_srgb(v),
                    Transfer::Linear => v,
                };
                output[[y, x, c]] = to_u8(encoded * 255.0);
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel(r: u8, g: u8, b: u8) -> Array3<u8> {
        let mut img = Array3::<u8>::zeros((1, 1, 3));
        img[[0, 0, 0]] = r;
        img[[0, 0, 1]] = g;
        img[[0, 0, 2]] = b;
        img
    }

    #[test]
    fn test_white_and_black_lab() {
        let white = rgb_to_lab_u8(pixel(255, 255, 255).view(), Transfer::Srgb);
        assert_eq!(white[[0, 0, 0]], 255);
        assert!((white[[0, 0, 1]] as i32 - 128).abs() <= 1);
        assert!((white[[0, 0, 2]] as i32 - 128).abs() <= 1);

        let black = rgb_to_lab_u8(pixel(0, 0, 0).view(), Transfer::Srgb);
        assert_eq!(black[[0, 0, 0]], 0);
        assert_eq!(black[[0, 0, 1]], 128);
        assert_eq!(black[[0, 0, 2]], 128);
    }

    #[test]
    fn test_gray_has_neutral_chroma() {
        let lab = rgb_to_lab_u8(pixel(128, 128, 128).view(), Transfer::Srgb);
        assert!((lab[[0, 0, 1]] as i32 - 128).abs() <= 1);
        assert!((lab[[0, 0, 2]] as i32 - 128).abs() <= 1);
    }

    #[test]
    fn test_red_has_positive_a() {
        let lab = rgb_to_lab_u8(pixel(220, 30, 30).view(), Transfer::Srgb);
        assert!(lab[[0, 0, 1]] > 160);
    }

    #[test]
    fn test_round_trip_srgb() {
        for &(r, g, b) in &[(10u8, 200u8, 90u8), (255, 255, 255), (0, 0, 0), (128, 64, 32), (40, 40, 200)] {
            let lab = rgb_to_lab_u8(pixel(r, g, b).view(), Transfer::Srgb);
            let back = lab_to_rgb_u8(lab.view(), Transfer::Srgb);
            assert!((back[[0, 0, 0]] as i32 - r as i32).abs() <= 3, "r for {:?}", (r, g, b));
            assert!((back[[0, 0, 1]] as i32 - g as i32).abs() <= 3, "g for {:?}", (r, g, b));
            assert!((back[[0, 0, 2]] as i32 - b as i32).abs() <= 3, "b for {:?}", (r, g, b));
        }
    }

    #[test]
    fn test_round_trip_linear() {
        let img = pixel(180, 90, 20);
        let lab = rgb_to_lab_u8(img.view(), Transfer::Linear);
        let back = lab_to_rgb_u8(lab.view(), Transfer::Linear);
        for c in 0..3 {
            assert!((back[[0, 0, c]] as i32 - img[[0, 0, c]] as i32).abs() <= 4);
        }
    }
}
