//! Classical (non-network) upscalers.
//!
//! Resampling is done by `fast_image_resize` with a convolution filter:
//! Catmull-Rom for bicubic, Lanczos3 for lanczos. The sharpen variant runs
//! an unsharp mask over the bicubic result.

use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use log::debug;
use ndarray::{Array3, ArrayView3};

use crate::codec::{decode_rgb, encode_png};
use crate::error::{EnhanceError, Result};
use crate::filters::sharpen::unsharp_mask_u8;

/// Unsharp mask applied after bicubic upscaling.
const SHARPEN_RADIUS: f32 = 2.0;
const SHARPEN_PERCENT: f32 = 150.0;
const SHARPEN_THRESHOLD: u8 = 3;

/// Resampling kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Bicubic,
    Lanczos,
}

impl Interpolation {
    fn filter(self) -> FilterType {
        match self {
            Interpolation::Bicubic => FilterType::CatmullRom,
            Interpolation::Lanczos => FilterType::Lanczos3,
        }
    }
}

/// Resize an RGB raster by an integer factor.
///
/// # Arguments
/// * `rgb` - RGB image (height, width, 3)
/// * `scale` - Magnification, at least 1
/// * `interpolation` - Resampling kernel
///
/// # Returns
/// Image of size `(height * scale, width * scale, 3)`
pub fn resize_rgb(rgb: ArrayView3<u8>, scale: u32, interpolation: Interpolation) -> Result<Array3<u8>> {
    if scale == 0 {
        return Err(EnhanceError::Config("upscale factor must be at least 1".to_string()));
    }
    let (height, width, channels) = rgb.dim();
    if channels != 3 {
        return Err(EnhanceError::Resize(format!("expected 3 channels, got {}", channels)));
    }

    let too_large = || EnhanceError::Resize(format!("{}x{} scaled by {} is too large", width, height, scale));
    let src_w = u32::try_from(width).map_err(|_| too_large())?;
    let src_h = u32::try_from(height).map_err(|_| too_large())?;
    let dst_w = src_w.checked_mul(scale).ok_or_else(too_large)?;
    let dst_h = src_h.checked_mul(scale).ok_or_else(too_large)?;

    let raw: Vec<u8> = rgb.iter().copied().collect();
    let src = Image::from_vec_u8(src_w, src_h, raw, PixelType::U8x3)
        .map_err(|e| EnhanceError::Resize(e.to_string()))?;
    let mut dst = Image::new(dst_w, dst_h, PixelType::U8x3);

    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(interpolation.filter()));
    Resizer::new()
        .resize(&src, &mut dst, &options)
        .map_err(|e| EnhanceError::Resize(e.to_string()))?;

    debug!("{:?} resize {}x{} -> {}x{}", interpolation, src_w, src_h, dst_w, dst_h);

    Array3::from_shape_vec((dst_h as usize, dst_w as usize, 3), dst.into_vec())
        .map_err(|e| EnhanceError::Resize(e.to_string()))
}

/// Decode, upscale with Catmull-Rom and encode as PNG.
pub fn upscale_bicubic(image_bytes: &[u8], scale: u32) -> Result<Vec<u8>> {
    let rgb = decode_rgb(image_bytes)?;
    let upscaled = resize_rgb(rgb.view(), scale, Interpolation::Bicubic)?;
    encode_png(upscaled.view())
}

/// Decode, upscale with Lanczos3 and encode as PNG.
pub fn upscale_lanczos(image_bytes: &[u8], scale: u32) -> Result<Vec<u8>> {
    let rgb = decode_rgb(image_bytes)?;
    let upscaled = resize_rgb(rgb.view(), scale, Interpolation::Lanczos)?;
    encode_png(upscaled.view())
}

/// Bicubic upscale followed by an unsharp mask (radius 2, 150%, threshold 3).
pub fn upscale_bicubic_sharpen(image_bytes: &[u8], scale: u32) -> Result<Vec<u8>> {
    let rgb = decode_rgb(image_bytes)?;
    let upscaled = resize_rgb(rgb.view(), scale, Interpolation::Bicubic)?;
    let sharpened = unsharp_mask_u8(upscaled.view(), SHARPEN_RADIUS, SHARPEN_PERCENT, SHARPEN_THRESHOLD);
    encode_png(sharpened.view())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(height: usize, width: usize, f: impl Fn(usize, usize, usize) -> u8) -> Vec<u8> {
        let img = Array3::from_shape_fn((height, width, 3), |(y, x, c)| f(y, x, c));
        encode_png(img.view()).unwrap()
    }

    #[test]
    fn test_bicubic_scales_dimensions() {
        let input = png(6, 8, |y, x, c| (y * 20 + x * 10 + c * 5) as u8);
        let out = decode_rgb(&upscale_bicubic(&input, 4).unwrap()).unwrap();
        assert_eq!(out.dim(), (24, 32, 3));
    }

    #[test]
    fn test_lanczos_scales_dimensions() {
        let input = png(5, 3, |_, x, _| (x * 60) as u8);
        let out = decode_rgb(&upscale_lanczos(&input, 2).unwrap()).unwrap();
        assert_eq!(out.dim(), (10, 6, 3));
    }

    #[test]
    fn test_sharpen_scales_dimensions() {
        let input = png(4, 4, |y, x, _| if (x + y) % 2 == 0 { 30 } else { 200 });
        let out = decode_rgb(&upscale_bicubic_sharpen(&input, 3).unwrap()).unwrap();
        assert_eq!(out.dim(), (12, 12, 3));
    }

    #[test]
    fn test_uniform_color_survives_resize() {
        let img = Array3::from_shape_fn((5, 5, 3), |(_, _, c)| [77u8, 140, 200][c]);
        let out = resize_rgb(img.view(), 3, Interpolation::Lanczos).unwrap();
        for px in out.rows() {
            assert!((px[0] as i32 - 77).abs() <= 1);
            assert!((px[1] as i32 - 140).abs() <= 1);
            assert!((px[2] as i32 - 200).abs() <= 1);
        }
    }

    #[test]
    fn test_zero_scale_rejected() {
        let img = Array3::<u8>::zeros((2, 2, 3));
        assert!(matches!(
            resize_rgb(img.view(), 0, Interpolation::Bicubic),
            Err(EnhanceError::Config(_))
        ));
    }

    #[test]
    fn test_undecodable_input() {
        assert!(matches!(upscale_lanczos(b"not an image", 2), Err(EnhanceError::Decode(_))));
    }
}
