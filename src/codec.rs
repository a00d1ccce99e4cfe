//! Conversion between compressed image bytes and RGB rasters.
//!
//! Every raster inside the crate is `(height, width, 3)` in RGB order.
//! Channel order is fixed here, at the boundary, and nowhere else.

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use ndarray::{Array3, ArrayView3};

use crate::error::{dimension_mismatch, EnhanceError, Result};

/// Content type of everything [`encode_png`] produces.
pub const PNG_CONTENT_TYPE: &str = "image/png";

/// Decode any supported format (PNG, JPEG, BMP, ...) into an RGB raster.
///
/// Gray and alpha inputs are expanded / flattened to three channels.
pub fn decode_rgb(bytes: &[u8]) -> Result<Array3<u8>> {
    let image = image::load_from_memory(bytes)
        .map_err(EnhanceError::Decode)?
        .to_rgb8();
    let (width, height) = image.dimensions();
    Array3::from_shape_vec((height as usize, width as usize, 3), image.into_raw())
        .map_err(|_| EnhanceError::Decode(dimension_mismatch()))
}

/// Encode an RGB raster as PNG bytes.
pub fn encode_png(rgb: ArrayView3<u8>) -> Result<Vec<u8>> {
    let (height, width, channels) = rgb.dim();
    if channels != 3 {
        return Err(EnhanceError::Encode(dimension_mismatch()));
    }
    let width = u32::try_from(width).map_err(|_| EnhanceError::Encode(dimension_mismatch()))?;
    let height = u32::try_from(height).map_err(|_| EnhanceError::Encode(dimension_mismatch()))?;

    // Logical (row-major) order regardless of the view's memory layout
    let raw: Vec<u8> = rgb.iter().copied().collect();

    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(&raw, width, height, ExtendedColorType::Rgb8)
        .map_err(EnhanceError::Encode)?;
    Ok(out)
}
