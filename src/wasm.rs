//! WebAssembly exports for the enhancer.
//!
//! These functions are exposed to JavaScript via wasm-bindgen. Errors are
//! returned as strings; encoded inputs accept any format the decoder knows
//! and outputs are PNG.

use ndarray::Array3;
use wasm_bindgen::prelude::*;

use crate::config::{EdgeEnhanceParams, EnhancerConfig};
use crate::dispatch::{EnhanceRequest, EnhancementKind, Enhancer};
use crate::error::EnhanceError;
use crate::pipeline::{self, EdgeEnhancer};

fn to_js(err: EnhanceError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

// ============================================================================
// Encoded images
// ============================================================================

/// Sobel edge enhancement of an encoded image.
///
/// # Arguments
/// * `data` - Encoded image bytes (PNG, JPEG, ...)
/// * `edge_weight` - Overlay strength, 1.0 by default on the Python side
///
/// # Returns
/// PNG bytes with the input's dimensions
#[wasm_bindgen]
pub fn enhance_wasm(data: &[u8], edge_weight: f64) -> Result<Vec<u8>, JsValue> {
    pipeline::enhance(data, edge_weight).map_err(to_js)
}

/// Upscale or enhance an encoded image by enhancement type name.
///
/// # Arguments
/// * `kind` - "bicubic", "lanczos", "sharpen" or "sobel"
/// * `data` - Encoded image bytes
/// * `scale` - Magnification for the upscalers
///
/// # Returns
/// PNG bytes
#[wasm_bindgen]
pub fn upscale_wasm(kind: &str, data: &[u8], scale: u32) -> Result<Vec<u8>, JsValue> {
    let kind: EnhancementKind = kind.parse().map_err(to_js)?;
    let config = EnhancerConfig {
        upscale_factor: scale,
        ..EnhancerConfig::default()
    };
    config.validate().map_err(to_js)?;
    let response = Enhancer::new(config)
        .process(&EnhanceRequest::new(kind, data))
        .map_err(to_js)?;
    Ok(response.bytes)
}

// ============================================================================
// Raw RGB buffers
// ============================================================================

/// Edge-enhance a raw RGB buffer.
///
/// # Arguments
/// * `data` - Flat array of RGB bytes (length = width * height * 3)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `edge_weight` - Overlay strength
///
/// # Returns
/// Flat array of RGB bytes with the same dimensions
#[wasm_bindgen]
pub fn enhance_rgb_wasm(data: &[u8], width: usize, height: usize, edge_weight: f64) -> Result<Vec<u8>, JsValue> {
    let input = Array3::from_shape_vec((height, width, 3), data.to_vec())
        .map_err(|e| JsValue::from_str(&format!("invalid dimensions: {}", e)))?;

    let result = EdgeEnhancer::new(EdgeEnhanceParams::with_edge_weight(edge_weight)).enhance_rgb(input.view());
    Ok(result.into_raw_vec_and_offset().0)
}
