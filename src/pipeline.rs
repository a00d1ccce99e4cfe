//! Sobel edge-enhancement pipeline.
//!
//! Decoded RGB images flow through four stages:
//!
//! 1. **Denoise** - colored non-local means, so sensor noise does not show
//!    up as edges
//! 2. **Edge mask** - grayscale, Gaussian blur, Sobel magnitude normalized
//!    to 0-255, binary threshold, then a blur to soften the mask
//! 3. **Blend** - `pixel + mask * edge_weight / 255` on every channel,
//!    saturating at 0 and 255
//! 4. **Contrast** - CLAHE on the L channel of Lab, chroma untouched
//!
//! The result is encoded as PNG at the input's dimensions.
//!
//! ```ignore
//! let png = enhancer_rust::pipeline::enhance(&upload, 1.5)?;
//! ```

use log::{debug, warn};
use ndarray::{s, Array2, Array3, ArrayView2, ArrayView3, Zip};

use crate::codec::{decode_rgb, encode_png};
use crate::config::EdgeEnhanceParams;
use crate::error::Result;
use crate::filters::blur::gaussian_blur_u8;
use crate::filters::clahe::clahe_u8;
use crate::filters::color_science::{lab_to_rgb_u8, rgb_to_lab_u8, Transfer};
use crate::filters::edge::{magnitude, normalize_to_u8, sobel_f64};
use crate::filters::grayscale::rgb_to_gray_u8;
use crate::filters::noise::nl_means_colored_u8;
use crate::filters::threshold::threshold_binary_u8;

/// Run the whole pipeline on encoded image bytes with default parameters.
///
/// # Arguments
/// * `image_bytes` - Any format the decoder understands
/// * `edge_weight` - Overlay strength; 0 skips the overlay, 1.0 is the default
///
/// # Returns
/// PNG bytes with the same width and height as the input
pub fn enhance(image_bytes: &[u8], edge_weight: f64) -> Result<Vec<u8>> {
    EdgeEnhancer::new(EdgeEnhanceParams::with_edge_weight(edge_weight)).enhance_bytes(image_bytes)
}

/// The pipeline with a fixed set of parameters.
///
/// Holds no state beyond its parameters, so one instance can serve
/// concurrent requests.
#[derive(Debug, Clone, Default)]
pub struct EdgeEnhancer {
    params: EdgeEnhanceParams,
}

impl EdgeEnhancer {
    pub fn new(params: EdgeEnhanceParams) -> Self {
        if params.edge_weight.is_nan() {
            warn!("edge_weight is NaN; the edge overlay is skipped");
        } else if !(0.0..=255.0).contains(&params.edge_weight) {
            warn!(
                "edge_weight {} is outside [0, 255]; the overlay will saturate or darken",
                params.edge_weight
            );
        }
        Self { params }
    }

    pub fn params(&self) -> &EdgeEnhanceParams {
        &self.params
    }

    /// Decode, enhance and re-encode as PNG.
    pub fn enhance_bytes(&self, image_bytes: &[u8]) -> Result<Vec<u8>> {
        let rgb = decode_rgb(image_bytes)?;
        let (height, width, _) = rgb.dim();
        debug!(
            "decoded {}x{} image ({} bytes) for edge enhancement",
            width,
            height,
            image_bytes.len()
        );
        let enhanced = self.enhance_rgb(rgb.view());
        encode_png(enhanced.view())
    }

    /// Enhance an RGB raster (height, width, 3).
    pub fn enhance_rgb(&self, rgb: ArrayView3<u8>) -> Array3<u8> {
        let denoised = self.denoise(rgb);
        let mask = self.edge_mask(denoised.view());
        let blended = blend_edges(denoised.view(), mask.view(), self.params.edge_weight);
        self.equalize_contrast(blended.view())
    }

    /// Stage 1: colored non-local means.
    pub fn denoise(&self, rgb: ArrayView3<u8>) -> Array3<u8> {
        let p = &self.params.denoise;
        nl_means_colored_u8(rgb, p.h, p.h_color, p.template_window, p.search_window)
    }

    /// Stage 2: soft binary mask of strong gradients, 0-255.
    pub fn edge_mask(&self, rgb: ArrayView3<u8>) -> Array2<u8> {
        let ksize = self.params.blur_ksize;

        let gray = rgb_to_gray_u8(rgb);
        let smoothed = gaussian_blur_u8(gray.view(), ksize, 0.0);
        let (gx, gy) = sobel_f64(smoothed.view());
        let normalized = normalize_to_u8(magnitude(gx.view(), gy.view()).view());
        let binary = threshold_binary_u8(normalized.view(), self.params.edge_threshold, 255);

        let edge_pixels = binary.iter().filter(|&&v| v > 0).count();
        debug!(
            "edge mask: {} of {} pixels at or above threshold {}",
            edge_pixels,
            binary.len(),
            self.params.edge_threshold
        );

        gaussian_blur_u8(binary.view(), ksize, 0.0)
    }

    /// Stage 4: CLAHE on lightness only.
    pub fn equalize_contrast(&self, rgb: ArrayView3<u8>) -> Array3<u8> {
        let clahe = &self.params.clahe;
        let mut lab = rgb_to_lab_u8(rgb, Transfer::Srgb);
        let lightness = clahe_u8(lab.slice(s![.., .., 0]), clahe.clip_limit, clahe.tile_grid);
        lab.slice_mut(s![.., .., 0]).assign(&lightness);
        lab_to_rgb_u8(lab.view(), Transfer::Srgb)
    }
}

/// Stage 3: add the scaled edge mask to every channel.
///
/// Computes `round(pixel + mask * edge_weight / 255)` clipped to 0-255.
/// Pixels outside the mask are never touched. A weight of 0 or NaN leaves
/// the image untouched; infinite weights saturate masked pixels.
///
/// # Arguments
/// * `image` - RGB image (height, width, channels)
/// * `mask` - Edge mask (height, width)
/// * `edge_weight` - Scale of the overlay
pub fn blend_edges(image: ArrayView3<u8>, mask: ArrayView2<u8>, edge_weight: f64) -> Array3<u8> {
    let mut output = image.to_owned();
    if edge_weight.is_nan() {
        return output;
    }
    let scale = edge_weight / 255.0;
    let channels = output.dim().2;
    for c in 0..channels {
        Zip::from(output.slice_mut(s![.., .., c]))
            .and(&mask)
            .for_each(|v, &m| {
                if m == 0 {
                    return;
                }
                let blended = *v as f64 + m as f64 * scale;
                *v = blended.round().clamp(0.0, 255.0) as u8;
            });
    }
    output
}
