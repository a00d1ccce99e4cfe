//! Tunable parameters for the edge-enhancement pipeline and the dispatcher.
//!
//! Every struct deserializes with `#[serde(default)]`, so a JSON document
//! only needs the fields it overrides:
//!
//! ```json
//! { "edge": { "edge_weight": 1.5, "clahe": { "clip_limit": 3.0 } }, "upscale_factor": 2 }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EnhanceError, Result};

/// Default strength of the edge overlay.
pub const DEFAULT_EDGE_WEIGHT: f64 = 1.0;

/// Default magnification for the classical upscalers.
pub const DEFAULT_UPSCALE_FACTOR: u32 = 4;

// ============================================================================
// Pipeline parameters
// ============================================================================

/// Non-local means settings for the first pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DenoiseParams {
    /// Lightness filter strength.
    pub h: f32,
    /// Chroma filter strength.
    pub h_color: f32,
    /// Patch size, odd.
    pub template_window: usize,
    /// Search area size, odd.
    pub search_window: usize,
}

impl Default for DenoiseParams {
    fn default() -> Self {
        Self {
            h: 10.0,
            h_color: 10.0,
            template_window: 7,
            search_window: 21,
        }
    }
}

/// CLAHE settings for the final contrast stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaheParams {
    pub clip_limit: f32,
    /// `(tiles_x, tiles_y)`
    pub tile_grid: (usize, usize),
}

impl Default for ClaheParams {
    fn default() -> Self {
        Self {
            clip_limit: 2.0,
            tile_grid: (8, 8),
        }
    }
}

/// Everything the Sobel edge-enhancement pipeline can be tuned with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeEnhanceParams {
    /// Scale of the edge overlay; 0 disables it, values above 1 exaggerate.
    pub edge_weight: f64,
    pub denoise: DenoiseParams,
    /// Gaussian kernel size used before Sobel and on the edge mask.
    pub blur_ksize: usize,
    /// Normalized gradient level at which a pixel counts as an edge.
    pub edge_threshold: u8,
    pub clahe: ClaheParams,
}

impl Default for EdgeEnhanceParams {
    fn default() -> Self {
        Self {
            edge_weight: DEFAULT_EDGE_WEIGHT,
            denoise: DenoiseParams::default(),
            blur_ksize: 3,
            edge_threshold: 50,
            clahe: ClaheParams::default(),
        }
    }
}

impl EdgeEnhanceParams {
    /// Defaults with a different edge weight.
    pub fn with_edge_weight(edge_weight: f64) -> Self {
        Self {
            edge_weight,
            ..Self::default()
        }
    }

    /// Reject settings the filters cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.blur_ksize == 0 || self.blur_ksize % 2 == 0 {
            return Err(EnhanceError::Config(format!(
                "blur_ksize must be a positive odd number, got {}",
                self.blur_ksize
            )));
        }
        if self.denoise.template_window % 2 == 0 || self.denoise.search_window % 2 == 0 {
            return Err(EnhanceError::Config(
                "denoise windows must be odd".to_string(),
            ));
        }
        if self.denoise.search_window < self.denoise.template_window {
            return Err(EnhanceError::Config(
                "denoise search_window must not be smaller than template_window".to_string(),
            ));
        }
        let (tx, ty) = self.clahe.tile_grid;
        if tx == 0 || ty == 0 {
            return Err(EnhanceError::Config(
                "clahe tile_grid must be at least 1x1".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Service configuration
// ============================================================================

/// Top-level configuration for an [`Enhancer`](crate::dispatch::Enhancer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancerConfig {
    pub edge: EdgeEnhanceParams,
    /// Magnification used by the bicubic, lanczos and sharpen upscalers.
    pub upscale_factor: u32,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            edge: EdgeEnhanceParams::default(),
            upscale_factor: DEFAULT_UPSCALE_FACTOR,
        }
    }
}

impl EnhancerConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EnhanceError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| {
            EnhanceError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.upscale_factor == 0 {
            return Err(EnhanceError::Config(
                "upscale_factor must be at least 1".to_string(),
            ));
        }
        self.edge.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EnhancerConfig::default();
        assert_eq!(config.upscale_factor, 4);
        assert_eq!(config.edge.edge_weight, 1.0);
        assert_eq!(config.edge.denoise.template_window, 7);
        assert_eq!(config.edge.denoise.search_window, 21);
        assert_eq!(config.edge.blur_ksize, 3);
        assert_eq!(config.edge.edge_threshold, 50);
        assert_eq!(config.edge.clahe.tile_grid, (8, 8));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            EnhancerConfig::from_json_str(r#"{ "edge": { "edge_weight": 1.5, "clahe": { "clip_limit": 3.0 } } }"#)
                .unwrap();
        assert_eq!(config.edge.edge_weight, 1.5);
        assert_eq!(config.edge.clahe.clip_limit, 3.0);
        assert_eq!(config.edge.clahe.tile_grid, (8, 8));
        assert_eq!(config.upscale_factor, 4);
    }

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(EnhancerConfig::from_json_str("{}").unwrap(), EnhancerConfig::default());
    }

    #[test]
    fn test_zero_upscale_factor_rejected() {
        let err = EnhancerConfig::from_json_str(r#"{ "upscale_factor": 0 }"#).unwrap_err();
        assert!(matches!(err, EnhanceError::Config(_)));
    }

    #[test]
    fn test_even_blur_rejected() {
        let err = EnhancerConfig::from_json_str(r#"{ "edge": { "blur_ksize": 4 } }"#).unwrap_err();
        assert!(matches!(err, EnhanceError::Config(_)));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(
            EnhancerConfig::from_json_str("{ upscale_factor: "),
            Err(EnhanceError::Config(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = EnhancerConfig::load(Path::new("/nonexistent/enhancer.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = EnhancerConfig::default();
        config.edge.edge_weight = 0.25;
        config.upscale_factor = 2;
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(EnhancerConfig::from_json_str(&json).unwrap(), config);
    }
}
