//! Routing of enhancement requests to the algorithm that serves them.
//!
//! Classical kinds (bicubic, lanczos, sharpen, sobel) run in-process.
//! Network kinds (esrgan, anime) need a [`SuperResolution`] model, which
//! the host registers as a [`LazyModel`]; it is built on first use and
//! shared afterwards.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use log::debug;
use ndarray::{Array3, ArrayView3};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::codec::{decode_rgb, encode_png, PNG_CONTENT_TYPE};
use crate::config::EnhancerConfig;
use crate::error::{EnhanceError, Result};
use crate::pipeline::EdgeEnhancer;
use crate::upscale;

/// Stem used in output names when the upload had no usable file name.
const DEFAULT_STEM: &str = "image";

// ============================================================================
// Enhancement kinds
// ============================================================================

/// Every enhancement a request can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnhancementKind {
    /// General-purpose super-resolution network.
    Esrgan,
    /// Super-resolution network tuned for anime artwork.
    Anime,
    Bicubic,
    Lanczos,
    /// Bicubic followed by an unsharp mask.
    Sharpen,
    /// Sobel edge-enhancement pipeline.
    Sobel,
}

impl EnhancementKind {
    pub const ALL: [EnhancementKind; 6] = [
        EnhancementKind::Esrgan,
        EnhancementKind::Anime,
        EnhancementKind::Bicubic,
        EnhancementKind::Lanczos,
        EnhancementKind::Sharpen,
        EnhancementKind::Sobel,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EnhancementKind::Esrgan => "esrgan",
            EnhancementKind::Anime => "anime",
            EnhancementKind::Bicubic => "bicubic",
            EnhancementKind::Lanczos => "lanczos",
            EnhancementKind::Sharpen => "sharpen",
            EnhancementKind::Sobel => "sobel",
        }
    }

    /// Whether this kind needs a registered model.
    pub fn is_network(self) -> bool {
        matches!(self, EnhancementKind::Esrgan | EnhancementKind::Anime)
    }

    /// File name to suggest for the enhanced download.
    ///
    /// Classical upscalers use a fixed name; the others embed the stem of
    /// the uploaded file name (`"image"` when absent).
    pub fn output_file_name(self, original: Option<&str>) -> String {
        match self {
            EnhancementKind::Esrgan => format!("enhanced_esrgan_{}.png", file_stem(original)),
            EnhancementKind::Anime => format!("enhanced_esrgan_anime_{}.png", file_stem(original)),
            EnhancementKind::Bicubic => "enhanced_bicubic.png".to_string(),
            EnhancementKind::Lanczos => "enhanced_lanczos.png".to_string(),
            EnhancementKind::Sharpen => "enhanced_sharpen.png".to_string(),
            EnhancementKind::Sobel => format!("enhanced_sobel_{}.png", file_stem(original)),
        }
    }
}

impl fmt::Display for EnhancementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnhancementKind {
    type Err = EnhanceError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        EnhancementKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| EnhanceError::UnknownKind(s.to_string()))
    }
}

/// Base name without directories or the last extension.
fn file_stem(name: Option<&str>) -> &str {
    let Some(name) = name else {
        return DEFAULT_STEM;
    };
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let stem = match base.rfind('.') {
        Some(0) | None => base,
        Some(dot) => &base[..dot],
    };
    if stem.is_empty() {
        DEFAULT_STEM
    } else {
        stem
    }
}

// ============================================================================
// Super-resolution models
// ============================================================================

/// A learned upscaler. Implementations must be usable from many threads.
pub trait SuperResolution: Send + Sync {
    /// Upscale an RGB raster (height, width, 3).
    fn upscale(&self, image: ArrayView3<u8>) -> Result<Array3<u8>>;
}

type ModelFactory = Box<dyn Fn() -> Result<Arc<dyn SuperResolution>> + Send + Sync>;

/// A model slot that builds its model once, on first use.
///
/// A failed build is reported to the caller and retried on the next use.
pub struct LazyModel {
    factory: ModelFactory,
    cell: OnceCell<Arc<dyn SuperResolution>>,
}

impl LazyModel {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn SuperResolution>> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            cell: OnceCell::new(),
        }
    }

    /// A slot holding an already-built model.
    pub fn ready(model: Arc<dyn SuperResolution>) -> Self {
        let fallback = Arc::clone(&model);
        Self {
            factory: Box::new(move || Ok(Arc::clone(&fallback))),
            cell: OnceCell::with_value(model),
        }
    }

    /// The model, building it if this is the first call.
    pub fn get(&self) -> Result<&Arc<dyn SuperResolution>> {
        self.cell.get_or_try_init(|| {
            debug!("building super-resolution model");
            (self.factory)()
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl fmt::Debug for LazyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyModel")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// One enhancement request.
#[derive(Debug, Clone, Copy)]
pub struct EnhanceRequest<'a> {
    pub kind: EnhancementKind,
    /// Encoded image bytes as uploaded.
    pub image: &'a [u8],
    /// Overrides the configured edge weight for [`EnhancementKind::Sobel`].
    pub edge_weight: Option<f64>,
    /// Uploaded file name, used to name the output.
    pub file_name: Option<&'a str>,
}

impl<'a> EnhanceRequest<'a> {
    pub fn new(kind: EnhancementKind, image: &'a [u8]) -> Self {
        Self {
            kind,
            image,
            edge_weight: None,
            file_name: None,
        }
    }
}

/// An encoded result ready to hand back to the client.
#[derive(Debug, Clone, PartialEq)]
pub struct EnhanceResponse {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub file_name: String,
}

/// Serves [`EnhanceRequest`]s. Shareable across threads.
#[derive(Debug, Default)]
pub struct Enhancer {
    config: EnhancerConfig,
    /// Registered models, network kinds only
    models: HashMap<EnhancementKind, LazyModel>,
}

impl Enhancer {
    pub fn new(config: EnhancerConfig) -> Self {
        Self {
            config,
            models: HashMap::new(),
        }
    }

    /// Register the model serving a network kind.
    pub fn with_model(mut self, kind: EnhancementKind, model: LazyModel) -> Result<Self> {
        if !kind.is_network() {
            return Err(EnhanceError::Config(format!(
                "{} is not served by a model",
                kind
            )));
        }
        self.models.insert(kind, model);
        Ok(self)
    }

    pub fn config(&self) -> &EnhancerConfig {
        &self.config
    }

    /// Run the requested enhancement and encode the result as PNG.
    pub fn process(&self, request: &EnhanceRequest<'_>) -> Result<EnhanceResponse> {
        let kind = request.kind;
        debug!("dispatching {} request ({} bytes)", kind, request.image.len());

        let scale = self.config.upscale_factor;
        let bytes = match kind {
            EnhancementKind::Esrgan | EnhancementKind::Anime => self.run_model(kind, request.image)?,
            EnhancementKind::Bicubic => upscale::upscale_bicubic(request.image, scale)?,
            EnhancementKind::Lanczos => upscale::upscale_lanczos(request.image, scale)?,
            EnhancementKind::Sharpen => upscale::upscale_bicubic_sharpen(request.image, scale)?,
            EnhancementKind::Sobel => {
                let mut params = self.config.edge.clone();
                if let Some(weight) = request.edge_weight {
                    params.edge_weight = weight;
                }
                EdgeEnhancer::new(params).enhance_bytes(request.image)?
            }
        };

        Ok(EnhanceResponse {
            bytes,
            content_type: PNG_CONTENT_TYPE,
            file_name: kind.output_file_name(request.file_name),
        })
    }

    fn run_model(&self, kind: EnhancementKind, image: &[u8]) -> Result<Vec<u8>> {
        let slot = self
            .models
            .get(&kind)
            .ok_or(EnhanceError::ModelUnavailable(kind))?;

        let model = slot.get()?;
        let rgb = decode_rgb(image)?;
        let upscaled = model.upscale(rgb.view())?;
        encode_png(upscaled.view())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Nearest-neighbour 2x, stands in for a network.
    struct Doubler;

    impl SuperResolution for Doubler {
        fn upscale(&self, image: ArrayView3<u8>) -> Result<Array3<u8>> {
            let (h, w, c) = image.dim();
            Ok(Array3::from_shape_fn((h * 2, w * 2, c), |(y, x, ch)| image[[y / 2, x / 2, ch]]))
        }
    }

    fn sample_png() -> Vec<u8> {
        let img = Array3::from_shape_fn((6, 6, 3), |(y, x, c)| (y * 30 + x * 10 + c) as u8);
        encode_png(img.view()).unwrap()
    }

    #[test]
    fn test_parse_kinds() {
        for kind in EnhancementKind::ALL {
            assert_eq!(kind.as_str().parse::<EnhancementKind>().unwrap(), kind);
        }
        assert_eq!(" Sobel ".parse::<EnhancementKind>().unwrap(), EnhancementKind::Sobel);
        assert!(matches!(
            "waifu2x".parse::<EnhancementKind>(),
            Err(EnhanceError::UnknownKind(s)) if s == "waifu2x"
        ));
    }

    #[test]
    fn test_kind_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&EnhancementKind::Anime).unwrap(), "\"anime\"");
        let kind: EnhancementKind = serde_json::from_str("\"lanczos\"").unwrap();
        assert_eq!(kind, EnhancementKind::Lanczos);
    }

    #[test]
    fn test_output_file_names() {
        let name = Some("uploads/holiday.photo.jpg");
        assert_eq!(EnhancementKind::Esrgan.output_file_name(name), "enhanced_esrgan_holiday.photo.png");
        assert_eq!(EnhancementKind::Anime.output_file_name(Some("cat.png")), "enhanced_esrgan_anime_cat.png");
        assert_eq!(EnhancementKind::Sobel.output_file_name(None), "enhanced_sobel_image.png");
        assert_eq!(EnhancementKind::Bicubic.output_file_name(name), "enhanced_bicubic.png");
        assert_eq!(EnhancementKind::Lanczos.output_file_name(None), "enhanced_lanczos.png");
        assert_eq!(EnhancementKind::Sharpen.output_file_name(None), "enhanced_sharpen.png");
    }

    #[test]
    fn test_file_stem_edge_cases() {
        assert_eq!(file_stem(Some("")), "image");
        assert_eq!(file_stem(Some(".hidden")), ".hidden");
        assert_eq!(file_stem(Some("C:\\pics\\dog.jpeg")), "dog");
        assert_eq!(file_stem(Some("noext")), "noext");
    }

    #[test]
    fn test_missing_model_is_reported() {
        let enhancer = Enhancer::default();
        let png = sample_png();
        let err = enhancer
            .process(&EnhanceRequest::new(EnhancementKind::Esrgan, &png))
            .unwrap_err();
        assert!(matches!(err, EnhanceError::ModelUnavailable(EnhancementKind::Esrgan)));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_network_kinds() {
        let network: Vec<_> = EnhancementKind::ALL.into_iter().filter(|k| k.is_network()).collect();
        assert_eq!(network, vec![EnhancementKind::Esrgan, EnhancementKind::Anime]);
    }

    #[test]
    fn test_config_is_kept() {
        let config = EnhancerConfig {
            upscale_factor: 3,
            ..EnhancerConfig::default()
        };
        assert_eq!(Enhancer::new(config.clone()).config(), &config);
    }

    #[test]
    fn test_model_kind_validation() {
        let model = LazyModel::ready(Arc::new(Doubler));
        assert!(matches!(
            Enhancer::default().with_model(EnhancementKind::Bicubic, model),
            Err(EnhanceError::Config(_))
        ));
    }

    #[test]
    fn test_lazy_model_builds_once() {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&builds);
        let model = LazyModel::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Doubler) as Arc<dyn SuperResolution>)
        });
        let enhancer = Enhancer::default()
            .with_model(EnhancementKind::Anime, model)
            .unwrap();

        let png = sample_png();
        let request = EnhanceRequest {
            file_name: Some("frame.png"),
            ..EnhanceRequest::new(EnhancementKind::Anime, &png)
        };
        let first = enhancer.process(&request).unwrap();
        let second = enhancer.process(&request).unwrap();

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        assert_eq!(first.file_name, "enhanced_esrgan_anime_frame.png");
        assert_eq!(decode_rgb(&first.bytes).unwrap().dim(), (12, 12, 3));
    }

    #[test]
    fn test_failed_model_build_is_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let model = LazyModel::new(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(EnhanceError::Inference("weights missing".into()))
            } else {
                Ok(Arc::new(Doubler) as Arc<dyn SuperResolution>)
            }
        });

        assert!(matches!(model.get(), Err(EnhanceError::Inference(_))));
        assert!(!model.is_initialized());
        assert!(model.get().is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_classical_kinds_use_configured_scale() {
        let config = EnhancerConfig {
            upscale_factor: 2,
            ..EnhancerConfig::default()
        };
        let enhancer = Enhancer::new(config);
        let png = sample_png();

        for kind in [EnhancementKind::Bicubic, EnhancementKind::Lanczos, EnhancementKind::Sharpen] {
            let response = enhancer.process(&EnhanceRequest::new(kind, &png)).unwrap();
            assert_eq!(response.content_type, "image/png");
            assert_eq!(decode_rgb(&response.bytes).unwrap().dim(), (12, 12, 3));
        }
    }

    #[test]
    fn test_sobel_keeps_dimensions() {
        let png = sample_png();
        let request = EnhanceRequest {
            edge_weight: Some(1.5),
            ..EnhanceRequest::new(EnhancementKind::Sobel, &png)
        };
        let response = Enhancer::default().process(&request).unwrap();
        assert_eq!(response.file_name, "enhanced_sobel_image.png");
        assert_eq!(decode_rgb(&response.bytes).unwrap().dim(), (6, 6, 3));
    }

    #[test]
    fn test_bad_upload_is_client_error() {
        let err = Enhancer::default()
            .process(&EnhanceRequest::new(EnhancementKind::Sobel, b"\x89PNG\r\n"))
            .unwrap_err();
        assert!(err.is_client_error());
    }
}
