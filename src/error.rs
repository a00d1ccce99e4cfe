//! Error type shared by the pipeline, the upscalers and the dispatcher.
//!
//! Hosts map errors to responses with [`EnhanceError::is_client_error`]:
//! undecodable uploads and unknown enhancement types are the caller's
//! fault, everything else is a server-side failure.

use thiserror::Error;

use crate::dispatch::EnhancementKind;

/// Everything that can go wrong while enhancing an image.
#[derive(Debug, Error)]
pub enum EnhanceError {
    /// The input bytes are not a decodable raster image.
    #[error("invalid image data; unable to decode image: {0}")]
    Decode(#[source] image::ImageError),

    /// The processed raster could not be serialized to PNG.
    #[error("failed to encode the image: {0}")]
    Encode(#[source] image::ImageError),

    /// The resize backend rejected the buffers or dimensions.
    #[error("failed to resize the image: {0}")]
    Resize(String),

    /// The requested enhancement type is not one we know.
    #[error("unknown enhancement type `{0}`")]
    UnknownKind(String),

    /// A network-backed enhancement was requested but no model is registered.
    #[error("no {0} model is configured")]
    ModelUnavailable(EnhancementKind),

    /// A super-resolution model failed to build or run.
    #[error("super-resolution inference failed: {0}")]
    Inference(String),

    /// Configuration could not be read or is out of range.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl EnhanceError {
    /// Whether the failure was caused by the request rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, EnhanceError::Decode(_) | EnhanceError::UnknownKind(_))
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, EnhanceError>;

/// An `ImageError` describing a buffer whose length does not match its shape.
pub(crate) fn dimension_mismatch() -> image::ImageError {
    image::ImageError::Parameter(image::error::ParameterError::from_kind(
        image::error::ParameterErrorKind::DimensionMismatch,
    ))
}
