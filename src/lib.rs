//! Enhancer Rust Core
//!
//! Image enhancement for an upload-and-download enhancement service:
//! a Sobel edge-enhancement pipeline, classical upscalers, and a
//! dispatcher that routes requests by enhancement type. Python bindings
//! via PyO3 and WASM bindings for JavaScript are behind features.
//!
//! ## Image Format
//! Rasters are `ndarray` arrays of `u8`:
//! - **RGB**: (height, width, 3) - red, green, blue
//! - **Gray / masks**: (height, width)
//!
//! Compressed bytes are decoded to RGB at the boundary ([`codec`]) and
//! every result is encoded as PNG.
//!
//! ## Entry Points
//! - [`enhance`] - edge enhancement of encoded bytes
//! - [`upscale`] - bicubic, lanczos and sharpened-bicubic upscaling
//! - [`Enhancer`] - request dispatch, including registered super-resolution models

pub mod codec;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod filters;
pub mod pipeline;
pub mod upscale;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use config::{ClaheParams, DenoiseParams, EdgeEnhanceParams, EnhancerConfig};
pub use dispatch::{EnhanceRequest, EnhanceResponse, EnhancementKind, Enhancer, LazyModel, SuperResolution};
pub use error::{EnhanceError, Result};
pub use pipeline::{enhance, EdgeEnhancer};

// Python bindings (only when python feature is enabled)
#[cfg(feature = "python")]
mod python {
    use numpy::{IntoPyArray, PyArray2, PyArray3, PyReadonlyArray3};
    use pyo3::exceptions::{PyRuntimeError, PyValueError};
    use pyo3::prelude::*;
    use pyo3::types::PyBytes;

    use crate::config::EdgeEnhanceParams;
    use crate::error::EnhanceError;
    use crate::pipeline::{self, EdgeEnhancer};
    use crate::upscale;

    impl From<EnhanceError> for PyErr {
        fn from(err: EnhanceError) -> PyErr {
            if err.is_client_error() {
                PyValueError::new_err(err.to_string())
            } else {
                PyRuntimeError::new_err(err.to_string())
            }
        }
    }

    fn require_rgb(shape: (usize, usize, usize)) -> PyResult<()> {
        if shape.2 != 3 {
            return Err(PyValueError::new_err(format!(
                "expected an RGB array of shape (height, width, 3), got {:?}",
                shape
            )));
        }
        Ok(())
    }

    // ========================================================================
    // Encoded bytes in, PNG bytes out
    // ========================================================================

    /// Sobel edge enhancement of an encoded image. Returns PNG bytes.
    ///
    /// Raises ValueError when the bytes are not a decodable image.
    #[pyfunction]
    #[pyo3(signature = (image_bytes, edge_weight=1.0))]
    pub fn enhance_quality_with_sobel<'py>(
        py: Python<'py>,
        image_bytes: &[u8],
        edge_weight: f64,
    ) -> PyResult<Bound<'py, PyBytes>> {
        let png = py.allow_threads(|| pipeline::enhance(image_bytes, edge_weight))?;
        Ok(PyBytes::new(py, &png))
    }

    /// Bicubic (Catmull-Rom) upscale. Returns PNG bytes.
    #[pyfunction]
    #[pyo3(signature = (image_bytes, scale=4))]
    pub fn upscale_bicubic<'py>(py: Python<'py>, image_bytes: &[u8], scale: u32) -> PyResult<Bound<'py, PyBytes>> {
        let png = py.allow_threads(|| upscale::upscale_bicubic(image_bytes, scale))?;
        Ok(PyBytes::new(py, &png))
    }

    /// Lanczos3 upscale. Returns PNG bytes.
    #[pyfunction]
    #[pyo3(signature = (image_bytes, scale=4))]
    pub fn upscale_lanczos<'py>(py: Python<'py>, image_bytes: &[u8], scale: u32) -> PyResult<Bound<'py, PyBytes>> {
        let png = py.allow_threads(|| upscale::upscale_lanczos(image_bytes, scale))?;
        Ok(PyBytes::new(py, &png))
    }

    /// Bicubic upscale followed by an unsharp mask. Returns PNG bytes.
    #[pyfunction]
    #[pyo3(signature = (image_bytes, scale=4))]
    pub fn upscale_bicubic_sharpen<'py>(
        py: Python<'py>,
        image_bytes: &[u8],
        scale: u32,
    ) -> PyResult<Bound<'py, PyBytes>> {
        let png = py.allow_threads(|| upscale::upscale_bicubic_sharpen(image_bytes, scale))?;
        Ok(PyBytes::new(py, &png))
    }

    // ========================================================================
    // Numpy arrays
    // ========================================================================

    /// Soft edge mask (height, width) of an RGB u8 array.
    #[pyfunction]
    pub fn edge_mask<'py>(py: Python<'py>, image: PyReadonlyArray3<'py, u8>) -> PyResult<Bound<'py, PyArray2<u8>>> {
        let input = image.as_array();
        require_rgb(input.dim())?;
        let result = EdgeEnhancer::default().edge_mask(input);
        Ok(result.into_pyarray(py))
    }

    /// Full edge enhancement of an RGB u8 array, without the PNG round trip.
    #[pyfunction]
    #[pyo3(signature = (image, edge_weight=1.0))]
    pub fn enhance_array<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        edge_weight: f64,
    ) -> PyResult<Bound<'py, PyArray3<u8>>> {
        let input = image.as_array();
        require_rgb(input.dim())?;
        let result = EdgeEnhancer::new(EdgeEnhanceParams::with_edge_weight(edge_weight)).enhance_rgb(input);
        Ok(result.into_pyarray(py))
    }

    #[pymodule]
    pub fn enhancer_rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(enhance_quality_with_sobel, m)?)?;
        m.add_function(wrap_pyfunction!(upscale_bicubic, m)?)?;
        m.add_function(wrap_pyfunction!(upscale_lanczos, m)?)?;
        m.add_function(wrap_pyfunction!(upscale_bicubic_sharpen, m)?)?;
        m.add_function(wrap_pyfunction!(edge_mask, m)?)?;
        m.add_function(wrap_pyfunction!(enhance_array, m)?)?;
        Ok(())
    }
}

#[cfg(feature = "python")]
pub use python::enhancer_rust;
