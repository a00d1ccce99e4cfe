//! Filter building blocks for the enhancement pipeline and upscalers.
//!
//! ## Supported Formats
//!
//! | Format | Shape | Type | Description |
//! |--------|-------|------|-------------|
//! | Gray8 | (H, W) | u8 | Grayscale planes and masks, 0-255 |
//! | RGB8 | (H, W, 3) | u8 | Red, green, blue, 0-255 |
//! | Lab8 | (H, W, 3) | u8 | L scaled to 0-255, a and b offset by 128 |
//!
//! ## Architecture
//!
//! - **Reflect-101 borders** - every neighborhood filter mirrors without
//!   repeating the edge pixel
//! - **Rounded u8 outputs** - float intermediates are rounded and
//!   saturated on the way back
//! - **Thread-safe** - rows are processed in parallel with rayon; results
//!   never depend on scheduling
//!
//! ## Filter Categories
//!
//! - **Kernels**: gaussian kernels, separable convolution (`core`)
//! - **Smoothing**: gaussian blur (`blur`), non-local means (`noise`)
//! - **Edges**: Sobel gradients, magnitude, normalization (`edge`), binary threshold (`threshold`)
//! - **Color**: grayscale (`grayscale`), Lab conversion (`color_science`)
//! - **Tonal**: CLAHE (`clahe`)
//! - **Detail**: unsharp mask (`sharpen`)

pub mod core;
pub mod blur;
pub mod grayscale;
pub mod color_science;
pub mod edge;
pub mod threshold;
pub mod clahe;
pub mod noise;
pub mod sharpen;
