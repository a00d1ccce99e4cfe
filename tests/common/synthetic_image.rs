use enhancer_rust::codec::encode_png;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use ndarray::Array3;

/// Black on the left of `split`, white from `split` on.
pub fn split_rgb(width: usize, height: usize, split: usize) -> Array3<u8> {
    assert!(width > 0 && height > 0, "image dimensions must be positive");
    Array3::from_shape_fn((height, width, 3), |(_, x, _)| if x < split { 0u8 } else { 255 })
}

/// Diagonal color gradient with deterministic pseudo-random noise.
pub fn noisy_gradient(width: usize, height: usize, seed: u32) -> Array3<u8> {
    assert!(width > 0 && height > 0, "image dimensions must be positive");
    let mut state = seed.wrapping_mul(747796405).wrapping_add(2891336453);
    Array3::from_shape_fn((height, width, 3), |(y, x, c)| {
        state = state.wrapping_mul(1664525).wrapping_add(1013904223);
        let noise = ((state >> 24) % 17) as i32 - 8;
        let base = ((x * 200) / width + (y * 40) / height + c * 10) as i32;
        (base + noise).clamp(0, 255) as u8
    })
}

pub fn png_bytes(image: &Array3<u8>) -> Vec<u8> {
    encode_png(image.view()).expect("synthetic image encodes")
}

pub fn jpeg_bytes(image: &Array3<u8>) -> Vec<u8> {
    let (height, width, _) = image.dim();
    let raw: Vec<u8> = image.iter().copied().collect();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, 95)
        .encode(&raw, width as u32, height as u32, ExtendedColorType::Rgb8)
        .expect("synthetic image encodes");
    out
}

/// Single-channel PNG where every pixel is `value`.
pub fn gray_png_bytes(width: usize, height: usize, value: u8) -> Vec<u8> {
    let raw = vec![value; width * height];
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(&raw, width as u32, height as u32, ExtendedColorType::L8)
        .expect("synthetic image encodes");
    out
}
