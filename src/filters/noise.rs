//! Noise removal: non-local means denoising.
//!
//! Each output pixel is a weighted average of every pixel in a search
//! window around it. The weight of a candidate depends on how similar the
//! small template patch around the candidate is to the patch around the
//! target pixel, so repeated structure far away still contributes while
//! edges are not smeared.
//!
//! ## Supported Formats
//!
//! - **Single plane or joint planes**: (height, width, channels) with any
//!   channel count, all channels share one patch distance
//! - **RGB**: [`nl_means_colored_u8`] denoises lightness and chroma separately
//!
//! ## Evaluation Order
//!
//! Output rows are split into fixed bands, one parallel task each. Inside a
//! band the search window is walked offset by offset: a squared-difference
//! map is box-summed over the template window with running sums, turned
//! into weights and accumulated. Patch distances are exact integers and
//! per-pixel accumulation always follows the same offset order, so the
//! result does not depend on thread count or scheduling.

use ndarray::{s, Array3, ArrayView3};
use rayon::prelude::*;

use super::color_science::{lab_to_rgb_u8, rgb_to_lab_u8, Transfer};
use super::core::reflect_101;

/// Weights below this are treated as zero.
const WEIGHT_THRESHOLD: f32 = 0.001;

/// Output rows handled by one parallel task.
const BAND_ROWS: usize = 16;

// ============================================================================
// Non-local Means
// ============================================================================

/// Window geometry shared by every band.
#[derive(Clone, Copy)]
struct Windows {
    width: usize,
    channels: usize,
    template: usize,
    search: usize,
    /// Row length of the padded source, in pixels
    padded_width: usize,
    /// `1 / (template² · channels · h²)`
    norm: f32,
}

/// Apply non-local means denoising - u8 version.
///
/// The weight for a candidate at offset `(dy, dx)` is
/// `exp(-d / h²)` where `d` is the mean squared difference between the two
/// template patches, averaged over patch pixels and channels.
///
/// # Arguments
/// * `input` - Image with any channel count (height, width, channels)
/// * `h` - Filter strength; larger removes more noise and more detail
/// * `template_window` - Patch size (odd, typically 7)
/// * `search_window` - Search area size (odd, typically 21)
///
/// # Returns
/// Denoised image with same shape
pub fn nl_means_u8(input: ArrayView3<u8>, h: f32, template_window: usize, search_window: usize) -> Array3<u8> {
    let (height, width, channels) = input.dim();
    if height == 0 || width == 0 || channels == 0 || h <= 0.0 {
        return input.to_owned();
    }

    let template = template_window.max(1) | 1;
    let search = search_window.max(1) | 1;

    // Mirror-padded copy, wide enough for every template around every candidate
    let pad = search / 2 + template / 2;
    let pw = width + 2 * pad;
    let ph = height + 2 * pad;
    let mut padded = vec![0i32; ph * pw * channels];
    padded.par_chunks_mut(pw * channels).enumerate().for_each(|(py, row)| {
        let sy = reflect_101(py as isize - pad as isize, height);
        for px in 0..pw {
            let sx = reflect_101(px as isize - pad as isize, width);
            for c in 0..channels {
                row[px * channels + c] = input[[sy, sx, c]] as i32;
            }
        }
    });

    let windows = Windows {
        width,
        channels,
        template,
        search,
        padded_width: pw,
        norm: 1.0 / ((template * template * channels) as f32 * h * h),
    };

    let mut out = vec![0u8; height * width * channels];
    out.par_chunks_mut(BAND_ROWS * width * channels)
        .enumerate()
        .for_each(|(band, band_out)| denoise_band(&padded, windows, band * BAND_ROWS, band_out));

    Array3::from_shape_vec((height, width, channels), out).unwrap_or_else(|_| input.to_owned())
}

/// Denoise the output rows starting at `y0` into `out`.
///
/// The search window is walked offset by offset. Per offset, squared
/// differences are summed over the template with a horizontal running sum
/// followed by a vertical running sum, so each pixel costs O(1) per offset.
fn denoise_band(padded: &[i32], win: Windows, y0: usize, out: &mut [u8]) {
    let Windows {
        width,
        channels,
        template,
        search,
        padded_width: pw,
        norm,
    } = win;
    let s = search / 2;
    let t = template / 2;
    let rows = out.len() / (width * channels);

    let at = |y: usize, x: usize, c: usize| padded[(y * pw + x) * channels + c];

    // Difference map covers the band plus a template margin. Local row `ey`
    // is padded row `y0 + ey + s` for the reference patch
    let ext_w = width + 2 * t;
    let ext_rows = rows + 2 * t;
    let mut diff = vec![0u32; ext_rows * ext_w];
    let mut row_sums = vec![0u32; ext_rows * width];
    let mut col_sums = vec![0u32; width];

    let mut acc = vec![0.0f32; rows * width * channels];
    let mut weight_sum = vec![0.0f32; rows * width];

    for dy in 0..search {
        for dx in 0..search {
            for ey in 0..ext_rows {
                let ref_y = y0 + ey + s;
                let cand_y = y0 + ey + dy;
                let row = &mut diff[ey * ext_w..(ey + 1) * ext_w];
                for (ex, d_out) in row.iter_mut().enumerate() {
                    let mut d = 0u32;
                    for c in 0..channels {
                        let delta = at(ref_y, ex + s, c) - at(cand_y, ex + dx, c);
                        d += (delta * delta) as u32;
                    }
                    *d_out = d;
                }

                let src = &diff[ey * ext_w..(ey + 1) * ext_w];
                let sums = &mut row_sums[ey * width..(ey + 1) * width];
                let mut run: u32 = src[..template].iter().sum();
                sums[0] = run;
                for x in 1..width {
                    run = run + src[x + template - 1] - src[x - 1];
                    sums[x] = run;
                }
            }

            for y in 0..rows {
                if y == 0 {
                    col_sums.fill(0);
                    for k in 0..template {
                        for (col, &v) in col_sums.iter_mut().zip(&row_sums[k * width..(k + 1) * width]) {
                            *col += v;
                        }
                    }
                } else {
                    let entering = &row_sums[(y + template - 1) * width..(y + template) * width];
                    let leaving = &row_sums[(y - 1) * width..y * width];
                    for x in 0..width {
                        col_sums[x] = col_sums[x] + entering[x] - leaving[x];
                    }
                }

                let cand_y = y0 + y + t + dy;
                for x in 0..width {
                    let w = (-(col_sums[x] as f32) * norm).exp();
                    if w < WEIGHT_THRESHOLD {
                        continue;
                    }
                    weight_sum[y * width + x] += w;
                    for c in 0..channels {
                        acc[(y * width + x) * channels + c] += w * at(cand_y, x + t + dx, c) as f32;
                    }
                }
            }
        }
    }

    for (i, v) in out.iter_mut().enumerate() {
        let pixel = i / channels;
        let w = weight_sum[pixel];
        *v = if w > 0.0 {
            (acc[i] / w).round().clamp(0.0, 255.0) as u8
        } else {
            let (y, x, c) = (pixel / width, pixel % width, i % channels);
            at(y0 + y + s + t, x + s + t, c) as u8
        };
    }
}

/// Apply non-local means to an RGB image, treating lightness and color separately.
///
/// The image is moved to 8-bit Lab (linear transfer). The L plane is
/// denoised with `h`, the a/b planes jointly with `h_color`, then the
/// result is converted back to RGB.
///
/// # Arguments
/// * `input` - RGB image (height, width, 3)
/// * `h` - Lightness filter strength (typically 10)
/// * `h_color` - Chroma filter strength (typically 10)
/// * `template_window` - Patch size (odd, typically 7)
/// * `search_window` - Search area size (odd, typically 21)
pub fn nl_means_colored_u8(
    input: ArrayView3<u8>,
    h: f32,
    h_color: f32,
    template_window: usize,
    search_window: usize,
) -> Array3<u8> {
    let (height, width, channels) = input.dim();
    if channels < 3 || height == 0 || width == 0 {
        return nl_means_u8(input, h, template_window, search_window);
    }

    let lab = rgb_to_lab_u8(input, Transfer::Linear);
    let lightness = nl_means_u8(lab.slice(s![.., .., 0..1]), h, template_window, search_window);
    let chroma = nl_means_u8(lab.slice(s![.., .., 1..3]), h_color, template_window, search_window);

    let mut merged = Array3::<u8>::zeros((height, width, 3));
    merged.slice_mut(s![.., .., 0..1]).assign(&lightness);
    merged.slice_mut(s![.., .., 1..3]).assign(&chroma);

    lab_to_rgb_u8(merged.view(), Transfer::Linear)
}
