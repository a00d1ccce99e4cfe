//! Contrast-limited adaptive histogram equalization (CLAHE).
//!
//! The image is split into a grid of tiles. Each tile gets its own
//! equalization LUT built from a clipped histogram; output pixels blend
//! the LUTs of the four nearest tile centers bilinearly so no block
//! seams appear.
//!
//! When the size is not a multiple of the grid, the histogram source is
//! extended with mirrored pixels (both axes grow, as the tile size must
//! be integral). Interpolation always runs over the original size.

use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;

use super::core::reflect_101;

const HIST_SIZE: usize = 256;

/// Apply CLAHE to a single-channel u8 image.
///
/// # Arguments
/// * `input` - Grayscale image (height, width)
/// * `clip_limit` - Contrast limit relative to a flat histogram (e.g. 2.0);
///   `<= 0` disables clipping
/// * `tiles` - Grid size as `(tiles_x, tiles_y)`
///
/// # Returns
/// Equalized image with same dimensions
pub fn clahe_u8(input: ArrayView2<u8>, clip_limit: f32, tiles: (usize, usize)) -> Array2<u8> {
    let (height, width) = input.dim();
    let (tiles_x, tiles_y) = tiles;
    if height == 0 || width == 0 || tiles_x == 0 || tiles_y == 0 {
        return input.to_owned();
    }

    let (ext_w, ext_h) = if width % tiles_x == 0 && height % tiles_y == 0 {
        (width, height)
    } else {
        (
            width + tiles_x - width % tiles_x,
            height + tiles_y - height % tiles_y,
        )
    };
    let tile_w = ext_w / tiles_x;
    let tile_h = ext_h / tiles_y;
    let luts = build_tile_luts(input, (tiles_x, tiles_y), (tile_w, tile_h), clip_limit);

    let inv_tw = 1.0f32 / tile_w as f32;
    let inv_th = 1.0f32 / tile_h as f32;

    let mut out = vec![0u8; height * width];
    out.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        let tyf = y as f32 * inv_th - 0.5;
        let ty1 = tyf.floor() as isize;
        let ya = tyf - ty1 as f32;
        let ya1 = 1.0 - ya;
        let ty2 = ((ty1 + 1) as usize).min(tiles_y - 1);
        let ty1 = ty1.max(0) as usize;

        for (x, value) in row.iter_mut().enumerate() {
            let txf = x as f32 * inv_tw - 0.5;
            let tx1 = txf.floor() as isize;
            let xa = txf - tx1 as f32;
            let xa1 = 1.0 - xa;
            let tx2 = ((tx1 + 1) as usize).min(tiles_x - 1);
            let tx1 = tx1.max(0) as usize;

            let v = input[[y, x]] as usize;
            let lut = |ty: usize, tx: usize| luts[ty * tiles_x + tx][v] as f32;

            let res = (lut(ty1, tx1) * xa1 + lut(ty1, tx2) * xa) * ya1
                + (lut(ty2, tx1) * xa1 + lut(ty2, tx2) * xa) * ya;
            *value = res.round().clamp(0.0, 255.0) as u8;
        }
    });

    Array2::from_shape_vec((height, width), out).unwrap_or_else(|_| input.to_owned())
}

/// Build one equalization LUT per tile, row-major over the grid.
fn build_tile_luts(
    input: ArrayView2<u8>,
    tiles: (usize, usize),
    tile_size: (usize, usize),
    clip_limit: f32,
) -> Vec<[u8; HIST_SIZE]> {
    let (height, width) = input.dim();
    let (tiles_x, tiles_y) = tiles;
    let (tile_w, tile_h) = tile_size;
    let tile_area = tile_w * tile_h;

    let clip = if clip_limit > 0.0 {
        ((clip_limit * tile_area as f32 / HIST_SIZE as f32) as u32).max(1)
    } else {
        u32::MAX
    };
    let lut_scale = (HIST_SIZE - 1) as f32 / tile_area as f32;

    (0..tiles_x * tiles_y)
        .into_par_iter()
        .map(|idx| {
            let ty = idx / tiles_x;
            let tx = idx % tiles_x;

            let mut hist = [0u32; HIST_SIZE];
            for py in ty * tile_h..(ty + 1) * tile_h {
                let sy = reflect_101(py as isize, height);
                for px in tx * tile_w..(tx + 1) * tile_w {
                    let sx = reflect_101(px as isize, width);
                    hist[input[[sy, sx]] as usize] += 1;
                }
            }

            clip_histogram(&mut hist, clip);

            let mut lut = [0u8; HIST_SIZE];
            let mut sum = 0u32;
            for (entry, &count) in lut.iter_mut().zip(hist.iter()) {
                sum += count;
                *entry = (sum as f32 * lut_scale).round().clamp(0.0, 255.0) as u8;
            }
            lut
        })
        .collect()
}

/// Clip histogram bins at `clip` and spread the excess back evenly.
///
/// The remainder that does not divide evenly goes one count at a time to
/// bins spaced across the range.
fn clip_histogram(hist: &mut [u32; HIST_SIZE], clip: u32) {
    let mut clipped = 0u32;
    for bin in hist.iter_mut() {
        if *bin > clip {
            clipped += *bin - clip;
            *bin = clip;
        }
    }

    let batch = clipped / HIST_SIZE as u32;
    let mut residual = (clipped - batch * HIST_SIZE as u32) as usize;
    for bin in hist.iter_mut() {
        *bin += batch;
    }

    if residual > 0 {
        let step = (HIST_SIZE / residual).max(1);
        let mut i = 0;
        while i < HIST_SIZE && residual > 0 {
            hist[i] += 1;
            i += step;
            residual -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clahe_preserves_dimensions() {
        let img = Array2::<u8>::from_elem((60, 80), 128);
        let out = clahe_u8(img.view(), 2.0, (8, 8));
        assert_eq!(out.dim(), (60, 80));
    }

    #[test]
    fn test_clahe_uniform_stays_uniform() {
        let img = Array2::<u8>::from_elem((64, 64), 128);
        let out = clahe_u8(img.view(), 2.0, (8, 8));
        let first = out[[0, 0]];
        assert!(out.iter().all(|&v| v == first));
    }

    #[test]
    fn test_clahe_non_divisible_size() {
        let img = Array2::from_shape_fn((13, 21), |(y, x)| ((x * 11 + y * 5) % 256) as u8);
        let out = clahe_u8(img.view(), 2.0, (8, 8));
        assert_eq!(out.dim(), (13, 21));
    }

    #[test]
    fn test_clahe_stretches_low_contrast_ramp() {
        // Values squeezed into 100..=227
        let img = Array2::from_shape_fn((256, 256), |(_, x)| 100 + (x / 2) as u8);
        let out = clahe_u8(img.view(), 2.0, (8, 8));

        let in_range = 127i32;
        let lo = *out.iter().min().unwrap() as i32;
        let hi = *out.iter().max().unwrap() as i32;
        assert!(hi - lo > in_range, "range {} -> {}", in_range, hi - lo);
    }

    #[test]
    fn test_clahe_zero_tiles_returns_copy() {
        let img = Array2::<u8>::from_elem((4, 4), 9);
        assert_eq!(clahe_u8(img.view(), 2.0, (0, 8)), img);
    }

    #[test]
    fn test_clip_histogram_conserves_mass() {
        let mut hist = [0u32; HIST_SIZE];
        hist[10] = 1000;
        hist[20] = 37;
        let total: u32 = hist.iter().sum();
        clip_histogram(&mut hist, 8);
        assert_eq!(hist.iter().sum::<u32>(), total);
        assert!(hist[10] <= 8 + 4);
    }
}
