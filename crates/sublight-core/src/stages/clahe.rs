//! CLAHE stage: contrast-limited adaptive histogram equalization on the
//! LAB lightness channel.
//!
//! Per-tile clipped histograms build lookup tables; pixels interpolate
//! bilinearly between the four surrounding tile LUTs, which removes tile
//! seams. The clip limit redistributes excess counts iteratively.

use crate::cancel::CancelToken;
use crate::color::{lightness_plane, set_lightness_plane};
use crate::config::{PipelineConfig, StageId};
use crate::error::Result;
use crate::image::Image;
use crate::models::SceneSignature;

const BINS: usize = 256;

pub struct ClaheStage;

impl super::Stage for ClaheStage {
    fn id(&self) -> StageId {
        StageId::Clahe
    }

    fn apply(
        &self,
        image: &Image,
        config: &PipelineConfig,
        _cancel: &CancelToken,
    ) -> Result<Image> {
        let params = &config.clahe.params;
        let width = image.width() as usize;
        let height = image.height() as usize;

        let lightness = lightness_plane(image);
        let equalized = clahe_plane(
            &lightness,
            width,
            height,
            params.clip_limit,
            params.tile_grid as usize,
        );
        Ok(set_lightness_plane(image, &equalized))
    }

    fn auto_tune(&self, signature: &SceneSignature, config: &mut PipelineConfig) -> Result<()> {
        let params = &mut config.clahe.params;

        // Low global contrast asks for stronger equalization.
        let spread = signature.luminance_percentiles[7] - signature.luminance_percentiles[1];
        let mut clip = if spread < 0.4 {
            (2.0 + (0.4 - spread) * 8.0).min(4.0)
        } else {
            2.0
        };

        // Noise pulls the clip limit back down.
        if signature.laplacian_variance > 0.003 {
            clip = (clip - (signature.laplacian_variance - 0.003) * 400.0).max(1.5);
        }
        params.clip_limit = clip;

        // Tile grid scales with resolution.
        let megapixels = signature.num_pixels() as f32 / 1.0e6;
        params.tile_grid = if megapixels <= 1.0 {
            6
        } else if megapixels <= 4.0 {
            8
        } else {
            10
        };

        params.clamp_to_bounds();
        Ok(())
    }

    fn describe(&self, config: &PipelineConfig) -> String {
        let params = &config.clahe.params;
        format!(
            "CLAHE: clip limit {:.1}, tiles {}x{}",
            params.clip_limit, params.tile_grid, params.tile_grid
        )
    }
}

/// CLAHE over a `[0, 1]` plane with a square `tiles x tiles` grid.
pub(crate) fn clahe_plane(
    plane: &[f32],
    width: usize,
    height: usize,
    clip_limit: f32,
    tiles: usize,
) -> Vec<f32> {
    debug_assert_eq!(plane.len(), width * height);
    let tiles = tiles.max(1);
    let tile_w = width.div_ceil(tiles);
    let tile_h = height.div_ceil(tiles);

    // Per-tile lookup tables mapping bin index to equalized value.
    let mut luts = vec![[0.0f32; BINS]; tiles * tiles];
    for ty in 0..tiles {
        for tx in 0..tiles {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(width);
            let y1 = (y0 + tile_h).min(height);
            if x0 >= width || y0 >= height {
                // Degenerate tile on tiny images; identity mapping.
                for (bin, slot) in luts[ty * tiles + tx].iter_mut().enumerate() {
                    *slot = bin as f32 / (BINS - 1) as f32;
                }
                continue;
            }
            let tile_pixels = (x1 - x0) * (y1 - y0);

            let mut hist = [0u32; BINS];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[bin_of(plane[y * width + x])] += 1;
                }
            }

            let limit = ((clip_limit * tile_pixels as f32) / BINS as f32).max(1.0) as u32;
            clip_histogram(&mut hist, limit);

            let mut cdf = 0u32;
            let total: u32 = hist.iter().sum();
            let lut = &mut luts[ty * tiles + tx];
            for bin in 0..BINS {
                cdf += hist[bin];
                lut[bin] = if total > 0 {
                    cdf as f32 / total as f32
                } else {
                    bin as f32 / (BINS - 1) as f32
                };
            }
        }
    }

    // Bilinear interpolation between the four surrounding tile LUTs,
    // relative to tile centers.
    let mut output = vec![0.0f32; width * height];
    for y in 0..height {
        let fy = (y as f32 - tile_h as f32 / 2.0) / tile_h as f32;
        let ty0 = (fy.floor() as i32).clamp(0, tiles as i32 - 1) as usize;
        let ty1 = (ty0 + 1).min(tiles - 1);
        let ay = (fy - ty0 as f32).clamp(0.0, 1.0);
        for x in 0..width {
            let fx = (x as f32 - tile_w as f32 / 2.0) / tile_w as f32;
            let tx0 = (fx.floor() as i32).clamp(0, tiles as i32 - 1) as usize;
            let tx1 = (tx0 + 1).min(tiles - 1);
            let ax = (fx - tx0 as f32).clamp(0.0, 1.0);

            let bin = bin_of(plane[y * width + x]);
            let tl = luts[ty0 * tiles + tx0][bin];
            let tr = luts[ty0 * tiles + tx1][bin];
            let bl = luts[ty1 * tiles + tx0][bin];
            let br = luts[ty1 * tiles + tx1][bin];

            let top = tl * (1.0 - ax) + tr * ax;
            let bottom = bl * (1.0 - ax) + br * ax;
            output[y * width + x] = (top * (1.0 - ay) + bottom * ay).clamp(0.0, 1.0);
        }
    }
    output
}

#[inline]
fn bin_of(v: f32) -> usize {
    ((v.clamp(0.0, 1.0) * (BINS - 1) as f32).round() as usize).min(BINS - 1)
}

/// Cap histogram bins at `limit`, redistributing the excess iteratively.
fn clip_histogram(hist: &mut [u32; BINS], limit: u32) {
    for _ in 0..BINS {
        let mut excess = 0u32;
        for h in hist.iter_mut() {
            if *h > limit {
                excess += *h - limit;
                *h = limit;
            }
        }
        if excess == 0 {
            break;
        }

        let per_bin = excess / BINS as u32;
        let mut remainder = (excess % BINS as u32) as usize;
        if per_bin > 0 {
            for h in hist.iter_mut() {
                *h = (*h + per_bin).min(limit);
            }
        }
        for h in hist.iter_mut() {
            if remainder == 0 {
                break;
            }
            if *h < limit {
                *h += 1;
                remainder -= 1;
            }
        }
        if per_bin == 0 && remainder > 0 {
            // Every bin is at the limit; nothing more to redistribute.
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_plane_stays_uniform() {
        let plane = vec![0.5f32; 64 * 64];
        let result = clahe_plane(&plane, 64, 64, 4.0, 8);
        let first = result[0];
        assert!(result.iter().all(|&v| (v - first).abs() < 0.02));
    }

    #[test]
    fn test_clip_histogram_caps_bins() {
        let mut hist = [0u32; BINS];
        hist[0] = 1000;
        hist[1] = 500;
        clip_histogram(&mut hist, 100);
        // Redistribution may refill bins up to the limit, never beyond.
        assert!(hist.iter().all(|&v| v <= 100));
    }

    #[test]
    fn test_low_contrast_plane_gains_spread() {
        // Values squeezed into [0.45, 0.55] should spread out.
        let mut plane = vec![0.0f32; 64 * 64];
        for (i, v) in plane.iter_mut().enumerate() {
            *v = 0.45 + 0.1 * ((i % 64) as f32 / 64.0);
        }
        let result = clahe_plane(&plane, 64, 64, 4.0, 4);
        let min = result.iter().cloned().fold(f32::INFINITY, f32::min);
        let max = result.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        assert!(
            max - min > 0.3,
            "expected contrast expansion, got [{}, {}]",
            min,
            max
        );
    }
}
