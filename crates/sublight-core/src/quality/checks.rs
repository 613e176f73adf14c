//! The seven quality checks.
//!
//! Each check scores `[0, 10]` (10 = no issue found) and thresholds its
//! measurements into recommendation keys. The `improvements` check is the
//! exception: it rewards gains over the original and scores 5.0 when the
//! processed image is unchanged.

use image::GrayImage;

use crate::color::{lightness_plane, rgb_to_hsv};
use crate::image::Image;
use crate::models::QualityCheck;
use crate::ops::{
    channel_means, entropy_bits, fraction_above, histogram, laplacian_plane, mean, percentile,
    percentiles, variance,
};

use super::{check_names, recommendations};

/// Shared planes computed once for the whole battery.
pub struct AnalysisContext<'a> {
    pub original: &'a Image,
    pub processed: &'a Image,
    pub width: usize,
    pub height: usize,
    pub original_luminance: Vec<f32>,
    pub processed_luminance: Vec<f32>,
    pub original_saturation: Vec<f32>,
    pub processed_saturation: Vec<f32>,
    pub processed_hue: Vec<f32>,
    pub original_lightness: Vec<f32>,
    pub processed_lightness: Vec<f32>,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(original: &'a Image, processed: &'a Image) -> Self {
        let mut original_saturation = Vec::with_capacity(original.num_pixels());
        for px in original.data().chunks_exact(3) {
            original_saturation.push(rgb_to_hsv(px[0], px[1], px[2]).s);
        }
        let mut processed_saturation = Vec::with_capacity(processed.num_pixels());
        let mut processed_hue = Vec::with_capacity(processed.num_pixels());
        for px in processed.data().chunks_exact(3) {
            let hsv = rgb_to_hsv(px[0], px[1], px[2]);
            processed_saturation.push(hsv.s);
            processed_hue.push(hsv.h);
        }

        Self {
            original,
            processed,
            width: original.width() as usize,
            height: original.height() as usize,
            original_luminance: original.luminance(),
            processed_luminance: processed.luminance(),
            original_saturation,
            processed_saturation,
            processed_hue,
            original_lightness: lightness_plane(original),
            processed_lightness: lightness_plane(processed),
        }
    }
}

/// Check 1: over-correction artifacts — neon red, hot magenta, red dominance.
pub fn unrealistic_colors(ctx: &AnalysisContext) -> QualityCheck {
    let mut check = QualityCheck::new(check_names::UNREALISTIC_COLORS);
    let num_pixels = ctx.processed.num_pixels() as f32;

    let neon_red = ctx
        .processed
        .data()
        .chunks_exact(3)
        .filter(|px| px[0] > 0.95 && px[1] < 0.3 && px[2] < 0.3)
        .count() as f32
        / num_pixels;

    let magenta = ctx
        .processed_hue
        .iter()
        .zip(ctx.processed_saturation.iter())
        .filter(|(&h, &s)| (290.0..=340.0).contains(&h) && s > 0.8)
        .count() as f32
        / num_pixels;

    let means = channel_means(ctx.processed);
    let red_dominance = means[0] / means[2].max(0.1);

    check.details.insert("neon_red_fraction", neon_red);
    check.details.insert("magenta_fraction", magenta);
    check.details.insert("red_dominance_ratio", red_dominance);

    check.score = (10.0 - neon_red * 400.0 - magenta * 200.0 - (red_dominance - 1.5).max(0.0) * 2.0)
        .clamp(0.0, 10.0);

    if neon_red > 0.02 {
        check.recommendations.push(recommendations::REDUCE_RED_GAIN);
    }
    if magenta > 0.01 {
        check
            .recommendations
            .push(recommendations::REDUCE_RED_COMPENSATION);
    }
    if red_dominance > 1.5 {
        check
            .recommendations
            .push(recommendations::REDUCE_BEER_LAMBERT_RED);
    }
    check
}

/// Check 2: red channel compensation against the original.
pub fn red_channel_balance(ctx: &AnalysisContext) -> QualityCheck {
    let mut check = QualityCheck::new(check_names::RED_CHANNEL_BALANCE);

    let orig = channel_means(ctx.original);
    let proc = channel_means(ctx.processed);

    let red_gain = proc[0] / orig[0].max(0.01);
    let red_blue_post = proc[0] / proc[2].max(0.01);
    let red_dominant = ctx
        .processed
        .data()
        .chunks_exact(3)
        .filter(|px| px[0] > px[1].max(px[2]))
        .count() as f32
        / ctx.processed.num_pixels() as f32;

    check.details.insert("red_gain", red_gain);
    check.details.insert("red_blue_ratio", red_blue_post);
    check.details.insert("red_dominant_fraction", red_dominant);

    let mut score = 10.0;
    if red_gain > 1.8 && red_blue_post > 1.3 {
        score -= 4.0 + (red_gain - 1.8) * 2.0;
        check
            .recommendations
            .push(recommendations::EXCESSIVE_RED_COMPENSATION);
    } else if red_gain > 1.5 {
        score -= (red_gain - 1.5) * 2.0;
    }
    check.score = score.clamp(0.0, 10.0);
    check
}

/// Check 3: saturation clipping and large saturated regions.
pub fn saturation_clipping(ctx: &AnalysisContext) -> QualityCheck {
    let mut check = QualityCheck::new(check_names::SATURATION_CLIPPING);

    let fully = fraction_above(&ctx.processed_saturation, 0.999);
    let high = fraction_above(&ctx.processed_saturation, 0.95);
    let largest = largest_connected_fraction(&ctx.processed_saturation, ctx.width, ctx.height, 0.95);

    check.details.insert("fully_saturated_fraction", fully);
    check.details.insert("highly_saturated_fraction", high);
    check.details.insert("largest_region_fraction", largest);

    let mut score = 10.0 - high * 5.0;
    if fully > 0.02 {
        score -= 2.0 + (fully - 0.02) * 200.0;
        check
            .recommendations
            .push(recommendations::REDUCE_SATURATION);
    }
    if largest > 0.01 {
        score -= 2.0 + largest * 100.0;
        if !check
            .recommendations
            .contains(&recommendations::REDUCE_SATURATION)
        {
            check
                .recommendations
                .push(recommendations::REDUCE_SATURATION);
        }
    }
    check.score = score.clamp(0.0, 10.0);
    check
}

/// Check 4: noise amplification in the darkest fifth of the original.
pub fn color_noise(ctx: &AnalysisContext) -> QualityCheck {
    let mut check = QualityCheck::new(check_names::COLOR_NOISE);

    let threshold = percentile(&ctx.original_luminance, 20.0);
    let mask: Vec<bool> = ctx
        .original_luminance
        .iter()
        .map(|&l| l <= threshold)
        .collect();
    if mask.iter().filter(|&&m| m).count() < 16 {
        check.details.insert("noise_ratio_mean", 1.0);
        return check;
    }

    let mut ratios = [1.0f32; 3];
    let mut plane = vec![0.0f32; ctx.original.num_pixels()];
    for c in 0..3 {
        for (i, px) in ctx.original.data().chunks_exact(3).enumerate() {
            plane[i] = px[c];
        }
        let orig_noise = masked_variance(
            &laplacian_plane(&plane, ctx.width, ctx.height),
            &mask,
        );
        for (i, px) in ctx.processed.data().chunks_exact(3).enumerate() {
            plane[i] = px[c];
        }
        let proc_noise = masked_variance(
            &laplacian_plane(&plane, ctx.width, ctx.height),
            &mask,
        );
        ratios[c] = proc_noise / orig_noise.max(1e-6);
    }

    let ratio_mean = (ratios[0] + ratios[1] + ratios[2]) / 3.0;
    check.details.insert("red_noise_ratio", ratios[0]);
    check.details.insert("green_noise_ratio", ratios[1]);
    check.details.insert("blue_noise_ratio", ratios[2]);
    check.details.insert("noise_ratio_mean", ratio_mean);

    check.score = (10.0 - (ratio_mean - 1.5).max(0.0) * 4.0).clamp(0.0, 10.0);
    if ratios[0] > 1.5 {
        check
            .recommendations
            .push(recommendations::APPLY_NOISE_REDUCTION);
    }
    check
}

/// Check 5: halo overshoot around edges of the processed image.
pub fn halo_artifacts(ctx: &AnalysisContext) -> QualityCheck {
    let mut check = QualityCheck::new(check_names::HALO_ARTIFACTS);

    // Canny on the processed luminance, quantized to 8 bits.
    let gray = GrayImage::from_fn(ctx.width as u32, ctx.height as u32, |x, y| {
        let l = ctx.processed_luminance[y as usize * ctx.width + x as usize];
        image::Luma([(l.clamp(0.0, 1.0) * 255.0) as u8])
    });
    let edges = imageproc::edges::canny(&gray, 50.0, 150.0);

    // Mean luminance variance in a 5x5 neighborhood of each edge pixel.
    let mut variance_sum = 0.0f64;
    let mut edge_count = 0usize;
    for y in 0..ctx.height {
        for x in 0..ctx.width {
            if edges.get_pixel(x as u32, y as u32).0[0] == 0 {
                continue;
            }
            edge_count += 1;
            variance_sum += neighborhood_variance(
                &ctx.processed_luminance,
                ctx.width,
                ctx.height,
                x,
                y,
            ) as f64;
        }
    }

    let mean_variance = if edge_count == 0 {
        0.0
    } else {
        (variance_sum / edge_count as f64) as f32
    };
    let edge_fraction = edge_count as f32 / (ctx.width * ctx.height) as f32;

    check.details.insert("edge_variance_mean", mean_variance);
    check.details.insert("edge_fraction", edge_fraction);

    // Clean edges carry variance; overshoot pushes it past this threshold.
    check.score = (10.0 - (mean_variance - 0.05).max(0.0) * 50.0).clamp(0.0, 10.0);
    if mean_variance > 0.05 {
        check
            .recommendations
            .push(recommendations::REDUCE_CLAHE_CLIP_LIMIT);
    }
    check
}

/// Check 6: tonal distribution of the processed image.
pub fn midtone_balance(ctx: &AnalysisContext) -> QualityCheck {
    let mut check = QualityCheck::new(check_names::MIDTONE_BALANCE);
    let total = ctx.processed_lightness.len() as f32;

    let shadows = ctx
        .processed_lightness
        .iter()
        .filter(|&&l| l < 0.25)
        .count() as f32
        / total;
    let highlights = ctx
        .processed_lightness
        .iter()
        .filter(|&&l| l > 0.75)
        .count() as f32
        / total;
    let midtones = 1.0 - shadows - highlights;

    check.details.insert("shadow_fraction", shadows);
    check.details.insert("midtone_fraction", midtones);
    check.details.insert("highlight_fraction", highlights);

    let mut score = 10.0;
    if shadows < 0.05 {
        score -= (0.05 - shadows) * 60.0;
        check
            .recommendations
            .push(recommendations::ADJUST_GAMMA_SHADOWS);
    }
    if shadows > 0.6 {
        score -= (shadows - 0.6) * 15.0;
        check
            .recommendations
            .push(recommendations::REDUCE_CONTRAST_ENHANCEMENT);
    }
    check.score = score.clamp(0.0, 10.0);
    check
}

/// Check 7: gains over the original. Scores above 5 raise the aggregate.
pub fn improvements(ctx: &AnalysisContext) -> QualityCheck {
    let mut check = QualityCheck::new(check_names::IMPROVEMENTS);

    let spread = |plane: &[f32]| {
        let p = percentiles(plane, &[5.0, 95.0]);
        p[1] - p[0]
    };
    let contrast_delta = spread(&ctx.processed_lightness) - spread(&ctx.original_lightness);

    let entropy_of = |image: &Image| entropy_bits(&histogram(image.data(), 256));
    let entropy_delta = entropy_of(ctx.processed) - entropy_of(ctx.original);

    let saturation_delta = mean(&ctx.processed_saturation) - mean(&ctx.original_saturation);

    check.details.insert("contrast_delta", contrast_delta);
    check.details.insert("entropy_delta", entropy_delta);
    check.details.insert("saturation_delta", saturation_delta);

    check.score =
        (5.0 + contrast_delta * 10.0 + entropy_delta * 2.0 + saturation_delta * 10.0)
            .clamp(0.0, 10.0);

    if contrast_delta < 0.05 {
        check
            .recommendations
            .push(recommendations::INCREASE_CONTRAST);
    }
    if entropy_delta < 0.02 {
        check
            .recommendations
            .push(recommendations::ENHANCE_DETAIL_PRESERVATION);
    }
    check
}

/// Variance over the masked subset of a plane.
fn masked_variance(plane: &[f32], mask: &[bool]) -> f32 {
    let values: Vec<f32> = plane
        .iter()
        .zip(mask.iter())
        .filter(|(_, &m)| m)
        .map(|(&v, _)| v)
        .collect();
    variance(&values)
}

/// Sample variance of the 5x5 neighborhood around `(x, y)`, edge-clamped.
fn neighborhood_variance(plane: &[f32], width: usize, height: usize, x: usize, y: usize) -> f32 {
    let mut values = [0.0f32; 25];
    let mut count = 0usize;
    for dy in -2i32..=2 {
        for dx in -2i32..=2 {
            let sx = (x as i32 + dx).clamp(0, width as i32 - 1) as usize;
            let sy = (y as i32 + dy).clamp(0, height as i32 - 1) as usize;
            values[count] = plane[sy * width + sx];
            count += 1;
        }
    }
    variance(&values[..count])
}

/// Fraction of the image covered by the largest 4-connected region where the
/// plane exceeds `threshold`.
fn largest_connected_fraction(
    plane: &[f32],
    width: usize,
    height: usize,
    threshold: f32,
) -> f32 {
    let mask: Vec<bool> = plane.iter().map(|&v| v > threshold).collect();
    let mut visited = vec![false; mask.len()];
    let mut largest = 0usize;
    let mut stack = Vec::new();

    for start in 0..mask.len() {
        if !mask[start] || visited[start] {
            continue;
        }
        let mut size = 0usize;
        visited[start] = true;
        stack.push(start);
        while let Some(idx) = stack.pop() {
            size += 1;
            let x = idx % width;
            let y = idx / width;
            let mut push = |nx: usize, ny: usize| {
                let nidx = ny * width + nx;
                if mask[nidx] && !visited[nidx] {
                    visited[nidx] = true;
                    stack.push(nidx);
                }
            };
            if x > 0 {
                push(x - 1, y);
            }
            if x + 1 < width {
                push(x + 1, y);
            }
            if y > 0 {
                push(x, y - 1);
            }
            if y + 1 < height {
                push(x, y + 1);
            }
        }
        largest = largest.max(size);
    }
    largest as f32 / (width * height) as f32
}
