//! White balance stage: five methods for neutralizing underwater color casts.

use crate::cancel::CancelToken;
use crate::config::{PipelineConfig, StageId};
use crate::error::Result;
use crate::image::Image;
use crate::models::{SceneSignature, WbMethod, WhiteBalanceParams};
use crate::ops::{
    banded_mean, gaussian_blur_plane, minkowski_mean, parallel_for_each_pixel_mut, sobel_magnitude,
    split_channels,
};

/// Minkowski norm order for the shades-of-gray method.
const SHADES_OF_GRAY_NORM: f32 = 6.0;

/// Post-correction G/R ratio targeted by the lake method.
const LAKE_TARGET_GREEN_RED: f32 = 1.05;

/// Red gain floor for the lake method, avoiding red loss in green water.
const LAKE_RED_FLOOR: f32 = 1.02;

pub struct WhiteBalanceStage;

impl super::Stage for WhiteBalanceStage {
    fn id(&self) -> StageId {
        StageId::WhiteBalance
    }

    fn apply(
        &self,
        image: &Image,
        config: &PipelineConfig,
        _cancel: &CancelToken,
    ) -> Result<Image> {
        let params = &config.white_balance.params;
        let mut output = image.clone();
        match params.method {
            WbMethod::GrayWorld => apply_gray_world(&mut output, params),
            WbMethod::WhitePatch => apply_white_patch(&mut output, params),
            WbMethod::ShadesOfGray => apply_shades_of_gray(&mut output, params),
            WbMethod::GreyEdge => apply_grey_edge(&mut output, params),
            WbMethod::LakeGreenWater => apply_lake_green_water(&mut output, params),
        }
        output.clamp_unit();
        Ok(output)
    }

    fn auto_tune(&self, signature: &SceneSignature, config: &mut PipelineConfig) -> Result<()> {
        let params = &mut config.white_balance.params;

        let [r_mean, g_mean, b_mean] = signature.means;
        let bright_peak = (0..3).any(|c| {
            signature.channel_percentile(c, 99.0) - signature.channel_percentile(c, 95.0) > 0.1
        });

        if g_mean > 1.15 * r_mean.max(b_mean) {
            // Strong green dominance: freshwater cast.
            params.method = WbMethod::LakeGreenWater;
            params.green_reduction = ((signature.g_ratio() - 0.33) * 2.0).clamp(0.1, 0.8);
            params.magenta_strength = ((signature.g_ratio() - 0.35) * 1.5).clamp(0.0, 0.3);
            params.gray_world_influence = 0.6;
        } else if signature.hist_spread > 0.5 && signature.channel_distance < 0.1 {
            params.method = WbMethod::GrayWorld;
            params.percentile = 20.0;
            params.max_gain = 1.8;
        } else if bright_peak {
            params.method = WbMethod::WhitePatch;
            params.max_gain = 2.2;
        } else {
            params.method = WbMethod::ShadesOfGray;
            params.max_gain = 2.0;
        }

        if signature.saturated_fraction > 0.05 {
            params.max_gain *= 0.8;
        }
        params.clamp_to_bounds();
        Ok(())
    }

    fn describe(&self, config: &PipelineConfig) -> String {
        let params = &config.white_balance.params;
        match params.method {
            WbMethod::LakeGreenWater => format!(
                "White balance ({}): green reduction {:.2}, magenta {:.2}, gray-world {:.2}",
                params.method.key(),
                params.green_reduction,
                params.magenta_strength,
                params.gray_world_influence
            ),
            _ => format!(
                "White balance ({}): percentile {:.0}, max gain {:.1}",
                params.method.key(),
                params.percentile,
                params.max_gain
            ),
        }
    }
}

/// Clamp a gain into `[1/max_gain, max_gain]`.
fn clamp_gain(gain: f32, max_gain: f32) -> f32 {
    gain.clamp(1.0 / max_gain, max_gain)
}

fn apply_gains(image: &mut Image, gains: [f32; 3]) {
    parallel_for_each_pixel_mut(image.data_mut(), |px| {
        px[0] *= gains[0];
        px[1] *= gains[1];
        px[2] *= gains[2];
    });
}

/// Gains that pull per-channel references toward their common mean.
fn gains_toward_gray(references: [f32; 3], max_gain: f32) -> [f32; 3] {
    let target = (references[0] + references[1] + references[2]) / 3.0;
    if target <= 0.0 {
        return [1.0; 3];
    }
    [
        clamp_gain(target / (references[0] + 1e-6), max_gain),
        clamp_gain(target / (references[1] + 1e-6), max_gain),
        clamp_gain(target / (references[2] + 1e-6), max_gain),
    ]
}

/// Gray-world: percentile-banded channel means should be neutral.
fn apply_gray_world(image: &mut Image, params: &WhiteBalanceParams) {
    let channels = split_channels(image);
    let references = [
        banded_mean(&channels[0], params.percentile),
        banded_mean(&channels[1], params.percentile),
        banded_mean(&channels[2], params.percentile),
    ];
    apply_gains(image, gains_toward_gray(references, params.max_gain));
}

/// White-patch: the 99th-percentile of each channel is the reference white;
/// the brightest channel sets the target.
fn apply_white_patch(image: &mut Image, params: &WhiteBalanceParams) {
    let channels = split_channels(image);
    let p99 = [
        crate::ops::percentile(&channels[0], 99.0),
        crate::ops::percentile(&channels[1], 99.0),
        crate::ops::percentile(&channels[2], 99.0),
    ];
    let target = p99[0].max(p99[1]).max(p99[2]);
    if target <= 0.0 {
        return;
    }
    let gains = [
        clamp_gain(target / (p99[0] + 1e-6), params.max_gain),
        clamp_gain(target / (p99[1] + 1e-6), params.max_gain),
        clamp_gain(target / (p99[2] + 1e-6), params.max_gain),
    ];
    apply_gains(image, gains);
}

/// Shades-of-gray: Minkowski-norm generalization of gray-world.
fn apply_shades_of_gray(image: &mut Image, params: &WhiteBalanceParams) {
    let channels = split_channels(image);
    let references = [
        minkowski_mean(&channels[0], SHADES_OF_GRAY_NORM),
        minkowski_mean(&channels[1], SHADES_OF_GRAY_NORM),
        minkowski_mean(&channels[2], SHADES_OF_GRAY_NORM),
    ];
    apply_gains(image, gains_toward_gray(references, params.max_gain));
}

/// Grey-edge: first-order derivative magnitudes as the illuminant estimate.
fn apply_grey_edge(image: &mut Image, params: &WhiteBalanceParams) {
    let width = image.width() as usize;
    let height = image.height() as usize;
    let channels = split_channels(image);

    let mut references = [0.0f32; 3];
    for (c, channel) in channels.iter().enumerate() {
        let smoothed = gaussian_blur_plane(channel, width, height, 1.0);
        let gradient = sobel_magnitude(&smoothed, width, height);
        references[c] = banded_mean(&gradient, params.percentile);
    }
    apply_gains(image, gains_toward_gray(references, params.max_gain));
}

/// Specialized correction for green-dominant freshwater.
///
/// Adaptive green reduction and magenta compensation first, then a blended
/// gray-world pass, then the green-suppression scalar that brings the G/R
/// ratio near the target, with the red gain floored.
fn apply_lake_green_water(image: &mut Image, params: &WhiteBalanceParams) {
    let green_reduction = params.green_reduction;
    let magenta_strength = params.magenta_strength;

    // Step 1: per-pixel green reduction and magenta boost, strongest where
    // green dominates both other channels.
    parallel_for_each_pixel_mut(image.data_mut(), |px| {
        let rg_ratio = px[0] / (px[1] + 1e-6);
        let bg_ratio = px[2] / (px[1] + 1e-6);
        let green_dominance = 1.0 / (1.0 + rg_ratio + bg_ratio);
        px[1] *= 1.0 - green_dominance * green_reduction;
        let magenta_boost = 1.0 + magenta_strength * green_dominance;
        px[0] *= magenta_boost;
        px[2] *= magenta_boost;
    });

    // Step 2: gray-world gains on the corrected image, blended by influence.
    let means = crate::ops::channel_means(image);
    let gw = gains_toward_gray(means, params.max_gain);
    let influence = params.gray_world_influence;
    let mut gains = [
        1.0 + influence * (gw[0] - 1.0),
        1.0 + influence * (gw[1] - 1.0),
        1.0 + influence * (gw[2] - 1.0),
    ];

    // Step 3: enforce the red floor, then pick the green suppression scalar
    // that lands the post-correction G/R ratio near the target.
    gains[0] = gains[0].max(LAKE_RED_FLOOR);
    let post_r = means[0] * gains[0];
    let post_g = means[1] * gains[1];
    if post_g > 1e-6 {
        let suppression = (LAKE_TARGET_GREEN_RED * post_r / post_g).clamp(0.6, 1.0);
        gains[1] *= suppression;
    }

    apply_gains(image, gains);
}
