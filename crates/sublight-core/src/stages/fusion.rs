//! Multi-scale fusion stage.
//!
//! Fuses three variants of the already-processed pipeline output (identity,
//! gentle contrast, gentle sharpen) through Laplacian pyramid blending with
//! per-pixel quality weights. The variants are derived from the processed
//! image the engine hands in, never from the original source.

use crate::cancel::CancelToken;
use crate::config::{PipelineConfig, StageId};
use crate::error::Result;
use crate::image::Image;
use crate::models::{FusionParams, SceneSignature};
use crate::ops::{
    collapse_laplacian, gaussian_blur_image, gaussian_blur_plane, gaussian_pyramid_plane,
    laplacian_pyramid_image, laplacian_plane, Plane,
};

/// Gaussian width of the well-exposedness measure around mid-gray.
const EXPOSEDNESS_SIGMA: f32 = 0.2;

/// Slope of the gentle sigmoid contrast variant.
const CONTRAST_SLOPE: f32 = 1.5;

pub struct FusionStage;

impl super::Stage for FusionStage {
    fn id(&self) -> StageId {
        StageId::MultiscaleFusion
    }

    fn apply(&self, image: &Image, config: &PipelineConfig, cancel: &CancelToken) -> Result<Image> {
        let params = &config.multiscale_fusion.params;
        let width = image.width() as usize;
        let height = image.height() as usize;
        let levels = params.levels as usize;

        // The three variants.
        let identity = image.clone();
        let contrast = gentle_contrast(image);
        let sharpened = gentle_sharpen(image, params.base_sigma, params.sharpen_amount);
        cancel.check()?;

        let variants = [&identity, &contrast, &sharpened];

        // Per-pixel quality weights, normalized so they sum to one.
        let mut weights: Vec<Vec<f32>> = variants
            .iter()
            .map(|v| quality_weights(v, params))
            .collect();
        normalize_weight_maps(&mut weights);
        cancel.check()?;

        // Weight pyramids (Gaussian) and variant pyramids (Laplacian).
        let weight_pyramids: Vec<Vec<Plane>> = weights
            .iter()
            .map(|w| {
                gaussian_pyramid_plane(
                    w,
                    width,
                    height,
                    levels,
                    params.scale_factor,
                    params.base_sigma,
                )
            })
            .collect();
        cancel.check()?;

        let mut variant_pyramids = Vec::with_capacity(variants.len());
        for variant in variants {
            cancel.check()?;
            variant_pyramids.push(laplacian_pyramid_image(
                variant,
                levels,
                params.scale_factor,
                params.base_sigma,
            ));
        }

        // Blend level by level, renormalizing the smoothed weights.
        let mut fused = Vec::with_capacity(levels);
        for level in 0..levels {
            cancel.check()?;
            let shape = &variant_pyramids[0][level];
            let num_pixels = shape.num_pixels();
            let mut data = vec![0.0f32; num_pixels * 3];

            for i in 0..num_pixels {
                let mut total = 1e-12f32;
                for wp in &weight_pyramids {
                    total += wp[level].data[i];
                }
                for (vp, wp) in variant_pyramids.iter().zip(weight_pyramids.iter()) {
                    let w = wp[level].data[i] / total;
                    let px = &vp[level].data()[i * 3..i * 3 + 3];
                    data[i * 3] += w * px[0];
                    data[i * 3 + 1] += w * px[1];
                    data[i * 3 + 2] += w * px[2];
                }
            }
            fused.push(Image::from_raw(shape.width(), shape.height(), data));
        }

        let mut result = collapse_laplacian(&fused);
        result.clamp_unit();
        Ok(result)
    }

    fn auto_tune(&self, _signature: &SceneSignature, config: &mut PipelineConfig) -> Result<()> {
        // The default preset is the tuned preset: moderate depth, octave
        // scaling, balanced weight exponents, light sharpening.
        config.multiscale_fusion.params = FusionParams::default();
        Ok(())
    }

    fn describe(&self, config: &PipelineConfig) -> String {
        let params = &config.multiscale_fusion.params;
        format!(
            "Multi-scale fusion: {} levels, scale {:.1}, weights ({:.1}, {:.1}, {:.1}), sharpen {:.2}",
            params.levels,
            params.scale_factor,
            params.contrast_weight,
            params.saturation_weight,
            params.exposedness_weight,
            params.sharpen_amount
        )
    }
}

/// Soft sigmoid contrast boost around mid-gray, mapped back onto `[0, 1]`.
fn gentle_contrast(image: &Image) -> Image {
    let span = (CONTRAST_SLOPE * 0.5).tanh() * 2.0;
    let mut output = image.clone();
    for v in output.data_mut().iter_mut() {
        *v = (0.5 + ((*v - 0.5) * CONTRAST_SLOPE).tanh() / span).clamp(0.0, 1.0);
    }
    output
}

/// Unsharp mask: `v + amount * (v - blur(v))`.
fn gentle_sharpen(image: &Image, sigma: f32, amount: f32) -> Image {
    if amount <= 0.0 {
        return image.clone();
    }
    let blurred = gaussian_blur_image(image, sigma);
    let data: Vec<f32> = image
        .data()
        .iter()
        .zip(blurred.data().iter())
        .map(|(v, b)| (v + amount * (v - b)).clamp(0.0, 1.0))
        .collect();
    Image::from_raw(image.width(), image.height(), data)
}

/// Combined per-pixel quality measure: contrast, saturation, exposedness,
/// each raised to its configured exponent.
fn quality_weights(variant: &Image, params: &FusionParams) -> Vec<f32> {
    let width = variant.width() as usize;
    let height = variant.height() as usize;
    let luminance = variant.luminance();

    // Contrast: absolute Laplacian response of luminance, lightly smoothed.
    let contrast: Vec<f32> = laplacian_plane(&luminance, width, height)
        .iter()
        .map(|v| v.abs())
        .collect();
    let contrast = gaussian_blur_plane(&contrast, width, height, 1.0);

    let mut weights = vec![0.0f32; width * height];
    for (i, px) in variant.data().chunks_exact(3).enumerate() {
        // Saturation: standard deviation across channels.
        let mean = (px[0] + px[1] + px[2]) / 3.0;
        let saturation = (((px[0] - mean).powi(2) + (px[1] - mean).powi(2)
            + (px[2] - mean).powi(2))
            / 3.0)
            .sqrt();

        // Exposedness: Gaussian distance from mid-gray, per channel.
        let mut exposedness = 1.0f32;
        for &c in px {
            exposedness *= (-(c - 0.5) * (c - 0.5)
                / (2.0 * EXPOSEDNESS_SIGMA * EXPOSEDNESS_SIGMA))
                .exp();
        }

        weights[i] = (contrast[i] + 1e-6).powf(params.contrast_weight)
            * (saturation + 1e-6).powf(params.saturation_weight)
            * (exposedness + 1e-6).powf(params.exposedness_weight)
            + 1e-12;
    }
    weights
}

/// Normalize the stacked weight maps so each pixel's weights sum to one.
fn normalize_weight_maps(weights: &mut [Vec<f32>]) {
    let num_pixels = weights[0].len();
    for i in 0..num_pixels {
        let total: f32 = weights.iter().map(|w| w[i]).sum::<f32>() + 1e-12;
        for w in weights.iter_mut() {
            w[i] /= total;
        }
    }
}
