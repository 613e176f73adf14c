//! Beer-Lambert stage: wavelength-dependent attenuation compensation.
//!
//! Light through water decays as `exp(-k * d)` with distance and wavelength;
//! red dies first. The stage inverts that decay with a brightness-derived
//! per-pixel depth proxy, so darker (assumed farther) regions receive more
//! compensation.

use crate::cancel::CancelToken;
use crate::config::{PipelineConfig, StageId};
use crate::error::Result;
use crate::image::Image;
use crate::models::SceneSignature;
use crate::ops::percentile;

/// Reference absorption coefficients for clear water (R, G, B baseline).
const REFERENCE_ABSORPTION: [f32; 3] = [0.6, 0.25, 0.1];

pub struct BeerLambertStage;

impl super::Stage for BeerLambertStage {
    fn id(&self) -> StageId {
        StageId::BeerLambert
    }

    fn apply(
        &self,
        image: &Image,
        config: &PipelineConfig,
        _cancel: &CancelToken,
    ) -> Result<Image> {
        let params = &config.beer_lambert.params;
        let luminance = image.luminance();
        let coefficients = [params.k_red, params.k_green, params.k_blue];

        let mut data = Vec::with_capacity(image.data().len());
        for (px, &luma) in image.data().chunks_exact(3).zip(luminance.iter()) {
            // Darker regions read as deeper / farther.
            let depth = (1.0 - luma) * params.depth_factor;
            for c in 0..3 {
                data.push(px[c] * (coefficients[c] * depth).exp() * params.enhancement);
            }
        }

        // Renormalize channels whose 99th percentile overshot, preserving
        // dynamic range instead of hard-clipping the compensation.
        for c in 0..3 {
            let channel: Vec<f32> = data.iter().skip(c).step_by(3).copied().collect();
            let p99 = percentile(&channel, 99.0);
            if p99 > 1.0 {
                for v in data.iter_mut().skip(c).step_by(3) {
                    *v /= p99;
                }
            }
        }

        for v in data.iter_mut() {
            *v = v.clamp(0.0, 1.0);
        }
        Ok(Image::from_raw(image.width(), image.height(), data))
    }

    fn auto_tune(&self, signature: &SceneSignature, config: &mut PipelineConfig) -> Result<()> {
        let params = &mut config.beer_lambert.params;
        let [r_mean, _, b_mean] = signature.means;

        // Spectral distance proxy: the more blue has outlived red, the
        // farther the light has traveled.
        let spectral_depth = (b_mean.max(1e-3) / r_mean.max(1e-3)).ln();
        params.depth_factor = (0.3 + spectral_depth.max(0.0) * 0.75).clamp(0.3, 1.2);

        let scale = 0.5 + params.depth_factor;
        params.k_red = REFERENCE_ABSORPTION[0] * scale;
        params.k_green = REFERENCE_ABSORPTION[1] * scale;
        params.k_blue = REFERENCE_ABSORPTION[2] * scale;

        let luminance_mean = (signature.means[0] + signature.means[1] + signature.means[2]) / 3.0;
        params.enhancement = (1.0 + (0.4 - luminance_mean).max(0.0) * 2.0).clamp(1.0, 2.5);

        // Low saturation headroom: back off to avoid clipping highlights.
        let headroom_low = signature.luminance_percentiles[8] > 0.9;
        if headroom_low {
            params.k_red *= 0.7;
            params.k_green *= 0.7;
            params.k_blue *= 0.7;
            params.enhancement = (params.enhancement * 0.8).max(1.0);
        }

        params.clamp_to_bounds();
        Ok(())
    }

    fn describe(&self, config: &PipelineConfig) -> String {
        let params = &config.beer_lambert.params;
        format!(
            "Beer-Lambert: depth {:.2}, k=({:.2}, {:.2}, {:.2}), enhancement {:.1}",
            params.depth_factor, params.k_red, params.k_green, params.k_blue, params.enhancement
        )
    }
}
