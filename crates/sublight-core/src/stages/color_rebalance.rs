//! Color rebalance stage: 3x3 channel mixing with saturation guards.

use crate::cancel::CancelToken;
use crate::color::{hsv_to_rgb, rgb_to_hsv, rgb_to_lab};
use crate::config::{PipelineConfig, StageId};
use crate::error::Result;
use crate::image::Image;
use crate::models::SceneSignature;
use crate::ops::parallel_for_each_pixel_mut;

/// Hue band treated as magenta by the saturation guard, in degrees.
/// Source revisions disagree on the exact bounds; 290-340 is the midpoint.
const MAGENTA_HUE: (f32, f32) = (290.0, 340.0);

pub struct ColorRebalanceStage;

impl super::Stage for ColorRebalanceStage {
    fn id(&self) -> StageId {
        StageId::ColorRebalance
    }

    fn apply(
        &self,
        image: &Image,
        config: &PipelineConfig,
        _cancel: &CancelToken,
    ) -> Result<Image> {
        let params = &config.color_rebalance.params;
        let matrix = params.matrix;
        let saturation_limit = params.saturation_limit;
        let preserve_luminance = params.preserve_luminance;

        let mut output = image.clone();
        parallel_for_each_pixel_mut(output.data_mut(), |px| {
            let (r, g, b) = (px[0], px[1], px[2]);

            let mut out = [
                (matrix[0][0] * r + matrix[0][1] * g + matrix[0][2] * b).clamp(0.0, 1.0),
                (matrix[1][0] * r + matrix[1][1] * g + matrix[1][2] * b).clamp(0.0, 1.0),
                (matrix[2][0] * r + matrix[2][1] * g + matrix[2][2] * b).clamp(0.0, 1.0),
            ];

            // Anti-magenta guard: cap saturation inside the magenta band.
            if saturation_limit < 1.0 {
                let mut hsv = rgb_to_hsv(out[0], out[1], out[2]);
                if hsv.h >= MAGENTA_HUE.0 && hsv.h <= MAGENTA_HUE.1 && hsv.s > saturation_limit {
                    hsv.s = saturation_limit;
                    let (nr, ng, nb) = hsv_to_rgb(hsv);
                    out = [nr, ng, nb];
                }
            }

            // Rescale so the output lightness matches the input lightness.
            // L* is nonlinear in RGB, so one multiplicative correction
            // undershoots; two iterations converge well below visibility.
            if preserve_luminance {
                let l_in = rgb_to_lab(r, g, b).l;
                for _ in 0..2 {
                    let l_out = rgb_to_lab(out[0], out[1], out[2]).l;
                    if l_out <= 1e-3 {
                        break;
                    }
                    let ratio = l_in / l_out;
                    for v in out.iter_mut() {
                        *v = (*v * ratio).clamp(0.0, 1.0);
                    }
                }
            }

            px[0] = out[0];
            px[1] = out[1];
            px[2] = out[2];
        });
        Ok(output)
    }

    fn auto_tune(&self, signature: &SceneSignature, config: &mut PipelineConfig) -> Result<()> {
        let params = &mut config.color_rebalance.params;

        // The matrix stays identity; only the magenta guard adapts. A strong
        // red bias going into this stage (after Beer-Lambert compensation)
        // wants a tighter saturation ceiling.
        let red_bias = (signature.red_blue_ratio - 1.0).max(0.0);
        params.saturation_limit = (0.9 - red_bias * 0.2).clamp(0.5, 0.9);

        params.clamp_to_bounds();
        Ok(())
    }

    fn describe(&self, config: &PipelineConfig) -> String {
        let params = &config.color_rebalance.params;
        format!(
            "Color rebalance: diag ({:.2}, {:.2}, {:.2}), saturation limit {:.2}{}",
            params.matrix[0][0],
            params.matrix[1][1],
            params.matrix[2][2],
            params.saturation_limit,
            if params.preserve_luminance {
                ", preserve luminance"
            } else {
                ""
            }
        )
    }
}
