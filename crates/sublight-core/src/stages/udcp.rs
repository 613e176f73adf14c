//! Underwater Dark Channel Prior stage: haze removal via transmission
//! estimation and radiance recovery.

use crate::cancel::CancelToken;
use crate::config::{PipelineConfig, StageId};
use crate::error::Result;
use crate::image::Image;
use crate::models::SceneSignature;
use crate::ops::{guided_filter, min_filter_plane, percentile};

/// Fraction of the brightest dark-channel pixels used to estimate the
/// background light.
const BRIGHTEST_FRACTION: f32 = 0.001;

pub struct UdcpStage;

impl super::Stage for UdcpStage {
    fn id(&self) -> StageId {
        StageId::Udcp
    }

    fn apply(&self, image: &Image, config: &PipelineConfig, cancel: &CancelToken) -> Result<Image> {
        let params = &config.udcp.params;
        let width = image.width() as usize;
        let height = image.height() as usize;
        let window = params.window as usize;

        // Step 1: dark channel (window minimum over channels).
        let dark = dark_channel(image, window);
        cancel.check()?;

        // Step 2: background light from the brightest dark-channel pixels.
        let background = estimate_background_light(image, &dark);

        // Step 3: transmission estimate on the background-normalized image.
        let transmission = estimate_transmission(image, background, params.omega, window);
        cancel.check()?;

        // Step 4: guided refinement with the luminance as guidance.
        let luminance = image.luminance();
        let mut refined = guided_filter(
            &luminance,
            &transmission,
            width,
            height,
            params.guided_radius as usize,
            params.guided_eps,
        );
        cancel.check()?;

        // Step 5: transmission floor.
        for t in refined.iter_mut() {
            *t = t.max(params.t0);
        }

        // Step 6: radiance recovery.
        let mut data = Vec::with_capacity(image.data().len());
        for (px, &t) in image.data().chunks_exact(3).zip(refined.iter()) {
            for c in 0..3 {
                let recovered = (px[c] - background[c]) / t + background[c];
                data.push(recovered.clamp(0.0, 1.0));
            }
        }

        // Step 7: linear contrast stretch around the midpoint.
        if params.post_contrast_gain > 1.0 {
            let gain = params.post_contrast_gain;
            for v in data.iter_mut() {
                *v = ((*v - 0.5) * gain + 0.5).clamp(0.0, 1.0);
            }
        }

        Ok(Image::from_raw(image.width(), image.height(), data))
    }

    fn auto_tune(&self, signature: &SceneSignature, config: &mut PipelineConfig) -> Result<()> {
        let params = &mut config.udcp.params;

        // A bright dark channel means the scene is hazy everywhere; removing
        // the full estimate would over-correct.
        params.omega = (0.95 - signature.dark_channel_mean * 0.6).clamp(0.7, 0.95);

        // Dark scenes need a higher transmission floor to avoid noise blowup.
        params.t0 = (0.05 + signature.dark_channel_mean * 0.5).clamp(0.05, 0.2);

        // Texture-rich scenes get a smaller window to preserve detail.
        params.window = if signature.sobel_mean > 0.15 {
            7
        } else if signature.sobel_mean > 0.08 {
            9
        } else {
            11
        };

        // Noise raises the guided filter regularization.
        params.guided_eps = (1e-3 + signature.laplacian_variance * 0.4).clamp(1e-4, 5e-3);

        params.clamp_to_bounds();
        Ok(())
    }

    fn describe(&self, config: &PipelineConfig) -> String {
        let params = &config.udcp.params;
        format!(
            "UDCP: omega {:.2}, t0 {:.2}, window {}, guided radius {}, contrast {:.1}",
            params.omega, params.t0, params.window, params.guided_radius, params.post_contrast_gain
        )
    }
}

/// Window-minimum over channels: `D(p) = min_c min_q I_c(q)`.
pub(crate) fn dark_channel(image: &Image, window: usize) -> Vec<f32> {
    let width = image.width() as usize;
    let height = image.height() as usize;
    let min_channel: Vec<f32> = image
        .data()
        .chunks_exact(3)
        .map(|px| px[0].min(px[1]).min(px[2]))
        .collect();
    min_filter_plane(&min_channel, width, height, window)
}

/// Per-channel mean of the source pixels at the brightest 0.1% of the dark
/// channel; the underwater analogue of atmospheric light.
fn estimate_background_light(image: &Image, dark: &[f32]) -> [f32; 3] {
    let count = ((dark.len() as f32 * BRIGHTEST_FRACTION) as usize).max(1);
    let threshold = percentile(dark, 100.0 * (1.0 - BRIGHTEST_FRACTION));

    let mut sums = [0.0f64; 3];
    let mut picked = 0usize;
    for (px, &d) in image.data().chunks_exact(3).zip(dark.iter()) {
        if d >= threshold && picked < count.max(16) {
            sums[0] += px[0] as f64;
            sums[1] += px[1] as f64;
            sums[2] += px[2] as f64;
            picked += 1;
        }
    }
    if picked == 0 {
        return [1.0; 3];
    }
    [
        (sums[0] / picked as f64) as f32,
        (sums[1] / picked as f64) as f32,
        (sums[2] / picked as f64) as f32,
    ]
}

/// `t_hat(p) = 1 - omega * min_c min_q (I_c(q) / A_c)`.
fn estimate_transmission(image: &Image, background: [f32; 3], omega: f32, window: usize) -> Vec<f32> {
    let width = image.width() as usize;
    let height = image.height() as usize;

    let normalized_min: Vec<f32> = image
        .data()
        .chunks_exact(3)
        .map(|px| {
            let r = px[0] / background[0].max(1e-6);
            let g = px[1] / background[1].max(1e-6);
            let b = px[2] / background[2].max(1e-6);
            r.min(g).min(b)
        })
        .collect();
    let eroded = min_filter_plane(&normalized_min, width, height, window);

    eroded.iter().map(|&d| 1.0 - omega * d).collect()
}
