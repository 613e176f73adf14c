use super::*;
use crate::cancel::CancelToken;
use crate::config::PipelineConfig;
use crate::image::Image;
use crate::models::{ParameterValue, WbMethod};
use crate::ops::psnr;

/// Non-trivial test image: gradients with a green-blue cast and tonal range.
fn reef_image(width: u32, height: u32) -> Image {
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            let fx = x as f32 / width as f32;
            let fy = y as f32 / height as f32;
            data.push(0.05 + 0.25 * fx);
            data.push(0.2 + 0.5 * fy);
            data.push(0.3 + 0.4 * fx * fy);
        }
    }
    Image::from_data(width, height, data).unwrap()
}

// ============================================================
// Shared stage properties
// ============================================================

#[test]
fn test_all_stages_preserve_shape_and_range() {
    let image = reef_image(40, 28);
    let config = PipelineConfig::default();
    let cancel = CancelToken::new();

    for id in crate::config::StageId::ALL {
        let stage = stage_for(id);
        let output = stage.apply(&image, &config, &cancel).unwrap();
        assert_eq!(output.width(), image.width(), "{} changed width", id);
        assert_eq!(output.height(), image.height(), "{} changed height", id);
        for (i, &v) in output.data().iter().enumerate() {
            assert!(
                (0.0..=1.0).contains(&v),
                "{} produced out-of-range sample {} at {}",
                id,
                v,
                i
            );
        }
    }
}

#[test]
fn test_all_stages_accept_tiny_images() {
    let image = Image::constant(1, 1, [0.4, 0.5, 0.6]);
    let config = PipelineConfig::default();
    let cancel = CancelToken::new();

    for id in crate::config::StageId::ALL {
        let output = stage_for(id).apply(&image, &config, &cancel).unwrap();
        assert_eq!(output.num_pixels(), 1, "{} broke on 1x1", id);
    }
}

#[test]
fn test_describe_mentions_parameters() {
    let config = PipelineConfig::default();
    for id in crate::config::StageId::ALL {
        let text = stage_for(id).describe(&config);
        assert!(!text.is_empty(), "{} has empty description", id);
    }
}

// ============================================================
// White balance
// ============================================================

#[test]
fn test_gray_world_on_flat_green_image() {
    // Constant (0.3, 0.9, 0.2) with percentile 50 and a wide gain clamp
    // must come out neutral at the channel average.
    let image = Image::constant(32, 32, [0.3, 0.9, 0.2]);
    let mut config = PipelineConfig::default();
    config
        .set_parameter(
            crate::config::StageId::WhiteBalance,
            "method",
            &ParameterValue::Enum("gray_world".to_string()),
        )
        .unwrap();
    config
        .set_parameter(
            crate::config::StageId::WhiteBalance,
            "percentile",
            &ParameterValue::Float(50.0),
        )
        .unwrap();
    config
        .set_parameter(
            crate::config::StageId::WhiteBalance,
            "max_gain",
            &ParameterValue::Float(5.0),
        )
        .unwrap();

    let output = WhiteBalanceStage
        .apply(&image, &config, &CancelToken::new())
        .unwrap();

    let expected = (0.3 + 0.9 + 0.2) / 3.0;
    let means = crate::ops::channel_means(&output);
    for (c, &mean) in means.iter().enumerate() {
        assert!(
            (mean - expected).abs() < 1e-3,
            "channel {} mean {} != {}",
            c,
            mean,
            expected
        );
    }
}

#[test]
fn test_white_patch_equalizes_channel_peaks() {
    let image = Image::constant(16, 16, [0.8, 0.4, 0.6]);
    let mut config = PipelineConfig::default();
    config.white_balance.params.method = WbMethod::WhitePatch;
    config.white_balance.params.max_gain = 3.0;

    let output = WhiteBalanceStage
        .apply(&image, &config, &CancelToken::new())
        .unwrap();
    let px = output.pixel(8, 8);
    // Brightest channel (red) is the target; the others scale up to it.
    assert!((px[0] - 0.8).abs() < 1e-3);
    assert!((px[1] - 0.8).abs() < 1e-3);
    assert!((px[2] - 0.8).abs() < 1e-3);
}

#[test]
fn test_lake_method_tames_green_dominance() {
    let image = Image::constant(24, 24, [0.15, 0.7, 0.2]);
    let mut config = PipelineConfig::default();
    config.white_balance.params.method = WbMethod::LakeGreenWater;

    let output = WhiteBalanceStage
        .apply(&image, &config, &CancelToken::new())
        .unwrap();
    let means = crate::ops::channel_means(&output);
    let before_ratio = 0.7 / 0.15;
    let after_ratio = means[1] / means[0].max(1e-6);
    assert!(
        after_ratio < before_ratio * 0.6,
        "green/red only moved from {} to {}",
        before_ratio,
        after_ratio
    );
    // Red must not lose energy.
    assert!(means[0] >= 0.15 - 1e-3);
}

#[test]
fn test_grey_edge_runs_on_textured_image() {
    let image = reef_image(32, 32);
    let mut config = PipelineConfig::default();
    config.white_balance.params.method = WbMethod::GreyEdge;
    let output = WhiteBalanceStage
        .apply(&image, &config, &CancelToken::new())
        .unwrap();
    assert_eq!(output.num_pixels(), image.num_pixels());
}

// ============================================================
// UDCP
// ============================================================

#[test]
fn test_udcp_recovers_synthetic_haze() {
    // Ground truth with a white patch (for background light estimation) and
    // a consistently dark blue channel (for a meaningful dark channel). The
    // frame is larger than the guided filter window so the refinement stays
    // local.
    let (width, height) = (256u32, 256u32);
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            if x < 24 && y < 24 {
                data.extend_from_slice(&[1.0, 1.0, 1.0]);
            } else {
                let fx = x as f32 / width as f32;
                let fy = y as f32 / height as f32;
                data.push(0.1 + 0.7 * fx);
                data.push(0.2 + 0.4 * fy);
                data.push(0.05);
            }
        }
    }
    let truth = Image::from_data(width, height, data).unwrap();

    // Uniform synthetic haze: I = 0.7 * J + 0.3.
    let hazed_data: Vec<f32> = truth.data().iter().map(|&v| 0.7 * v + 0.3).collect();
    let hazed = Image::from_data(width, height, hazed_data).unwrap();

    let mut config = PipelineConfig::default();
    config.udcp.params.omega = 0.95;
    config.udcp.params.t0 = 0.1;
    config.udcp.params.post_contrast_gain = 1.0;

    let recovered = UdcpStage
        .apply(&hazed, &config, &CancelToken::new())
        .unwrap();

    let quality = psnr(&truth, &recovered);
    assert!(
        quality >= 22.0,
        "PSNR {} dB below the 22 dB recovery bar",
        quality
    );
}

#[test]
fn test_udcp_contrast_stretch_expands_spread() {
    let image = reef_image(32, 32);
    let mut low = PipelineConfig::default();
    low.udcp.params.post_contrast_gain = 1.0;
    let mut high = PipelineConfig::default();
    high.udcp.params.post_contrast_gain = 2.0;

    let cancel = CancelToken::new();
    let out_low = UdcpStage.apply(&image, &low, &cancel).unwrap();
    let out_high = UdcpStage.apply(&image, &high, &cancel).unwrap();
    assert!(out_low.mean_abs_diff(&out_high) > 1e-4);
}

// ============================================================
// Beer-Lambert
// ============================================================

#[test]
fn test_beer_lambert_boosts_red_most() {
    let image = Image::constant(16, 16, [0.2, 0.3, 0.4]);
    let config = PipelineConfig::default();
    let output = BeerLambertStage
        .apply(&image, &config, &CancelToken::new())
        .unwrap();
    let px = output.pixel(8, 8);
    let gains = [px[0] / 0.2, px[1] / 0.3, px[2] / 0.4];
    assert!(gains[0] > gains[1], "red gain {} <= green {}", gains[0], gains[1]);
    assert!(gains[1] > gains[2], "green gain {} <= blue {}", gains[1], gains[2]);
    assert!(gains[2] >= 1.0);
}

#[test]
fn test_beer_lambert_compensates_dark_regions_more() {
    // Two flat halves: a dark one and a bright one.
    let (width, height) = (32u32, 16u32);
    let mut data = Vec::new();
    for _y in 0..height {
        for x in 0..width {
            if x < 16 {
                data.extend_from_slice(&[0.1, 0.15, 0.2]);
            } else {
                data.extend_from_slice(&[0.5, 0.55, 0.6]);
            }
        }
    }
    let image = Image::from_data(width, height, data).unwrap();
    let output = BeerLambertStage
        .apply(&image, &PipelineConfig::default(), &CancelToken::new())
        .unwrap();

    let dark_gain = output.pixel(4, 8)[0] / 0.1;
    let bright_gain = output.pixel(24, 8)[0] / 0.5;
    assert!(
        dark_gain > bright_gain,
        "dark gain {} <= bright gain {}",
        dark_gain,
        bright_gain
    );
}

// ============================================================
// Color rebalance
// ============================================================

#[test]
fn test_identity_matrix_with_guard_off_is_identity() {
    let image = reef_image(24, 24);
    let mut config = PipelineConfig::default();
    config.color_rebalance.params.saturation_limit = 1.0;
    config.color_rebalance.params.preserve_luminance = false;

    let output = ColorRebalanceStage
        .apply(&image, &config, &CancelToken::new())
        .unwrap();
    assert!(image.mean_abs_diff(&output) < 1e-6);
}

#[test]
fn test_matrix_scales_channels() {
    let image = Image::constant(8, 8, [0.2, 0.4, 0.3]);
    let mut config = PipelineConfig::default();
    config.color_rebalance.params.matrix[0][0] = 1.5;
    config.color_rebalance.params.saturation_limit = 1.0;

    let output = ColorRebalanceStage
        .apply(&image, &config, &CancelToken::new())
        .unwrap();
    let px = output.pixel(4, 4);
    assert!((px[0] - 0.3).abs() < 1e-4);
    assert!((px[1] - 0.4).abs() < 1e-4);
}

#[test]
fn test_anti_magenta_guard_caps_saturation() {
    // Saturated magenta (hue 300) above the limit.
    let image = Image::constant(8, 8, [0.9, 0.1, 0.9]);
    let mut config = PipelineConfig::default();
    config.color_rebalance.params.saturation_limit = 0.5;

    let output = ColorRebalanceStage
        .apply(&image, &config, &CancelToken::new())
        .unwrap();
    let px = output.pixel(4, 4);
    let hsv = crate::color::rgb_to_hsv(px[0], px[1], px[2]);
    assert!(hsv.s <= 0.5 + 1e-3, "saturation {} beyond limit", hsv.s);
}

#[test]
fn test_non_magenta_hues_unaffected_by_guard() {
    // Saturated green is outside the magenta band.
    let image = Image::constant(8, 8, [0.1, 0.9, 0.1]);
    let mut config = PipelineConfig::default();
    config.color_rebalance.params.saturation_limit = 0.5;

    let output = ColorRebalanceStage
        .apply(&image, &config, &CancelToken::new())
        .unwrap();
    assert!(image.mean_abs_diff(&output) < 1e-6);
}

#[test]
fn test_preserve_luminance_holds_lightness() {
    let image = reef_image(16, 16);
    let mut config = PipelineConfig::default();
    config.color_rebalance.params.matrix[0][0] = 1.6;
    config.color_rebalance.params.preserve_luminance = true;
    config.color_rebalance.params.saturation_limit = 1.0;

    let output = ColorRebalanceStage
        .apply(&image, &config, &CancelToken::new())
        .unwrap();

    let l_in = crate::color::lightness_plane(&image);
    let l_out = crate::color::lightness_plane(&output);
    let mean_shift: f32 = l_in
        .iter()
        .zip(l_out.iter())
        .map(|(a, b)| (a - b).abs())
        .sum::<f32>()
        / l_in.len() as f32;
    assert!(mean_shift < 0.03, "lightness drifted by {}", mean_shift);
}

// ============================================================
// CLAHE and fusion
// ============================================================

#[test]
fn test_clahe_raises_contrast_of_flat_scene() {
    // Narrow tonal band around mid-gray; a high clip limit allows the
    // equalization to actually spread it.
    let mut data = Vec::new();
    for i in 0..128 * 128 {
        let v = 0.45 + 0.08 * ((i % 128) as f32 / 128.0);
        data.extend_from_slice(&[v, v, v]);
    }
    let image = Image::from_data(128, 128, data).unwrap();
    let mut config = PipelineConfig::default();
    config.clahe.params.clip_limit = 10.0;
    let output = ClaheStage
        .apply(&image, &config, &CancelToken::new())
        .unwrap();

    let spread = |img: &Image| {
        let luma = img.luminance();
        let p = crate::ops::percentiles(&luma, &[5.0, 95.0]);
        p[1] - p[0]
    };
    assert!(
        spread(&output) > spread(&image) * 1.5,
        "CLAHE did not expand contrast: {} vs {}",
        spread(&output),
        spread(&image)
    );
}

#[test]
fn test_fusion_output_close_to_input_on_flat_image() {
    // All three variants of a flat image are nearly identical; fusion must
    // not invent structure.
    let image = Image::constant(32, 32, [0.4, 0.5, 0.6]);
    let output = FusionStage
        .apply(&image, &PipelineConfig::default(), &CancelToken::new())
        .unwrap();
    assert!(
        image.mean_abs_diff(&output) < 0.02,
        "fusion drifted by {}",
        image.mean_abs_diff(&output)
    );
}

#[test]
fn test_fusion_sharpen_amount_changes_output() {
    let image = reef_image(32, 32);
    let cancel = CancelToken::new();
    let mut soft = PipelineConfig::default();
    soft.multiscale_fusion.params.sharpen_amount = 0.0;
    let mut sharp = PipelineConfig::default();
    sharp.multiscale_fusion.params.sharpen_amount = 1.0;

    let out_soft = FusionStage.apply(&image, &soft, &cancel).unwrap();
    let out_sharp = FusionStage.apply(&image, &sharp, &cancel).unwrap();
    assert!(out_soft.mean_abs_diff(&out_sharp) > 1e-5);
}

#[test]
fn test_fusion_cancellation_between_levels() {
    let image = reef_image(64, 64);
    let cancel = CancelToken::new();
    cancel.cancel();
    let result = FusionStage.apply(&image, &PipelineConfig::default(), &cancel);
    assert!(matches!(result, Err(crate::ProcessError::Cancelled)));
}
