use super::*;
use crate::image::Image;

/// Balanced test scene: a dark block (keeps the shadow fraction healthy)
/// next to a smooth neutral gradient.
fn balanced_scene() -> Image {
    let (width, height) = (64u32, 48u32);
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for _y in 0..height {
        for x in 0..width {
            if x < width / 4 {
                data.extend_from_slice(&[0.02, 0.03, 0.04]);
            } else {
                let t = (x - width / 4) as f32 / (width - width / 4) as f32;
                let v = 0.1 + 0.8 * t;
                data.extend_from_slice(&[v, v, v]);
            }
        }
    }
    Image::from_data(width, height, data).unwrap()
}

#[test]
fn test_identity_scores_high_with_clean_checks() {
    let image = balanced_scene();
    let report = analyze_quality(&image, &image, &crate::CancelToken::new()).unwrap();

    assert!(
        report.overall_score >= 9.0,
        "identity scored {}",
        report.overall_score
    );
    assert_eq!(report.checks.len(), 7);

    // Checks 1-6 find nothing to flag on an unmodified image.
    for check in &report.checks {
        if check.name != check_names::IMPROVEMENTS {
            assert!(
                check.recommendations.is_empty(),
                "check '{}' flagged the identity: {:?}",
                check.name,
                check.recommendations
            );
            assert!(
                check.score > 9.5,
                "check '{}' scored {}",
                check.name,
                check.score
            );
        }
    }

    // The improvements check reports zero deltas and a neutral score.
    let improvements = report.check(check_names::IMPROVEMENTS).unwrap();
    assert!((improvements.score - 5.0).abs() < 1e-3);
    for (key, value) in &improvements.details {
        assert!(value.abs() < 1e-5, "{} delta was {}", key, value);
    }
}

#[test]
fn test_mismatched_sizes_rejected() {
    let a = Image::constant(8, 8, [0.5; 3]);
    let b = Image::constant(9, 8, [0.5; 3]);
    let result = analyze_quality(&a, &b, &crate::CancelToken::new());
    assert!(matches!(result, Err(crate::ProcessError::InvalidInput(_))));
}

#[test]
fn test_neon_red_flagged_as_unrealistic() {
    let original = balanced_scene();
    // Paint a quarter of the frame neon red.
    let mut data = original.data().to_vec();
    for px in data.chunks_exact_mut(3).take(original.num_pixels() / 4) {
        px[0] = 0.99;
        px[1] = 0.05;
        px[2] = 0.05;
    }
    let processed = Image::from_data(original.width(), original.height(), data).unwrap();

    let report = analyze_quality(&original, &processed, &crate::CancelToken::new()).unwrap();
    let check = report.check(check_names::UNREALISTIC_COLORS).unwrap();
    assert!(check.score < 5.0, "neon red scored {}", check.score);
    assert!(check
        .recommendations
        .contains(&recommendations::REDUCE_RED_GAIN));
}

#[test]
fn test_saturation_clipping_flagged() {
    let original = balanced_scene();
    // Fully saturated red block covering half the frame.
    let mut data = original.data().to_vec();
    for px in data.chunks_exact_mut(3).take(original.num_pixels() / 2) {
        px[0] = 1.0;
        px[1] = 0.0;
        px[2] = 0.0;
    }
    let processed = Image::from_data(original.width(), original.height(), data).unwrap();

    let report = analyze_quality(&original, &processed, &crate::CancelToken::new()).unwrap();
    let check = report.check(check_names::SATURATION_CLIPPING).unwrap();
    assert!(check.score < 5.0);
    assert!(check
        .recommendations
        .contains(&recommendations::REDUCE_SATURATION));
    assert!(check.details["largest_region_fraction"] > 0.4);
}

#[test]
fn test_excessive_red_compensation_flagged() {
    // Original is blue-heavy; "processed" multiplies red far past it.
    let original = Image::constant(32, 32, [0.2, 0.3, 0.4]);
    let processed = Image::constant(32, 32, [0.75, 0.3, 0.4]);

    let report = analyze_quality(&original, &processed, &crate::CancelToken::new()).unwrap();
    let check = report.check(check_names::RED_CHANNEL_BALANCE).unwrap();
    assert!(check.score < 7.0);
    assert!(check
        .recommendations
        .contains(&recommendations::EXCESSIVE_RED_COMPENSATION));
}

#[test]
fn test_crushed_midtones_flagged() {
    let original = balanced_scene();
    // Push everything bright: almost no shadows remain.
    let data: Vec<f32> = original
        .data()
        .iter()
        .map(|&v| (0.5 + v * 0.5).min(1.0))
        .collect();
    let processed = Image::from_data(original.width(), original.height(), data).unwrap();

    let report = analyze_quality(&original, &processed, &crate::CancelToken::new()).unwrap();
    let check = report.check(check_names::MIDTONE_BALANCE).unwrap();
    assert!(check.details["shadow_fraction"] < 0.05);
    assert!(check
        .recommendations
        .contains(&recommendations::ADJUST_GAMMA_SHADOWS));
}

#[test]
fn test_improvements_reward_contrast_gain() {
    // Low-contrast original, stretched processed version.
    let mut data = Vec::new();
    for i in 0..48 * 48 {
        let v = 0.4 + 0.2 * ((i % 48) as f32 / 48.0);
        data.extend_from_slice(&[v, v, v]);
    }
    let original = Image::from_data(48, 48, data).unwrap();
    let stretched: Vec<f32> = original
        .data()
        .iter()
        .map(|&v| ((v - 0.5) * 3.0 + 0.5).clamp(0.0, 1.0))
        .collect();
    let processed = Image::from_data(48, 48, stretched).unwrap();

    let report = analyze_quality(&original, &processed, &crate::CancelToken::new()).unwrap();
    let check = report.check(check_names::IMPROVEMENTS).unwrap();
    assert!(
        check.score > 5.5,
        "contrast stretch scored only {}",
        check.score
    );
    assert!(check.details["contrast_delta"] > 0.1);
}

#[test]
fn test_cancellation_aborts_analysis() {
    let image = balanced_scene();
    let cancel = crate::CancelToken::new();
    cancel.cancel();
    let result = analyze_quality(&image, &image, &cancel);
    assert!(matches!(result, Err(crate::ProcessError::Cancelled)));
}

#[test]
fn test_overall_score_is_mean_of_checks() {
    let image = balanced_scene();
    let report = analyze_quality(&image, &image, &crate::CancelToken::new()).unwrap();
    let mean: f32 =
        report.checks.iter().map(|c| c.score).sum::<f32>() / report.checks.len() as f32;
    assert!((report.overall_score - mean).abs() < 1e-5);
}
