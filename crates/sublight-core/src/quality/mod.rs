//! Post-processing quality analysis.
//!
//! Runs a fixed battery of seven checks comparing the original and processed
//! images at preview resolution, scoring each in `[0, 10]` and producing
//! recommendations from a fixed catalog. Preview-resolution analysis is
//! mandatory: the metrics are ratio- and fraction-based and scale-robust,
//! and full-resolution analysis would stall interactive use.

mod checks;

#[cfg(test)]
mod tests;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{SystemTime, UNIX_EPOCH};

use log::warn;

use crate::cancel::CancelToken;
use crate::error::{ProcessError, Result};
use crate::image::Image;
use crate::models::{QualityCheck, QualityReport};

/// Recommendation keys, localization-agnostic.
pub mod recommendations {
    pub const REDUCE_RED_GAIN: &str = "qc_reduce_red_gain";
    pub const REDUCE_RED_COMPENSATION: &str = "qc_reduce_red_compensation";
    pub const REDUCE_BEER_LAMBERT_RED: &str = "qc_reduce_beer_lambert_red";
    pub const EXCESSIVE_RED_COMPENSATION: &str = "qc_excessive_red_compensation";
    pub const REDUCE_SATURATION: &str = "qc_reduce_saturation";
    pub const APPLY_NOISE_REDUCTION: &str = "qc_apply_noise_reduction";
    pub const REDUCE_CLAHE_CLIP_LIMIT: &str = "qc_reduce_clahe_clip_limit";
    pub const ADJUST_GAMMA_SHADOWS: &str = "qc_adjust_gamma_shadows";
    pub const REDUCE_CONTRAST_ENHANCEMENT: &str = "qc_reduce_contrast_enhancement";
    pub const INCREASE_CONTRAST: &str = "qc_increase_contrast";
    pub const ENHANCE_DETAIL_PRESERVATION: &str = "qc_enhance_detail_preservation";
    pub const CHECK_FAILED: &str = "qc_check_failed";
}

/// Check names in report order.
pub mod check_names {
    pub const UNREALISTIC_COLORS: &str = "unrealistic_colors";
    pub const RED_CHANNEL_BALANCE: &str = "red_channel_balance";
    pub const SATURATION_CLIPPING: &str = "saturation_clipping";
    pub const COLOR_NOISE: &str = "color_noise";
    pub const HALO_ARTIFACTS: &str = "halo_artifacts";
    pub const MIDTONE_BALANCE: &str = "midtone_balance";
    pub const IMPROVEMENTS: &str = "improvements";
}

/// Run all seven checks on an (original, processed) preview pair.
///
/// A check that fails internally contributes a neutral 5.0 score plus a
/// failure recommendation; it never aborts the report.
pub fn analyze_quality(
    original: &Image,
    processed: &Image,
    cancel: &CancelToken,
) -> Result<QualityReport> {
    if original.width() != processed.width() || original.height() != processed.height() {
        return Err(ProcessError::InvalidInput(format!(
            "original {}x{} and processed {}x{} differ in size",
            original.width(),
            original.height(),
            processed.width(),
            processed.height()
        )));
    }

    let context = checks::AnalysisContext::new(original, processed);

    type CheckFn = fn(&checks::AnalysisContext) -> QualityCheck;
    let battery: [(&'static str, CheckFn); 7] = [
        (check_names::UNREALISTIC_COLORS, checks::unrealistic_colors),
        (check_names::RED_CHANNEL_BALANCE, checks::red_channel_balance),
        (check_names::SATURATION_CLIPPING, checks::saturation_clipping),
        (check_names::COLOR_NOISE, checks::color_noise),
        (check_names::HALO_ARTIFACTS, checks::halo_artifacts),
        (check_names::MIDTONE_BALANCE, checks::midtone_balance),
        (check_names::IMPROVEMENTS, checks::improvements),
    ];

    let mut results = Vec::with_capacity(battery.len());
    for (name, check) in battery {
        cancel.check()?;
        let outcome = catch_unwind(AssertUnwindSafe(|| check(&context)));
        match outcome {
            Ok(result) => results.push(result),
            Err(_) => {
                warn!("quality check '{}' failed; scoring neutral", name);
                results.push(QualityCheck::failed(name));
            }
        }
    }

    let sum: f32 = results.iter().map(|c| c.score).sum();
    let overall_score = (sum / results.len() as f32).clamp(0.0, 10.0);

    Ok(QualityReport {
        checks: results,
        overall_score,
        generated_at_unix_secs: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0),
    })
}
