//! Auto-tune orchestrator.
//!
//! Computes the shared scene signature once per source image, classifies the
//! water type, and drives each flagged stage's tuner from the signature.
//! Tuning happens only on explicit calls (image load, flag flip, user
//! request); `process` never mutates parameters.

mod signature;


pub use signature::compute_signature;

use log::warn;

use crate::config::{PipelineConfig, StageId};
use crate::models::{SceneSignature, WaterTypeTag};
use crate::stages::stage_for;

/// Classify the water body from the scene signature. Deterministic; rules
/// are evaluated in priority order.
pub fn classify_water(signature: &SceneSignature) -> WaterTypeTag {
    if signature.g_ratio() > 0.4 {
        WaterTypeTag::Lake
    } else if signature.b_ratio() < 0.25 {
        WaterTypeTag::OceanDeep
    } else if signature.r_ratio() < 0.2 {
        WaterTypeTag::Tropical
    } else if signature.sobel_mean > 0.1 && signature.hist_spread > 0.5 {
        WaterTypeTag::ClearHighContrast
    } else {
        WaterTypeTag::Standard
    }
}

/// Run the tuner of every stage whose auto-tune flag is set.
///
/// A failing tuner logs a warning and leaves the stage's previous parameters
/// in place; it never aborts the others.
pub fn tune(config: &mut PipelineConfig, signature: &SceneSignature) {
    for stage in StageId::ALL {
        if config.is_auto_tune(stage) {
            tune_stage(config, signature, stage);
        }
    }
}

/// Run a single stage's tuner, restoring previous parameters on failure.
pub fn tune_stage(config: &mut PipelineConfig, signature: &SceneSignature, stage: StageId) {
    let previous = config.clone();
    if let Err(err) = stage_for(stage).auto_tune(signature, config) {
        warn!(
            "auto-tune for stage {} failed, keeping previous parameters: {}",
            stage, err
        );
        *config = previous;
    }
    config.clamp_all();
}

/// Toggle the auto-tune flag on every stage in one call.
pub fn global_auto_tune(config: &mut PipelineConfig, enabled: bool) {
    for stage in StageId::ALL {
        config.set_auto_tune(stage, enabled);
    }
}
