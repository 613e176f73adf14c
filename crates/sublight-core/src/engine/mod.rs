//! Pipeline engine: fixed-order stage execution with progress reporting.


use log::warn;

use crate::cancel::CancelToken;
use crate::config::{PipelineConfig, StageId};
use crate::error::Result;
use crate::image::Image;
use crate::progress::{keys, ProgressFn, ProgressReporter, STAGE_BAND, VIDEO_BAND};
use crate::stages::stage_for;

/// Outcome metadata of one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Stages that failed and were passed through unchanged.
    pub degraded: Vec<StageId>,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.degraded.is_empty()
    }
}

/// Run the enabled stages in fixed order on a still image.
///
/// Stage progress is distributed linearly over the enabled stages within the
/// 10-85 band; `finalize` closes the run at 100. A failing stage is logged,
/// marked degraded in the report, and skipped (pass-through); the pipeline
/// never aborts on a stage failure. Cancellation aborts between stages.
pub fn process(
    image: &Image,
    config: &PipelineConfig,
    cancel: &CancelToken,
    progress: Option<&ProgressFn>,
) -> Result<(Image, RunReport)> {
    // Copy-on-read snapshot: parameter writes during the run affect the next
    // run, never this one.
    let config = config.clone();

    let mut reporter = ProgressReporter::new(progress);
    reporter.emit_absolute(keys::INIT, 10.0);
    reporter.set_band(STAGE_BAND.0, STAGE_BAND.1);

    let (result, report) = run_stages(image, &config, cancel, &mut reporter, None)?;

    reporter.emit_absolute(keys::FINALIZE, 100.0);
    Ok((result, report))
}

/// Run the enabled stages on one video frame.
///
/// Identical semantics to [`process`], but stage progress maps into this
/// frame's sub-band of the 10-90 video band and messages carry the
/// `frame i/N: <stage_key>` form. Init/finalize framing belongs to the
/// video driver.
pub fn process_frame(
    image: &Image,
    config: &PipelineConfig,
    frame_index: usize,
    frame_count: usize,
    cancel: &CancelToken,
    progress: Option<&ProgressFn>,
) -> Result<(Image, RunReport)> {
    let config = config.clone();
    let frame_count = frame_count.max(1);

    let mut reporter = ProgressReporter::new(progress);
    let span = VIDEO_BAND.1 - VIDEO_BAND.0;
    let lo = VIDEO_BAND.0 + span * frame_index as f32 / frame_count as f32;
    let hi = VIDEO_BAND.0 + span * (frame_index + 1) as f32 / frame_count as f32;
    reporter.set_band(lo, hi);

    run_stages(
        image,
        &config,
        cancel,
        &mut reporter,
        Some((frame_index, frame_count)),
    )
}

fn run_stages(
    image: &Image,
    config: &PipelineConfig,
    cancel: &CancelToken,
    reporter: &mut ProgressReporter<'_>,
    frame: Option<(usize, usize)>,
) -> Result<(Image, RunReport)> {
    let enabled: Vec<StageId> = StageId::ALL
        .into_iter()
        .filter(|&id| config.is_enabled(id))
        .collect();

    let mut current = image.clone();
    let mut report = RunReport::default();
    let count = enabled.len().max(1);

    for (index, id) in enabled.iter().copied().enumerate() {
        cancel.check()?;

        let key = id.progress_key();
        match frame {
            Some((frame_index, frame_count)) => {
                let message = format!("frame {}/{}: {}", frame_index + 1, frame_count, key);
                reporter.emit(&message, index as f32 / count as f32);
            }
            None => reporter.emit(key, index as f32 / count as f32),
        }

        match stage_for(id).apply(&current, config, cancel) {
            Ok(next) => {
                debug_assert_eq!(next.width(), current.width());
                debug_assert_eq!(next.height(), current.height());
                current = next;
            }
            Err(err) if err.is_cancelled() => return Err(err),
            Err(err) => {
                warn!("stage {} failed, passing through unchanged: {}", id, err);
                report.degraded.push(id);
            }
        }
    }

    Ok((current, report))
}
