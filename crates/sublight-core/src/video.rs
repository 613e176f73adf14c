//! Video driver: per-frame pipeline application over decoded frame streams.
//!
//! Container I/O lives outside the core; the driver only sees a decoder that
//! yields RGB frames and an encoder that accepts processed frames. Each
//! output frame is a pure function of its input frame and the configuration
//! frozen at the start of the run.

use crate::cancel::CancelToken;
use crate::config::PipelineConfig;
use crate::engine;
use crate::error::{ProcessError, Result};
use crate::image::Image;
use crate::progress::{keys, ProgressFn, ProgressReporter};

/// Decoded-frame supplier. Implementations wrap the host's video decoder.
pub trait FrameSource {
    /// Total number of frames this source will yield.
    fn frame_count(&self) -> usize;

    /// Next decoded RGB frame, or `None` when the stream ends.
    fn next_frame(&mut self) -> Result<Option<Image>>;
}

/// Processed-frame consumer. Implementations wrap the host's video encoder.
pub trait FrameSink {
    fn write_frame(&mut self, frame: Image) -> Result<()>;
}

/// Summary of a video run.
#[derive(Debug, Clone, Default)]
pub struct VideoReport {
    pub frames_processed: usize,
    /// Frame indices that completed with degraded stages.
    pub degraded_frames: Vec<usize>,
}

/// Process every frame from `source` through the pipeline into `sink`.
///
/// The configuration is snapshotted once: parameter writes during the run do
/// not affect any frame of this run. Progress divides the 10-90 band equally
/// across frames, with stage progress mapped into each frame's sub-band.
pub fn process_video(
    source: &mut dyn FrameSource,
    sink: &mut dyn FrameSink,
    config: &PipelineConfig,
    cancel: &CancelToken,
    progress: Option<&ProgressFn>,
) -> Result<VideoReport> {
    let config = config.clone();
    let frame_count = source.frame_count();

    let mut reporter = ProgressReporter::new(progress);
    reporter.emit_absolute(keys::INIT, 10.0);

    let mut report = VideoReport::default();
    let mut index = 0usize;
    while let Some(frame) = source.next_frame()? {
        cancel.check()?;
        if index >= frame_count {
            return Err(ProcessError::InvalidInput(format!(
                "source yielded more than the announced {} frames",
                frame_count
            )));
        }

        let (processed, frame_report) =
            engine::process_frame(&frame, &config, index, frame_count, cancel, progress)?;
        if !frame_report.is_clean() {
            report.degraded_frames.push(index);
        }
        sink.write_frame(processed)?;
        report.frames_processed += 1;
        index += 1;
    }

    reporter.emit_absolute(keys::FINALIZE, 100.0);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StageId;
    use std::sync::{Arc, Mutex};

    struct VecSource {
        frames: Vec<Image>,
        cursor: usize,
    }

    impl FrameSource for VecSource {
        fn frame_count(&self) -> usize {
            self.frames.len()
        }

        fn next_frame(&mut self) -> Result<Option<Image>> {
            let frame = self.frames.get(self.cursor).cloned();
            self.cursor += 1;
            Ok(frame)
        }
    }

    #[derive(Default)]
    struct VecSink {
        frames: Vec<Image>,
    }

    impl FrameSink for VecSink {
        fn write_frame(&mut self, frame: Image) -> Result<()> {
            self.frames.push(frame);
            Ok(())
        }
    }

    fn frames(count: usize) -> Vec<Image> {
        (0..count)
            .map(|i| Image::constant(16, 16, [0.1 + 0.1 * i as f32, 0.5, 0.4]))
            .collect()
    }

    /// White-balance-only config keeps the per-frame work cheap.
    fn wb_only_config() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        for stage in StageId::ALL {
            config.set_enabled(stage, stage == StageId::WhiteBalance);
        }
        config
    }

    #[test]
    fn test_all_frames_processed_in_order() {
        let mut source = VecSource {
            frames: frames(4),
            cursor: 0,
        };
        let mut sink = VecSink::default();
        let report = process_video(
            &mut source,
            &mut sink,
            &wb_only_config(),
            &CancelToken::new(),
            None,
        )
        .unwrap();
        assert_eq!(report.frames_processed, 4);
        assert_eq!(sink.frames.len(), 4);
        assert!(report.degraded_frames.is_empty());
    }

    #[test]
    fn test_frame_independence() {
        // Processing a frame alone must equal processing it inside a run.
        let config = wb_only_config();
        let cancel = CancelToken::new();
        let all = frames(3);

        let mut source = VecSource {
            frames: all.clone(),
            cursor: 0,
        };
        let mut sink = VecSink::default();
        process_video(&mut source, &mut sink, &config, &cancel, None).unwrap();

        let (alone, _) = engine::process(&all[1], &config, &cancel, None).unwrap();
        assert_eq!(sink.frames[1], alone);
    }

    #[test]
    fn test_video_progress_monotonic_and_labeled() {
        let events: Arc<Mutex<Vec<(String, u8)>>> = Arc::new(Mutex::new(Vec::new()));
        let events_cb = events.clone();
        let cb = move |key: &str, pct: u8| events_cb.lock().unwrap().push((key.to_string(), pct));

        let mut source = VecSource {
            frames: frames(3),
            cursor: 0,
        };
        let mut sink = VecSink::default();
        process_video(
            &mut source,
            &mut sink,
            &wb_only_config(),
            &CancelToken::new(),
            Some(&cb),
        )
        .unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events.first().unwrap(), &(keys::INIT.to_string(), 10));
        assert_eq!(events.last().unwrap().1, 100);
        assert!(events.windows(2).all(|w| w[0].1 <= w[1].1));
        assert!(events
            .iter()
            .any(|(key, _)| key == "frame 2/3: stage.white_balance"));
    }

    #[test]
    fn test_cancellation_stops_mid_run() {
        let cancel = CancelToken::new();
        let mut source = VecSource {
            frames: frames(2),
            cursor: 0,
        };
        let mut sink = VecSink::default();
        cancel.cancel();
        let result = process_video(
            &mut source,
            &mut sink,
            &wb_only_config(),
            &cancel,
            None,
        );
        assert!(matches!(result, Err(ProcessError::Cancelled)));
        assert!(sink.frames.is_empty());
    }
}
