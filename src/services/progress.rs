//! Progress reporting service
//!
//! Separates progress reporting from the pipeline so the CLI and library
//! callers can each decide how (and whether) to show it.

use crate::types::ProcessingTimings;
use instant::Instant;

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Waiting on the background removal service
    BackgroundRemoval,
    /// Scaling color channels of the cutout
    BrightnessAdjustment,
    /// Building and blurring the drop shadow
    ShadowSynthesis,
    /// Computing the output canvas layout
    CanvasFitting,
    /// Rendering the background and placing the product
    Compositing,
    /// Pipeline finished
    Completed,
}

impl ProcessingStage {
    /// Human-readable description of the stage
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::BackgroundRemoval => "Removing background",
            Self::BrightnessAdjustment => "Adjusting brightness",
            Self::ShadowSynthesis => "Adding drop shadow",
            Self::CanvasFitting => "Fitting canvas",
            Self::Compositing => "Compositing background",
            Self::Completed => "Processing completed",
        }
    }

    /// Typical overall progress when this stage starts
    #[must_use]
    pub fn progress_percentage(&self) -> u8 {
        match self {
            Self::BackgroundRemoval => 5,
            Self::BrightnessAdjustment => 55,
            Self::ShadowSynthesis => 60,
            Self::CanvasFitting => 85,
            Self::Compositing => 90,
            Self::Completed => 100,
        }
    }
}

/// Progress update containing stage and timing information
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub stage: ProcessingStage,
    /// Progress percentage (0-100)
    pub progress: u8,
    pub description: String,
    /// Elapsed time since processing started (milliseconds)
    pub elapsed_ms: u64,
}

impl ProgressUpdate {
    #[must_use]
    pub fn new(stage: ProcessingStage, start_time: Instant) -> Self {
        Self {
            progress: stage.progress_percentage(),
            description: stage.description().to_string(),
            elapsed_ms: start_time.elapsed().as_millis() as u64,
            stage,
        }
    }
}

/// Receives progress from a pipeline run
pub trait ProgressReporter: Send + Sync {
    fn report_progress(&self, update: ProgressUpdate);

    /// Called once per successful composite
    fn report_completion(&self, timings: &ProcessingTimings);

    fn report_error(&self, stage: ProcessingStage, error: &str);
}

/// Discards everything
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report_progress(&self, _update: ProgressUpdate) {}

    fn report_completion(&self, _timings: &ProcessingTimings) {}

    fn report_error(&self, _stage: ProcessingStage, _error: &str) {}
}

/// Logs progress through `tracing`
pub struct ConsoleProgressReporter {
    verbose: bool,
}

impl ConsoleProgressReporter {
    /// # Arguments
    /// * `verbose` - Whether to include elapsed time and per-stage timings
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        if self.verbose {
            tracing::info!(
                stage = ?update.stage,
                elapsed_ms = update.elapsed_ms,
                "[{}%] {}",
                update.progress,
                update.description
            );
        } else {
            tracing::info!("[{}%] {}", update.progress, update.description);
        }
    }

    fn report_completion(&self, timings: &ProcessingTimings) {
        tracing::info!(total_ms = timings.total_ms, "Composite ready");

        if self.verbose {
            tracing::info!(
                background_removal_ms = timings.background_removal_ms,
                brightness_ms = timings.brightness_ms,
                shadow_ms = timings.shadow_ms,
                canvas_fit_ms = timings.canvas_fit_ms,
                compositing_ms = timings.compositing_ms,
                other_ms = timings.other_overhead_ms(),
                "Stage timings"
            );
        }
    }

    fn report_error(&self, stage: ProcessingStage, error: &str) {
        tracing::error!(stage = ?stage, "Error during {}: {}", stage.description(), error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingReporter {
        events: Arc<Mutex<Vec<String>>>,
    }

    impl ProgressReporter for RecordingReporter {
        fn report_progress(&self, update: ProgressUpdate) {
            self.events.lock().unwrap().push(format!("{:?}", update.stage));
        }

        fn report_completion(&self, timings: &ProcessingTimings) {
            self.events
                .lock()
                .unwrap()
                .push(format!("done {}", timings.total_ms));
        }

        fn report_error(&self, stage: ProcessingStage, error: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("error {:?} {}", stage, error));
        }
    }

    #[test]
    fn test_stage_progress_is_ascending() {
        let stages = [
            ProcessingStage::BackgroundRemoval,
            ProcessingStage::BrightnessAdjustment,
            ProcessingStage::ShadowSynthesis,
            ProcessingStage::CanvasFitting,
            ProcessingStage::Compositing,
            ProcessingStage::Completed,
        ];

        for pair in stages.windows(2) {
            assert!(pair[0].progress_percentage() < pair[1].progress_percentage());
        }
        assert!(stages.iter().all(|s| !s.description().is_empty()));
        assert_eq!(ProcessingStage::Completed.progress_percentage(), 100);
    }

    #[test]
    fn test_progress_update_uses_stage_defaults() {
        let update = ProgressUpdate::new(ProcessingStage::ShadowSynthesis, Instant::now());
        assert_eq!(update.progress, 60);
        assert_eq!(update.description, "Adding drop shadow");
        assert!(update.elapsed_ms < 1000);
    }

    #[test]
    fn test_reporters_receive_events() {
        let reporter = RecordingReporter::default();
        reporter.report_progress(ProgressUpdate::new(ProcessingStage::Compositing, Instant::now()));
        reporter.report_completion(&ProcessingTimings {
            total_ms: 12,
            ..ProcessingTimings::default()
        });
        reporter.report_error(ProcessingStage::BackgroundRemoval, "timed out");

        let events = reporter.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec!["Compositing", "done 12", "error BackgroundRemoval timed out"]
        );

        // Built-in reporters accept every call
        NoOpProgressReporter.report_error(ProcessingStage::Completed, "ignored");
        ConsoleProgressReporter::new(true).report_completion(&ProcessingTimings::default());
    }
}
