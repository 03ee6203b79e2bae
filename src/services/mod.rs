//! Service layer for frontends
//!
//! Concerns that sit beside the pipeline rather than inside it, shared by the
//! library API and the CLI.

pub mod progress;

pub use progress::{
    ConsoleProgressReporter, NoOpProgressReporter, ProcessingStage, ProgressReporter,
    ProgressUpdate,
};
