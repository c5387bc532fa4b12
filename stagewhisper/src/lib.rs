//! Batch speech-to-subtitle pipeline: audio files in, WebVTT out.
//!
//! **stagewhisper** validates decoding options, plans the temperature fallback
//! schedule, runs whisper.cpp over each input file and writes the segments as
//! WebVTT (optionally plain text, SRT and JSON). A file that fails to
//! transcribe is reported and the batch carries on.
//!
//! # Quick start
//!
//! ```rust,no_run
//! # #[tokio::main]
//! # async fn main() -> stagewhisper::Result<()> {
//! use stagewhisper::TranscribeOptions;
//!
//! let options = TranscribeOptions::new().model("base.en").output_dir("subs");
//! let run = stagewhisper::transcribe_files(&["interview.mp3".into()], &options).await?;
//! for outcome in &run.outcomes {
//!     println!("{}: {}", outcome.input().display(), outcome.is_success());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The pieces are public too: [`normalize`], [`build_schedule`],
//! [`WhisperModel::load`] and [`batch::run`], with [`ModelHandle`] as the seam
//! for other engines.

pub(crate) mod audio;
pub mod batch;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod model;
pub mod schedule;
pub mod subtitle;
pub mod types;
pub mod whisper;

pub use batch::BatchOutcome;
pub use config::{
    normalize, CanonicalConfig, Device, Language, Model, Normalized, OutputFormats,
    SuppressTokens, Task, TranscribeOptions, Warning,
};
pub use engine::{DecodeParams, ModelHandle};
pub use error::{Error, Result};
pub use schedule::{build_schedule, TemperatureSchedule};
pub use types::{Segment, TranscriptionResult};
pub use whisper::WhisperModel;

use std::path::PathBuf;

/// Result of a whole batch.
#[derive(Debug)]
pub struct BatchRun {
    /// Adjustments made to the options (already logged).
    pub warnings: Vec<Warning>,
    /// One entry per input, in input order.
    pub outcomes: Vec<BatchOutcome>,
}

/// Transcribe every file in `inputs` with one model load.
///
/// Errors only for setup problems: invalid options, an output directory that
/// cannot be created, or a model that cannot be fetched or loaded. Per-file
/// failures are reported in [`BatchRun::outcomes`].
pub async fn transcribe_files(
    inputs: &[PathBuf],
    options: &TranscribeOptions,
) -> Result<BatchRun> {
    let Normalized { config, warnings } = normalize(options)?;
    let schedule = config.schedule()?;

    let model =
        WhisperModel::load(config.model, config.device, config.gpu_device, &config.cache_dir)
            .await?;

    let outcomes = batch::run(&model, inputs, &config, &schedule);
    Ok(BatchRun { warnings, outcomes })
}
