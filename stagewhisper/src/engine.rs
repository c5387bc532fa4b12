use std::path::Path;

use crate::config::{SuppressTokens, Task};
use crate::error::Result;
use crate::types::TranscriptionResult;

/// Decoding parameters in the shape a speech engine consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeParams {
    pub task: Task,
    /// `None` asks the engine to detect the language.
    pub language: Option<String>,
    /// Fallback temperatures, tried in order until the output passes the
    /// thresholds below. Never empty.
    pub temperatures: Vec<f32>,
    pub best_of: u32,
    /// `None` decodes greedily.
    pub beam_size: Option<u32>,
    pub patience: f32,
    pub length_penalty: Option<f32>,
    pub suppress_tokens: SuppressTokens,
    pub fp16: bool,
    pub compression_ratio_threshold: Option<f32>,
    pub logprob_threshold: Option<f32>,
    pub no_speech_threshold: Option<f32>,
    pub n_threads: Option<u32>,
    /// Log every segment as soon as it is decoded.
    pub verbose: bool,
}

/// A loaded speech recognition model.
///
/// `transcribe` is a single blocking call: the engine owns audio decoding,
/// language detection and the temperature fallback loop.
pub trait ModelHandle {
    fn transcribe(&self, path: &Path, params: &DecodeParams) -> Result<TranscriptionResult>;
}
