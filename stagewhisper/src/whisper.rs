use std::path::Path;

use tracing::{debug, info, warn};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::audio;
use crate::config::{Device, Model, Task};
use crate::engine::{DecodeParams, ModelHandle};
use crate::error::{Error, Result};
use crate::model::ensure_model;
use crate::types::{Segment, TranscriptionResult};

/// whisper.cpp timestamps are in centiseconds.
const TIMESTAMP_UNITS_PER_SEC: f64 = 100.0;

/// A whisper.cpp model loaded into memory.
pub struct WhisperModel {
    model: Model,
    ctx: WhisperContext,
}

impl WhisperModel {
    /// Fetch `model` into `cache_dir` if needed and load it.
    pub async fn load(
        model: Model,
        device: Device,
        gpu_device: u32,
        cache_dir: &Path,
    ) -> Result<Self> {
        let model_path = ensure_model(model, cache_dir).await?;
        Self::from_file(model, &model_path, device, gpu_device)
    }

    /// Load an already downloaded ggml file.
    pub fn from_file(model: Model, path: &Path, device: Device, gpu_device: u32) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::ModelNotFound {
                path: path.to_path_buf(),
            });
        }
        info!(%model, %device, path = %path.display(), "loading whisper model");

        let mut ctx_params = WhisperContextParameters::new();
        ctx_params.use_gpu(device == Device::Gpu);
        ctx_params.gpu_device(gpu_device as i32);

        let ctx = WhisperContext::new_with_params(
            path.to_str()
                .ok_or_else(|| Error::Model("model path contains invalid UTF-8".into()))?,
            ctx_params,
        )?;

        Ok(Self { model, ctx })
    }

    pub fn model(&self) -> Model {
        self.model
    }

    /// Run inference on 16 kHz mono samples.
    fn transcribe_samples(
        &self,
        samples: &[f32],
        params: &DecodeParams,
    ) -> Result<TranscriptionResult> {
        let mut state = self.ctx.create_state()?;

        let mut full = FullParams::new(sampling_strategy(params));

        full.set_language(Some(params.language.as_deref().unwrap_or("auto")));
        full.set_translate(params.task == Task::Translate);

        let fallback = FallbackSettings::from_params(params);
        full.set_temperature(fallback.temperature);
        full.set_temperature_inc(fallback.temperature_inc);
        full.set_entropy_thold(fallback.entropy_thold);
        full.set_logprob_thold(fallback.logprob_thold);
        full.set_no_speech_thold(fallback.no_speech_thold);

        if let Some(alpha) = params.length_penalty {
            full.set_length_penalty(alpha);
        }
        full.set_suppress_nst(params.suppress_tokens.non_speech);
        if !params.suppress_tokens.ids.is_empty() {
            warn!(
                ids = ?params.suppress_tokens.ids,
                "whisper.cpp cannot suppress individual token ids; ignoring them"
            );
        }
        if let Some(n) = params.n_threads {
            full.set_n_threads(n as i32);
        }
        // Weights are used at the precision stored in the ggml file.
        debug!(fp16 = params.fp16, model = %self.model, "precision request");

        full.set_print_progress(false);
        full.set_print_realtime(false);
        full.set_print_special(false);
        full.set_print_timestamps(false);

        info!(
            samples = samples.len(),
            temperatures = params.temperatures.len(),
            "running whisper"
        );
        state.full(full, samples)?;

        let num_segments = state.full_n_segments();
        debug!(num_segments, "inference complete");

        let mut segments = Vec::with_capacity(num_segments.max(0) as usize);
        for i in 0..num_segments {
            let segment = state
                .get_segment(i)
                .ok_or_else(|| Error::Transcription(format!("segment {i} not found")))?;

            let text = segment
                .to_str_lossy()
                .map_err(|e| Error::Transcription(format!("segment text error: {e}")))?
                .into_owned();
            let start = (segment.start_timestamp() as f64 / TIMESTAMP_UNITS_PER_SEC).max(0.0);
            let end = (segment.end_timestamp() as f64 / TIMESTAMP_UNITS_PER_SEC).max(start);

            if params.verbose {
                info!(
                    start = format!("{start:.3}"),
                    end = format!("{end:.3}"),
                    "{}",
                    text.trim()
                );
            }

            segments.push(Segment::new(segments.len(), start, end, text));
        }

        let language = match &params.language {
            Some(code) => Some(code.clone()),
            None => whisper_rs::get_lang_str(state.full_lang_id_from_state()).map(str::to_string),
        };

        Ok(TranscriptionResult::from_segments(segments, language))
    }
}

impl ModelHandle for WhisperModel {
    fn transcribe(&self, path: &Path, params: &DecodeParams) -> Result<TranscriptionResult> {
        let samples = audio::load_audio(path)?;
        self.transcribe_samples(&samples, params)
    }
}

/// Beam search when a beam width is set, best-of-N sampling otherwise.
fn sampling_strategy(params: &DecodeParams) -> SamplingStrategy {
    match params.beam_size {
        Some(beam_size) => SamplingStrategy::BeamSearch {
            beam_size: beam_size as i32,
            // whisper.cpp treats a negative patience as "unset".
            patience: if params.patience > 0.0 {
                params.patience
            } else {
                -1.0
            },
        },
        None => SamplingStrategy::Greedy {
            best_of: params.best_of as i32,
        },
    }
}

/// whisper.cpp's view of the temperature schedule and quality gates.
///
/// whisper.cpp regenerates the schedule from its start and step, stepping up
/// to 1.0 the same way [`crate::build_schedule`] does. Compression ratio maps
/// to its entropy threshold; disabled gates are set so they never trip.
#[derive(Debug, Clone, Copy, PartialEq)]
struct FallbackSettings {
    temperature: f32,
    temperature_inc: f32,
    entropy_thold: f32,
    logprob_thold: f32,
    no_speech_thold: f32,
}

impl FallbackSettings {
    fn from_params(params: &DecodeParams) -> Self {
        let temperature = params.temperatures.first().copied().unwrap_or(0.0);
        let temperature_inc = match params.temperatures.as_slice() {
            [a, b, ..] => b - a,
            _ => 0.0,
        };
        Self {
            temperature,
            temperature_inc,
            entropy_thold: params.compression_ratio_threshold.unwrap_or(0.0),
            logprob_thold: params.logprob_threshold.unwrap_or(f32::NEG_INFINITY),
            no_speech_thold: params.no_speech_threshold.unwrap_or(f32::INFINITY),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SuppressTokens;

    fn params() -> DecodeParams {
        DecodeParams {
            task: Task::Transcribe,
            language: None,
            temperatures: vec![0.0, 0.2, 0.4, 0.6, 0.8, 1.0],
            best_of: 5,
            beam_size: Some(5),
            patience: 0.0,
            length_penalty: None,
            suppress_tokens: SuppressTokens::default(),
            fp16: false,
            compression_ratio_threshold: Some(2.4),
            logprob_threshold: Some(-1.0),
            no_speech_threshold: Some(0.6),
            n_threads: None,
            verbose: false,
        }
    }

    #[test]
    fn test_fallback_from_schedule() {
        let f = FallbackSettings::from_params(&params());
        assert_eq!(f.temperature, 0.0);
        assert!((f.temperature_inc - 0.2).abs() < 1e-6);
        assert_eq!(f.entropy_thold, 2.4);
        assert_eq!(f.logprob_thold, -1.0);
        assert_eq!(f.no_speech_thold, 0.6);
    }

    #[test]
    fn test_single_rung_disables_fallback() {
        let p = DecodeParams {
            temperatures: vec![0.4],
            ..params()
        };
        let f = FallbackSettings::from_params(&p);
        assert_eq!(f.temperature, 0.4);
        assert_eq!(f.temperature_inc, 0.0);
    }

    #[test]
    fn test_disabled_thresholds_never_trip() {
        let p = DecodeParams {
            compression_ratio_threshold: None,
            logprob_threshold: None,
            no_speech_threshold: None,
            ..params()
        };
        let f = FallbackSettings::from_params(&p);
        assert_eq!(f.entropy_thold, 0.0);
        assert_eq!(f.logprob_thold, f32::NEG_INFINITY);
        assert_eq!(f.no_speech_thold, f32::INFINITY);
    }

    #[test]
    fn test_sampling_strategy() {
        match sampling_strategy(&params()) {
            SamplingStrategy::BeamSearch { beam_size, patience } => {
                assert_eq!(beam_size, 5);
                assert_eq!(patience, -1.0);
            }
            _ => panic!("expected beam search"),
        }

        let p = DecodeParams {
            patience: 1.5,
            ..params()
        };
        match sampling_strategy(&p) {
            SamplingStrategy::BeamSearch { patience, .. } => assert_eq!(patience, 1.5),
            _ => panic!("expected beam search"),
        }

        let p = DecodeParams {
            beam_size: None,
            best_of: 3,
            ..params()
        };
        match sampling_strategy(&p) {
            SamplingStrategy::Greedy { best_of } => assert_eq!(best_of, 3),
            _ => panic!("expected greedy"),
        }
    }

    #[test]
    fn test_from_file_missing_model() {
        let result = WhisperModel::from_file(
            Model::Tiny,
            Path::new("/nonexistent/ggml-tiny.bin"),
            Device::Cpu,
            0,
        );
        assert!(matches!(result, Err(Error::ModelNotFound { .. })));
    }
}
