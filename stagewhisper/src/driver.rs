use std::path::Path;
use std::time::Instant;

use tracing::{debug, info};

use crate::config::CanonicalConfig;
use crate::engine::{DecodeParams, ModelHandle};
use crate::error::{Error, Result};
use crate::schedule::TemperatureSchedule;
use crate::types::TranscriptionResult;

/// Map validated options onto the engine's parameter shape.
pub fn decode_params(config: &CanonicalConfig, schedule: &TemperatureSchedule) -> DecodeParams {
    DecodeParams {
        task: config.task,
        language: config.language.code().map(str::to_string),
        temperatures: schedule.as_slice().to_vec(),
        best_of: config.best_of,
        beam_size: config.beam_size,
        patience: config.patience,
        length_penalty: config.length_penalty,
        suppress_tokens: config.suppress_tokens.clone(),
        fp16: config.fp16,
        compression_ratio_threshold: config.compression_ratio_threshold,
        logprob_threshold: config.logprob_threshold,
        no_speech_threshold: config.no_speech_threshold,
        n_threads: config.n_threads,
        verbose: config.verbose,
    }
}

/// Transcribe one file.
///
/// Any failure comes back as [`Error::Engine`] carrying the file path.
/// Nothing is retried here; the engine walks the temperature schedule itself.
pub fn transcribe<H: ModelHandle + ?Sized>(
    handle: &H,
    config: &CanonicalConfig,
    schedule: &TemperatureSchedule,
    path: &Path,
) -> Result<TranscriptionResult> {
    let params = decode_params(config, schedule);
    debug!(
        path = %path.display(),
        temperatures = ?params.temperatures,
        language = params.language.as_deref().unwrap_or("auto"),
        "transcribing"
    );

    let started = Instant::now();
    let result = handle
        .transcribe(path, &params)
        .map_err(|source| Error::Engine {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;

    info!(
        path = %path.display(),
        segments = result.segments.len(),
        language = result.language.as_deref().unwrap_or("unknown"),
        elapsed_secs = format!("{:.1}", started.elapsed().as_secs_f64()),
        "transcription finished"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::path::PathBuf;

    use super::*;
    use crate::config::{normalize, Task, TranscribeOptions};
    use crate::types::Segment;

    /// Records every call and answers with a canned result.
    struct Recorder {
        calls: RefCell<Vec<(PathBuf, DecodeParams)>>,
        fail: bool,
    }

    impl ModelHandle for Recorder {
        fn transcribe(&self, path: &Path, params: &DecodeParams) -> Result<TranscriptionResult> {
            self.calls
                .borrow_mut()
                .push((path.to_path_buf(), params.clone()));
            if self.fail {
                return Err(Error::AudioNotFound {
                    path: path.to_path_buf(),
                });
            }
            Ok(TranscriptionResult::from_segments(
                vec![Segment::new(0, 0.0, 1.0, "hello")],
                Some("en".into()),
            ))
        }
    }

    fn config(opts: TranscribeOptions) -> (CanonicalConfig, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = normalize(&opts.output_dir(dir.path()).device("gpu"))
            .unwrap()
            .config;
        (config, dir)
    }

    #[test]
    fn test_decode_params_mapping() {
        let (config, _dir) = config(
            TranscribeOptions::new()
                .task("translate")
                .language("ja")
                .beam_size(None)
                .best_of(3)
                .length_penalty(Some(0.6))
                .n_threads(4)
                .verbose(true),
        );
        let schedule = config.schedule().unwrap();
        let params = decode_params(&config, &schedule);

        assert_eq!(params.task, Task::Translate);
        assert_eq!(params.language.as_deref(), Some("ja"));
        assert_eq!(params.temperatures, schedule.as_slice());
        assert_eq!(params.best_of, 3);
        assert_eq!(params.beam_size, None);
        assert_eq!(params.length_penalty, Some(0.6));
        assert_eq!(params.compression_ratio_threshold, Some(2.4));
        assert_eq!(params.logprob_threshold, Some(-1.0));
        assert_eq!(params.no_speech_threshold, Some(0.6));
        assert_eq!(params.n_threads, Some(4));
        assert!(params.verbose);
    }

    #[test]
    fn test_auto_language_maps_to_none() {
        let (config, _dir) = config(TranscribeOptions::new());
        let params = decode_params(&config, &config.schedule().unwrap());
        assert_eq!(params.language, None);
    }

    #[test]
    fn test_single_call_with_full_schedule() {
        let (config, _dir) = config(TranscribeOptions::new());
        let schedule = config.schedule().unwrap();
        let engine = Recorder {
            calls: RefCell::new(Vec::new()),
            fail: false,
        };

        let result = transcribe(&engine, &config, &schedule, Path::new("a.wav")).unwrap();
        assert_eq!(result.text, "hello");

        let calls = engine.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, PathBuf::from("a.wav"));
        assert_eq!(calls[0].1.temperatures.len(), 6);
    }

    #[test]
    fn test_failure_is_wrapped_and_not_retried() {
        let (config, _dir) = config(TranscribeOptions::new());
        let schedule = config.schedule().unwrap();
        let engine = Recorder {
            calls: RefCell::new(Vec::new()),
            fail: true,
        };

        let e = transcribe(&engine, &config, &schedule, Path::new("gone.wav")).unwrap_err();
        match e {
            Error::Engine { path, source } => {
                assert_eq!(path, PathBuf::from("gone.wav"));
                assert!(matches!(*source, Error::AudioNotFound { .. }));
            }
            other => panic!("expected engine error, got {other:?}"),
        }
        assert_eq!(engine.calls.borrow().len(), 1);
    }
}
