use std::fmt;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::schedule::{self, TemperatureSchedule};

/// A validated language for whisper transcription.
///
/// Wraps a language code that has been verified against whisper.cpp's
/// supported language list. Accepts both short codes ("en", "de")
/// and full names ("english", "German").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Language {
    /// Auto-detect language from audio.
    Auto,
    /// A validated language code (e.g. "en", "de", "ja").
    Code {
        /// Short code as whisper expects it.
        code: String,
        /// Whisper internal language ID.
        id: i32,
    },
}

impl Language {
    /// Create a language from a code or full name, validating against whisper.cpp.
    ///
    /// "auto" and "none" (any case) select auto-detection.
    pub fn new(lang: &str) -> Result<Self> {
        let lower = lang.trim().to_lowercase();
        if lower == "auto" || lower == "none" {
            return Ok(Language::Auto);
        }

        match whisper_rs::get_lang_id(&lower) {
            Some(id) => {
                let code = whisper_rs::get_lang_str(id)
                    .unwrap_or(&lower)
                    .to_string();
                Ok(Language::Code { code, id })
            }
            None => Err(Error::validation(
                "language",
                format!("unsupported language \"{lang}\" (see --list-languages)"),
            )),
        }
    }

    /// English, the only language English-only models can produce.
    pub fn english() -> Self {
        Language::Code {
            code: "en".into(),
            id: 0,
        }
    }

    /// Get the short language code (e.g. "en"), or None for Auto.
    pub fn code(&self) -> Option<&str> {
        match self {
            Language::Auto => None,
            Language::Code { code, .. } => Some(code),
        }
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, Language::Auto)
    }

    pub fn is_english(&self) -> bool {
        self.code() == Some("en")
    }

    /// List all supported languages as (code, full_name) pairs.
    pub fn supported() -> Vec<(&'static str, &'static str)> {
        let max = whisper_rs::get_lang_max_id();
        (0..=max)
            .filter_map(|id| {
                let code = whisper_rs::get_lang_str(id)?;
                let name = whisper_rs::get_lang_str_full(id)?;
                Some((code, name))
            })
            .collect()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Auto => write!(f, "auto"),
            Language::Code { code, .. } => write!(f, "{code}"),
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::Auto
    }
}

/// Whisper model sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Model {
    Tiny,
    TinyEn,
    Base,
    BaseEn,
    Small,
    SmallEn,
    Medium,
    MediumEn,
    LargeV1,
    LargeV2,
    LargeV3,
    LargeV3Turbo,
}

impl Model {
    pub const ALL: [Model; 12] = [
        Model::Tiny,
        Model::TinyEn,
        Model::Base,
        Model::BaseEn,
        Model::Small,
        Model::SmallEn,
        Model::Medium,
        Model::MediumEn,
        Model::LargeV1,
        Model::LargeV2,
        Model::LargeV3,
        Model::LargeV3Turbo,
    ];

    /// Model filename as used by HuggingFace / whisper.cpp.
    pub fn filename(&self) -> String {
        format!("ggml-{}.bin", self.name())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Model::Tiny => "tiny",
            Model::TinyEn => "tiny.en",
            Model::Base => "base",
            Model::BaseEn => "base.en",
            Model::Small => "small",
            Model::SmallEn => "small.en",
            Model::Medium => "medium",
            Model::MediumEn => "medium.en",
            Model::LargeV1 => "large-v1",
            Model::LargeV2 => "large-v2",
            Model::LargeV3 => "large-v3",
            Model::LargeV3Turbo => "large-v3-turbo",
        }
    }

    /// Approximate download size, for listings.
    pub fn approx_size(&self) -> &'static str {
        match self {
            Model::Tiny | Model::TinyEn => "75 MB",
            Model::Base | Model::BaseEn => "142 MB",
            Model::Small | Model::SmallEn => "466 MB",
            Model::Medium | Model::MediumEn => "1.5 GB",
            Model::LargeV1 | Model::LargeV2 | Model::LargeV3 => "2.9 GB",
            Model::LargeV3Turbo => "1.6 GB",
        }
    }

    /// Parse from string (e.g. CLI argument). "large" and "turbo" are aliases
    /// for the newest large checkpoints.
    pub fn parse_name(s: &str) -> Option<Self> {
        match s {
            "large" => return Some(Model::LargeV3),
            "turbo" => return Some(Model::LargeV3Turbo),
            _ => {}
        }
        Model::ALL.into_iter().find(|m| m.name() == s)
    }

    /// Models whose name ends in `.en` only ever produce English.
    pub fn is_english_only(&self) -> bool {
        self.name().ends_with(".en")
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where inference runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Gpu,
}

impl Device {
    /// "cpu", "gpu" or "cuda", case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "cpu" => Some(Device::Cpu),
            "gpu" | "cuda" => Some(Device::Gpu),
            _ => None,
        }
    }

    /// GPU when whisper.cpp was built with an accelerator backend.
    pub fn detect() -> Self {
        if cfg!(any(feature = "cuda", feature = "vulkan", feature = "metal")) {
            Device::Gpu
        } else {
            Device::Cpu
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Gpu => write!(f, "gpu"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// X -> X speech recognition.
    Transcribe,
    /// X -> English translation.
    Translate,
}

impl Task {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "transcribe" => Some(Task::Transcribe),
            "translate" => Some(Task::Translate),
            _ => None,
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Transcribe => write!(f, "transcribe"),
            Task::Translate => write!(f, "translate"),
        }
    }
}

/// Tokens the decoder must never emit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuppressTokens {
    /// `-1`: suppress most special characters except common punctuation.
    pub non_speech: bool,
    /// Explicit token ids.
    pub ids: Vec<i32>,
}

impl SuppressTokens {
    /// Parse a comma-separated list of token ids. An empty string suppresses nothing.
    pub fn parse(s: &str) -> Result<Self> {
        let mut tokens = SuppressTokens::default();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let id: i32 = part.parse().map_err(|_| {
                Error::validation(
                    "suppress_tokens",
                    format!("\"{part}\" is not a token id"),
                )
            })?;
            match id {
                -1 => tokens.non_speech = true,
                id if id >= 0 => tokens.ids.push(id),
                id => {
                    return Err(Error::validation(
                        "suppress_tokens",
                        format!("{id} is not a token id (only -1 may be negative)"),
                    ))
                }
            }
        }
        Ok(tokens)
    }
}

/// Extra files written next to the always-on `.vtt`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputFormats {
    pub txt: bool,
    pub srt: bool,
    pub json: bool,
}

/// Non-fatal adjustments made while normalizing options.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    EnglishOnlyModel { model: Model, requested: String },
    Fp16OnCpu,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::EnglishOnlyModel { model, requested } => write!(
                f,
                "{model} is an English-only model but '{requested}' was selected; using English instead"
            ),
            Warning::Fp16OnCpu => write!(f, "FP16 is not supported on CPU; using FP32 instead"),
        }
    }
}

/// User-supplied options, as typed on the command line.
///
/// Nothing here is validated until [`normalize`] turns it into a
/// [`CanonicalConfig`].
#[derive(Debug, Clone)]
pub struct TranscribeOptions {
    pub model: String,
    /// `None` picks the best available device.
    pub device: Option<String>,
    pub gpu_device: u32,
    pub output_dir: PathBuf,
    pub task: String,
    /// `None` (or "auto") performs language detection.
    pub language: Option<String>,
    pub verbose: bool,
    pub temperature: f32,
    /// `None` disables temperature fallback.
    pub temperature_increment_on_fallback: Option<f32>,
    pub best_of: u32,
    /// `None` decodes greedily.
    pub beam_size: Option<u32>,
    pub patience: f32,
    pub length_penalty: Option<f32>,
    pub suppress_tokens: String,
    pub fp16: bool,
    pub compression_ratio_threshold: Option<f32>,
    pub logprob_threshold: Option<f32>,
    pub no_speech_threshold: Option<f32>,
    pub n_threads: Option<u32>,
    pub cache_dir: Option<PathBuf>,
    pub outputs: OutputFormats,
}

impl Default for TranscribeOptions {
    fn default() -> Self {
        Self {
            model: "small".into(),
            device: None,
            gpu_device: 0,
            output_dir: PathBuf::from("."),
            task: "transcribe".into(),
            language: None,
            verbose: false,
            temperature: 0.0,
            temperature_increment_on_fallback: Some(0.2),
            best_of: 5,
            beam_size: Some(5),
            patience: 0.0,
            length_penalty: None,
            suppress_tokens: "-1".into(),
            fp16: true,
            compression_ratio_threshold: Some(2.4),
            logprob_threshold: Some(-1.0),
            no_speech_threshold: Some(0.6),
            n_threads: None,
            cache_dir: None,
            outputs: OutputFormats::default(),
        }
    }
}

impl TranscribeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    pub fn gpu_device(mut self, device: u32) -> Self {
        self.gpu_device = device;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn task(mut self, task: impl Into<String>) -> Self {
        self.task = task.into();
        self
    }

    pub fn language(mut self, lang: impl Into<String>) -> Self {
        self.language = Some(lang.into());
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.temperature = temp;
        self
    }

    pub fn temperature_increment_on_fallback(mut self, inc: Option<f32>) -> Self {
        self.temperature_increment_on_fallback = inc;
        self
    }

    pub fn best_of(mut self, n: u32) -> Self {
        self.best_of = n;
        self
    }

    pub fn beam_size(mut self, size: Option<u32>) -> Self {
        self.beam_size = size;
        self
    }

    pub fn patience(mut self, patience: f32) -> Self {
        self.patience = patience;
        self
    }

    pub fn length_penalty(mut self, alpha: Option<f32>) -> Self {
        self.length_penalty = alpha;
        self
    }

    pub fn suppress_tokens(mut self, tokens: impl Into<String>) -> Self {
        self.suppress_tokens = tokens.into();
        self
    }

    pub fn fp16(mut self, enabled: bool) -> Self {
        self.fp16 = enabled;
        self
    }

    pub fn compression_ratio_threshold(mut self, threshold: Option<f32>) -> Self {
        self.compression_ratio_threshold = threshold;
        self
    }

    pub fn logprob_threshold(mut self, threshold: Option<f32>) -> Self {
        self.logprob_threshold = threshold;
        self
    }

    pub fn no_speech_threshold(mut self, threshold: Option<f32>) -> Self {
        self.no_speech_threshold = threshold;
        self
    }

    pub fn n_threads(mut self, n: u32) -> Self {
        self.n_threads = Some(n);
        self
    }

    pub fn cache_dir(mut self, dir: PathBuf) -> Self {
        self.cache_dir = Some(dir);
        self
    }

    pub fn outputs(mut self, outputs: OutputFormats) -> Self {
        self.outputs = outputs;
        self
    }

    /// Resolve the model cache directory, defaulting to ~/.cache/stagewhisper/models.
    pub fn resolve_cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from(".cache"))
                .join("stagewhisper")
                .join("models")
        })
    }
}

/// Validated, reconciled options. Every field is in range.
#[derive(Debug, Clone)]
pub struct CanonicalConfig {
    pub model: Model,
    pub device: Device,
    pub gpu_device: u32,
    pub task: Task,
    pub language: Language,
    pub verbose: bool,
    pub temperature: f32,
    pub temperature_increment: Option<f32>,
    pub best_of: u32,
    pub beam_size: Option<u32>,
    pub patience: f32,
    pub length_penalty: Option<f32>,
    pub suppress_tokens: SuppressTokens,
    pub fp16: bool,
    pub compression_ratio_threshold: Option<f32>,
    pub logprob_threshold: Option<f32>,
    pub no_speech_threshold: Option<f32>,
    pub n_threads: Option<u32>,
    pub output_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub outputs: OutputFormats,
}

impl CanonicalConfig {
    /// Fallback temperatures for this configuration.
    pub fn schedule(&self) -> Result<TemperatureSchedule> {
        schedule::build_schedule(self.temperature, self.temperature_increment)
    }
}

#[derive(Debug, Clone)]
pub struct Normalized {
    pub config: CanonicalConfig,
    pub warnings: Vec<Warning>,
}

/// Validate and reconcile raw options.
///
/// Creates the output directory once all values check out.
pub fn normalize(options: &TranscribeOptions) -> Result<Normalized> {
    let model = Model::parse_name(options.model.trim()).ok_or_else(|| {
        Error::validation(
            "model",
            format!("unknown model \"{}\" (see --list-models)", options.model),
        )
    })?;

    let device = match &options.device {
        Some(d) => Device::parse(d).ok_or_else(|| {
            Error::validation("device", format!("\"{d}\" is not one of cpu, gpu"))
        })?,
        None => {
            let detected = Device::detect();
            debug!(device = %detected, "auto-selected device");
            detected
        }
    };

    let task = Task::parse(&options.task).ok_or_else(|| {
        Error::validation(
            "task",
            format!("\"{}\" is not one of transcribe, translate", options.task),
        )
    })?;

    let mut language = match &options.language {
        Some(lang) => Language::new(lang)?,
        None => Language::Auto,
    };

    let temperature = non_negative("temperature", options.temperature)?;
    let temperature_increment = options.temperature_increment_on_fallback;
    schedule::build_schedule(temperature, temperature_increment)?;
    if options.best_of == 0 {
        return Err(Error::validation("best_of", "must be at least 1"));
    }
    if options.beam_size == Some(0) {
        return Err(Error::validation("beam_size", "must be at least 1"));
    }
    let patience = non_negative("patience", options.patience)?;
    let length_penalty = options
        .length_penalty
        .map(|v| unit_interval("length_penalty", v))
        .transpose()?;
    let compression_ratio_threshold = match options.compression_ratio_threshold {
        Some(v) if !v.is_finite() || v <= 0.0 => {
            return Err(Error::validation(
                "compression_ratio_threshold",
                format!("must be greater than 0, got {v}"),
            ))
        }
        other => other,
    };
    let logprob_threshold = match options.logprob_threshold {
        Some(v) if !v.is_finite() || v > 0.0 => {
            return Err(Error::validation(
                "logprob_threshold",
                format!("must be a log-probability (<= 0), got {v}"),
            ))
        }
        other => other,
    };
    let no_speech_threshold = options
        .no_speech_threshold
        .map(|v| unit_interval("no_speech_threshold", v))
        .transpose()?;
    if options.n_threads == Some(0) {
        return Err(Error::validation("threads", "must be at least 1"));
    }
    let suppress_tokens = SuppressTokens::parse(&options.suppress_tokens)?;

    let mut warnings = Vec::new();

    if model.is_english_only() && !language.is_english() {
        if let Some(requested) = language.code() {
            warnings.push(Warning::EnglishOnlyModel {
                model,
                requested: requested.to_string(),
            });
        }
        language = Language::english();
    }

    let mut fp16 = options.fp16;
    if fp16 && device == Device::Cpu {
        warnings.push(Warning::Fp16OnCpu);
        fp16 = false;
    }

    for w in &warnings {
        warn!("{w}");
    }

    std::fs::create_dir_all(&options.output_dir).map_err(|source| Error::OutputDir {
        path: options.output_dir.clone(),
        source,
    })?;

    Ok(Normalized {
        config: CanonicalConfig {
            model,
            device,
            gpu_device: options.gpu_device,
            task,
            language,
            verbose: options.verbose,
            temperature,
            temperature_increment,
            best_of: options.best_of,
            beam_size: options.beam_size,
            patience,
            length_penalty,
            suppress_tokens,
            fp16,
            compression_ratio_threshold,
            logprob_threshold,
            no_speech_threshold,
            n_threads: options.n_threads,
            output_dir: options.output_dir.clone(),
            cache_dir: options.resolve_cache_dir(),
            outputs: options.outputs,
        },
        warnings,
    })
}

fn non_negative(field: &'static str, value: f32) -> Result<f32> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(Error::validation(
            field,
            format!("must be a finite value >= 0, got {value}"),
        ))
    }
}

fn unit_interval(field: &'static str, value: f32) -> Result<f32> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(Error::validation(
            field,
            format!("must be between 0 and 1, got {value}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options_in(dir: &tempfile::TempDir) -> TranscribeOptions {
        TranscribeOptions::new().output_dir(dir.path()).device("gpu")
    }

    fn field_of(result: Result<Normalized>) -> Option<&'static str> {
        result.unwrap_err().field()
    }

    // --- models ---

    #[test]
    fn test_model_parse_roundtrips_names() {
        for model in Model::ALL {
            assert_eq!(Model::parse_name(model.name()), Some(model));
        }
        assert_eq!(Model::parse_name("large"), Some(Model::LargeV3));
        assert_eq!(Model::parse_name("turbo"), Some(Model::LargeV3Turbo));
        assert_eq!(Model::parse_name("huge"), None);
        assert_eq!(Model::parse_name("Tiny"), None);
    }

    #[test]
    fn test_model_filename() {
        assert_eq!(Model::Tiny.filename(), "ggml-tiny.bin");
        assert_eq!(Model::MediumEn.filename(), "ggml-medium.en.bin");
        assert_eq!(Model::LargeV3Turbo.filename(), "ggml-large-v3-turbo.bin");
    }

    #[test]
    fn test_english_only_models() {
        let english_only: Vec<_> = Model::ALL
            .into_iter()
            .filter(Model::is_english_only)
            .collect();
        assert_eq!(
            english_only,
            vec![Model::TinyEn, Model::BaseEn, Model::SmallEn, Model::MediumEn]
        );
    }

    // --- small enums ---

    #[test]
    fn test_device_parse() {
        assert_eq!(Device::parse("CPU"), Some(Device::Cpu));
        assert_eq!(Device::parse("gpu"), Some(Device::Gpu));
        assert_eq!(Device::parse("cuda"), Some(Device::Gpu));
        assert_eq!(Device::parse("tpu"), None);
    }

    #[test]
    fn test_task_parse() {
        assert_eq!(Task::parse("Translate"), Some(Task::Translate));
        assert_eq!(Task::parse("transcribe"), Some(Task::Transcribe));
        assert_eq!(Task::parse("summarize"), None);
    }

    #[test]
    fn test_suppress_tokens_parse() {
        let t = SuppressTokens::parse("-1").unwrap();
        assert!(t.non_speech);
        assert!(t.ids.is_empty());

        let t = SuppressTokens::parse("-1, 50362,7").unwrap();
        assert!(t.non_speech);
        assert_eq!(t.ids, vec![50362, 7]);

        assert_eq!(SuppressTokens::parse("").unwrap(), SuppressTokens::default());

        let e = SuppressTokens::parse("1,x").unwrap_err();
        assert_eq!(e.field(), Some("suppress_tokens"));
        let e = SuppressTokens::parse("-2").unwrap_err();
        assert_eq!(e.field(), Some("suppress_tokens"));
    }

    // --- languages ---

    #[test]
    fn test_language_codes_and_names() {
        assert_eq!(Language::new("en").unwrap().code(), Some("en"));
        assert_eq!(Language::new("German").unwrap().code(), Some("de"));
        assert!(Language::new("AUTO").unwrap().is_auto());
        assert!(Language::new("None").unwrap().is_auto());
        assert_eq!(Language::english(), Language::new("english").unwrap());
    }

    #[test]
    fn test_language_unknown() {
        let e = Language::new("klingon").unwrap_err();
        assert_eq!(e.field(), Some("language"));
        assert!(e.to_string().contains("klingon"));
    }

    #[test]
    fn test_supported_languages_include_english() {
        let langs = Language::supported();
        assert!(langs.iter().any(|(code, _)| *code == "en"));
        assert!(langs.len() > 90);
    }

    // --- normalize ---

    #[test]
    fn test_normalize_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let n = normalize(&options_in(&dir)).unwrap();
        let c = n.config;
        assert_eq!(c.model, Model::Small);
        assert_eq!(c.device, Device::Gpu);
        assert_eq!(c.task, Task::Transcribe);
        assert!(c.language.is_auto());
        assert_eq!(c.temperature_increment, Some(0.2));
        assert_eq!(c.beam_size, Some(5));
        assert!(c.suppress_tokens.non_speech);
        assert!(c.fp16);
        assert!(n.warnings.is_empty());
    }

    #[test]
    fn test_normalize_auto_detects_device() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = TranscribeOptions::new().output_dir(dir.path());
        opts.device = None;
        let n = normalize(&opts.fp16(false)).unwrap();
        assert_eq!(n.config.device, Device::detect());
    }

    #[test]
    fn test_normalize_english_only_overrides_language() {
        let dir = tempfile::tempdir().unwrap();
        let opts = options_in(&dir).model("base.en").language("de");
        let n = normalize(&opts).unwrap();
        assert!(n.config.language.is_english());
        assert_eq!(
            n.warnings,
            vec![Warning::EnglishOnlyModel {
                model: Model::BaseEn,
                requested: "de".into(),
            }]
        );
        assert!(n.warnings[0].to_string().contains("English-only"));
    }

    #[test]
    fn test_normalize_english_only_without_conflict_is_silent() {
        let dir = tempfile::tempdir().unwrap();

        let n = normalize(&options_in(&dir).model("tiny.en").language("English")).unwrap();
        assert!(n.config.language.is_english());
        assert!(n.warnings.is_empty());

        let n = normalize(&options_in(&dir).model("tiny.en")).unwrap();
        assert!(n.config.language.is_english());
        assert!(n.warnings.is_empty());
    }

    #[test]
    fn test_normalize_multilingual_keeps_language() {
        let dir = tempfile::tempdir().unwrap();
        let n = normalize(&options_in(&dir).model("medium").language("fr")).unwrap();
        assert_eq!(n.config.language.code(), Some("fr"));
        assert!(n.warnings.is_empty());
    }

    #[test]
    fn test_normalize_fp16_on_cpu_warns() {
        let dir = tempfile::tempdir().unwrap();
        let n = normalize(&options_in(&dir).device("cpu")).unwrap();
        assert!(!n.config.fp16);
        assert_eq!(n.warnings, vec![Warning::Fp16OnCpu]);

        let n = normalize(&options_in(&dir).device("cpu").fp16(false)).unwrap();
        assert!(n.warnings.is_empty());
    }

    #[test]
    fn test_normalize_rejects_unknown_model() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(field_of(normalize(&options_in(&dir).model("huge"))), Some("model"));
    }

    #[test]
    fn test_normalize_rejects_bad_enums() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(field_of(normalize(&options_in(&dir).device("tpu"))), Some("device"));
        assert_eq!(field_of(normalize(&options_in(&dir).task("dance"))), Some("task"));
        assert_eq!(
            field_of(normalize(&options_in(&dir).language("xx-nope"))),
            Some("language")
        );
    }

    #[test]
    fn test_normalize_rejects_out_of_range_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let cases = [
            (options_in(&dir).temperature(-0.1), "temperature"),
            (options_in(&dir).temperature(f32::NAN), "temperature"),
            (
                options_in(&dir).temperature_increment_on_fallback(Some(0.0)),
                "temperature_increment_on_fallback",
            ),
            (
                options_in(&dir).temperature_increment_on_fallback(Some(1e-30)),
                "temperature_increment_on_fallback",
            ),
            (options_in(&dir).best_of(0), "best_of"),
            (options_in(&dir).beam_size(Some(0)), "beam_size"),
            (options_in(&dir).patience(-1.0), "patience"),
            (options_in(&dir).length_penalty(Some(1.5)), "length_penalty"),
            (
                options_in(&dir).compression_ratio_threshold(Some(0.0)),
                "compression_ratio_threshold",
            ),
            (options_in(&dir).logprob_threshold(Some(0.5)), "logprob_threshold"),
            (options_in(&dir).no_speech_threshold(Some(1.2)), "no_speech_threshold"),
            (options_in(&dir).n_threads(0), "threads"),
            (options_in(&dir).suppress_tokens("a"), "suppress_tokens"),
        ];
        for (opts, field) in cases {
            assert_eq!(field_of(normalize(&opts)), Some(field), "{field}");
        }
    }

    #[test]
    fn test_normalize_accepts_disabled_thresholds() {
        let dir = tempfile::tempdir().unwrap();
        let opts = options_in(&dir)
            .temperature_increment_on_fallback(None)
            .compression_ratio_threshold(None)
            .logprob_threshold(None)
            .no_speech_threshold(None)
            .beam_size(None);
        let c = normalize(&opts).unwrap().config;
        assert_eq!(c.temperature_increment, None);
        assert_eq!(c.compression_ratio_threshold, None);
        assert_eq!(c.logprob_threshold, None);
        assert_eq!(c.no_speech_threshold, None);
        assert_eq!(c.beam_size, None);
    }

    #[test]
    fn test_normalize_failure_leaves_output_dir_alone() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("subs");
        let opts = TranscribeOptions::new()
            .device("gpu")
            .output_dir(&out)
            .temperature_increment_on_fallback(Some(1e-30));

        let e = normalize(&opts).unwrap_err();
        assert!(matches!(e, Error::Validation { .. }));
        assert!(!out.exists());
    }

    #[test]
    fn test_normalize_creates_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("subs");
        let opts = TranscribeOptions::new().device("gpu").output_dir(&out);
        normalize(&opts).unwrap();
        assert!(out.is_dir());

        // idempotent
        normalize(&opts).unwrap();
        assert!(out.is_dir());
    }

    #[test]
    fn test_normalize_output_dir_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"not a dir").unwrap();

        let opts = TranscribeOptions::new()
            .device("gpu")
            .output_dir(blocker.join("out"));
        let e = normalize(&opts).unwrap_err();
        assert!(matches!(e, Error::OutputDir { .. }));
    }

    #[test]
    fn test_normalize_validation_does_not_create_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("never");
        let opts = TranscribeOptions::new().model("huge").output_dir(&out);
        assert!(normalize(&opts).is_err());
        assert!(!out.exists());
    }

    #[test]
    fn test_config_schedule() {
        let dir = tempfile::tempdir().unwrap();
        let c = normalize(&options_in(&dir)).unwrap().config;
        let schedule = c.schedule().unwrap();
        assert_eq!(schedule.len(), 6);
        assert_eq!(schedule.first(), 0.0);
    }

    #[test]
    fn test_resolve_cache_dir() {
        let opts = TranscribeOptions::new().cache_dir(PathBuf::from("/tmp/models"));
        assert_eq!(opts.resolve_cache_dir(), PathBuf::from("/tmp/models"));

        let default = TranscribeOptions::new().resolve_cache_dir();
        assert!(default.ends_with("stagewhisper/models"));
    }
}
