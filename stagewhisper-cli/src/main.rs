use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, ValueEnum};
use stagewhisper::{
    batch, normalize, BatchOutcome, Language, Model, OutputFormats, TranscribeOptions,
    WhisperModel,
};

#[derive(Parser)]
#[command(
    name = "stagewhisper",
    version,
    about = "Transcribe audio files into WebVTT subtitles with whisper"
)]
struct Cli {
    /// Audio file(s) to transcribe.
    #[arg(required_unless_present_any = ["list_models", "download_model", "list_languages"])]
    inputs: Vec<PathBuf>,

    /// Whisper model to use. Models ending in ".en" are English-only.
    #[arg(short, long, default_value = "small")]
    model: String,

    /// Device for inference (default: GPU if this build supports one).
    #[arg(long)]
    device: Option<DeviceArg>,

    /// GPU device ID.
    #[arg(long, default_value = "0")]
    gpu_device: u32,

    /// Directory to save the outputs.
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// X->X speech recognition or X->English translation.
    #[arg(short, long, default_value = "transcribe")]
    task: TaskArg,

    /// Language spoken in the audio (code or name); omit or "auto" to detect.
    #[arg(short, long)]
    language: Option<String>,

    /// Print each segment as it is decoded and enable debug logging.
    #[arg(short, long)]
    verbose: bool,

    /// Temperature to use for sampling.
    #[arg(long, default_value = "0.0")]
    temperature: f32,

    /// Number of candidates when sampling with non-zero temperature.
    #[arg(long, default_value = "5")]
    best_of: u32,

    /// Number of beams in beam search; 0 decodes greedily.
    #[arg(long, default_value = "5")]
    beam_size: u32,

    /// Beam search patience; 0 disables it.
    #[arg(long, default_value = "0.0")]
    patience: f32,

    /// Token length penalty coefficient (alpha), 0 to 1.
    #[arg(long)]
    length_penalty: Option<f32>,

    /// Comma-separated token ids to suppress; -1 suppresses most special characters.
    #[arg(long, default_value = "-1", allow_hyphen_values = true)]
    suppress_tokens: String,

    /// Whether to request half-precision inference.
    #[arg(long, default_value = "true", action = ArgAction::Set)]
    fp16: bool,

    /// Temperature step when decoding fails the thresholds below ("none" disables fallback).
    #[arg(long, default_value = "0.2", value_parser = optional_float)]
    temperature_increment_on_fallback: OptionalFloat,

    /// Never retry decoding at a higher temperature.
    #[arg(long)]
    no_fallback: bool,

    /// Treat decoding as failed if the compression ratio is above this ("none" disables).
    #[arg(long, default_value = "2.4", value_parser = optional_float)]
    compression_ratio_threshold: OptionalFloat,

    /// Treat decoding as failed if the average log probability is below this ("none" disables).
    #[arg(long, default_value = "-1.0", allow_hyphen_values = true, value_parser = optional_float)]
    logprob_threshold: OptionalFloat,

    /// Treat a segment as silence if the no-speech probability is above this ("none" disables).
    #[arg(long, default_value = "0.6", value_parser = optional_float)]
    no_speech_threshold: OptionalFloat,

    /// Number of threads (default: auto).
    #[arg(long)]
    threads: Option<u32>,

    /// Also write the plain transcript as <input>.txt.
    #[arg(long)]
    txt: bool,

    /// Also write <input>.srt.
    #[arg(long)]
    srt: bool,

    /// Also write the full result as <input>.json.
    #[arg(long)]
    json: bool,

    /// Model cache directory.
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// List available models.
    #[arg(long)]
    list_models: bool,

    /// Download a model without transcribing.
    #[arg(long)]
    download_model: Option<String>,

    /// List supported languages.
    #[arg(long)]
    list_languages: bool,
}

/// A float flag that also accepts "none".
#[derive(Debug, Clone, Copy, PartialEq)]
struct OptionalFloat(Option<f32>);

fn optional_float(s: &str) -> Result<OptionalFloat, String> {
    if s.eq_ignore_ascii_case("none") {
        return Ok(OptionalFloat(None));
    }
    s.parse::<f32>()
        .map(|v| OptionalFloat(Some(v)))
        .map_err(|e| format!("expected a number or \"none\": {e}"))
}

#[derive(Clone, Copy, ValueEnum)]
enum DeviceArg {
    Cpu,
    #[value(alias = "cuda")]
    Gpu,
}

#[derive(Clone, Copy, ValueEnum)]
enum TaskArg {
    Transcribe,
    Translate,
}

impl Cli {
    fn options(&self) -> TranscribeOptions {
        let mut opts = TranscribeOptions::new()
            .model(self.model.as_str())
            .gpu_device(self.gpu_device)
            .output_dir(&self.output_dir)
            .task(match self.task {
                TaskArg::Transcribe => "transcribe",
                TaskArg::Translate => "translate",
            })
            .verbose(self.verbose)
            .temperature(self.temperature)
            .temperature_increment_on_fallback(if self.no_fallback {
                None
            } else {
                self.temperature_increment_on_fallback.0
            })
            .best_of(self.best_of)
            .beam_size((self.beam_size > 0).then_some(self.beam_size))
            .patience(self.patience)
            .length_penalty(self.length_penalty)
            .suppress_tokens(self.suppress_tokens.as_str())
            .fp16(self.fp16)
            .compression_ratio_threshold(self.compression_ratio_threshold.0)
            .logprob_threshold(self.logprob_threshold.0)
            .no_speech_threshold(self.no_speech_threshold.0)
            .outputs(OutputFormats {
                txt: self.txt,
                srt: self.srt,
                json: self.json,
            });

        if let Some(device) = self.device {
            opts = opts.device(match device {
                DeviceArg::Cpu => "cpu",
                DeviceArg::Gpu => "gpu",
            });
        }
        if let Some(lang) = &self.language {
            opts = opts.language(lang.as_str());
        }
        if let Some(n) = self.threads {
            opts = opts.n_threads(n);
        }
        if let Some(dir) = &self.cache_dir {
            opts = opts.cache_dir(dir.clone());
        }
        opts
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "stagewhisper=debug"
    } else {
        "stagewhisper=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_level.parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    if cli.list_languages {
        println!("{:<6} {}", "CODE", "LANGUAGE");
        println!("{:<6} {}", "----", "--------");
        for (code, name) in Language::supported() {
            println!("{code:<6} {name}");
        }
        return ExitCode::SUCCESS;
    }

    let options = cli.options();

    if cli.list_models {
        list_models(&options);
        return ExitCode::SUCCESS;
    }

    if let Some(name) = &cli.download_model {
        let Some(model) = Model::parse_name(name) else {
            eprintln!("Unknown model: {name}");
            eprintln!("Use --list-models to see available models");
            return ExitCode::FAILURE;
        };
        return match stagewhisper::model::ensure_model(model, &options.resolve_cache_dir()).await
        {
            Ok(path) => {
                println!("Model ready: {}", path.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {e}");
                ExitCode::FAILURE
            }
        };
    }

    // Setup failures below are fatal; per-file failures are not.
    let normalized = match normalize(&options) {
        Ok(n) => n,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    // Warnings were already logged by normalize.
    let config = normalized.config;

    let schedule = match config.schedule() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let model = match WhisperModel::load(
        config.model,
        config.device,
        config.gpu_device,
        &config.cache_dir,
    )
    .await
    {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let outcomes = batch::run(&model, &cli.inputs, &config, &schedule);

    let mut failed = 0;
    for outcome in &outcomes {
        match outcome {
            BatchOutcome::Transcribed { outputs, .. } => {
                for path in outputs {
                    eprintln!("Written to {}", path.display());
                }
            }
            BatchOutcome::Failed { input, error } => {
                failed += 1;
                eprintln!("Failed: {}: {error}", input.display());
            }
        }
    }
    eprintln!(
        "Done: {} of {} file(s) transcribed, {failed} failed",
        outcomes.len() - failed,
        outcomes.len()
    );

    ExitCode::SUCCESS
}

fn list_models(options: &TranscribeOptions) {
    println!("{:<16} {}", "MODEL", "SIZE");
    println!("{:<16} {}", "-----", "----");
    for model in Model::ALL {
        println!("{:<16} {}", model.name(), model.approx_size());
    }

    let cache_dir = options.resolve_cache_dir();
    let cached = stagewhisper::model::list_cached_models(&cache_dir);
    if !cached.is_empty() {
        println!("\nCached models in {}:", cache_dir.display());
        for path in cached {
            let size = std::fs::metadata(&path)
                .map(|m| format_bytes(m.len()))
                .unwrap_or_default();
            println!(
                "  {} ({})",
                path.file_name()
                    .map(|f| f.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                size
            );
        }
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_000_000_000 {
        format!("{:.1} GB", bytes as f64 / 1_000_000_000.0)
    } else if bytes >= 1_000_000 {
        format!("{:.0} MB", bytes as f64 / 1_000_000.0)
    } else {
        format!("{:.0} KB", bytes as f64 / 1_000.0)
    }
}
