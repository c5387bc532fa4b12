use std::io;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::config::CanonicalConfig;
use crate::driver;
use crate::engine::ModelHandle;
use crate::error::{Error, Result};
use crate::schedule::TemperatureSchedule;
use crate::subtitle;

/// What happened to one input file.
#[derive(Debug)]
pub enum BatchOutcome {
    Transcribed {
        input: PathBuf,
        /// Files written, `.vtt` first.
        outputs: Vec<PathBuf>,
        language: Option<String>,
    },
    Failed {
        input: PathBuf,
        error: Error,
    },
}

impl BatchOutcome {
    pub fn input(&self) -> &Path {
        match self {
            BatchOutcome::Transcribed { input, .. } | BatchOutcome::Failed { input, .. } => input,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BatchOutcome::Transcribed { .. })
    }

    pub fn outputs(&self) -> &[PathBuf] {
        match self {
            BatchOutcome::Transcribed { outputs, .. } => outputs,
            BatchOutcome::Failed { .. } => &[],
        }
    }
}

/// `<output_dir>/<input file name>.<extension>`, e.g. `talk.mp3` -> `talk.mp3.vtt`.
pub fn output_path(output_dir: &Path, input: &Path, extension: &str) -> Result<PathBuf> {
    let name = input.file_name().ok_or_else(|| {
        Error::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("input path {} has no file name", input.display()),
        ))
    })?;
    let mut name = name.to_os_string();
    name.push(".");
    name.push(extension);
    Ok(output_dir.join(name))
}

/// Transcribe every input in order, writing results into `config.output_dir`.
///
/// A failing file is recorded and the batch moves on. The output directory
/// must already exist ([`crate::normalize`] creates it).
pub fn run<H: ModelHandle + ?Sized>(
    handle: &H,
    inputs: &[PathBuf],
    config: &CanonicalConfig,
    schedule: &TemperatureSchedule,
) -> Vec<BatchOutcome> {
    let mut outcomes = Vec::with_capacity(inputs.len());

    for (i, input) in inputs.iter().enumerate() {
        info!(
            path = %input.display(),
            file = i + 1,
            total = inputs.len(),
            "processing"
        );

        let outcome = match process_one(handle, input, config, schedule) {
            Ok((outputs, language)) => {
                info!(path = %input.display(), outputs = outputs.len(), "written");
                BatchOutcome::Transcribed {
                    input: input.clone(),
                    outputs,
                    language,
                }
            }
            Err(e) => {
                error!(path = %input.display(), error = %e, "file failed, continuing");
                BatchOutcome::Failed {
                    input: input.clone(),
                    error: e,
                }
            }
        };
        outcomes.push(outcome);
    }

    outcomes
}

fn process_one<H: ModelHandle + ?Sized>(
    handle: &H,
    input: &Path,
    config: &CanonicalConfig,
    schedule: &TemperatureSchedule,
) -> Result<(Vec<PathBuf>, Option<String>)> {
    // Resolve names up front so a bad path never costs an inference run.
    let vtt_path = output_path(&config.output_dir, input, "vtt")?;

    let result = driver::transcribe(handle, config, schedule, input)?;

    let mut files = vec![(vtt_path, subtitle::to_vtt(&result.segments))];
    if config.outputs.txt {
        files.push((
            output_path(&config.output_dir, input, "txt")?,
            subtitle::to_txt(&result),
        ));
    }
    if config.outputs.srt {
        files.push((
            output_path(&config.output_dir, input, "srt")?,
            subtitle::to_srt(&result.segments),
        ));
    }
    if config.outputs.json {
        files.push((
            output_path(&config.output_dir, input, "json")?,
            subtitle::to_json(&result)?,
        ));
    }

    let mut written = Vec::with_capacity(files.len());
    for (path, contents) in files {
        std::fs::write(&path, contents)?;
        written.push(path);
    }

    Ok((written, result.language))
}
