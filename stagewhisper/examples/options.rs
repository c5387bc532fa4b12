//! Drive the pipeline step by step with a fixed language and plain-text output.
//!
//! Usage: cargo run --example options -- path/to/audio.mp3

use stagewhisper::{batch, normalize, OutputFormats, TranscribeOptions, WhisperModel};

#[tokio::main]
async fn main() -> stagewhisper::Result<()> {
    let path = std::env::args()
        .nth(1)
        .expect("usage: options <audio-file>");

    let opts = TranscribeOptions::new()
        .model("small")
        .language("en")
        .output_dir("transcripts")
        .temperature_increment_on_fallback(Some(0.25))
        .outputs(OutputFormats {
            txt: true,
            ..OutputFormats::default()
        });

    let normalized = normalize(&opts)?;
    for warning in &normalized.warnings {
        eprintln!("warning: {warning}");
    }
    let config = normalized.config;
    let schedule = config.schedule()?;
    println!("temperature schedule: {:?}", schedule.as_slice());

    let model =
        WhisperModel::load(config.model, config.device, config.gpu_device, &config.cache_dir)
            .await?;

    for outcome in batch::run(&model, &[path.into()], &config, &schedule) {
        for file in outcome.outputs() {
            println!("wrote {}", file.display());
        }
    }

    Ok(())
}
