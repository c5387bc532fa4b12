//! Transcribe audio files into WebVTT in the current directory.
//!
//! Usage: cargo run --example basic -- path/to/audio.mp3 [more.wav ...]

#[tokio::main]
async fn main() -> stagewhisper::Result<()> {
    let inputs: Vec<std::path::PathBuf> = std::env::args().skip(1).map(Into::into).collect();
    if inputs.is_empty() {
        eprintln!("usage: basic <audio-file>...");
        std::process::exit(2);
    }

    let run = stagewhisper::transcribe_files(&inputs, &stagewhisper::TranscribeOptions::new())
        .await?;

    for outcome in &run.outcomes {
        match outcome {
            stagewhisper::BatchOutcome::Transcribed { outputs, .. } => {
                println!("{}", outputs[0].display())
            }
            stagewhisper::BatchOutcome::Failed { input, error } => {
                eprintln!("{}: {error}", input.display())
            }
        }
    }

    Ok(())
}
