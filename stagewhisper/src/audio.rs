//! Audio loading for the whisper engine. All decoding, downmixing and
//! resampling is delegated to the `ffmpeg` executable.

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use crate::error::{Error, Result};

/// Sample rate whisper.cpp expects.
pub const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// 8 hours of audio, roughly 1.8 GB of f32 samples.
const MAX_AUDIO_DURATION_SECS: f64 = 8.0 * 3600.0;

/// ffmpeg `-t` limit. Past the cap, so over-long input is still rejected.
const DECODE_LIMIT_SECS: f64 = MAX_AUDIO_DURATION_SECS + 1.0;

/// Decode `path` into 16 kHz mono f32 samples in [-1.0, 1.0].
pub fn load_audio(path: &Path) -> Result<Vec<f32>> {
    if !path.is_file() {
        return Err(Error::AudioNotFound {
            path: path.to_path_buf(),
        });
    }

    let output = Command::new("ffmpeg")
        .args(ffmpeg_args(path))
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::AudioDecode("ffmpeg not found; install it and make sure it is on PATH".into())
            } else {
                Error::AudioDecode(format!("failed to run ffmpeg: {e}"))
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = stderr.lines().last().unwrap_or("unknown error");
        return Err(Error::AudioDecode(format!("ffmpeg failed: {reason}")));
    }

    let samples = pcm_s16le_to_f32(&output.stdout);
    if samples.is_empty() {
        return Err(Error::AudioDecode("no audio stream decoded".into()));
    }

    let duration = samples.len() as f64 / f64::from(WHISPER_SAMPLE_RATE);
    if duration > MAX_AUDIO_DURATION_SECS {
        return Err(Error::AudioDecode(format!(
            "audio too long ({duration:.0}s); maximum supported duration is {MAX_AUDIO_DURATION_SECS:.0}s"
        )));
    }

    info!(
        path = %path.display(),
        duration_secs = format!("{duration:.1}"),
        "audio decoded"
    );
    Ok(samples)
}

/// `ffmpeg -i <path>` to raw signed 16-bit mono PCM on stdout.
fn ffmpeg_args(path: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-nostdin", "-threads", "0", "-i"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(path.as_os_str().to_os_string());
    args.extend(
        [
            "-f".to_string(),
            "s16le".into(),
            "-ac".into(),
            "1".into(),
            "-acodec".into(),
            "pcm_s16le".into(),
            "-ar".into(),
            WHISPER_SAMPLE_RATE.to_string(),
            "-t".into(),
            DECODE_LIMIT_SECS.to_string(),
            "-".into(),
        ]
        .into_iter()
        .map(OsString::from),
    );
    debug!(?args, "ffmpeg arguments");
    args
}

/// Little-endian s16 bytes to f32. A trailing odd byte is dropped.
fn pcm_s16le_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|chunk| f32::from(i16::from_le_bytes([chunk[0], chunk[1]])) / 32768.0)
        .collect()
}
