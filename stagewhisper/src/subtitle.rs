//! Transcript serializers: WebVTT, SRT, plain text and JSON.

use crate::error::Result;
use crate::types::{Segment, TranscriptionResult};

/// Format segments as WebVTT. Segments are written in the order given.
pub fn to_vtt(segments: &[Segment]) -> String {
    let mut out = String::from("WEBVTT\n\n");
    for seg in segments {
        out.push_str(&format!(
            "{} --> {}\n",
            format_timestamp(seg.start, '.'),
            format_timestamp(seg.end, '.')
        ));
        out.push_str(&cue_text(&seg.text));
        out.push_str("\n\n");
    }
    out
}

/// Format segments as SRT subtitles, numbered from 1.
pub fn to_srt(segments: &[Segment]) -> String {
    let mut out = String::new();
    for (i, seg) in segments.iter().enumerate() {
        out.push_str(&format!("{}\n", i + 1));
        out.push_str(&format!(
            "{} --> {}\n",
            format_timestamp(seg.start, ','),
            format_timestamp(seg.end, ',')
        ));
        out.push_str(&cue_text(&seg.text));
        out.push_str("\n\n");
    }
    out
}

/// The full recognized text, newline-terminated.
pub fn to_txt(result: &TranscriptionResult) -> String {
    format!("{}\n", result.text)
}

/// Pretty-printed JSON of the whole result.
pub fn to_json(result: &TranscriptionResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

// A literal "-->" inside cue text would be read as a timing line.
fn cue_text(text: &str) -> String {
    text.trim().replace("-->", "->")
}

/// `HH:MM:SS<sep>mmm`, hours widening past two digits when needed.
fn format_timestamp(seconds: f64, ms_separator: char) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let h = total_ms / 3_600_000;
    let m = (total_ms % 3_600_000) / 60_000;
    let s = (total_ms % 60_000) / 1_000;
    let ms = total_ms % 1_000;
    format!("{h:02}:{m:02}:{s:02}{ms_separator}{ms:03}")
}
