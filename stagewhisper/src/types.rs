use serde::{Deserialize, Serialize};

/// One recognized utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Position in the transcript, starting at 0.
    pub id: usize,
    /// Seconds from the start of the audio.
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl Segment {
    pub fn new(id: usize, start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            id,
            start,
            end,
            text: text.into(),
        }
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// Everything the engine recognized in one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub text: String,
    pub segments: Vec<Segment>,
    /// Detected (or forced) language code.
    pub language: Option<String>,
}

impl TranscriptionResult {
    /// Build a result whose full text is the concatenation of its segments.
    pub fn from_segments(segments: Vec<Segment>, language: Option<String>) -> Self {
        let text = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<String>()
            .trim()
            .to_string();
        Self {
            text,
            segments,
            language,
        }
    }

    /// End of the last segment, in seconds.
    pub fn duration(&self) -> f64 {
        self.segments.last().map_or(0.0, |s| s.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_segments_concatenates_text() {
        let result = TranscriptionResult::from_segments(
            vec![
                Segment::new(0, 0.0, 1.5, " Hi"),
                Segment::new(1, 1.5, 3.0, " there."),
            ],
            Some("en".into()),
        );
        assert_eq!(result.text, "Hi there.");
        assert_eq!(result.duration(), 3.0);
        assert_eq!(result.language.as_deref(), Some("en"));
    }

    #[test]
    fn test_empty_result() {
        let result = TranscriptionResult::from_segments(Vec::new(), None);
        assert!(result.text.is_empty());
        assert_eq!(result.duration(), 0.0);
    }

    #[test]
    fn test_segment_duration_never_negative() {
        assert_eq!(Segment::new(0, 2.0, 1.0, "x").duration(), 0.0);
        assert!((Segment::new(0, 1.0, 2.25, "x").duration() - 1.25).abs() < 1e-9);
    }
}
