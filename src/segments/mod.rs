use serde::{Deserialize, Serialize};

pub mod clipper;

pub use clipper::{ClipArtifact, ClipExtractor};

use crate::extractors::TranscriptEntry;

/// Length of every segment, in seconds
pub const SEGMENT_SECONDS: f64 = 60.0;

/// Most segments planned for one video; anything past this is dropped
pub const MAX_SEGMENTS: usize = 10;

/// Longest transcript excerpt kept as a segment description, in characters
pub const MAX_DESCRIPTION_CHARS: usize = 200;

/// Why a segment was chosen
pub const SEGMENT_REASON: &str = "Auto-generated segment";

/// One planned clip of the source video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentDescriptor {
    /// Start offset in seconds
    pub start: f64,

    /// End offset in seconds, always greater than `start`
    pub end: f64,

    pub title: String,

    /// Transcript excerpt, or a placeholder when no transcript is available
    pub description: String,

    pub reason: String,
}

impl SegmentDescriptor {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Split a video's timeline into fixed one-minute windows.
///
/// Produces `min(floor(duration / 60), 10)` contiguous segments starting at 0; a trailing
/// partial window is discarded. A zero, negative or non-finite duration gives no segments.
/// With a transcript, each description is the text of the entries starting inside the
/// window, cut to 200 characters.
pub fn plan_segments(
    duration: f64,
    title: &str,
    transcript: Option<&[TranscriptEntry]>,
) -> Vec<SegmentDescriptor> {
    if !duration.is_finite() || duration <= 0.0 {
        return Vec::new();
    }

    let full_windows = (duration / SEGMENT_SECONDS).floor() as usize;
    let count = full_windows.min(MAX_SEGMENTS);

    if full_windows > MAX_SEGMENTS {
        // Policy cap: long videos lose their tail
        tracing::warn!(
            "Video has {} full windows, only the first {} are used ({:.0}s of content dropped)",
            full_windows,
            MAX_SEGMENTS,
            duration - count as f64 * SEGMENT_SECONDS
        );
    }

    (0..count)
        .map(|i| {
            let start = i as f64 * SEGMENT_SECONDS;
            let end = (start + SEGMENT_SECONDS).min(duration);
            let part = i + 1;

            let description = match transcript {
                Some(entries) => {
                    let excerpt = transcript_excerpt(entries, start, end);
                    if excerpt.is_empty() {
                        format!("Segment {}", part)
                    } else {
                        excerpt
                    }
                }
                None => format!("Part {} of {}", part, count),
            };

            SegmentDescriptor {
                start,
                end,
                title: format!("{} - Part {}", title, part),
                description,
                reason: SEGMENT_REASON.to_string(),
            }
        })
        .collect()
}

/// Text of the entries starting in `[start, end)`, space-joined and cut to 200 characters
fn transcript_excerpt(entries: &[TranscriptEntry], start: f64, end: f64) -> String {
    let joined = entries
        .iter()
        .filter(|entry| entry.start >= start && entry.start < end)
        .map(|entry| entry.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    joined
        .trim()
        .chars()
        .take(MAX_DESCRIPTION_CHARS)
        .collect::<String>()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(start: f64, text: &str) -> TranscriptEntry {
        TranscriptEntry {
            text: text.to_string(),
            start,
            duration: 2.0,
        }
    }

    fn assert_contiguous(segments: &[SegmentDescriptor]) {
        for (i, segment) in segments.iter().enumerate() {
            assert_eq!(segment.start, i as f64 * SEGMENT_SECONDS);
            assert!(segment.end > segment.start);
            assert!(segment.duration() <= SEGMENT_SECONDS);
            if i > 0 {
                assert_eq!(segment.start, segments[i - 1].end);
            }
        }
    }

    #[test]
    fn test_zero_duration_gives_no_segments() {
        assert!(plan_segments(0.0, "t", None).is_empty());
        assert!(plan_segments(-3.0, "t", None).is_empty());
        assert!(plan_segments(f64::NAN, "t", None).is_empty());
    }

    #[test]
    fn test_shorter_than_one_window() {
        assert!(plan_segments(59.99, "t", None).is_empty());
        assert_eq!(plan_segments(60.0, "t", None).len(), 1);
    }

    #[test]
    fn test_partial_window_is_dropped() {
        let segments = plan_segments(185.0, "Talk", None);

        assert_eq!(segments.len(), 3);
        assert_contiguous(&segments);
        assert_eq!((segments[2].start, segments[2].end), (120.0, 180.0));
        assert_eq!(segments[0].title, "Talk - Part 1");
        assert_eq!(segments[2].description, "Part 3 of 3");
        assert_eq!(segments[1].reason, SEGMENT_REASON);
    }

    #[test]
    fn test_segment_count_is_capped() {
        let segments = plan_segments(725.0, "Long", None);

        assert_eq!(segments.len(), MAX_SEGMENTS);
        assert_contiguous(&segments);
        assert_eq!((segments[9].start, segments[9].end), (540.0, 600.0));
        assert_eq!(segments[9].description, "Part 10 of 10");
    }

    #[test]
    fn test_segment_count_matches_floor_division() {
        for duration in [1.0, 60.0, 119.9, 120.0, 301.5, 599.0, 600.0, 601.0, 3600.0] {
            let expected = ((duration / SEGMENT_SECONDS).floor() as usize).min(MAX_SEGMENTS);
            let segments = plan_segments(duration, "t", None);

            assert_eq!(segments.len(), expected, "duration {}", duration);
            assert_contiguous(&segments);
            if let Some(last) = segments.last() {
                assert!(last.end <= duration);
            }
        }
    }

    #[test]
    fn test_transcript_descriptions() {
        let transcript = vec![
            entry(0.0, "hello"),
            entry(30.5, "world"),
            entry(60.0, "second minute"),
            entry(179.0, "late"),
        ];

        let segments = plan_segments(150.0, "Talk", Some(&transcript));

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].description, "hello world");
        assert_eq!(segments[1].description, "second minute");
    }

    #[test]
    fn test_window_without_captions_gets_placeholder() {
        let transcript = vec![entry(5.0, "only the first minute talks")];
        let segments = plan_segments(125.0, "Talk", Some(&transcript));

        assert_eq!(segments[1].description, "Segment 2");
    }

    #[test]
    fn test_transcript_description_is_truncated() {
        let transcript: Vec<TranscriptEntry> =
            (0..50).map(|i| entry(i as f64, "ơi trời ơi")).collect();

        let segments = plan_segments(60.0, "Talk", Some(&transcript));

        assert_eq!(segments[0].description.chars().count(), MAX_DESCRIPTION_CHARS);
        assert!(segments[0].description.starts_with("ơi trời ơi ơi"));
    }
}
