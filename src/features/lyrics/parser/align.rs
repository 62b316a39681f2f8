//! Dual-track alignment
//!
//! Merges an original lyric and its translation into one timeline. The longer
//! track usually carries leading lines (credits, intro) that the translation
//! does not cover, so the shorter track's first tag anchors the merge.

use super::lrc::{make_line, parse_time, tagged_lines};
use super::types::{LyricLine, Track};

/// Result of anchoring the shorter track inside the longer one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alignment {
    /// Track whose lines are skipped and then paired
    pub longer: Track,
    /// Number of leading lines of the longer track emitted without translation
    pub skip: usize,
}

/// Index of the first line of `longer` whose tag text equals the first tag of
/// `shorter`. Falls back to 0 when nothing matches.
pub fn find_skip(longer: &[&str], shorter: &[&str]) -> usize {
    let Some(first) = shorter.first().and_then(|line| parse_time(line)) else {
        return 0;
    };

    longer
        .iter()
        .position(|line| parse_time(line).is_some_and(|tagged| tagged.tag == first.tag))
        .unwrap_or(0)
}

/// Merge an original track and a translation track
///
/// Returns `None` when either track has no tagged line; callers fall back to
/// single-track parsing in that case.
pub fn merge_tracks(original: &str, translation: &str) -> Option<(Vec<LyricLine>, Alignment)> {
    let original = tagged_lines(original);
    let translation = tagged_lines(translation);
    if original.is_empty() || translation.is_empty() {
        return None;
    }

    // The original wins ties
    let (longer, shorter, longer_track) = if original.len() >= translation.len() {
        (&original, &translation, Track::Original)
    } else {
        (&translation, &original, Track::Translated)
    };

    let skip = find_skip(longer, shorter);
    let mut result: Vec<LyricLine> = longer[..skip]
        .iter()
        .filter_map(|line| make_line(line, None))
        .collect();

    let paired = longer[skip..].iter().zip(shorter.iter());
    result.extend(paired.filter_map(|(long, short)| match longer_track {
        Track::Original => make_line(long, Some(*short)),
        Track::Translated => make_line(short, Some(*long)),
    }));

    tracing::debug!(
        "Merged lyric tracks: {} original, {} translated, skip={}, longer={:?}",
        original.len(),
        translation.len(),
        skip,
        longer_track
    );

    Some((
        result,
        Alignment {
            longer: longer_track,
            skip,
        },
    ))
}
