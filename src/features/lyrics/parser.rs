//! Lyrics parsing module
//!
//! Turns raw LRC text into an ordered timeline of [`LyricLine`]s:
//! - `lrc`: timestamp tags and single-track parsing
//! - `align`: merging an original track with its translation
//!
//! Parsing never fails. Malformed input degrades to fewer (possibly zero)
//! lines, and the output keeps the order lines were produced in.

mod align;
mod lrc;
mod types;

pub use align::{Alignment, find_skip, merge_tracks};
pub use lrc::{TaggedLine, format_timestamp, parse_lrc, parse_time, write_timestamp};
pub use types::*;

/// Parse a lyric with an optional translation
///
/// A missing or blank translation selects single-track mode. When either
/// track of a dual input has no tagged lines the original is parsed alone.
pub fn parse_lyric(original: &str, translation: Option<&str>) -> Vec<LyricLine> {
    let translation = translation.filter(|t| !t.trim().is_empty());

    let lines = match translation {
        Some(translation) => match merge_tracks(original, translation) {
            Some((lines, _)) => lines,
            None => {
                tracing::debug!("Translation has no usable lines, parsing original only");
                parse_lrc(original)
            }
        },
        None => parse_lrc(original),
    };

    tracing::debug!("Parsed {} lyric lines", lines.len());
    lines
}
