//! Standard LRC format parser
//!
//! Handles the line-level `[mm:ss.xx]text` format. Only the first timestamp
//! tag of a physical line is honoured; it may appear anywhere on the line.

use once_cell::sync::Lazy;
use regex::Regex;

use super::types::LyricLine;

/// `[mm:ss]`, `[mm:ss.xx]` or `[mm:ss.xxx]`
static TIME_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[([0-9]{2}):([0-9]{2})(?:\.([0-9]{2,3}))?\]").expect("valid time tag regex")
});

/// A physical line that carries a timestamp tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaggedLine<'a> {
    /// The raw tag text, brackets included. Used for track alignment.
    pub tag: &'a str,
    /// Tag converted to milliseconds
    pub time_ms: u64,
    line: &'a str,
    start: usize,
    end: usize,
}

impl TaggedLine<'_> {
    /// Line text with the tag cut out, trimmed
    pub fn text(&self) -> String {
        let before = &self.line[..self.start];
        let after = &self.line[self.end..];
        if before.trim().is_empty() {
            return after.trim().to_string();
        }
        format!("{}{}", before, after).trim().to_string()
    }
}

/// Parse the first timestamp tag found in `line`
pub fn parse_time(line: &str) -> Option<TaggedLine<'_>> {
    let caps = TIME_TAG.captures(line)?;
    let whole = caps.get(0)?;

    let min: u64 = caps[1].parse().ok()?;
    let sec: u64 = caps[2].parse().ok()?;
    let fraction = match caps.get(3) {
        // centiseconds
        Some(m) if m.as_str().len() == 2 => m.as_str().parse::<u64>().ok()? * 10,
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };

    Some(TaggedLine {
        tag: whole.as_str(),
        time_ms: min * 60 * 1000 + sec * 1000 + fraction,
        line,
        start: whole.start(),
        end: whole.end(),
    })
}

/// Build a lyric line from an original line and an optional translation line
///
/// Returns `None` when the original has no tag or no text left after the tag.
pub fn make_line(line: &str, translation: Option<&str>) -> Option<LyricLine> {
    let tagged = parse_time(line)?;
    let original_text = tagged.text();
    if original_text.is_empty() {
        return None;
    }

    let translated_text = translation
        .map(|t| match parse_time(t) {
            Some(tagged) => tagged.text(),
            None => t.trim().to_string(),
        })
        .unwrap_or_default();

    Some(LyricLine {
        original_text,
        translated_text,
        timestamp_ms: tagged.time_ms,
    })
}

/// Parse single-track LRC content into lyric lines
///
/// Input order is preserved; untagged and blank lines are dropped.
pub fn parse_lrc(src: &str) -> Vec<LyricLine> {
    src.lines().filter_map(|line| make_line(line, None)).collect()
}

/// Physical lines of `src` that carry a timestamp tag
pub fn tagged_lines(src: &str) -> Vec<&str> {
    src.lines().filter(|line| TIME_TAG.is_match(line)).collect()
}

/// Write timestamp in LRC format
pub fn write_timestamp(result: &mut String, time: u64) {
    use std::fmt::Write;
    let ms = time % 1000;
    let sec = (time / 1000) % 60;
    let min = time / 60000;
    // Writing to a String cannot fail
    let _ = write!(result, "[{:02}:{:02}.{:03}]", min, sec, ms);
}

/// Format a millisecond timestamp as `[mm:ss.mmm]`
pub fn format_timestamp(time: u64) -> String {
    let mut result = String::with_capacity(11);
    write_timestamp(&mut result, time);
    result
}
