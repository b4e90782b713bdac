//! Estimated reading time for post content

use super::markdown::strip_markdown;

/// Estimate reading time in minutes over the stripped content.
/// Latin prose reads at ~200 words/min; non-ASCII characters (CJK text
/// has no word spacing) at ~300 chars/min. Never less than one minute.
pub fn reading_time_minutes(content: &str) -> u32 {
    let plain = strip_markdown(content);
    let words = plain.split_whitespace().count();
    let wide_chars = plain.chars().filter(|c| !c.is_ascii()).count();
    let minutes = (words as f64 / 200.0 + wide_chars as f64 / 300.0).ceil();
    (minutes as u32).max(1)
}

/// Render a minute count as display text, e.g. "4 min read".
pub fn format_reading_time(minutes: u32) -> String {
    format!("{} min read", minutes)
}
