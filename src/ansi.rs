//! ANSI escape handling for width measurement.
//!
//! Only CSI sequences (`ESC [ params intermediates final`) are recognised.
//! The stripped text is used to measure what the terminal will actually
//! display; it is never written out.

use regex::Regex;
use std::sync::OnceLock;

fn csi_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\x1B\[[0-?]*[ -/]*[@-~]").expect("CSI pattern is a valid regex")
    })
}

/// Remove all CSI escape sequences from `text`.
///
/// Every other character, including newlines, is kept as-is.
pub fn strip(text: &str) -> String {
    csi_pattern().replace_all(text, "").into_owned()
}

/// Number of visible characters in `text` once escape sequences are removed.
pub fn visible_len(text: &str) -> usize {
    strip(text).chars().count()
}
