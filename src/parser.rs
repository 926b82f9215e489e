//! Pure text helpers shared by every recognizer.
//!
//! A command line is never parsed into a tree here: each command variant
//! inspects the raw text itself. This module only knows how to trim it,
//! how to spot the trailing background marker and how to split it into
//! whitespace-separated tokens.

/// Characters treated as whitespace when trimming and tokenizing.
pub const WHITESPACE: &str = " \n\r\t\u{0C}\u{0B}";

/// The trailing marker that sends a command to the background.
pub const BACKGROUND_MARKER: char = '&';

fn is_blank(c: char) -> bool {
    WHITESPACE.contains(c)
}

/// Strip whitespace from both ends of `line`.
pub fn trim(line: &str) -> &str {
    line.trim_matches(is_blank)
}

/// Strip whitespace from the end of `line` only.
pub fn trim_end(line: &str) -> &str {
    line.trim_end_matches(is_blank)
}

/// Returns true when the last non-whitespace character of `line` is `&`.
pub fn is_background(line: &str) -> bool {
    trim_end(line).ends_with(BACKGROUND_MARKER)
}

/// Remove a trailing background marker.
///
/// The marker is replaced by a break and the result is right-trimmed, so
/// `sleep 5&` becomes `sleep 5` and `sleep 5 &` becomes `sleep 5`. Lines
/// without a marker come back right-trimmed but otherwise untouched.
pub fn remove_background_sign(line: &str) -> String {
    let end = trim_end(line);
    match end.strip_suffix(BACKGROUND_MARKER) {
        Some(rest) => {
            let mut stripped = String::with_capacity(rest.len() + 1);
            stripped.push_str(rest);
            stripped.push(' ');
            trim_end(&stripped).to_string()
        }
        None => end.to_string(),
    }
}

/// Split a line into whitespace-separated tokens.
pub fn tokenize(line: &str) -> Vec<&str> {
    line.split(is_blank).filter(|t| !t.is_empty()).collect()
}

/// Trimmed, marker-free text of a line. What recognizers look at.
pub fn normalize(line: &str) -> String {
    trim(&remove_background_sign(line)).to_string()
}
