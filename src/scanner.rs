//! Phase 0: Source scanning.
//!
//! Splits raw source text into logical lines, stripping `#//` comments
//! and discarding fully-empty lines before the indentation tracker ever
//! sees them.

/// One physical line, post comment-stripping, that survived to
/// participate in indentation tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    /// The raw whitespace prefix of the physical line, before comment
    /// stripping. Used by the indentation tracker to compute levels.
    pub leading: String,
    /// The line's content after the leading whitespace and after
    /// comment stripping, with no trailing `\r`.
    pub content: String,
    /// 1-based physical line number in the original source.
    pub line_number: usize,
}

/// Scan `source` into surviving [`RawLine`]s.
///
/// Fully empty lines (after comment stripping and trimming) are
/// dropped entirely and never reach the indentation tracker.
pub fn scan(source: &str) -> Vec<RawLine> {
    let mut lines = Vec::new();

    for (idx, physical) in source.split('\n').enumerate() {
        let physical = physical.strip_suffix('\r').unwrap_or(physical);
        let leading_len = physical.len() - physical.trim_start_matches([' ', '\t']).len();
        let leading = &physical[..leading_len];
        let rest = &physical[leading_len..];

        let content = strip_comment(rest);
        if content.trim().is_empty() {
            continue;
        }

        lines.push(RawLine {
            leading: leading.to_string(),
            content: content.to_string(),
            line_number: idx + 1,
        });
    }

    lines
}

/// Strip a `#//` comment marker and everything after it, unless the
/// marker appears inside a double-quoted string or is escaped with a
/// preceding backslash.
///
/// Scans left to right tracking a single quote-state toggle on
/// unescaped `"`; this intentionally does not handle nested or
/// multi-line quoting.
fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut in_quotes = false;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' if i + 1 < bytes.len() => {
                i += 2;
                continue;
            }
            b'"' => {
                in_quotes = !in_quotes;
            }
            b'#' if !in_quotes && line[i..].starts_with("#//") => {
                return &line[..i];
            }
            _ => {}
        }
        i += 1;
    }

    line
}
