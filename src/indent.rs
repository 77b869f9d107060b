//! Phase 1: Indentation tracking.
//!
//! Converts each surviving [`RawLine`]'s whitespace prefix into an
//! abstract indentation level, detecting the source's indentation unit
//! from the first indented line and validating that levels never jump
//! by more than one step at a time.

use crate::error::{CompileError, ErrorKind};
use crate::scanner::RawLine;

/// The indentation unit detected for a compilation, established by the
/// first indented line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Spaces(usize),
    Tab,
}

/// A line paired with its computed indentation level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeveledLine {
    pub level: usize,
    pub content: String,
    pub line_number: usize,
    /// 1-based column the line's content starts at (i.e. `leading.len() + 1`).
    pub column: usize,
    /// The original whitespace prefix, preserved so `raw` blocks can
    /// reconstruct verbatim indentation relative to their directive.
    pub leading: String,
}

/// Track indentation across a sequence of [`RawLine`]s and return each
/// line paired with its level, or the first indentation error
/// encountered.
pub struct IndentationTracker {
    unit: Option<Unit>,
    prev_level: Option<usize>,
}

impl IndentationTracker {
    pub fn new() -> Self {
        Self {
            unit: None,
            prev_level: None,
        }
    }

    pub fn track(&mut self, lines: &[RawLine]) -> Result<Vec<LeveledLine>, CompileError> {
        let mut out = Vec::with_capacity(lines.len());
        for line in lines {
            let level = self.level_for(line)?;
            out.push(LeveledLine {
                level,
                content: line.content.clone(),
                line_number: line.line_number,
                column: line.leading.len() + 1,
                leading: line.leading.clone(),
            });
        }
        Ok(out)
    }

    fn level_for(&mut self, line: &RawLine) -> Result<usize, CompileError> {
        let leading = &line.leading;

        if self.unit.is_none() && !leading.is_empty() {
            self.unit = Some(detect_unit(leading, line.line_number)?);
        }

        let level = match self.unit {
            None => 0,
            Some(Unit::Tab) => {
                if leading.bytes().any(|b| b != b'\t') {
                    return Err(mixed_error(line.line_number));
                }
                leading.len()
            }
            Some(Unit::Spaces(width)) => {
                if leading.bytes().any(|b| b != b' ') {
                    return Err(mixed_error(line.line_number));
                }
                if leading.len() % width != 0 {
                    return Err(CompileError::new(
                        ErrorKind::IndentationUnitConflict,
                        line.line_number,
                        1,
                        format!(
                            "leading whitespace of {} spaces is not a multiple of the detected unit width {}",
                            leading.len(),
                            width
                        ),
                    ));
                }
                leading.len() / width
            }
        };

        if let Some(prev) = self.prev_level {
            if level > prev + 1 {
                return Err(CompileError::new(
                    ErrorKind::IndentationJump,
                    line.line_number,
                    1,
                    format!(
                        "indentation increased from level {} to level {}; only a one-level increase is allowed",
                        prev, level
                    ),
                ));
            }
        }

        self.prev_level = Some(level);
        Ok(level)
    }

    /// The number of leading-whitespace bytes that make up one
    /// indentation level, used by the tree builder to reconstruct
    /// `raw` block content verbatim. Defaults to 1 if no indented line
    /// was ever seen (the value is then irrelevant: there is no
    /// indentation to reconstruct).
    pub fn unit_width(&self) -> usize {
        match self.unit {
            Some(Unit::Tab) => 1,
            Some(Unit::Spaces(width)) => width,
            None => 1,
        }
    }
}

impl Default for IndentationTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn detect_unit(leading: &str, line_number: usize) -> Result<Unit, CompileError> {
    if leading.starts_with('\t') {
        if leading.bytes().any(|b| b != b'\t') {
            return Err(mixed_error(line_number));
        }
        Ok(Unit::Tab)
    } else {
        if leading.bytes().any(|b| b != b' ') {
            return Err(mixed_error(line_number));
        }
        Ok(Unit::Spaces(leading.len()))
    }
}

fn mixed_error(line_number: usize) -> CompileError {
    CompileError::new(
        ErrorKind::IndentationUnitConflict,
        line_number,
        1,
        "leading whitespace mixes tabs and spaces",
    )
}

/// Track indentation over a full set of scanned lines. Convenience
/// wrapper used by `api::compile`.
pub fn track(lines: &[RawLine]) -> Result<Vec<LeveledLine>, CompileError> {
    IndentationTracker::new().track(lines)
}

/// Track indentation and also return the detected indentation unit
/// width (leading-whitespace bytes per level), needed to reconstruct
/// `raw` block content verbatim in the tree builder.
pub fn track_with_unit_width(lines: &[RawLine]) -> Result<(Vec<LeveledLine>, usize), CompileError> {
    let mut tracker = IndentationTracker::new();
    let leveled = tracker.track(lines)?;
    let width = tracker.unit_width();
    Ok((leveled, width))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(leading: &str, content: &str, n: usize) -> RawLine {
        RawLine {
            leading: leading.to_string(),
            content: content.to_string(),
            line_number: n,
        }
    }

    #[test]
    fn flat_lines_are_level_zero() {
        let lines = vec![raw("", "div", 1), raw("", "p", 2)];
        let leveled = track(&lines).unwrap();
        assert_eq!(leveled[0].level, 0);
        assert_eq!(leveled[1].level, 0);
    }

    #[test]
    fn detects_space_unit_and_computes_levels() {
        let lines = vec![
            raw("", "div", 1),
            raw("  ", "p", 2),
            raw("    ", "span", 3),
        ];
        let leveled = track(&lines).unwrap();
        assert_eq!(leveled[0].level, 0);
        assert_eq!(leveled[1].level, 1);
        assert_eq!(leveled[2].level, 2);
    }

    #[test]
    fn detects_tab_unit() {
        let lines = vec![raw("", "div", 1), raw("\t", "p", 2), raw("\t\t", "span", 3)];
        let leveled = track(&lines).unwrap();
        assert_eq!(leveled[1].level, 1);
        assert_eq!(leveled[2].level, 2);
    }

    #[test]
    fn non_integer_quotient_fails() {
        let lines = vec![raw("", "div", 1), raw("  ", "p", 2), raw("   ", "span", 3)];
        let err = track(&lines).unwrap_err();
        assert_eq!(err.kind, ErrorKind::IndentationUnitConflict);
    }

    #[test]
    fn jump_by_more_than_one_level_fails() {
        let lines = vec![raw("", "div", 1), raw("    ", "span", 2)];
        let err = track(&lines).unwrap_err();
        assert_eq!(err.kind, ErrorKind::IndentationJump);
    }

    #[test]
    fn decrease_to_any_level_is_valid() {
        let lines = vec![
            raw("", "a", 1),
            raw("  ", "b", 2),
            raw("    ", "c", 3),
            raw("", "d", 4),
        ];
        let leveled = track(&lines).unwrap();
        assert_eq!(leveled[3].level, 0);
    }

    #[test]
    fn mixed_tabs_and_spaces_on_one_line_fails() {
        let lines = vec![raw("", "div", 1), raw(" \t", "p", 2)];
        let err = track(&lines).unwrap_err();
        assert_eq!(err.kind, ErrorKind::IndentationUnitConflict);
    }

    #[test]
    fn unit_width_reflects_detected_space_count() {
        let lines = vec![raw("", "a", 1), raw("   ", "b", 2)];
        let (_, width) = track_with_unit_width(&lines).unwrap();
        assert_eq!(width, 3);
    }

    #[test]
    fn unit_width_defaults_to_one_with_no_indentation() {
        let lines = vec![raw("", "a", 1)];
        let (_, width) = track_with_unit_width(&lines).unwrap();
        assert_eq!(width, 1);
    }

    #[test]
    fn doubling_the_unit_produces_the_same_levels() {
        let narrow = vec![raw("", "a", 1), raw("  ", "b", 2), raw("    ", "c", 3)];
        let wide = vec![raw("", "a", 1), raw("    ", "b", 2), raw("        ", "c", 3)];
        let narrow_levels: Vec<_> = track(&narrow).unwrap().into_iter().map(|l| l.level).collect();
        let wide_levels: Vec<_> = track(&wide).unwrap().into_iter().map(|l| l.level).collect();
        assert_eq!(narrow_levels, wide_levels);
    }
}
