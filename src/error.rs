//! Structured compiler errors.
//!
//! Every error produced anywhere in the pipeline carries the position
//! it was detected at, so the CLI can print `file:line:col: kind: message`
//! without needing to re-derive positions after the fact.

use std::fmt;

/// The distinct failure modes the compiler can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    IndentationUnitConflict,
    IndentationJump,
    UnknownDirective,
    MalformedAttribute,
    UnknownBinding,
    BindingKindMismatch,
    MacroArityError,
    MacroRecursion,
    NameConflict,
    RawBlockMisuse,
    SelfClosingHasChildren,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::IndentationUnitConflict => "IndentationUnitConflict",
            ErrorKind::IndentationJump => "IndentationJump",
            ErrorKind::UnknownDirective => "UnknownDirective",
            ErrorKind::MalformedAttribute => "MalformedAttribute",
            ErrorKind::UnknownBinding => "UnknownBinding",
            ErrorKind::BindingKindMismatch => "BindingKindMismatch",
            ErrorKind::MacroArityError => "MacroArityError",
            ErrorKind::MacroRecursion => "MacroRecursion",
            ErrorKind::NameConflict => "NameConflict",
            ErrorKind::RawBlockMisuse => "RawBlockMisuse",
            ErrorKind::SelfClosingHasChildren => "SelfClosingHasChildren",
        };
        write!(f, "{}", name)
    }
}

/// A single compile error, positioned at the line/column it was detected at.
///
/// `line` and `column` are 1-based, matching the CLI's diagnostic format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub kind: ErrorKind,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl CompileError {
    pub fn new(kind: ErrorKind, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            kind,
            line,
            column,
            message: message.into(),
        }
    }

    /// Render as `file:line:col: kind: message`, the CLI's diagnostic line format.
    pub fn render(&self, filename: &str) -> String {
        format!(
            "{}:{}:{}: {}: {}",
            filename, self.line, self.column, self.kind, self.message
        )
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.line, self.column, self.kind, self.message
        )
    }
}

impl std::error::Error for CompileError {}
