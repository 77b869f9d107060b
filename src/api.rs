//! Pure compilation entry point.
//!
//! Threads a source string through scanner -> indentation tracker ->
//! line parser -> tree builder -> expander -> emitter with no I/O of
//! any kind. The `filename` is carried only so callers can include it
//! in rendered diagnostics; the core never opens or reads it.

use crate::emitter;
use crate::error::CompileError;
use crate::expander::Expander;
use crate::indent;
use crate::scanner;
use crate::tree;

/// Compile Althtml `source` to an HTML string.
///
/// `filename` is a logical name used only for error positions rendered
/// by the caller (via [`CompileError::render`]); it need not correspond
/// to a real path and is not otherwise inspected.
pub fn compile(source: &str, filename: &str) -> Result<String, Vec<CompileError>> {
    let _ = filename;
    let raw_lines = scanner::scan(source);
    let (leveled, unit_width) =
        indent::track_with_unit_width(&raw_lines).map_err(|e| vec![e])?;
    let nodes = tree::build(&leveled, unit_width).map_err(|e| vec![e])?;
    let resolved = Expander::new().expand(nodes)?;
    Ok(emitter::emit(&resolved))
}
