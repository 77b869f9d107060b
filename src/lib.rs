//! Althtml: a compile-time templating language that translates an
//! indentation-structured source into HTML.
//!
//! The pipeline is leaves-first: [`scanner`] splits source into
//! logical lines, [`indent`] converts leading whitespace into levels,
//! [`lineparse`] classifies each line into a [`lineparse::LineForm`],
//! [`tree`] threads lines into a forest of [`tree::Node`]s, [`env`]
//! holds `set`/`:macro` bindings, [`expander`] performs variable and
//! macro substitution, and [`emitter`] walks the resolved tree into an
//! HTML string. [`api::compile`] is the single pure entry point tying
//! all of this together; everything else (file I/O, CLI argument
//! handling) lives outside this crate.

pub mod api;
pub mod emitter;
pub mod env;
pub mod error;
pub mod expander;
pub mod indent;
pub mod lineparse;
pub mod scanner;
pub mod tree;

pub use api::compile;
pub use error::{CompileError, ErrorKind};
