//! Phase 3: Tree building.
//!
//! Threads classified [`LineForm`]s into a forest of [`Node`]s using a
//! stack of open parents keyed by indentation level, attaching block
//! bodies to `set`, `:macro`, `raw`/`raw@`, and parameterized macro
//! invocations.

use crate::error::{CompileError, ErrorKind};
use crate::indent::LeveledLine;
use crate::lineparse::{self, AttrList, AttrPart, LineForm, SpanChunk, TextSpan};

/// A parsed, not-yet-expanded node in the template tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element {
        name: String,
        self_closing: bool,
        attrs: Vec<(String, TextSpan)>,
        id_parts: Vec<TextSpan>,
        classes_implicit: Vec<TextSpan>,
        classes_explicit: Vec<TextSpan>,
        children: Vec<Node>,
        text_after_pipe: Option<TextSpan>,
    },
    TextNode {
        span: TextSpan,
        preserve_whitespace: bool,
    },
    RawBlock {
        lines: Vec<String>,
        substitute: bool,
    },
    SetBinding {
        name: String,
        body: PendingBinding,
    },
    MacroBinding {
        name: String,
        parameterized: bool,
        body: Vec<Node>,
    },
    MacroInvocation {
        name: String,
        parameterized: bool,
        args: Vec<Vec<Node>>,
    },
    VarInsertion {
        name: String,
    },
    /// A `@N` placeholder inside a parameterized macro body, resolved
    /// per invocation by the expander.
    MacroArgRef {
        index: usize,
    },
}

/// The not-yet-resolved right-hand side of a `set` binding, as captured
/// by the tree builder. Resolved into an [`crate::env::BoundValue`] by
/// the expander once an environment is available to resolve any
/// variable references the value itself contains.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingBinding {
    InlineSpan(TextSpan),
    RawBody { lines: Vec<String>, substitute: bool },
    Subtree(Vec<Node>),
}

#[derive(Clone, Copy)]
struct BuildCtx {
    in_parameterized_macro_body: bool,
}

/// Build the root forest (level-0 nodes) from a fully leveled line
/// stream. `unit_width` is the number of leading-whitespace bytes that
/// make up one indentation level (needed to reconstruct `raw` block
/// content verbatim).
pub fn build(lines: &[LeveledLine], unit_width: usize) -> Result<Vec<Node>, CompileError> {
    let mut pos = 0;
    let ctx = BuildCtx {
        in_parameterized_macro_body: false,
    };
    build_children(lines, &mut pos, 0, unit_width, ctx)
}

fn build_children(
    lines: &[LeveledLine],
    pos: &mut usize,
    level: usize,
    unit_width: usize,
    ctx: BuildCtx,
) -> Result<Vec<Node>, CompileError> {
    let mut children = Vec::new();
    while *pos < lines.len() && lines[*pos].level >= level {
        let line = lines[*pos].clone();
        *pos += 1;
        children.push(build_node(lines, pos, &line, unit_width, ctx)?);
    }
    Ok(children)
}

fn build_node(
    lines: &[LeveledLine],
    pos: &mut usize,
    line: &LeveledLine,
    unit_width: usize,
    ctx: BuildCtx,
) -> Result<Node, CompileError> {
    let form = lineparse::classify_line(
        &line.content,
        line.line_number,
        line.column,
        ctx.in_parameterized_macro_body,
    )?;
    let level = line.level;

    match form {
        LineForm::Tag {
            name,
            self_closing,
            attrs,
            text,
        } => build_tag(lines, pos, line, level, unit_width, ctx, name, self_closing, attrs, text),

        LineForm::Text { span, explicit } => {
            reject_nested_block(lines, *pos, level, "a text line")?;
            // A line that is exactly one bare identifier is ambiguous
            // between "literal word" and "variable reference" until the
            // environment is available; keep it as a distinct node so
            // the expander can splice a subtree binding in place of it.
            if let [SpanChunk::Var(name)] = span.as_slice() {
                Ok(Node::VarInsertion { name: name.clone() })
            } else {
                Ok(Node::TextNode {
                    span,
                    preserve_whitespace: explicit,
                })
            }
        }

        LineForm::MacroArg { index } => {
            if !ctx.in_parameterized_macro_body {
                return Err(CompileError::new(
                    ErrorKind::UnknownDirective,
                    line.line_number,
                    line.column,
                    format!(
                        "`@{}` placeholder used outside a parameterized macro body",
                        index
                    ),
                ));
            }
            reject_nested_block(lines, *pos, level, "a `@N` placeholder")?;
            Ok(Node::MacroArgRef { index })
        }

        LineForm::Set { name, inline_value } => {
            if let Some(span) = inline_value {
                reject_nested_block(lines, *pos, level, "an inline `set`")?;
                Ok(Node::SetBinding {
                    name,
                    body: PendingBinding::InlineSpan(span),
                })
            } else {
                let body = build_set_body(lines, pos, level, unit_width, ctx)?;
                Ok(Node::SetBinding { name, body })
            }
        }

        LineForm::MacroDef { name, parameterized } => {
            let inner_ctx = BuildCtx {
                in_parameterized_macro_body: parameterized,
            };
            let body = build_children(lines, pos, level + 1, unit_width, inner_ctx)?;
            Ok(Node::MacroBinding {
                name,
                parameterized,
                body,
            })
        }

        LineForm::MacroRef { name, parameterized } => {
            if parameterized {
                let mut args = Vec::new();
                while *pos < lines.len() && lines[*pos].level > level {
                    let arg_line = lines[*pos].clone();
                    *pos += 1;
                    let node = build_node(lines, pos, &arg_line, unit_width, ctx)?;
                    args.push(vec![node]);
                }
                Ok(Node::MacroInvocation {
                    name,
                    parameterized: true,
                    args,
                })
            } else {
                reject_nested_block(lines, *pos, level, "a nullary macro reference")?;
                Ok(Node::MacroInvocation {
                    name,
                    parameterized: false,
                    args: Vec::new(),
                })
            }
        }

        LineForm::Raw { substitute } => {
            let body_lines = capture_raw(lines, pos, level, line.leading.len(), unit_width);
            Ok(Node::RawBlock {
                lines: body_lines,
                substitute,
            })
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn build_tag(
    lines: &[LeveledLine],
    pos: &mut usize,
    line: &LeveledLine,
    level: usize,
    unit_width: usize,
    ctx: BuildCtx,
    name: String,
    self_closing: bool,
    attrs: AttrList,
    text: Option<TextSpan>,
) -> Result<Node, CompileError> {
    let (pairs, id_parts, classes_implicit, classes_explicit) =
        split_attrs(attrs, ctx.in_parameterized_macro_body);

    if self_closing {
        if *pos < lines.len() && lines[*pos].level > level {
            return Err(CompileError::new(
                ErrorKind::SelfClosingHasChildren,
                line.line_number,
                line.column,
                format!("self-closing tag `{}` cannot have a block body", name),
            ));
        }
        return Ok(Node::Element {
            name,
            self_closing: true,
            attrs: pairs,
            id_parts,
            classes_implicit,
            classes_explicit,
            children: Vec::new(),
            text_after_pipe: text,
        });
    }

    let children = build_children(lines, pos, level + 1, unit_width, ctx)?;
    Ok(Node::Element {
        name,
        self_closing: false,
        attrs: pairs,
        id_parts,
        classes_implicit,
        classes_explicit,
        children,
        text_after_pipe: text,
    })
}

fn build_set_body(
    lines: &[LeveledLine],
    pos: &mut usize,
    level: usize,
    unit_width: usize,
    ctx: BuildCtx,
) -> Result<PendingBinding, CompileError> {
    if *pos >= lines.len() || lines[*pos].level <= level {
        // No body at all: binds to an empty subtree. A child indented
        // more than one level deeper can't actually arise here, since
        // the indentation tracker already rejects any jump of more
        // than one level -- the only irregular case left is "no body
        // at all", handled here.
        return Ok(PendingBinding::Subtree(Vec::new()));
    }

    let first_line = lines[*pos].clone();
    let first_form = lineparse::classify_line(
        &first_line.content,
        first_line.line_number,
        first_line.column,
        ctx.in_parameterized_macro_body,
    )?;

    if let LineForm::Raw { substitute } = first_form {
        *pos += 1;
        let raw_lines = capture_raw(lines, pos, first_line.level, first_line.leading.len(), unit_width);
        // Any further siblings of the `raw` line at the same level as
        // the `set` body are not representable in a RawString binding;
        // they're ignored, matching "the binding becomes RawString" --
        // a set body is RawString exactly when its first child is `raw`.
        while *pos < lines.len() && lines[*pos].level > level {
            *pos += 1;
        }
        return Ok(PendingBinding::RawBody {
            lines: raw_lines,
            substitute,
        });
    }

    let body = build_children(lines, pos, level + 1, unit_width, ctx)?;
    Ok(PendingBinding::Subtree(body))
}

/// Reconstruct `raw` block content verbatim: for each line strictly
/// deeper than `directive_level`, strip the directive's own leading
/// whitespace plus one indentation unit, keeping any further-nested
/// whitespace as literal content.
fn capture_raw(
    lines: &[LeveledLine],
    pos: &mut usize,
    directive_level: usize,
    directive_leading_len: usize,
    unit_width: usize,
) -> Vec<String> {
    let base = directive_leading_len + unit_width.max(1);
    let mut out = Vec::new();
    while *pos < lines.len() && lines[*pos].level > directive_level {
        let line = &lines[*pos];
        let extra = if line.leading.len() > base {
            &line.leading[base..]
        } else {
            ""
        };
        out.push(format!("{}{}", extra, line.content));
        *pos += 1;
    }
    out
}

/// Most leaf line forms have no field to hold a nested block; if the
/// next line is indented deeper, that's a structural error.
fn reject_nested_block(
    lines: &[LeveledLine],
    pos: usize,
    level: usize,
    what: &str,
) -> Result<(), CompileError> {
    if pos < lines.len() && lines[pos].level > level {
        let next = &lines[pos];
        return Err(CompileError::new(
            ErrorKind::UnknownDirective,
            next.line_number,
            next.column,
            format!("unexpected indented content under {}", what),
        ));
    }
    Ok(())
}

fn split_attrs(
    attrs: AttrList,
    in_macro_body: bool,
) -> (
    Vec<(String, TextSpan)>,
    Vec<TextSpan>,
    Vec<TextSpan>,
    Vec<TextSpan>,
) {
    let mut pairs = Vec::new();
    let mut id_parts = Vec::new();
    let mut classes_implicit = Vec::new();
    let mut classes_explicit = Vec::new();

    for attr in attrs {
        match attr {
            AttrPart::Pair { name, value } => pairs.push((name, value)),
            AttrPart::IdFragment { value } => id_parts.push(value),
            // A bare class word shares the same "a word that happens
            // to be a bound name is substituted" model as any other
            // span -- it's tokenized the same way so `theme` can
            // resolve against `set theme = "dark"`.
            AttrPart::Class { word } => {
                classes_implicit.push(lineparse::tokenize_span_ctx(&word, in_macro_body))
            }
            AttrPart::ExplicitClass { value } => classes_explicit.push(value),
        }
    }

    (pairs, id_parts, classes_implicit, classes_explicit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indent;
    use crate::scanner;

    fn build_source(src: &str) -> Vec<Node> {
        let raw = scanner::scan(src);
        let leveled = indent::track(&raw).unwrap();
        build(&leveled, 2).unwrap()
    }

    #[test]
    fn builds_simple_nesting() {
        let nodes = build_source("html\n  head\n    title\n  body");
        assert_eq!(nodes.len(), 1);
        match &nodes[0] {
            Node::Element { name, children, .. } => {
                assert_eq!(name, "html");
                assert_eq!(children.len(), 2);
            }
            other => panic!("expected Element, got {:?}", other),
        }
    }

    #[test]
    fn self_closing_with_children_is_error() {
        let raw = scanner::scan("img>\n  p");
        let leveled = indent::track(&raw).unwrap();
        let err = build(&leveled, 2).unwrap_err();
        assert_eq!(err.kind, ErrorKind::SelfClosingHasChildren);
    }

    #[test]
    fn set_with_raw_first_child_becomes_raw_string() {
        let nodes = build_source("set footerContent\n  raw\n    <b>hi</b>");
        match &nodes[0] {
            Node::SetBinding { body: PendingBinding::RawBody { lines, substitute }, .. } => {
                assert!(!substitute);
                assert_eq!(lines, &vec!["<b>hi</b>".to_string()]);
            }
            other => panic!("expected RawBody binding, got {:?}", other),
        }
    }

    #[test]
    fn set_with_element_first_child_becomes_subtree() {
        let nodes = build_source("set nav\n  div\n    p");
        match &nodes[0] {
            Node::SetBinding { body: PendingBinding::Subtree(children), .. } => {
                assert_eq!(children.len(), 1);
            }
            other => panic!("expected Subtree binding, got {:?}", other),
        }
    }

    #[test]
    fn parameterized_macro_ref_collects_child_lines_as_args() {
        let nodes = build_source("!button\n  primary\n  | Click Me");
        match &nodes[0] {
            Node::MacroInvocation { parameterized, args, .. } => {
                assert!(*parameterized);
                assert_eq!(args.len(), 2);
            }
            other => panic!("expected MacroInvocation, got {:?}", other),
        }
    }

    #[test]
    fn macro_arg_outside_macro_body_is_error() {
        let raw = scanner::scan("div\n  @0");
        let leveled = indent::track(&raw).unwrap();
        let err = build(&leveled, 2).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownDirective);
    }

    #[test]
    fn macro_arg_inside_parameterized_macro_body_is_allowed() {
        let nodes = build_source(":macro !wrap\n  div\n    @0");
        match &nodes[0] {
            Node::MacroBinding { parameterized, body, .. } => {
                assert!(*parameterized);
                assert_eq!(body.len(), 1);
            }
            other => panic!("expected MacroBinding, got {:?}", other),
        }
    }

    #[test]
    fn bare_word_line_becomes_var_insertion() {
        let nodes = build_source("div\n  | username");
        match &nodes[0] {
            Node::Element { children, .. } => match &children[0] {
                Node::VarInsertion { name } => assert_eq!(name, "username"),
                other => panic!("expected VarInsertion, got {:?}", other),
            },
            other => panic!("expected Element, got {:?}", other),
        }
    }

    #[test]
    fn raw_block_reconstructs_nested_indentation_verbatim() {
        let nodes = build_source("raw\n  line one\n    nested line");
        match &nodes[0] {
            Node::RawBlock { lines, .. } => {
                assert_eq!(lines[0], "line one");
                assert_eq!(lines[1], "  nested line");
            }
            other => panic!("expected RawBlock, got {:?}", other),
        }
    }
}
