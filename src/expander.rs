//! Phase 5: Variable and macro expansion.
//!
//! Walks the parsed tree in document order, maintaining the
//! [`Environment`] as `set`/`:macro` bindings are encountered and
//! resolving every `Var` reference, `VarInsertion`, and macro
//! invocation against it. Produces a [`ResolvedNode`] forest with no
//! unresolved directives left for the emitter to worry about.
//!
//! Errors are accumulated rather than aborting the walk at the first
//! one, since most bindings and invocations are independent of each
//! other.

use crate::env::{BoundValue, Environment, MacroDefinition};
use crate::error::{CompileError, ErrorKind};
use crate::lineparse::{self, SpanChunk, TextSpan};
use crate::tree::{Node, PendingBinding};

/// A macro call nests at most this many levels deep before being
/// rejected as runaway recursion.
const MAX_MACRO_DEPTH: usize = 1000;

/// A node with every variable reference and macro invocation resolved,
/// ready for [`crate::emitter`].
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedNode {
    Element {
        name: String,
        self_closing: bool,
        attrs: Vec<(String, String)>,
        id: Option<String>,
        classes: Vec<String>,
        children: Vec<ResolvedNode>,
    },
    Text {
        content: String,
        preserve_whitespace: bool,
    },
    Raw(String),
}

pub struct Expander {
    env: Environment,
    errors: Vec<CompileError>,
}

impl Expander {
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
            errors: Vec::new(),
        }
    }

    /// Expand a full document forest, returning either the resolved
    /// tree or every error accumulated along the way.
    pub fn expand(mut self, nodes: Vec<Node>) -> Result<Vec<ResolvedNode>, Vec<CompileError>> {
        let out = self.expand_nodes(nodes, None, 0);
        if self.errors.is_empty() {
            Ok(out)
        } else {
            Err(self.errors)
        }
    }

    fn expand_nodes(
        &mut self,
        nodes: Vec<Node>,
        args: Option<&[Vec<ResolvedNode>]>,
        depth: usize,
    ) -> Vec<ResolvedNode> {
        let mut out = Vec::new();
        for node in nodes {
            match node {
                Node::SetBinding { name, body } => match self.resolve_pending(body, args, depth) {
                    Ok(value) => {
                        if self.env.bind_value(&name, value) {
                            self.errors.push(name_conflict(&name));
                        }
                    }
                    Err(e) => self.errors.push(e),
                },

                Node::MacroBinding {
                    name,
                    parameterized,
                    body,
                } => {
                    if self.env.bind_macro(
                        &name,
                        MacroDefinition {
                            parameterized,
                            body,
                        },
                    ) {
                        self.errors.push(name_conflict(&name));
                    }
                }

                Node::Element {
                    name,
                    self_closing,
                    attrs,
                    id_parts,
                    classes_implicit,
                    classes_explicit,
                    children,
                    text_after_pipe,
                } => {
                    let resolved_attrs = attrs
                        .into_iter()
                        .map(|(k, v)| (k, self.resolve_span(v, args, depth)))
                        .collect();

                    let id = if id_parts.is_empty() {
                        None
                    } else {
                        Some(
                            id_parts
                                .into_iter()
                                .map(|part| self.resolve_span(part, args, depth))
                                .collect::<Vec<_>>()
                                .join(""),
                        )
                    };

                    let mut classes = Vec::new();
                    for span in classes_implicit {
                        let resolved = self.resolve_span(span, args, depth);
                        for word in resolved.split_whitespace() {
                            push_unique(&mut classes, word.to_string());
                        }
                    }
                    for span in classes_explicit {
                        let resolved = self.resolve_span(span, args, depth);
                        for word in resolved.split_whitespace() {
                            push_unique(&mut classes, word.to_string());
                        }
                    }

                    let mut children_out = self.expand_nodes(children, args, depth);
                    if let Some(span) = text_after_pipe {
                        children_out.insert(
                            0,
                            ResolvedNode::Text {
                                content: self.resolve_span(span, args, depth),
                                preserve_whitespace: true,
                            },
                        );
                    }

                    out.push(ResolvedNode::Element {
                        name,
                        self_closing,
                        attrs: resolved_attrs,
                        id,
                        classes,
                        children: children_out,
                    });
                }

                Node::TextNode {
                    span,
                    preserve_whitespace,
                } => {
                    let content = self.resolve_span(span, args, depth);
                    out.push(ResolvedNode::Text {
                        content,
                        preserve_whitespace,
                    });
                }

                Node::RawBlock { lines, substitute } => {
                    let joined = lines.join("\n");
                    let content = if substitute {
                        self.resolve_span(lineparse::tokenize_span_ctx(&joined, args.is_some()), args, depth)
                    } else {
                        joined
                    };
                    out.push(ResolvedNode::Raw(content));
                }

                Node::MacroInvocation {
                    name,
                    parameterized,
                    args: call_args,
                } => match self.expand_macro_call(&name, parameterized, call_args, args, depth) {
                    Ok(mut nodes) => out.append(&mut nodes),
                    Err(e) => self.errors.push(e),
                },

                Node::VarInsertion { name } => {
                    out.append(&mut self.resolve_var_insertion(&name));
                }

                Node::MacroArgRef { index } => match args.and_then(|a| a.get(index)) {
                    Some(nodes) => out.extend(nodes.iter().cloned()),
                    None => self.errors.push(CompileError::new(
                        ErrorKind::MacroArityError,
                        0,
                        0,
                        format!("macro argument @{} was not supplied at the call site", index),
                    )),
                },
            }
        }
        out
    }

    fn resolve_pending(
        &mut self,
        pending: PendingBinding,
        args: Option<&[Vec<ResolvedNode>]>,
        depth: usize,
    ) -> Result<BoundValue, CompileError> {
        match pending {
            PendingBinding::InlineSpan(span) => {
                Ok(BoundValue::Literal(self.resolve_span(span, args, depth)))
            }
            PendingBinding::RawBody { lines, substitute } => {
                let joined = lines.join("\n");
                let content = if substitute {
                    self.resolve_span(lineparse::tokenize_span_ctx(&joined, args.is_some()), args, depth)
                } else {
                    joined
                };
                Ok(BoundValue::RawString(content))
            }
            PendingBinding::Subtree(nodes) => {
                let resolved = self.expand_nodes(nodes, args, depth);
                Ok(BoundValue::Subtree(resolved))
            }
        }
    }

    /// Resolve a span to a plain string. `Var` chunks that name an
    /// unbound identifier fall back to their literal text -- most
    /// ordinary words in body text are not variable references, and
    /// treating every one as a hard error would make plain prose
    /// unwritable. `Var` chunks bound to a template subtree can't be
    /// flattened into a string and are reported as
    /// [`ErrorKind::BindingKindMismatch`]. `ArgRef` chunks splice a
    /// parameterized macro's positional argument in place, the same
    /// call-by-value argument a whole-line `@N` would substitute.
    fn resolve_span(
        &mut self,
        span: TextSpan,
        args: Option<&[Vec<ResolvedNode>]>,
        depth: usize,
    ) -> String {
        let mut out = String::new();
        for chunk in span {
            match chunk {
                SpanChunk::Literal(s) => out.push_str(&s),
                SpanChunk::Var(name) => match self.env.lookup_value(&name) {
                    Some(BoundValue::Literal(s)) => out.push_str(s),
                    Some(BoundValue::RawString(s)) => out.push_str(s),
                    Some(BoundValue::Subtree(_)) => {
                        self.errors.push(CompileError::new(
                            ErrorKind::BindingKindMismatch,
                            0,
                            0,
                            format!(
                                "`{}` is bound to a template subtree and cannot be used inside text",
                                name
                            ),
                        ));
                    }
                    None => out.push_str(&name),
                },
                SpanChunk::ArgRef(index) => match args.and_then(|a| a.get(index)) {
                    Some(nodes) => {
                        let nodes = nodes.clone();
                        let text = self.stringify_arg(index, &nodes);
                        out.push_str(&text);
                    }
                    None => self.errors.push(CompileError::new(
                        ErrorKind::MacroArityError,
                        0,
                        0,
                        format!("macro argument @{} was not supplied at the call site", index),
                    )),
                },
            }
        }
        let _ = depth;
        out
    }

    /// Flatten an already-expanded macro argument into a plain string
    /// for splicing into the middle of a span. A bare single-word
    /// argument (e.g. `primary`) parses as an empty, attribute-less
    /// element rather than text, since nothing distinguishes it from a
    /// tag head until the call site is known -- that case falls back to
    /// the element's own name. Anything richer than a single plain word
    /// can't be flattened and is reported as a kind mismatch.
    fn stringify_arg(&mut self, index: usize, nodes: &[ResolvedNode]) -> String {
        nodes
            .iter()
            .map(|node| self.stringify_arg_node(index, node))
            .collect()
    }

    fn stringify_arg_node(&mut self, index: usize, node: &ResolvedNode) -> String {
        match node {
            ResolvedNode::Text { content, .. } => content.clone(),
            ResolvedNode::Raw(content) => content.clone(),
            ResolvedNode::Element {
                name,
                attrs,
                id,
                classes,
                children,
                ..
            } => {
                if attrs.is_empty() && id.is_none() && classes.is_empty() && children.is_empty() {
                    name.clone()
                } else {
                    self.errors.push(CompileError::new(
                        ErrorKind::BindingKindMismatch,
                        0,
                        0,
                        format!(
                            "macro argument @{} cannot be spliced into a span because it is not a plain word",
                            index
                        ),
                    ));
                    String::new()
                }
            }
        }
    }

    /// Resolve a line that was exactly one bare identifier. Bound to a
    /// string, it becomes literal text; bound to a subtree, its nodes
    /// are spliced in place; unbound, it's literal text (its own name).
    fn resolve_var_insertion(&mut self, name: &str) -> Vec<ResolvedNode> {
        match self.env.lookup_value(name) {
            Some(BoundValue::Literal(s)) => vec![ResolvedNode::Text {
                content: s.clone(),
                preserve_whitespace: false,
            }],
            Some(BoundValue::RawString(s)) => vec![ResolvedNode::Raw(s.clone())],
            Some(BoundValue::Subtree(nodes)) => nodes.clone(),
            None => vec![ResolvedNode::Text {
                content: name.to_string(),
                preserve_whitespace: false,
            }],
        }
    }

    fn expand_macro_call(
        &mut self,
        name: &str,
        parameterized: bool,
        call_args: Vec<Vec<Node>>,
        outer_args: Option<&[Vec<ResolvedNode>]>,
        depth: usize,
    ) -> Result<Vec<ResolvedNode>, CompileError> {
        if depth >= MAX_MACRO_DEPTH {
            return Err(CompileError::new(
                ErrorKind::MacroRecursion,
                0,
                0,
                format!("expansion of macro `{}` exceeded the recursion depth limit", name),
            ));
        }

        let def = self.env.lookup_macro(name).cloned().ok_or_else(|| {
            CompileError::new(
                ErrorKind::UnknownBinding,
                0,
                0,
                format!("no macro named `{}` is defined", name),
            )
        })?;

        if def.parameterized != parameterized {
            return Err(CompileError::new(
                ErrorKind::MacroArityError,
                0,
                0,
                format!(
                    "`{}` was invoked as a {} macro but defined as a {} macro",
                    name,
                    if parameterized { "parameterized" } else { "nullary" },
                    if def.parameterized { "parameterized" } else { "nullary" },
                ),
            ));
        }

        // Call-by-value: each argument is expanded exactly once, in the
        // caller's context, before the body substitutes it wherever its
        // `@N` placeholder appears (possibly more than once).
        let resolved_args: Vec<Vec<ResolvedNode>> = call_args
            .into_iter()
            .map(|arg| self.expand_nodes(arg, outer_args, depth))
            .collect();

        Ok(self.expand_nodes(def.body, Some(&resolved_args), depth + 1))
    }
}

impl Default for Expander {
    fn default() -> Self {
        Self::new()
    }
}

fn push_unique(classes: &mut Vec<String>, word: String) {
    if !classes.contains(&word) {
        classes.push(word);
    }
}

fn name_conflict(name: &str) -> CompileError {
    CompileError::new(
        ErrorKind::NameConflict,
        0,
        0,
        format!("`{}` is already bound by an earlier `set` or `:macro`", name),
    )
}
