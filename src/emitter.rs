//! Phase 6: HTML emission.
//!
//! Walks a fully [`crate::expander::ResolvedNode`] forest and produces
//! the final HTML string: merges id fragments (already joined by the
//! expander), quotes attribute values, and special-cases void/
//! self-closing elements and `!DOCTYPE`.

use crate::expander::ResolvedNode;

/// HTML elements that are always self-closing, regardless of whether
/// the source line carried a trailing `>`.
const VOID_ELEMENTS: &[&str] = &[
    "img", "br", "meta", "input", "link", "hr", "area", "base", "col", "embed", "source",
    "track", "wbr",
];

/// Render a resolved forest to an HTML string.
pub fn emit(nodes: &[ResolvedNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        emit_node(node, &mut out);
    }
    out
}

fn emit_node(node: &ResolvedNode, out: &mut String) {
    match node {
        ResolvedNode::Element {
            name,
            self_closing,
            attrs,
            id,
            classes,
            children,
        } => emit_element(name, *self_closing, attrs, id, classes, children, out),
        ResolvedNode::Text {
            content,
            preserve_whitespace,
        } => {
            if *preserve_whitespace {
                escape_text(content, out);
            } else {
                let collapsed = collapse_whitespace(content);
                if !collapsed.is_empty() {
                    escape_text(&collapsed, out);
                }
            }
        }
        ResolvedNode::Raw(content) => out.push_str(content),
    }
}

#[allow(clippy::too_many_arguments)]
fn emit_element(
    name: &str,
    self_closing: bool,
    attrs: &[(String, String)],
    id: &Option<String>,
    classes: &[String],
    children: &[ResolvedNode],
    out: &mut String,
) {
    if name.eq_ignore_ascii_case("!DOCTYPE") {
        out.push_str("<!DOCTYPE");
        for (attr_name, value) in attrs {
            out.push(' ');
            out.push_str(attr_name);
            out.push_str("=\"");
            escape_attr_value(value, out);
            out.push('"');
        }
        if attrs.is_empty() {
            out.push_str(" html");
        }
        out.push('>');
        return;
    }

    let void = self_closing || is_void_element(name);

    out.push('<');
    out.push_str(name);

    if let Some(id) = id {
        out.push_str(" id=\"");
        escape_attr_value(id, out);
        out.push('"');
    }

    if !classes.is_empty() {
        out.push_str(" class=\"");
        escape_attr_value(&classes.join(" "), out);
        out.push('"');
    }

    for (attr_name, value) in attrs {
        out.push(' ');
        out.push_str(attr_name);
        out.push_str("=\"");
        escape_attr_value(value, out);
        out.push('"');
    }

    if void {
        out.push_str(" />");
        return;
    }

    out.push('>');
    for child in children {
        emit_node(child, out);
    }
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

/// Collapse runs of whitespace to a single space and trim the ends,
/// for implicit (non-`|`) text.
fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Escape text content: `&`, `<`, `>` only -- `"` is left alone, since
/// text nodes aren't quoted the way attribute values are.
fn escape_text(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
}

/// Escape an attribute value: `"`, `&`, `<`, `>`, so the surrounding
/// `"..."` quoting can never be broken out of.
fn escape_attr_value(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '"' => out.push_str("&quot;"),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
}
