//! Phase 2: Line parsing.
//!
//! Classifies the stripped remainder of a single source line into a
//! [`LineForm`], tokenizing tag heads, attribute lists, and text/id/
//! attribute-value spans along the way.

use crate::error::{CompileError, ErrorKind};

/// One chunk of a [`TextSpan`]: literal text, a candidate variable
/// reference, or a parameterized macro argument placeholder.
///
/// `Var` chunks are produced for every maximal run of identifier
/// characters, regardless of whether a binding with that name actually
/// exists — resolution happens at emission time (see `expander.rs`),
/// not here. `ArgRef` chunks are only produced inside a parameterized
/// macro body, where `@N` is reserved for positional argument
/// splicing rather than being read as a literal `@` next to a `Var`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanChunk {
    Literal(String),
    Var(String),
    ArgRef(usize),
}

/// A sequence of literal and variable chunks, used uniformly for text,
/// attribute values, and id fragments.
pub type TextSpan = Vec<SpanChunk>;

/// One element of an [`AttrList`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrPart {
    Pair { name: String, value: TextSpan },
    Class { word: String },
    IdFragment { value: TextSpan },
    ExplicitClass { value: TextSpan },
}

/// An ordered sequence of attribute-list fragments.
pub type AttrList = Vec<AttrPart>;

/// The parsed classification of a single source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineForm {
    Tag {
        name: String,
        self_closing: bool,
        attrs: AttrList,
        text: Option<TextSpan>,
    },
    Text {
        span: TextSpan,
        explicit: bool,
    },
    Set {
        name: String,
        inline_value: Option<TextSpan>,
    },
    MacroDef {
        name: String,
        parameterized: bool,
    },
    MacroRef {
        name: String,
        parameterized: bool,
    },
    Raw {
        substitute: bool,
    },
    MacroArg {
        index: usize,
    },
}

/// Segment `text` into literal/variable chunks, with no `@N` argument
/// recognition.
///
/// Equivalent to `tokenize_span_ctx(text, false)`; kept as the default
/// entry point for contexts outside a parameterized macro body.
pub fn tokenize_span(text: &str) -> TextSpan {
    tokenize_span_ctx(text, false)
}

/// Segment `text` into literal/variable/arg-ref chunks.
///
/// Every maximal run of ASCII-identifier characters (letters, digits,
/// `_`) becomes a `Var` candidate; everything else is literal. When
/// `allow_arg_ref` is set, an `@` immediately followed by a digit run
/// becomes an `ArgRef` instead -- this lets a parameterized macro body
/// splice `@0`, `@1`, ... into the middle of an attribute value, id
/// fragment, or text span, not just occupy a line of its own.
pub fn tokenize_span_ctx(text: &str, allow_arg_ref: bool) -> TextSpan {
    let mut chunks = Vec::new();
    let mut literal = String::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if allow_arg_ref && c == '@' {
            let mut lookahead = chars.clone();
            lookahead.next();
            let digits_start = start + c.len_utf8();
            let mut digits_end = digits_start;
            while let Some(&(_, c2)) = lookahead.peek() {
                if c2.is_ascii_digit() {
                    digits_end += c2.len_utf8();
                    lookahead.next();
                } else {
                    break;
                }
            }
            if digits_end > digits_start {
                if !literal.is_empty() {
                    chunks.push(SpanChunk::Literal(std::mem::take(&mut literal)));
                }
                let index: usize = text[digits_start..digits_end].parse().unwrap_or(0);
                chunks.push(SpanChunk::ArgRef(index));
                chars = lookahead;
                continue;
            }
        }

        if is_ident_char(c) {
            let mut end = start + c.len_utf8();
            chars.next();
            while let Some(&(_, c2)) = chars.peek() {
                if is_ident_char(c2) {
                    end += c2.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            if !literal.is_empty() {
                chunks.push(SpanChunk::Literal(std::mem::take(&mut literal)));
            }
            chunks.push(SpanChunk::Var(text[start..end].to_string()));
        } else {
            literal.push(c);
            chars.next();
        }
    }

    if !literal.is_empty() {
        chunks.push(SpanChunk::Literal(literal));
    }

    chunks
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn first_token(s: &str) -> &str {
    s.split_whitespace().next().unwrap_or("")
}

/// Classify a single scanned-and-stripped line into a [`LineForm`].
///
/// `content` has already had its leading whitespace and any `#//`
/// comment removed by the scanner; `line_number` and `column` are used
/// only to position errors. `in_macro_body` must be set when this line
/// lives inside a parameterized macro body, so embedded `@N` tokens in
/// its spans are recognized as argument placeholders rather than plain
/// text.
pub fn classify_line(
    content: &str,
    line_number: usize,
    column: usize,
    in_macro_body: bool,
) -> Result<LineForm, CompileError> {
    let trimmed = content.trim_end();
    let first = first_token(trimmed);

    if first == "set" {
        return parse_set(trimmed, line_number, column, in_macro_body);
    }
    if first == ":macro" {
        return parse_macro_def(trimmed, line_number, column);
    }
    if first == "raw" || first == "raw@" {
        let rest = trimmed[first.len()..].trim();
        if !rest.is_empty() {
            return Err(CompileError::new(
                ErrorKind::RawBlockMisuse,
                line_number,
                column,
                "`raw` directives may not carry inline content on the same line",
            ));
        }
        return Ok(LineForm::Raw {
            substitute: first == "raw@",
        });
    }
    if let Some(rest) = trimmed.strip_prefix('@') {
        let name = first_token(rest);
        if !name.is_empty() && name.chars().all(|c| c.is_ascii_digit()) {
            let index: usize = name.parse().map_err(|_| {
                CompileError::new(
                    ErrorKind::UnknownDirective,
                    line_number,
                    column,
                    format!("`@{}` is not a valid macro argument index", name),
                )
            })?;
            return Ok(LineForm::MacroArg { index });
        }
        if name.is_empty() {
            return Err(CompileError::new(
                ErrorKind::UnknownDirective,
                line_number,
                column,
                "`@` must be followed by a binding name or argument index",
            ));
        }
        return Ok(LineForm::MacroRef {
            name: name.to_string(),
            parameterized: false,
        });
    }
    if let Some(rest) = trimmed.strip_prefix('!') {
        if rest.to_ascii_uppercase().starts_with("DOCTYPE") {
            return parse_tag(trimmed, line_number, column, in_macro_body);
        }
        let name = first_token(rest);
        if name.is_empty() {
            return Err(CompileError::new(
                ErrorKind::UnknownDirective,
                line_number,
                column,
                "`!` must be followed by a macro name",
            ));
        }
        return Ok(LineForm::MacroRef {
            name: name.to_string(),
            parameterized: true,
        });
    }
    if let Some(rest) = trimmed.strip_prefix('|') {
        return Ok(LineForm::Text {
            span: tokenize_span_ctx(rest.trim_start(), in_macro_body),
            explicit: true,
        });
    }

    if is_tag_head(trimmed) {
        return parse_tag(trimmed, line_number, column, in_macro_body);
    }

    Ok(LineForm::Text {
        span: tokenize_span_ctx(trimmed, in_macro_body),
        explicit: false,
    })
}

fn is_tag_head(s: &str) -> bool {
    let s = s.strip_prefix('<').unwrap_or(s);
    s.chars().next().map(is_ident_start).unwrap_or(false)
}

fn parse_set(
    trimmed: &str,
    line_number: usize,
    column: usize,
    in_macro_body: bool,
) -> Result<LineForm, CompileError> {
    let rest = trimmed["set".len()..].trim_start();
    let name = first_token(rest);
    if name.is_empty() {
        return Err(CompileError::new(
            ErrorKind::UnknownDirective,
            line_number,
            column,
            "`set` requires a binding name",
        ));
    }
    let after_name = rest[name.len()..].trim_start();

    let inline_value = if let Some(value_part) = after_name.strip_prefix('=') {
        let value_part = value_part.trim_start();
        let (value, _) = read_value(value_part);
        Some(tokenize_span_ctx(&value, in_macro_body))
    } else {
        None
    };

    Ok(LineForm::Set {
        name: name.to_string(),
        inline_value,
    })
}

fn parse_macro_def(
    trimmed: &str,
    line_number: usize,
    column: usize,
) -> Result<LineForm, CompileError> {
    let rest = trimmed[":macro".len()..].trim_start();
    let token = first_token(rest);
    if token.is_empty() {
        return Err(CompileError::new(
            ErrorKind::UnknownDirective,
            line_number,
            column,
            "`:macro` requires a name",
        ));
    }
    if let Some(name) = token.strip_prefix('!') {
        if name.is_empty() {
            return Err(CompileError::new(
                ErrorKind::UnknownDirective,
                line_number,
                column,
                "`:macro !` requires a name after `!`",
            ));
        }
        Ok(LineForm::MacroDef {
            name: name.to_string(),
            parameterized: true,
        })
    } else {
        Ok(LineForm::MacroDef {
            name: token.to_string(),
            parameterized: false,
        })
    }
}

/// Read a possibly-quoted value starting at `s`. Returns the
/// unescaped value and the number of source characters consumed.
fn read_value(s: &str) -> (String, usize) {
    let chars: Vec<char> = s.chars().collect();
    if chars.first() == Some(&'"') {
        let mut i = 1;
        let mut buf = String::new();
        while i < chars.len() {
            match chars[i] {
                '\\' if i + 1 < chars.len() => {
                    buf.push(chars[i + 1]);
                    i += 2;
                }
                '"' => {
                    i += 1;
                    break;
                }
                c => {
                    buf.push(c);
                    i += 1;
                }
            }
        }
        (buf, i)
    } else {
        let end = s.find(char::is_whitespace).unwrap_or(s.len());
        (s[..end].to_string(), end)
    }
}

fn parse_tag(
    trimmed: &str,
    line_number: usize,
    column: usize,
    in_macro_body: bool,
) -> Result<LineForm, CompileError> {
    let rest = trimmed.strip_prefix('<').unwrap_or(trimmed);
    let name_end = rest
        .find(|c: char| c.is_whitespace() || c == '>')
        .unwrap_or(rest.len());
    let name = rest[..name_end].to_string();
    let mut after = &rest[name_end..];

    let mut self_closing = false;
    if let Some(stripped) = after.strip_prefix('>') {
        self_closing = true;
        after = stripped;
    }

    let (attrs, text) = parse_attrs(after, line_number, column, in_macro_body)?;

    if self_closing && text.is_some() {
        return Err(CompileError::new(
            ErrorKind::SelfClosingHasChildren,
            line_number,
            column,
            format!("self-closing tag `{}` cannot carry inline text", name),
        ));
    }

    Ok(LineForm::Tag {
        name,
        self_closing,
        attrs,
        text,
    })
}

/// Tokenize the attribute portion of a tag line, stopping at a
/// top-level `|` (which introduces `text_after_pipe`).
fn parse_attrs(
    s: &str,
    line_number: usize,
    column: usize,
    in_macro_body: bool,
) -> Result<(AttrList, Option<TextSpan>), CompileError> {
    let chars: Vec<char> = s.chars().collect();
    let n = chars.len();
    let mut i = 0;
    let mut attrs = Vec::new();

    while i < n {
        while i < n && chars[i].is_whitespace() {
            i += 1;
        }
        if i >= n {
            break;
        }

        if chars[i] == '|' {
            let text: String = chars[i + 1..].iter().collect();
            return Ok((
                attrs,
                Some(tokenize_span_ctx(text.trim_start(), in_macro_body)),
            ));
        }

        if chars[i] == '#' {
            i += 1;
            let start = i;
            while i < n && !chars[i].is_whitespace() {
                i += 1;
            }
            let frag: String = chars[start..i].iter().collect();
            attrs.push(AttrPart::IdFragment {
                value: tokenize_span_ctx(&frag, in_macro_body),
            });
            continue;
        }

        let start = i;
        while i < n && chars[i] != '=' && !chars[i].is_whitespace() && chars[i] != '|' {
            i += 1;
        }
        let name: String = chars[start..i].iter().collect();

        if i < n && chars[i] == '=' {
            if name.is_empty() {
                return Err(CompileError::new(
                    ErrorKind::MalformedAttribute,
                    line_number,
                    column,
                    "`=` must be preceded by an attribute name",
                ));
            }
            i += 1;
            let value = if i < n && chars[i] == '"' {
                i += 1;
                let mut buf = String::new();
                let mut closed = false;
                while i < n {
                    match chars[i] {
                        '\\' if i + 1 < n => {
                            buf.push(chars[i + 1]);
                            i += 2;
                        }
                        '"' => {
                            i += 1;
                            closed = true;
                            break;
                        }
                        c => {
                            buf.push(c);
                            i += 1;
                        }
                    }
                }
                if !closed {
                    return Err(CompileError::new(
                        ErrorKind::MalformedAttribute,
                        line_number,
                        column,
                        format!("unterminated quoted value for attribute `{}`", name),
                    ));
                }
                buf
            } else {
                let vstart = i;
                while i < n && !chars[i].is_whitespace() && chars[i] != '|' {
                    i += 1;
                }
                chars[vstart..i].iter().collect()
            };

            if name == "class" {
                attrs.push(AttrPart::ExplicitClass {
                    value: tokenize_span_ctx(&value, in_macro_body),
                });
            } else {
                attrs.push(AttrPart::Pair {
                    name,
                    value: tokenize_span_ctx(&value, in_macro_body),
                });
            }
        } else if name.is_empty() {
            // A stray character that is neither an identifier, `#`, `=`, nor `|`.
            return Err(CompileError::new(
                ErrorKind::MalformedAttribute,
                line_number,
                column,
                format!("unexpected character `{}` in attribute list", chars[i]),
            ));
        } else {
            attrs.push(AttrPart::Class { word: name });
        }
    }

    Ok((attrs, None))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span_literal(s: &str) -> TextSpan {
        vec![SpanChunk::Literal(s.to_string())]
    }

    #[test]
    fn tokenizes_pure_literal_with_no_identifiers() {
        assert_eq!(tokenize_span("...! "), span_literal("...! "));
    }

    #[test]
    fn tokenizes_literal_then_candidate_var() {
        assert_eq!(
            tokenize_span("hello, world"),
            vec![
                SpanChunk::Var("hello".to_string()),
                SpanChunk::Literal(", ".to_string()),
                SpanChunk::Var("world".to_string()),
            ]
        );
    }

    #[test]
    fn tokenizes_mixed_span() {
        let span = tokenize_span("Hi user.");
        assert_eq!(
            span,
            vec![
                SpanChunk::Literal("Hi ".to_string()),
                SpanChunk::Var("user".to_string()),
                SpanChunk::Literal(".".to_string()),
            ]
        );
    }

    #[test]
    fn tokenize_span_ignores_at_digit_without_arg_ref_context() {
        assert_eq!(
            tokenize_span_ctx("btn-@0", false),
            vec![
                SpanChunk::Var("btn".to_string()),
                SpanChunk::Literal("-@".to_string()),
                SpanChunk::Var("0".to_string()),
            ]
        );
    }

    #[test]
    fn tokenize_span_splices_arg_ref_inside_a_span() {
        assert_eq!(
            tokenize_span_ctx("btn btn-@0", true),
            vec![
                SpanChunk::Var("btn".to_string()),
                SpanChunk::Literal(" btn-".to_string()),
                SpanChunk::ArgRef(0),
            ]
        );
    }

    #[test]
    fn tokenize_span_treats_bare_at_with_no_digits_as_literal() {
        assert_eq!(
            tokenize_span_ctx("a@b", true),
            vec![
                SpanChunk::Var("a".to_string()),
                SpanChunk::Literal("@".to_string()),
                SpanChunk::Var("b".to_string()),
            ]
        );
    }

    #[test]
    fn classify_plain_tag() {
        let form = classify_line("div", 1, 1, false).unwrap();
        match form {
            LineForm::Tag { name, self_closing, attrs, text } => {
                assert_eq!(name, "div");
                assert!(!self_closing);
                assert!(attrs.is_empty());
                assert!(text.is_none());
            }
            other => panic!("expected Tag, got {:?}", other),
        }
    }

    #[test]
    fn classify_tag_recognizes_arg_ref_in_class_value_inside_macro_body() {
        let form = classify_line(r#"button class="btn btn-@0""#, 1, 1, true).unwrap();
        match form {
            LineForm::Tag { attrs, .. } => match &attrs[0] {
                AttrPart::ExplicitClass { value } => {
                    assert!(value.contains(&SpanChunk::ArgRef(0)));
                }
                other => panic!("expected ExplicitClass, got {:?}", other),
            },
            other => panic!("expected Tag, got {:?}", other),
        }
    }

    #[test]
    fn classify_self_closing_tag_with_attrs() {
        let form = classify_line(r#"img> src="logo.png" alt="My Image""#, 1, 1, false).unwrap();
        match form {
            LineForm::Tag { name, self_closing, attrs, .. } => {
                assert_eq!(name, "img");
                assert!(self_closing);
                assert_eq!(attrs.len(), 2);
            }
            other => panic!("expected Tag, got {:?}", other),
        }
    }

    #[test]
    fn classify_tag_with_classes_id_and_pair() {
        let form = classify_line(
            r#"div btn theme class="extra" #user- #userId data-value="some \"quoted\" data""#,
            1,
            1,
            false,
        )
        .unwrap();
        match form {
            LineForm::Tag { name, attrs, .. } => {
                assert_eq!(name, "div");
                assert_eq!(attrs.len(), 6);
                assert!(matches!(attrs[0], AttrPart::Class { .. }));
                assert!(matches!(attrs[1], AttrPart::Class { .. }));
                assert!(matches!(attrs[2], AttrPart::ExplicitClass { .. }));
                assert!(matches!(attrs[3], AttrPart::IdFragment { .. }));
                assert!(matches!(attrs[4], AttrPart::IdFragment { .. }));
                assert!(matches!(attrs[5], AttrPart::Pair { .. }));
            }
            other => panic!("expected Tag, got {:?}", other),
        }
    }

    #[test]
    fn classify_explicit_text_with_pipe() {
        let form = classify_line(r#"p | This is "literal text" for user."#, 1, 1, false).unwrap();
        match form {
            LineForm::Tag { text: Some(span), .. } => {
                assert!(span.contains(&SpanChunk::Var("user".to_string())));
            }
            other => panic!("expected Tag with text, got {:?}", other),
        }
    }

    #[test]
    fn classify_set_with_inline_literal() {
        let form = classify_line(r#"set userId = "123""#, 1, 1, false).unwrap();
        match form {
            LineForm::Set { name, inline_value: Some(span) } => {
                assert_eq!(name, "userId");
                assert_eq!(span, span_literal("123"));
            }
            other => panic!("expected Set, got {:?}", other),
        }
    }

    #[test]
    fn classify_set_without_inline_value() {
        let form = classify_line("set footerContent", 1, 1, false).unwrap();
        assert_eq!(
            form,
            LineForm::Set {
                name: "footerContent".to_string(),
                inline_value: None
            }
        );
    }

    #[test]
    fn classify_nullary_macro_def() {
        let form = classify_line(":macro header", 1, 1, false).unwrap();
        assert_eq!(
            form,
            LineForm::MacroDef { name: "header".to_string(), parameterized: false }
        );
    }

    #[test]
    fn classify_parameterized_macro_def() {
        let form = classify_line(":macro !button", 1, 1, false).unwrap();
        assert_eq!(
            form,
            LineForm::MacroDef { name: "button".to_string(), parameterized: true }
        );
    }

    #[test]
    fn classify_nullary_macro_ref() {
        assert_eq!(
            classify_line("@header", 1, 1, false).unwrap(),
            LineForm::MacroRef { name: "header".to_string(), parameterized: false }
        );
    }

    #[test]
    fn classify_parameterized_macro_ref() {
        assert_eq!(
            classify_line("!button", 1, 1, false).unwrap(),
            LineForm::MacroRef { name: "button".to_string(), parameterized: true }
        );
    }

    #[test]
    fn classify_macro_arg_placeholder() {
        assert_eq!(classify_line("@0", 1, 1, false).unwrap(), LineForm::MacroArg { index: 0 });
        assert_eq!(classify_line("@2", 1, 1, false).unwrap(), LineForm::MacroArg { index: 2 });
    }

    #[test]
    fn classify_raw_directive() {
        assert_eq!(classify_line("raw", 1, 1, false).unwrap(), LineForm::Raw { substitute: false });
        assert_eq!(classify_line("raw@", 1, 1, false).unwrap(), LineForm::Raw { substitute: true });
    }

    #[test]
    fn raw_with_inline_content_is_misuse() {
        let err = classify_line("raw something", 1, 1, false).unwrap_err();
        assert_eq!(err.kind, ErrorKind::RawBlockMisuse);
    }

    #[test]
    fn classify_doctype_as_tag() {
        let form = classify_line("!DOCTYPE html", 1, 1, false).unwrap();
        match form {
            LineForm::Tag { name, attrs, .. } => {
                assert_eq!(name, "!DOCTYPE");
                assert_eq!(attrs.len(), 1);
            }
            other => panic!("expected Tag, got {:?}", other),
        }
    }

    #[test]
    fn custom_element_angle_prefix_strips_sigil() {
        let form = classify_line("<my-widget", 1, 1, false).unwrap();
        match form {
            LineForm::Tag { name, .. } => assert_eq!(name, "my-widget"),
            other => panic!("expected Tag, got {:?}", other),
        }
    }

    #[test]
    fn unterminated_quote_is_malformed() {
        let err = classify_line(r#"div data-x="unterminated"#, 1, 1, false).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedAttribute);
    }

    #[test]
    fn bare_equals_without_name_is_malformed() {
        let err = classify_line(r#"div ="x""#, 1, 1, false).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedAttribute);
    }
}
