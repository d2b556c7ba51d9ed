//! Parses generated selector strings back into engines.
//!
//! Grammar: segments joined by `>>>`. A segment is `role=<role>[name="..."]`,
//! `text="..."`, `label="..."`, `css=<selector>` or a bare CSS selector. The
//! first segment searches the document and every shadow root; each later
//! segment searches the shadow roots of the previous segment's matches, and a
//! CSS chain there starts at the shadow root's top-level elements.

use crate::dom::{CssSelector, Document, NodeId};
use crate::errors::{RecorderError, Result};
use crate::selector::matcher::{Engine, MatchSet};

pub const SHADOW_PIERCE: &str = ">>>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorExpr {
    segments: Vec<Engine>,
}

impl SelectorExpr {
    pub fn parse(source: &str) -> Result<Self> {
        let segments = split_segments(source)
            .into_iter()
            .map(|segment| parse_segment(source, segment.trim()))
            .collect::<Result<Vec<_>>>()?;
        if segments.is_empty() {
            return Err(RecorderError::invalid_selector(source, "empty selector"));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Engine] {
        &self.segments
    }

    pub fn resolve(&self, doc: &Document) -> MatchSet {
        let mut current = Vec::new();
        for (index, engine) in self.segments.iter().enumerate() {
            current = if index == 0 {
                engine.query(doc, &[doc.root()])
            } else {
                let shadows: Vec<NodeId> = current
                    .iter()
                    .filter_map(|host| doc.shadow_root(*host))
                    .collect();
                engine.query_rooted(doc, &shadows)
            };
            if current.is_empty() {
                break;
            }
        }
        MatchSet::new(current)
    }
}

/// Parses and resolves `selector`, returning true iff it finds exactly `target`.
pub fn resolves_uniquely_to(doc: &Document, selector: &str, target: NodeId) -> bool {
    SelectorExpr::parse(selector)
        .map(|expr| expr.resolve(doc).is_unique_match(target))
        .unwrap_or(false)
}

fn split_segments(source: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let bytes = source.as_bytes();
    let mut quote: Option<u8> = None;
    let mut start = 0;
    let mut index = 0;
    while index < bytes.len() {
        let byte = bytes[index];
        match quote {
            Some(_) if byte == b'\\' => index += 1,
            Some(open) if byte == open => quote = None,
            Some(_) => {}
            None if byte == b'"' || byte == b'\'' => quote = Some(byte),
            None if bytes[index..].starts_with(SHADOW_PIERCE.as_bytes()) => {
                segments.push(&source[start..index]);
                index += SHADOW_PIERCE.len();
                start = index;
                continue;
            }
            None => {}
        }
        index += 1;
    }
    segments.push(&source[start.min(source.len())..]);
    segments
}

fn parse_segment(source: &str, segment: &str) -> Result<Engine> {
    if segment.is_empty() {
        return Err(RecorderError::invalid_selector(source, "empty segment"));
    }
    if let Some(rest) = segment.strip_prefix("role=") {
        return parse_role(source, rest);
    }
    if let Some(rest) = segment.strip_prefix("text=") {
        return Ok(Engine::Text(parse_whole_quoted(source, rest)?));
    }
    if let Some(rest) = segment.strip_prefix("label=") {
        return Ok(Engine::Label(parse_whole_quoted(source, rest)?));
    }
    let css = segment.strip_prefix("css=").unwrap_or(segment);
    Ok(Engine::Css(CssSelector::parse(css)?))
}

fn parse_role(source: &str, rest: &str) -> Result<Engine> {
    let (role, tail) = match rest.find('[') {
        Some(index) => (&rest[..index], &rest[index..]),
        None => (rest, ""),
    };
    let role = role.trim();
    if role.is_empty() || !role.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-') {
        return Err(RecorderError::invalid_selector(source, "expected role name"));
    }
    if tail.is_empty() {
        return Ok(Engine::Role {
            role: role.to_ascii_lowercase(),
            name: None,
        });
    }
    let inner = tail
        .strip_prefix("[name=")
        .ok_or_else(|| RecorderError::invalid_selector(source, "expected [name=...]"))?;
    let (name, remainder) = parse_quoted(source, inner)?;
    if remainder.trim() != "]" {
        return Err(RecorderError::invalid_selector(source, "expected ']'"));
    }
    Ok(Engine::Role {
        role: role.to_ascii_lowercase(),
        name: Some(name),
    })
}

fn parse_whole_quoted(source: &str, input: &str) -> Result<String> {
    let (value, remainder) = parse_quoted(source, input.trim())?;
    if !remainder.trim().is_empty() {
        return Err(RecorderError::invalid_selector(source, "trailing input"));
    }
    Ok(value)
}

/// Reads a `"..."` string (escapes as written by `quote_css_string`) and
/// returns it with the unread remainder.
fn parse_quoted<'a>(source: &str, input: &'a str) -> Result<(String, &'a str)> {
    let mut chars = input.char_indices();
    let quote = match chars.next() {
        Some((_, ch @ ('"' | '\''))) => ch,
        _ => return Err(RecorderError::invalid_selector(source, "expected quoted string")),
    };
    let mut out = String::new();
    while let Some((index, ch)) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some((next_index, 'a')) => {
                    out.push('\n');
                    if input[next_index + 1..].starts_with(' ') {
                        chars.next();
                    }
                }
                Some((_, escaped)) => out.push(escaped),
                None => break,
            },
            ch if ch == quote => return Ok((out, &input[index + ch.len_utf8()..])),
            ch => out.push(ch),
        }
    }
    Err(RecorderError::invalid_selector(source, "unterminated string"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    #[test]
    fn parses_each_engine() {
        let expr = SelectorExpr::parse(r#"role=button[name="Save \"all\""]"#).unwrap();
        assert_eq!(
            expr.segments(),
            &[Engine::Role {
                role: "button".to_string(),
                name: Some("Save \"all\"".to_string())
            }]
        );
        assert!(matches!(
            SelectorExpr::parse(r#"text="Sign in""#).unwrap().segments(),
            [Engine::Text(text)] if text == "Sign in"
        ));
        assert!(matches!(
            SelectorExpr::parse(r#"label="a >>> b""#).unwrap().segments(),
            [Engine::Label(text)] if text == "a >>> b"
        ));
        assert_eq!(
            SelectorExpr::parse("my-app >>> div > button").unwrap().segments().len(),
            2
        );
        assert!(SelectorExpr::parse("role=[name=\"x\"]").is_err());
        assert!(SelectorExpr::parse("text=\"open").is_err());
    }

    #[test]
    fn shadow_hops_resolve_inside_the_host() {
        let mut doc = parse_html(r#"<body><my-app></my-app><button>Out</button></body>"#).unwrap();
        let host = doc.body().and_then(|body| doc.element_children(body).first().copied()).unwrap();
        let shadow = doc.attach_shadow(host).unwrap();
        let button = doc.create_element("button");
        doc.append_child(shadow, button).unwrap();

        assert!(resolves_uniquely_to(&doc, "my-app >>> button", button));
        assert_eq!(
            SelectorExpr::parse("button").unwrap().resolve(&doc).len(),
            2
        );
    }
}
