//! Small CSS selector engine over [`Document`].
//!
//! Supports type/universal selectors, `#id`, `.class`, `[attr]`, `[attr=value]`,
//! `[attr="value"]`, `:nth-of-type(n)`, `:first-of-type`, descendant and child
//! combinators and selector lists. Matching never crosses a shadow boundary;
//! [`query_shadow_all`] runs the query once per root.

use crate::dom::{Document, NodeId};
use crate::errors::{RecorderError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssSelector {
    alternatives: Vec<ComplexSelector>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ComplexSelector {
    // Rightmost compound last.
    parts: Vec<(Combinator, CompoundSelector)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    None,
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CompoundSelector {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<AttributeCondition>,
    nth_of_type: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeCondition {
    name: String,
    value: Option<String>,
}

impl CssSelector {
    pub fn parse(source: &str) -> Result<Self> {
        let mut parser = Parser {
            chars: source.chars().collect(),
            pos: 0,
            source,
        };
        let alternatives = parser.parse_list()?;
        Ok(Self { alternatives })
    }

    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.matches_anchored(doc, node, None)
    }

    /// Like [`matches`](Self::matches), but the leftmost compound must be a
    /// direct child of `anchor`.
    pub fn matches_anchored(&self, doc: &Document, node: NodeId, anchor: Option<NodeId>) -> bool {
        doc.is_element(node)
            && self
                .alternatives
                .iter()
                .any(|complex| matches_complex(doc, node, &complex.parts, anchor))
    }
}

/// Matches under `scope` (exclusive), in tree order.
pub fn query_all(doc: &Document, scope: NodeId, selector: &CssSelector) -> Vec<NodeId> {
    doc.descendants(scope)
        .into_iter()
        .filter(|node| selector.matches(doc, *node))
        .collect()
}

/// Document-wide query that also searches every shadow root.
pub fn query_shadow_all(doc: &Document, selector: &CssSelector) -> Vec<NodeId> {
    doc.query_roots()
        .into_iter()
        .flat_map(|root| query_all(doc, root, selector))
        .collect()
}

/// Matches inside the tree of `root` whose selector chain starts at one of
/// `root`'s children. Used for the segment after a `>>>` shadow hop.
pub fn query_rooted(doc: &Document, root: NodeId, selector: &CssSelector) -> Vec<NodeId> {
    doc.descendants(root)
        .into_iter()
        .filter(|node| selector.matches_anchored(doc, *node, Some(root)))
        .collect()
}

pub fn query_shadow_all_str(doc: &Document, selector: &str) -> Result<Vec<NodeId>> {
    let selector = CssSelector::parse(selector)?;
    Ok(query_shadow_all(doc, &selector))
}

fn matches_complex(
    doc: &Document,
    node: NodeId,
    parts: &[(Combinator, CompoundSelector)],
    anchor: Option<NodeId>,
) -> bool {
    let Some(((combinator, compound), rest)) = parts.split_last() else {
        return false;
    };
    if !matches_compound(doc, node, compound) {
        return false;
    }
    match combinator {
        Combinator::None => anchor.map_or(true, |root| doc.parent(node) == Some(root)),
        Combinator::Child => doc
            .parent_element(node)
            .map(|parent| matches_complex(doc, parent, rest, anchor))
            .unwrap_or(false),
        Combinator::Descendant => {
            let mut cursor = doc.parent_element(node);
            while let Some(ancestor) = cursor {
                if matches_complex(doc, ancestor, rest, anchor) {
                    return true;
                }
                cursor = doc.parent_element(ancestor);
            }
            false
        }
    }
}

fn matches_compound(doc: &Document, node: NodeId, compound: &CompoundSelector) -> bool {
    let Some(element) = doc.element(node) else {
        return false;
    };
    if let Some(tag) = &compound.tag {
        if element.tag_name != *tag {
            return false;
        }
    }
    if let Some(id) = &compound.id {
        if element.attr("id") != Some(id.as_str()) {
            return false;
        }
    }
    if !compound.classes.is_empty() {
        let classes = doc.classes(node);
        if !compound
            .classes
            .iter()
            .all(|class| classes.contains(&class.as_str()))
        {
            return false;
        }
    }
    for condition in &compound.attributes {
        match (element.attr(&condition.name), &condition.value) {
            (None, _) => return false,
            (Some(actual), Some(expected)) if actual != expected => return false,
            _ => {}
        }
    }
    if let Some(n) = compound.nth_of_type {
        if nth_of_type_index(doc, node) != Some(n) {
            return false;
        }
    }
    true
}

/// 1-based position among same-tag element siblings.
pub fn nth_of_type_index(doc: &Document, node: NodeId) -> Option<usize> {
    let tag = doc.tag_name(node)?;
    let parent = doc.parent(node)?;
    doc.children(parent)
        .iter()
        .filter(|sibling| doc.tag_name(**sibling) == Some(tag))
        .position(|sibling| *sibling == node)
        .map(|index| index + 1)
}

pub fn same_tag_sibling_count(doc: &Document, node: NodeId) -> usize {
    let (Some(tag), Some(parent)) = (doc.tag_name(node), doc.parent(node)) else {
        return 0;
    };
    doc.children(parent)
        .iter()
        .filter(|sibling| doc.tag_name(**sibling) == Some(tag))
        .count()
}

/// Quotes a value for use inside `[attr="..."]`.
pub fn quote_css_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            '\n' => out.push_str("\\a "),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

/// True when `value` can be written as a bare identifier (`#value`, `.value`).
pub fn is_plain_ident(value: &str) -> bool {
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let second = value.chars().nth(1);
    if first.is_ascii_digit() || (first == '-' && second.map_or(true, |ch| ch.is_ascii_digit())) {
        return false;
    }
    (first.is_ascii_alphabetic() || first == '_' || first == '-')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
}

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    source: &'a str,
}

impl<'a> Parser<'a> {
    fn error(&self, message: &str) -> RecorderError {
        RecorderError::invalid_selector(self.source, format!("{} at {}", message, self.pos))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek();
        self.pos += 1;
        ch
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while matches!(self.peek(), Some(ch) if ch.is_whitespace()) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn parse_list(&mut self) -> Result<Vec<ComplexSelector>> {
        let mut list = Vec::new();
        loop {
            self.skip_whitespace();
            list.push(self.parse_complex()?);
            self.skip_whitespace();
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                }
                None => break,
                Some(_) => return Err(self.error("unexpected character")),
            }
        }
        Ok(list)
    }

    fn parse_complex(&mut self) -> Result<ComplexSelector> {
        let mut parts = Vec::new();
        let mut combinator = Combinator::None;
        loop {
            let compound = self.parse_compound()?;
            parts.push((combinator, compound));

            let had_space = self.skip_whitespace();
            match self.peek() {
                Some('>') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    combinator = Combinator::Child;
                }
                Some(',') | None => break,
                Some(_) if had_space => combinator = Combinator::Descendant,
                Some(_) => return Err(self.error("unexpected character")),
            }
        }
        Ok(ComplexSelector { parts })
    }

    fn parse_compound(&mut self) -> Result<CompoundSelector> {
        let mut compound = CompoundSelector::default();
        let start = self.pos;

        if self.peek() == Some('*') {
            self.pos += 1;
        } else if matches!(self.peek(), Some(ch) if is_ident_start(ch)) {
            compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    compound.id = Some(self.parse_ident()?);
                }
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.parse_ident()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attributes.push(self.parse_attribute()?);
                }
                Some(':') => {
                    self.pos += 1;
                    self.parse_pseudo(&mut compound)?;
                }
                _ => break,
            }
        }

        if self.pos == start {
            return Err(self.error("expected selector"));
        }
        Ok(compound)
    }

    fn parse_ident(&mut self) -> Result<String> {
        let mut out = String::new();
        while let Some(ch) = self.peek() {
            if ch == '\\' {
                self.pos += 1;
                let escaped = self.bump().ok_or_else(|| self.error("dangling escape"))?;
                out.push(escaped);
            } else if is_ident_char(ch) {
                out.push(ch);
                self.pos += 1;
            } else {
                break;
            }
        }
        if out.is_empty() {
            return Err(self.error("expected identifier"));
        }
        Ok(out)
    }

    fn parse_attribute(&mut self) -> Result<AttributeCondition> {
        self.skip_whitespace();
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_whitespace();
        let value = match self.bump() {
            Some(']') => return Ok(AttributeCondition { name, value: None }),
            Some('=') => {
                self.skip_whitespace();
                let value = match self.peek() {
                    Some(quote @ ('"' | '\'')) => {
                        self.pos += 1;
                        self.parse_quoted(quote)?
                    }
                    _ => self.parse_ident()?,
                };
                self.skip_whitespace();
                value
            }
            _ => return Err(self.error("unsupported attribute operator")),
        };
        if self.bump() != Some(']') {
            return Err(self.error("expected ']'"));
        }
        Ok(AttributeCondition {
            name,
            value: Some(value),
        })
    }

    fn parse_quoted(&mut self, quote: char) -> Result<String> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some('\\') => match self.bump() {
                    Some('a') => {
                        out.push('\n');
                        if self.peek() == Some(' ') {
                            self.pos += 1;
                        }
                    }
                    Some(ch) => out.push(ch),
                    None => return Err(self.error("dangling escape")),
                },
                Some(ch) if ch == quote => return Ok(out),
                Some(ch) => out.push(ch),
            }
        }
    }

    fn parse_pseudo(&mut self, compound: &mut CompoundSelector) -> Result<()> {
        let name = self.parse_ident()?.to_ascii_lowercase();
        match name.as_str() {
            "first-of-type" => compound.nth_of_type = Some(1),
            "nth-of-type" => {
                if self.bump() != Some('(') {
                    return Err(self.error("expected '('"));
                }
                self.skip_whitespace();
                let mut digits = String::new();
                while let Some(ch) = self.peek().filter(char::is_ascii_digit) {
                    digits.push(ch);
                    self.pos += 1;
                }
                self.skip_whitespace();
                if self.bump() != Some(')') {
                    return Err(self.error("expected ')'"));
                }
                let n = digits
                    .parse::<usize>()
                    .map_err(|_| self.error("expected integer"))?;
                compound.nth_of_type = Some(n);
            }
            _ => return Err(self.error("unsupported pseudo-class")),
        }
        Ok(())
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '-' || !ch.is_ascii()
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '-' || !ch.is_ascii()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    fn fixture() -> Document {
        parse_html(
            r#"<html><body>
                <div id="main" class="panel wide">
                    <ul><li>One</li><li class="x">Two</li><li>Three</li></ul>
                    <input name="q" type="search" data-testid="search box">
                </div>
                <div class="panel"><span>Other</span></div>
            </body></html>"#,
        )
        .unwrap()
    }

    #[test]
    fn matches_compound_and_combinators() {
        let doc = fixture();
        let run = |selector: &str| query_shadow_all_str(&doc, selector).unwrap();

        assert_eq!(run("div.panel").len(), 2);
        assert_eq!(run("#main > ul > li").len(), 3);
        assert_eq!(run("body li:nth-of-type(2)").len(), 1);
        assert_eq!(run("div span, li.x").len(), 2);
        assert_eq!(run(r#"[data-testid="search box"]"#).len(), 1);
        assert_eq!(run("input[name=q][type='search']").len(), 1);
        assert!(run("#main > li").is_empty());
    }

    #[test]
    fn rejects_unsupported_syntax() {
        assert!(CssSelector::parse("div:hover").is_err());
        assert!(CssSelector::parse("[name~=q]").is_err());
        assert!(CssSelector::parse("").is_err());
    }

    #[test]
    fn quoting_round_trips_through_the_parser() {
        let mut doc = fixture();
        let main = doc.by_id("main").unwrap();
        doc.set_attr(main, "title", r#"say "hi" \ bye"#);
        let selector = format!("[title={}]", quote_css_string(r#"say "hi" \ bye"#));
        assert_eq!(query_shadow_all_str(&doc, &selector).unwrap(), vec![main]);
    }

    #[test]
    fn rooted_queries_start_at_the_root_children() {
        let mut doc = fixture();
        let main = doc.by_id("main").unwrap();
        let shadow = doc.attach_shadow(main).unwrap();
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        let span = doc.create_element("span");
        doc.append_child(shadow, outer).unwrap();
        doc.append_child(outer, inner).unwrap();
        doc.append_child(inner, span).unwrap();

        let selector = CssSelector::parse("div > span").unwrap();
        assert_eq!(query_all(&doc, shadow, &selector), vec![span]);
        assert!(query_rooted(&doc, shadow, &selector).is_empty());
        let rooted = CssSelector::parse("div > div > span").unwrap();
        assert_eq!(query_rooted(&doc, shadow, &rooted), vec![span]);
    }

    #[test]
    fn plain_idents() {
        assert!(is_plain_ident("main-nav"));
        assert!(is_plain_ident("_x1"));
        assert!(!is_plain_ident("1st"));
        assert!(!is_plain_ident("-2"));
        assert!(!is_plain_ident("a:b"));
        assert!(!is_plain_ident(""));
    }

    #[test]
    fn shadow_roots_are_queried_separately() {
        let mut doc = fixture();
        let main = doc.by_id("main").unwrap();
        let shadow = doc.attach_shadow(main).unwrap();
        let inner = doc.create_element("button");
        doc.set_attr(inner, "data-testid", "inner");
        doc.append_child(shadow, inner).unwrap();

        assert_eq!(
            query_shadow_all_str(&doc, r#"[data-testid="inner"]"#).unwrap(),
            vec![inner]
        );
        // The shadow tree has no `div` ancestor for its button.
        assert!(query_shadow_all_str(&doc, "div button").unwrap().is_empty());
    }
}
