//! Selectors for elements with no unique semantic signal.

use crate::dom::{is_plain_ident, quote_css_string, Document, NodeId, NodeKind};
use crate::dom::query::{nth_of_type_index, same_tag_sibling_count};
use crate::selector::expr::{resolves_uniquely_to, SelectorExpr, SHADOW_PIERCE};
use crate::utils::text::cached_regex;
use regex::Regex;
use std::sync::OnceLock;

/// Generated or state classes that will not survive the next page load.
pub fn is_ephemeral_class(class: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(pattern) = cached_regex(
        &PATTERN,
        r"^(?:css-|sc-|jsx-|ng-|svelte-|emotion-|_)|^(?:is|has)-|^(?:active|hover|focus|focused|selected|open|opened|show|shown|visible|hidden|disabled|checked|expanded|collapsed|in|fade|animating)$|__[A-Za-z0-9]{4,}$|[0-9a-f]{6,}|\d{3,}",
    ) else {
        return false;
    };
    !is_plain_ident(class) || pattern.is_match(class)
}

/// `#id` or `tag.class` for an ancestor, when it has a stable handle.
fn ancestor_handle(doc: &Document, node: NodeId) -> Option<String> {
    if let Some(id) = doc.attr(node, "id").filter(|id| !id.trim().is_empty()) {
        return Some(if is_plain_ident(id) {
            format!("#{}", id)
        } else {
            format!("[id={}]", quote_css_string(id))
        });
    }
    let tag = doc.tag_name(node)?;
    doc.classes(node)
        .into_iter()
        .find(|class| !is_ephemeral_class(class))
        .map(|class| format!("{}.{}", tag, class))
}

fn scoped_child(doc: &Document, node: NodeId) -> Option<String> {
    let mut selector = doc.tag_name(node)?.to_string();
    for attribute in ["name", "type"] {
        if let Some(value) = doc.attr(node, attribute).filter(|value| !value.is_empty()) {
            selector.push_str(&format!("[{}={}]", attribute, quote_css_string(value)));
        }
    }
    Some(selector)
}

/// Walks up to `max_depth` ancestors looking for one whose handle is unique
/// and under which `tag[name][type]` finds only `node`.
pub fn ancestor_chain(doc: &Document, node: NodeId, max_depth: usize) -> Option<String> {
    let child = scoped_child(doc, node)?;
    let mut cursor = doc.parent_element(node);
    let mut depth = 0;
    while let (Some(ancestor), true) = (cursor, depth < max_depth) {
        if let Some(parent) = ancestor_handle(doc, ancestor) {
            let parent_unique = SelectorExpr::parse(&parent)
                .map(|expr| expr.resolve(doc).is_unique_match(ancestor))
                .unwrap_or(false);
            if parent_unique {
                let selector = format!("{} {}", parent, child);
                if resolves_uniquely_to(doc, &selector, node) {
                    return Some(selector);
                }
            }
        }
        cursor = doc.parent_element(ancestor);
        depth += 1;
    }
    None
}

/// Structural path from the tree root (or the nearest ancestor with a unique
/// id) down to `node`, hopping out of shadow trees with `>>>`.
pub fn css_path(doc: &Document, node: NodeId) -> String {
    let path = build_path(doc, node, true);
    if resolves_uniquely_to(doc, &path, node) {
        return path;
    }
    build_path(doc, node, false)
}

fn build_path(doc: &Document, node: NodeId, stop_at_id: bool) -> String {
    let mut segments = Vec::new();
    let mut current = Some(node);
    while let Some(start) = current {
        let in_shadow = matches!(
            doc.kind(doc.tree_root(start)),
            Some(NodeKind::ShadowRoot { .. })
        );
        segments.push(tree_segment(doc, start, stop_at_id && !in_shadow));
        current = match doc.kind(doc.tree_root(start)) {
            Some(NodeKind::ShadowRoot { host }) => Some(*host),
            _ => None,
        };
    }
    segments.reverse();
    segments.join(&format!(" {} ", SHADOW_PIERCE))
}

fn tree_segment(doc: &Document, node: NodeId, stop_at_id: bool) -> String {
    let mut steps = Vec::new();
    let mut cursor = Some(node);
    while let Some(current) = cursor {
        let Some(tag) = doc.tag_name(current) else {
            break;
        };
        if stop_at_id {
            if let Some(id) = doc.attr(current, "id").filter(|id| is_plain_ident(id)) {
                let step = format!("{}#{}", tag, id);
                if id_is_unique(doc, &step) {
                    steps.push(step);
                    break;
                }
            }
        }
        let mut step = tag.to_string();
        if same_tag_sibling_count(doc, current) > 1 {
            if let Some(index) = nth_of_type_index(doc, current) {
                step.push_str(&format!(":nth-of-type({})", index));
            }
        }
        steps.push(step);
        cursor = doc.parent_element(current);
    }
    steps.reverse();
    steps.join(" > ")
}

fn id_is_unique(doc: &Document, selector: &str) -> bool {
    SelectorExpr::parse(selector)
        .map(|expr| expr.resolve(doc).len() == 1)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    #[test]
    fn classifies_ephemeral_classes() {
        assert!(is_ephemeral_class("css-1x2y3z"));
        assert!(is_ephemeral_class("is-active"));
        assert!(is_ephemeral_class("Button_primary__3xYz1"));
        assert!(is_ephemeral_class("open"));
        assert!(!is_ephemeral_class("checkout-form"));
        assert!(!is_ephemeral_class("nav"));
    }

    #[test]
    fn chains_through_a_stable_ancestor() {
        let doc = parse_html(
            r#"<body>
                <form class="login-form is-open"><div><input id="t" name="user" type="text"></div></form>
                <form class="signup"><input name="user" type="text"></form>
            </body>"#,
        )
        .unwrap();
        let target = doc.by_id("t").unwrap();
        assert_eq!(
            ancestor_chain(&doc, target, 3).as_deref(),
            Some(r#"form.login-form input[name="user"][type="text"]"#)
        );
        assert_eq!(ancestor_chain(&doc, target, 1), None);
    }

    #[test]
    fn path_stops_at_a_unique_id() {
        let doc = parse_html(
            r#"<body><div id="list"><p>a</p><p>b</p></div><div><p>c</p></div></body>"#,
        )
        .unwrap();
        let list = doc.by_id("list").unwrap();
        let second = doc.element_children(list)[1];
        let path = css_path(&doc, second);
        assert_eq!(path, "div#list > p:nth-of-type(2)");
        assert!(resolves_uniquely_to(&doc, &path, second));
    }

    #[test]
    fn path_without_ids_is_anchored_at_html() {
        let doc = parse_html(r#"<body><div><span>a</span></div><div><span>a</span></div></body>"#)
            .unwrap();
        let body = doc.body().unwrap();
        let second_div = doc.element_children(body)[1];
        let span = doc.element_children(second_div)[0];
        let path = css_path(&doc, span);
        assert_eq!(path, "html > body > div:nth-of-type(2) > span");
        assert!(resolves_uniquely_to(&doc, &path, span));
    }

    #[test]
    fn path_hops_into_shadow_trees() {
        let mut doc = parse_html(r#"<body><x-card id="card"></x-card></body>"#).unwrap();
        let host = doc.by_id("card").unwrap();
        let shadow = doc.attach_shadow(host).unwrap();
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        let button = doc.create_element("button");
        doc.append_child(shadow, outer).unwrap();
        doc.append_child(outer, inner).unwrap();
        doc.append_child(inner, button).unwrap();

        let path = css_path(&doc, button);
        assert_eq!(path, "x-card#card >>> div > div > button");
        assert!(resolves_uniquely_to(&doc, &path, button));
    }
}
