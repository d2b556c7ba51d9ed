use crate::dom::{Document, NodeId};
use crate::utils::text::cached_regex;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;

fn transient_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(
        &PATTERN,
        r"(?i)toast|notification|snackbar|alert|modal|dialog|popover|dropdown|tooltip|menu",
    )
}

fn looks_transient(doc: &Document, node: NodeId) -> bool {
    let Some(pattern) = transient_pattern() else {
        return false;
    };
    ["class", "id", "role"]
        .iter()
        .filter_map(|name| doc.attr(node, name))
        .any(|value| pattern.is_match(value))
}

/// Closest ancestor-or-self that looks like floating UI about to go away.
pub fn likely_to_disappear(doc: &Document, node: NodeId) -> Option<NodeId> {
    std::iter::once(node)
        .chain(doc.composed_ancestors(node))
        .find(|candidate| doc.is_element(*candidate) && looks_transient(doc, *candidate))
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrozenElement {
    pub original_style: Option<String>,
    pub original_animation_state: Option<String>,
    pub frozen_at: i64,
}

/// Nodes individually frozen by an assert click.
#[derive(Debug, Default)]
pub struct FrozenElementRegistry {
    entries: HashMap<NodeId, FrozenElement>,
}

impl FrozenElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, node: NodeId) -> Option<&FrozenElement> {
        self.entries.get(&node)
    }

    /// Pauses `node`'s animation and transition inline. False if already frozen.
    pub fn freeze(&mut self, doc: &mut Document, node: NodeId, now: i64) -> bool {
        if self.entries.contains_key(&node) || !doc.is_element(node) {
            return false;
        }
        let mut style = doc.inline_style(node);
        let entry = FrozenElement {
            original_style: doc.attr(node, "style").map(str::to_string),
            original_animation_state: style.get("animation-play-state").map(str::to_string),
            frozen_at: now,
        };
        style.set("animation-play-state", "paused");
        style.set("transition", "none");
        doc.set_inline_style(node, &style);
        self.entries.insert(node, entry);
        debug!(?node, "element frozen");
        true
    }

    /// Puts every frozen node's inline style back and forgets them all.
    pub fn unfreeze_all(&mut self, doc: &mut Document) -> usize {
        let count = self.entries.len();
        for (node, entry) in self.entries.drain() {
            if !doc.is_element(node) {
                continue;
            }
            match entry.original_style {
                Some(style) => doc.set_attr(node, "style", &style),
                None => doc.remove_attr(node, "style"),
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    #[test]
    fn finds_transient_container() {
        let doc = parse_html(
            r#"<body><div class="toast-container"><span id="msg">Saved</span></div><p id="p">Body</p></body>"#,
        )
        .unwrap();
        let msg = doc.by_id("msg").unwrap();
        assert_eq!(
            likely_to_disappear(&doc, msg).and_then(|node| doc.attr(node, "class")),
            Some("toast-container")
        );
        assert_eq!(likely_to_disappear(&doc, doc.by_id("p").unwrap()), None);
    }

    #[test]
    fn freeze_and_restore_inline_style() {
        let mut doc =
            parse_html(r#"<body><div id="t" role="alert" style="color: red">Hi</div></body>"#)
                .unwrap();
        let node = doc.by_id("t").unwrap();
        let mut registry = FrozenElementRegistry::new();
        assert!(registry.freeze(&mut doc, node, 10));
        assert!(!registry.freeze(&mut doc, node, 11));
        assert_eq!(doc.inline_style(node).get("animation-play-state"), Some("paused"));
        assert_eq!(registry.get(node).map(|entry| entry.frozen_at), Some(10));

        assert_eq!(registry.unfreeze_all(&mut doc), 1);
        assert_eq!(doc.attr(node, "style"), Some("color: red"));
        assert!(registry.is_empty());
    }
}
