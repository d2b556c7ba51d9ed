//! Keeps visible nodes on screen while the page is frozen: a node the page
//! removes is put straight back under `body`, pinned where it was last seen.

use crate::dom::{Document, NodeId};
use crate::errors::{RecorderError, Result};
use crate::types::ElementRect;
use crate::utils::panel::is_in_tool_panel;
use crate::utils::visibility::is_rendered;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Stacking level used when the node never had one.
const RESTORED_Z_INDEX: i64 = 2_147_483_000;

const STRUCTURAL_TAGS: &[&str] = &["html", "head", "body", "style", "script"];

#[derive(Debug, Clone, PartialEq)]
pub struct ProtectedNode {
    pub parent: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    pub rect: ElementRect,
    pub z_index: Option<i64>,
}

#[derive(Debug, Clone)]
struct RestoredNode {
    node: NodeId,
    original_style: Option<String>,
}

#[derive(Debug, Default)]
pub struct ProtectionRegistry {
    nodes: HashMap<NodeId, ProtectedNode>,
    restored: Vec<RestoredNode>,
    panel_attribute: String,
}

impl ProtectionRegistry {
    pub fn new(panel_attribute: &str) -> Self {
        Self {
            nodes: HashMap::new(),
            restored: Vec::new(),
            panel_attribute: panel_attribute.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    pub fn get(&self, node: NodeId) -> Option<&ProtectedNode> {
        self.nodes.get(&node)
    }

    pub fn restored(&self) -> Vec<NodeId> {
        self.restored.iter().map(|entry| entry.node).collect()
    }

    fn eligible(&self, doc: &Document, node: NodeId) -> bool {
        doc.tag_name(node)
            .map_or(false, |tag| !STRUCTURAL_TAGS.contains(&tag))
            && !is_in_tool_panel(doc, node, &self.panel_attribute)
            && is_rendered(doc, node)
    }

    /// Records `node` if it is currently rendered. Returns whether it was added.
    pub fn protect(&mut self, doc: &Document, node: NodeId) -> bool {
        if !self.eligible(doc, node) {
            return false;
        }
        let entry = ProtectedNode {
            parent: doc.parent(node),
            next_sibling: doc.next_sibling(node),
            rect: doc.rect(node),
            z_index: doc.z_index(node),
        };
        self.nodes.insert(node, entry).is_none()
    }

    /// Every rendered element of the document and its shadow trees.
    pub fn snapshot(&mut self, doc: &Document) -> usize {
        let mut added = 0;
        for root in doc.query_roots() {
            for node in doc.descendants(root) {
                if self.protect(doc, node) {
                    added += 1;
                }
            }
        }
        debug!(added, "protection snapshot taken");
        added
    }

    /// `node` and its rendered descendants, after an insertion.
    pub fn protect_subtree(&mut self, doc: &Document, node: NodeId) -> usize {
        std::iter::once(node)
            .chain(doc.descendants(node))
            .filter(|candidate| self.protect(doc, *candidate))
            .count()
    }

    /// Puts a removed protected node back. `Ok(false)` when the node is not
    /// protected or is still connected.
    pub fn restore(&mut self, doc: &mut Document, node: NodeId) -> Result<bool> {
        let Some(entry) = self.nodes.get(&node).cloned() else {
            return Ok(false);
        };
        if doc.is_connected(node) {
            return Ok(false);
        }
        let body = doc
            .body()
            .ok_or_else(|| RecorderError::NodeNotFound("body".to_string()))?;
        let original_style = doc.attr(node, "style").map(str::to_string);

        let mut style = doc.inline_style(node);
        style.set("position", "fixed");
        style.set("left", &format!("{}px", entry.rect.x));
        style.set("top", &format!("{}px", entry.rect.y));
        style.set("width", &format!("{}px", entry.rect.width));
        style.set("height", &format!("{}px", entry.rect.height));
        style.set(
            "z-index",
            &entry.z_index.unwrap_or(RESTORED_Z_INDEX).to_string(),
        );
        style.set("visibility", "visible");
        style.set("opacity", "1");
        if style.get("display") == Some("none") {
            style.remove("display");
        }
        doc.set_inline_style(node, &style);
        doc.append_child(body, node)?;

        self.restored.push(RestoredNode {
            node,
            original_style,
        });
        debug!(?node, "removed node restored");
        Ok(true)
    }

    /// Detaches every node `restore` put back, with its own style, so the
    /// page ends up the way its scripts left it.
    pub fn detach_restored(&mut self, doc: &mut Document) -> usize {
        let mut detached = 0;
        for entry in std::mem::take(&mut self.restored) {
            match &entry.original_style {
                Some(style) => doc.set_attr(entry.node, "style", style),
                None => doc.remove_attr(entry.node, "style"),
            }
            if doc.parent(entry.node).is_none() {
                continue;
            }
            match doc.remove(entry.node) {
                Ok(()) => detached += 1,
                Err(err) => warn!(node = ?entry.node, "could not detach restored node: {}", err),
            }
        }
        detached
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.restored.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    #[test]
    fn snapshot_skips_hidden_and_panel_nodes() {
        let doc = parse_html(
            r#"<body><div id="toast">Saved</div><div id="gone" style="display:none">x</div><div data-recorder-panel="assert"><input id="field"></div></body>"#,
        )
        .unwrap();
        let mut registry = ProtectionRegistry::new("data-recorder-panel");
        registry.snapshot(&doc);
        assert!(registry.contains(doc.by_id("toast").unwrap()));
        assert!(!registry.contains(doc.by_id("gone").unwrap()));
        assert!(!registry.contains(doc.by_id("field").unwrap()));
        assert!(!registry.contains(doc.body().unwrap()));
    }

    #[test]
    fn restores_then_detaches_removed_nodes() {
        let mut doc = parse_html(
            r#"<body><div id="wrap"><div id="toast" style="left: 30px; top: 40px; width: 200px; height: 50px">Saved</div></div></body>"#,
        )
        .unwrap();
        let toast = doc.by_id("toast").unwrap();
        let mut registry = ProtectionRegistry::new("data-recorder-panel");
        registry.snapshot(&doc);

        doc.remove(toast).unwrap();
        assert!(registry.restore(&mut doc, toast).unwrap());
        assert!(doc.is_connected(toast));
        assert_eq!(doc.parent(toast), doc.body());
        let style = doc.inline_style(toast);
        assert_eq!(style.get("position"), Some("fixed"));
        assert_eq!(style.get("top"), Some("40px"));
        assert!(!registry.restore(&mut doc, toast).unwrap());

        assert_eq!(registry.detach_restored(&mut doc), 1);
        assert!(!doc.is_connected(toast));
        assert_eq!(doc.inline_style(toast).get("position"), None);
    }
}
