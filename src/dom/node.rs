use crate::dom::style::InlineStyle;
use crate::errors::{RecorderError, Result};
use crate::types::ElementRect;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_WIDTH: f64 = 100.0;
const DEFAULT_HEIGHT: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Document,
    Element(ElementData),
    Text(String),
    ShadowRoot { host: NodeId },
}

#[derive(Debug, Clone)]
pub struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

#[derive(Debug, Clone, Default)]
pub struct ElementData {
    pub tag_name: String,
    pub attrs: Vec<(String, String)>,
    pub value: String,
    pub checked: bool,
    pub files: Vec<SelectedFile>,
    pub rect: Option<ElementRect>,
    pub shadow_root: Option<NodeId>,
}

impl ElementData {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// A file picked into an `input[type=file]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFile {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub last_modified: i64,
    pub source: FileSource,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FileSource {
    Bytes(Vec<u8>),
    Path(PathBuf),
}

impl SelectedFile {
    pub fn from_bytes(name: &str, mime_type: &str, bytes: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            size: bytes.len() as u64,
            last_modified: 0,
            source: FileSource::Bytes(bytes),
        }
    }

    pub fn from_path(name: &str, mime_type: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            size: 0,
            last_modified: 0,
            source: FileSource::Path(path.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRecord {
    Added {
        parent: NodeId,
        node: NodeId,
    },
    Removed {
        parent: NodeId,
        node: NodeId,
        next_sibling: Option<NodeId>,
    },
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    mutation_log: Option<Vec<MutationRecord>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
            }],
            mutation_log: None,
        }
    }

    /// Empty `html > head + body` skeleton.
    pub fn with_body() -> Self {
        let mut doc = Self::new();
        let root = doc.root();
        let html = doc.create_element("html");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        let _ = doc.append_child(root, html);
        let _ = doc.append_child(html, head);
        let _ = doc.append_child(html, body);
        doc
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            kind,
        });
        id
    }

    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        self.push_node(NodeKind::Element(ElementData {
            tag_name: tag_name.to_ascii_lowercase(),
            ..Default::default()
        }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push_node(NodeKind::Text(text.to_string()))
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn checked_node(&self, id: NodeId) -> Result<&Node> {
        self.node(id)
            .ok_or_else(|| RecorderError::NodeNotFound(format!("{:?}", id)))
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).map(|node| &node.kind)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Element(_)))
    }

    pub fn is_shadow_root(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::ShadowRoot { .. }))
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.kind(id) {
            Some(NodeKind::Element(element)) => Some(element),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match self.nodes.get_mut(id.0).map(|node| &mut node.kind) {
            Some(NodeKind::Element(element)) => Some(element),
            _ => None,
        }
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|element| element.tag_name.as_str())
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn set_text(&mut self, id: NodeId, value: &str) {
        if let Some(NodeKind::Text(text)) = self.nodes.get_mut(id.0).map(|node| &mut node.kind) {
            *text = value.to_string();
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|node| node.parent)
    }

    /// Parent element, stepping from a shadow root to its host.
    pub fn composed_parent(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        match self.kind(parent) {
            Some(NodeKind::ShadowRoot { host }) => Some(*host),
            _ => Some(parent),
        }
    }

    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|parent| self.is_element(*parent))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.is_element(*child))
            .collect()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|sibling| *sibling == id)?;
        siblings.get(index + 1).copied()
    }

    /// Ancestors within the same tree, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.parent(id);
        while let Some(current) = cursor {
            out.push(current);
            cursor = self.parent(current);
        }
        out
    }

    /// Ancestor elements crossing shadow boundaries, nearest first.
    pub fn composed_ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.composed_parent(id);
        while let Some(current) = cursor {
            if self.is_element(current) {
                out.push(current);
            }
            cursor = self.composed_parent(current);
        }
        out
    }

    pub fn is_descendant_of(&self, id: NodeId, ancestor: NodeId) -> bool {
        self.ancestors(id).contains(&ancestor)
    }

    /// Topmost node of the tree containing `id` (document, shadow root or detached subtree).
    pub fn tree_root(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    pub fn is_connected(&self, id: NodeId) -> bool {
        if self.node(id).is_none() {
            return false;
        }
        let root = self.tree_root(id);
        match self.kind(root) {
            Some(NodeKind::Document) => true,
            Some(NodeKind::ShadowRoot { host }) => self.is_connected(*host),
            _ => false,
        }
    }

    /// Element descendants of `scope` in tree order, not entering shadow trees.
    pub fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            if self.is_element(current) {
                out.push(current);
            }
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Document root followed by every connected shadow root, in tree order.
    pub fn query_roots(&self) -> Vec<NodeId> {
        let mut roots = vec![self.root()];
        let mut index = 0;
        while index < roots.len() {
            let scope = roots[index];
            for element in self.descendants(scope) {
                if let Some(shadow) = self.shadow_root(element) {
                    roots.push(shadow);
                }
            }
            index += 1;
        }
        roots
    }

    pub fn attach_shadow(&mut self, host: NodeId) -> Result<NodeId> {
        if let Some(existing) = self.shadow_root(host) {
            return Ok(existing);
        }
        if !self.is_element(host) {
            return Err(RecorderError::NodeNotFound(format!(
                "shadow host {:?} is not an element",
                host
            )));
        }
        let shadow = self.push_node(NodeKind::ShadowRoot { host });
        if let Some(element) = self.element_mut(host) {
            element.shadow_root = Some(shadow);
        }
        Ok(shadow)
    }

    pub fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        self.element(host).and_then(|element| element.shadow_root)
    }

    pub fn document_element(&self) -> Option<NodeId> {
        self.element_children(self.root()).first().copied()
    }

    pub fn head(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.element_children(html)
            .into_iter()
            .find(|child| self.tag_name(*child) == Some("head"))
    }

    pub fn body(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.element_children(html)
            .into_iter()
            .find(|child| self.tag_name(*child) == Some("body"))
    }

    pub fn by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .find(|node| self.attr(*node, "id") == Some(id))
    }

    // ---- tree mutation ----

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.insert_before(parent, child, None)
    }

    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<()> {
        self.checked_node(parent)?;
        self.checked_node(child)?;
        if parent == child || self.is_descendant_of(parent, child) {
            return Err(RecorderError::NodeNotFound(format!(
                "cannot insert {:?} into its own subtree",
                child
            )));
        }
        if self.parent(child).is_some() {
            self.remove(child)?;
        }
        let position = match reference {
            Some(reference) => self
                .children(parent)
                .iter()
                .position(|sibling| *sibling == reference)
                .ok_or_else(|| {
                    RecorderError::NodeNotFound(format!(
                        "reference {:?} is not a child of {:?}",
                        reference, parent
                    ))
                })?,
            None => self.children(parent).len(),
        };
        self.nodes[parent.0].children.insert(position, child);
        self.nodes[child.0].parent = Some(parent);
        if let Some(log) = self.mutation_log.as_mut() {
            log.push(MutationRecord::Added {
                parent,
                node: child,
            });
        }
        Ok(())
    }

    pub fn remove(&mut self, node: NodeId) -> Result<()> {
        let parent = self
            .parent(node)
            .ok_or_else(|| RecorderError::DetachedNode(format!("{:?}", node)))?;
        let next_sibling = self.next_sibling(node);
        self.nodes[parent.0].children.retain(|child| *child != node);
        self.nodes[node.0].parent = None;
        if let Some(log) = self.mutation_log.as_mut() {
            log.push(MutationRecord::Removed {
                parent,
                node,
                next_sibling,
            });
        }
        Ok(())
    }

    // ---- mutation observation ----

    pub fn observe_mutations(&mut self) {
        if self.mutation_log.is_none() {
            self.mutation_log = Some(Vec::new());
        }
    }

    pub fn disconnect_observer(&mut self) {
        self.mutation_log = None;
    }

    pub fn is_observing(&self) -> bool {
        self.mutation_log.is_some()
    }

    pub fn take_mutations(&mut self) -> Vec<MutationRecord> {
        self.mutation_log
            .as_mut()
            .map(std::mem::take)
            .unwrap_or_default()
    }

    // ---- attributes ----

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|element| element.attr(name))
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        let Some(element) = self.element_mut(id) else {
            return;
        };
        match element.attrs.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => element.attrs.push((name.clone(), value.to_string())),
        }
        match name.as_str() {
            "value" if element.tag_name != "select" => element.value = value.to_string(),
            "checked" => element.checked = true,
            _ => {}
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(element) = self.element_mut(id) {
            element.attrs.retain(|(key, _)| key != name);
        }
    }

    pub fn attrs(&self, id: NodeId) -> &[(String, String)] {
        self.element(id)
            .map(|element| element.attrs.as_slice())
            .unwrap_or(&[])
    }

    pub fn classes(&self, id: NodeId) -> Vec<&str> {
        self.attr(id, "class")
            .map(|class| class.split_whitespace().collect())
            .unwrap_or_default()
    }

    // ---- form state ----

    pub fn value(&self, id: NodeId) -> String {
        self.element(id)
            .map(|element| element.value.clone())
            .unwrap_or_default()
    }

    pub fn set_value(&mut self, id: NodeId, value: &str) {
        if let Some(element) = self.element_mut(id) {
            element.value = value.to_string();
        }
    }

    pub fn checked(&self, id: NodeId) -> bool {
        self.element(id).map(|element| element.checked).unwrap_or(false)
    }

    pub fn set_checked(&mut self, id: NodeId, checked: bool) {
        if let Some(element) = self.element_mut(id) {
            element.checked = checked;
        }
    }

    pub fn files(&self, id: NodeId) -> &[SelectedFile] {
        self.element(id)
            .map(|element| element.files.as_slice())
            .unwrap_or(&[])
    }

    pub fn set_files(&mut self, id: NodeId, files: Vec<SelectedFile>) {
        if let Some(element) = self.element_mut(id) {
            element.files = files;
        }
    }

    /// Options of a `select`, including those nested in `optgroup`s.
    pub fn select_options(&self, select: NodeId) -> Vec<NodeId> {
        self.descendants(select)
            .into_iter()
            .filter(|node| self.tag_name(*node) == Some("option"))
            .collect()
    }

    pub fn option_value(&self, option: NodeId) -> String {
        self.attr(option, "value")
            .map(str::to_string)
            .unwrap_or_else(|| crate::utils::text::normalize_whitespace(&self.text_content(option)))
    }

    pub fn selected_option(&self, select: NodeId) -> Option<NodeId> {
        let value = self.value(select);
        let options = self.select_options(select);
        options
            .iter()
            .copied()
            .find(|option| self.option_value(*option) == value)
            .or_else(|| options.first().copied())
    }

    /// Picks the option carrying `value` and syncs the select's form value.
    pub fn select_option(&mut self, select: NodeId, value: &str) -> bool {
        let found = self
            .select_options(select)
            .into_iter()
            .any(|option| self.option_value(option) == value);
        if found {
            self.set_value(select, value);
        }
        found
    }

    /// Initial select values come from `option[selected]`, else the first option.
    pub fn sync_select_values(&mut self) {
        let selects: Vec<NodeId> = self
            .descendants(self.root())
            .into_iter()
            .filter(|node| self.tag_name(*node) == Some("select"))
            .collect();
        for select in selects {
            let options = self.select_options(select);
            let chosen = options
                .iter()
                .copied()
                .find(|option| self.has_attr(*option, "selected"))
                .or_else(|| options.first().copied());
            if let Some(option) = chosen {
                let value = self.option_value(option);
                self.set_value(select, &value);
            }
        }
    }

    // ---- text ----

    /// Concatenated descendant text; shadow content is not included.
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        let mut out = String::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            match self.kind(current) {
                Some(NodeKind::Text(text)) => out.push_str(text),
                Some(NodeKind::Element(element))
                    if element.tag_name == "script" || element.tag_name == "style" => {}
                _ => stack.extend(self.children(current).iter().rev().copied()),
            }
        }
        out
    }

    /// Text of the direct text-node children only.
    pub fn own_text(&self, id: NodeId) -> String {
        self.children(id)
            .iter()
            .filter_map(|child| self.text(*child))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn set_text_content(&mut self, id: NodeId, value: &str) -> Result<()> {
        for child in self.children(id).to_vec() {
            self.remove(child)?;
        }
        let text = self.create_text(value);
        self.append_child(id, text)
    }

    // ---- style and layout ----

    pub fn inline_style(&self, id: NodeId) -> InlineStyle {
        InlineStyle::parse(self.attr(id, "style").unwrap_or(""))
    }

    pub fn set_inline_style(&mut self, id: NodeId, style: &InlineStyle) {
        if style.is_empty() {
            self.remove_attr(id, "style");
        } else {
            self.set_attr(id, "style", &style.to_css());
        }
    }

    pub fn set_style_property(&mut self, id: NodeId, name: &str, value: &str) {
        let mut style = self.inline_style(id);
        style.set(name, value);
        self.set_inline_style(id, &style);
    }

    pub fn set_rect(&mut self, id: NodeId, rect: ElementRect) {
        if let Some(element) = self.element_mut(id) {
            element.rect = Some(rect);
        }
    }

    /// Layout box: explicit rect, else inline `left/top/width/height`, else a default box.
    pub fn rect(&self, id: NodeId) -> ElementRect {
        let Some(element) = self.element(id) else {
            return ElementRect::zero();
        };
        if let Some(rect) = element.rect {
            return rect;
        }
        let style = self.inline_style(id);
        ElementRect::new(
            style.px("left").unwrap_or(0.0),
            style.px("top").unwrap_or(0.0),
            style.px("width").unwrap_or(DEFAULT_WIDTH),
            style.px("height").unwrap_or(DEFAULT_HEIGHT),
        )
    }

    pub fn is_displayed(&self, id: NodeId) -> bool {
        std::iter::once(id)
            .chain(self.composed_ancestors(id))
            .all(|node| {
                !self.has_attr(node, "hidden")
                    && self.inline_style(node).get("display") != Some("none")
            })
    }

    pub fn visibility(&self, id: NodeId) -> String {
        std::iter::once(id)
            .chain(self.composed_ancestors(id))
            .find_map(|node| self.inline_style(node).get("visibility").map(str::to_string))
            .unwrap_or_else(|| "visible".to_string())
    }

    pub fn opacity(&self, id: NodeId) -> f64 {
        std::iter::once(id)
            .chain(self.composed_ancestors(id))
            .filter_map(|node| {
                self.inline_style(node)
                    .get("opacity")
                    .and_then(|value| value.parse::<f64>().ok())
            })
            .product()
    }

    pub fn z_index(&self, id: NodeId) -> Option<i64> {
        self.inline_style(id)
            .get("z-index")
            .and_then(|value| value.parse::<i64>().ok())
    }

    pub fn is_aria_hidden(&self, id: NodeId) -> bool {
        std::iter::once(id)
            .chain(self.composed_ancestors(id))
            .any(|node| self.attr(node, "aria-hidden") == Some("true"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removal_is_logged_only_while_observing() {
        let mut doc = Document::with_body();
        let body = doc.body().unwrap();
        let toast = doc.create_element("div");
        let after = doc.create_element("span");
        doc.append_child(body, toast).unwrap();
        doc.append_child(body, after).unwrap();

        assert!(doc.take_mutations().is_empty());

        doc.observe_mutations();
        doc.remove(toast).unwrap();
        let records = doc.take_mutations();
        assert_eq!(
            records,
            vec![MutationRecord::Removed {
                parent: body,
                node: toast,
                next_sibling: Some(after),
            }]
        );
        assert!(!doc.is_connected(toast));
    }

    #[test]
    fn shadow_content_is_connected_through_host() {
        let mut doc = Document::with_body();
        let body = doc.body().unwrap();
        let host = doc.create_element("my-widget");
        doc.append_child(body, host).unwrap();
        let shadow = doc.attach_shadow(host).unwrap();
        let button = doc.create_element("button");
        doc.append_child(shadow, button).unwrap();

        assert!(doc.is_connected(button));
        assert_eq!(doc.composed_parent(button), Some(host));
        assert_eq!(doc.query_roots(), vec![doc.root(), shadow]);

        doc.remove(host).unwrap();
        assert!(!doc.is_connected(button));
    }

    #[test]
    fn style_driven_visibility() {
        let mut doc = Document::with_body();
        let body = doc.body().unwrap();
        let wrapper = doc.create_element("div");
        let inner = doc.create_element("span");
        doc.append_child(body, wrapper).unwrap();
        doc.append_child(wrapper, inner).unwrap();

        doc.set_attr(wrapper, "style", "opacity: 0.5; visibility: hidden");
        doc.set_attr(inner, "style", "opacity: 0.5");
        assert_eq!(doc.visibility(inner), "hidden");
        assert!((doc.opacity(inner) - 0.25).abs() < f64::EPSILON);

        doc.set_style_property(wrapper, "display", "none");
        assert!(!doc.is_displayed(inner));
    }
}
