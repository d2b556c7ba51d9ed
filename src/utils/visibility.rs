use crate::dom::{Document, NodeId};

/// Visible to a user reading text: laid out with a non-zero box, not hidden
/// through `display`, `visibility` or `aria-hidden`.
pub fn is_visible(doc: &Document, node: NodeId) -> bool {
    doc.is_connected(node)
        && !doc.rect(node).is_empty()
        && doc.is_displayed(node)
        && doc.visibility(node) != "hidden"
        && !doc.is_aria_hidden(node)
}

/// Painted on screen; the criterion screen freeze uses when snapshotting.
pub fn is_rendered(doc: &Document, node: NodeId) -> bool {
    doc.is_connected(node)
        && !doc.rect(node).is_empty()
        && doc.is_displayed(node)
        && doc.visibility(node) != "hidden"
        && doc.opacity(node) > 0.01
}
