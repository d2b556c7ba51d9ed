use crate::dom::{Document, NodeId};

/// True when `node` sits inside one of the recorder's own panels (assertion
/// input, data-query, API-request, variable picker), marked with
/// `panel_attribute` on the panel root. Shadow boundaries are crossed.
pub fn is_in_tool_panel(doc: &Document, node: NodeId, panel_attribute: &str) -> bool {
    std::iter::once(node)
        .chain(doc.composed_ancestors(node))
        .any(|candidate| doc.has_attr(candidate, panel_attribute))
}

/// Name of the panel `node` belongs to, if any.
pub fn tool_panel_name<'a>(doc: &'a Document, node: NodeId, panel_attribute: &str) -> Option<&'a str> {
    std::iter::once(node)
        .chain(doc.composed_ancestors(node))
        .find_map(|candidate| doc.attr(candidate, panel_attribute))
}
