use crate::dom::{Document, NodeId};
use crate::utils::text::normalize_whitespace;

/// Roles that still make a usable locator without an accessible name.
pub const NAME_OPTIONAL_ROLES: &[&str] = &["button", "checkbox", "radio", "link"];

pub fn is_form_control(doc: &Document, node: NodeId) -> bool {
    matches!(doc.tag_name(node), Some("input" | "textarea" | "select"))
}

fn is_labelable(doc: &Document, node: NodeId) -> bool {
    is_form_control(doc, node)
        || matches!(doc.tag_name(node), Some("button" | "meter" | "output" | "progress"))
}

pub fn input_type(doc: &Document, node: NodeId) -> String {
    doc.attr(node, "type")
        .map(|kind| kind.trim().to_ascii_lowercase())
        .filter(|kind| !kind.is_empty())
        .unwrap_or_else(|| "text".to_string())
}

/// Explicit `role` (first token) or the role implied by tag and type.
pub fn role(doc: &Document, node: NodeId) -> Option<String> {
    if let Some(explicit) = doc
        .attr(node, "role")
        .and_then(|role| role.split_whitespace().next())
    {
        return Some(explicit.to_ascii_lowercase());
    }
    implicit_role(doc, node).map(str::to_string)
}

pub fn implicit_role(doc: &Document, node: NodeId) -> Option<&'static str> {
    let tag = doc.tag_name(node)?;
    let role = match tag {
        "a" | "area" if doc.has_attr(node, "href") => "link",
        "button" => "button",
        "input" => match input_type(doc, node).as_str() {
            "button" | "submit" | "reset" | "image" => "button",
            "checkbox" => "checkbox",
            "radio" => "radio",
            "range" => "slider",
            "number" => "spinbutton",
            "search" => "searchbox",
            "email" | "tel" | "text" | "url" | "password" => "textbox",
            _ => return None,
        },
        "textarea" => "textbox",
        "select" => {
            let multiple = doc.has_attr(node, "multiple");
            let size = doc
                .attr(node, "size")
                .and_then(|size| size.parse::<u32>().ok())
                .unwrap_or(0);
            if multiple || size > 1 {
                "listbox"
            } else {
                "combobox"
            }
        }
        "option" => "option",
        "img" if doc.attr(node, "alt") != Some("") => "img",
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => "heading",
        "ul" | "ol" => "list",
        "li" => "listitem",
        "nav" => "navigation",
        "main" => "main",
        "dialog" => "dialog",
        "table" => "table",
        "tr" => "row",
        "td" => "cell",
        "th" => "columnheader",
        "form" => "form",
        "progress" => "progressbar",
        "summary" => "button",
        _ => return None,
    };
    Some(role)
}

/// Label text from `aria-labelledby`, `aria-label`, `label[for]` or a wrapping `<label>`.
pub fn label_text(doc: &Document, node: NodeId) -> Option<String> {
    if let Some(ids) = doc.attr(node, "aria-labelledby") {
        let joined = ids
            .split_whitespace()
            .filter_map(|id| doc.by_id(id))
            .map(|label| normalize_whitespace(&doc.text_content(label)))
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !joined.is_empty() {
            return Some(joined);
        }
    }

    if let Some(label) = doc.attr(node, "aria-label").map(normalize_whitespace) {
        if !label.is_empty() {
            return Some(label);
        }
    }

    if !is_labelable(doc, node) {
        return None;
    }

    if let Some(id) = doc.attr(node, "id").filter(|id| !id.is_empty()) {
        let root = doc.tree_root(node);
        let for_label = doc
            .descendants(root)
            .into_iter()
            .find(|candidate| {
                doc.tag_name(*candidate) == Some("label") && doc.attr(*candidate, "for") == Some(id)
            });
        if let Some(label) = for_label {
            let text = normalize_whitespace(&doc.text_content(label));
            if !text.is_empty() {
                return Some(text);
            }
        }
    }

    doc.ancestors(node)
        .into_iter()
        .find(|ancestor| doc.tag_name(*ancestor) == Some("label"))
        .map(|label| normalize_whitespace(&doc.text_content(label)))
        .filter(|text| !text.is_empty())
}

/// Accessible name: label, then placeholder, title, alt, button value, then subtree text.
pub fn accessible_name(doc: &Document, node: NodeId) -> String {
    if let Some(label) = label_text(doc, node) {
        return label;
    }

    for attribute in ["placeholder", "title", "alt"] {
        if let Some(value) = doc.attr(node, attribute).map(normalize_whitespace) {
            if !value.is_empty() {
                return value;
            }
        }
    }

    if doc.tag_name(node) == Some("input") {
        let kind = input_type(doc, node);
        if matches!(kind.as_str(), "button" | "submit" | "reset") {
            let value = normalize_whitespace(&doc.value(node));
            if !value.is_empty() {
                return value;
            }
            return match kind.as_str() {
                "submit" => "Submit".to_string(),
                "reset" => "Reset".to_string(),
                _ => String::new(),
            };
        }
        return String::new();
    }

    if matches!(doc.tag_name(node), Some("textarea" | "select")) {
        return String::new();
    }

    normalize_whitespace(&subtree_text(doc, node))
}

fn subtree_text(doc: &Document, node: NodeId) -> String {
    let mut parts = Vec::new();
    for child in doc.children(node) {
        if let Some(text) = doc.text(*child) {
            parts.push(text.to_string());
            continue;
        }
        if !doc.is_element(*child) || doc.is_aria_hidden(*child) {
            continue;
        }
        if matches!(doc.tag_name(*child), Some("script" | "style")) {
            continue;
        }
        if let Some(label) = doc.attr(*child, "aria-label") {
            parts.push(label.to_string());
        } else if doc.tag_name(*child) == Some("img") {
            parts.push(doc.attr(*child, "alt").unwrap_or("").to_string());
        } else {
            parts.push(subtree_text(doc, *child));
        }
    }
    parts.join(" ")
}
