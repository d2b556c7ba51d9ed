use crate::dom::{Document, NodeId, NodeKind};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

pub fn outer_html(doc: &Document, node: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, node, &mut out);
    out
}

/// Start tag only, e.g. `<button class="primary" type="submit">`.
pub fn open_tag(doc: &Document, node: NodeId) -> String {
    let mut out = String::new();
    if let Some(element) = doc.element(node) {
        write_open_tag(&element.tag_name, &element.attrs, &mut out);
    }
    out
}

fn write_node(doc: &Document, node: NodeId, out: &mut String) {
    match doc.kind(node) {
        Some(NodeKind::Text(text)) => out.push_str(&escape_text(text)),
        Some(NodeKind::Element(element)) => {
            write_open_tag(&element.tag_name, &element.attrs, out);
            if VOID_ELEMENTS.contains(&element.tag_name.as_str()) {
                return;
            }
            for child in doc.children(node) {
                write_node(doc, *child, out);
            }
            out.push_str("</");
            out.push_str(&element.tag_name);
            out.push('>');
        }
        Some(NodeKind::Document) | Some(NodeKind::ShadowRoot { .. }) => {
            for child in doc.children(node) {
                write_node(doc, *child, out);
            }
        }
        None => {}
    }
}

fn write_open_tag(tag: &str, attrs: &[(String, String)], out: &mut String) {
    out.push('<');
    out.push_str(tag);
    for (name, value) in attrs {
        out.push(' ');
        out.push_str(name);
        if !value.is_empty() {
            out.push_str("=\"");
            out.push_str(&escape_attr(value));
            out.push('"');
        }
    }
    out.push('>');
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    #[test]
    fn serializes_void_and_nested_elements() {
        let doc = parse_html(r#"<body><p title="a&quot;b">x &lt; y<br><img alt="logo"></p></body>"#)
            .unwrap();
        let paragraph = crate::dom::query_shadow_all_str(&doc, "p").unwrap()[0];
        assert_eq!(
            outer_html(&doc, paragraph),
            r#"<p title="a&quot;b">x &lt; y<br><img alt="logo"></p>"#
        );
        assert_eq!(open_tag(&doc, paragraph), r#"<p title="a&quot;b">"#);
    }
}
