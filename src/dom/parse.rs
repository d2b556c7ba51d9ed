use crate::dom::{Document, NodeId};
use crate::errors::Result;
use scraper::{ElementRef, Html};
use tracing::debug;

/// Builds a [`Document`] from markup using the html5ever parser behind `scraper`.
///
/// `<template shadowrootmode="open">` children become the parent's shadow root,
/// the declarative form of `attachShadow`.
pub fn parse_html(html: &str) -> Result<Document> {
    let parsed = Html::parse_document(html);
    if !parsed.errors.is_empty() {
        debug!("html parsed with {} recoverable errors", parsed.errors.len());
    }

    let mut doc = Document::new();
    let root = doc.root();
    import_element(&mut doc, root, parsed.root_element())?;
    doc.sync_select_values();
    Ok(doc)
}

fn import_element(doc: &mut Document, parent: NodeId, source: ElementRef<'_>) -> Result<()> {
    let value = source.value();

    let target = if value.name() == "template" && value.attr("shadowrootmode").is_some() {
        doc.attach_shadow(parent)?
    } else {
        let node = doc.create_element(value.name());
        for (name, attr_value) in value.attrs() {
            doc.set_attr(node, name, attr_value);
        }
        doc.append_child(parent, node)?;
        node
    };

    for child in source.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            import_element(doc, target, child_element)?;
        } else if let Some(text) = child.value().as_text() {
            let content: &str = text;
            if !content.is_empty() {
                let text_node = doc.create_text(content);
                doc.append_child(target, text_node)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imports_attributes_text_and_form_state() {
        let doc = parse_html(
            r#"<html><body>
                <input id="name" value="abc">
                <input type="checkbox" id="agree" checked>
                <select id="size"><option value="s">Small</option><option value="l" selected>Large</option></select>
                <p class="note">Hello <b>world</b></p>
            </body></html>"#,
        )
        .unwrap();

        let name = doc.by_id("name").unwrap();
        assert_eq!(doc.value(name), "abc");
        assert!(doc.checked(doc.by_id("agree").unwrap()));
        assert_eq!(doc.value(doc.by_id("size").unwrap()), "l");

        let body = doc.body().unwrap();
        let paragraph = doc
            .descendants(body)
            .into_iter()
            .find(|node| doc.tag_name(*node) == Some("p"))
            .unwrap();
        assert_eq!(doc.classes(paragraph), vec!["note"]);
        assert_eq!(doc.text_content(paragraph), "Hello world");
        assert_eq!(doc.own_text(paragraph), "Hello ");
    }
}
