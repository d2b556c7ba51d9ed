use crate::dom::{open_tag, outer_html, Document, NodeId};
use crate::utils::text::{normalize_whitespace, truncate_chars};

/// Outer HTML for the action record, shortened to the start tag plus a text
/// excerpt when the full markup exceeds `max_len` characters.
pub fn element_preview(doc: &Document, node: NodeId, max_len: usize) -> String {
    let full = outer_html(doc, node);
    if full.chars().count() <= max_len {
        return full;
    }
    let Some(tag) = doc.tag_name(node) else {
        return truncate_chars(&full, max_len);
    };
    let start = open_tag(doc, node);
    let budget = max_len.saturating_sub(start.chars().count() + tag.len() + 3);
    let excerpt = truncate_chars(&normalize_whitespace(&doc.text_content(node)), budget);
    format!("{}{}</{}>", start, excerpt, tag)
}

/// What a user would read as the element's content: form values for
/// controls, the selected option for selects, text otherwise.
pub fn extract_element_text(doc: &Document, node: NodeId, max_len: usize) -> String {
    let text = match doc.tag_name(node) {
        Some("input") | Some("textarea") => doc.value(node),
        Some("select") => doc
            .selected_option(node)
            .map(|option| doc.text_content(option))
            .unwrap_or_default(),
        Some("img") => doc.attr(node, "alt").unwrap_or("").to_string(),
        _ => doc.text_content(node),
    };
    truncate_chars(&normalize_whitespace(&text), max_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    #[test]
    fn long_markup_is_reduced_to_start_tag_and_excerpt() {
        let long_text = "word ".repeat(100);
        let doc = parse_html(&format!(
            r#"<body><div id="big"><p>{}</p></div><span id="small">ok</span></body>"#,
            long_text
        ))
        .unwrap();

        let big = element_preview(&doc, doc.by_id("big").unwrap(), 80);
        assert!(big.starts_with(r#"<div id="big">word"#));
        assert!(big.ends_with("…</div>"));
        assert!(big.chars().count() <= 81);

        let small = element_preview(&doc, doc.by_id("small").unwrap(), 80);
        assert_eq!(small, r#"<span id="small">ok</span>"#);
    }

    #[test]
    fn extracts_values_for_form_controls() {
        let doc = parse_html(
            r#"<body><input id="i" value="typed"><select id="s"><option value="1">One</option><option value="2" selected>Two</option></select></body>"#,
        )
        .unwrap();
        assert_eq!(extract_element_text(&doc, doc.by_id("i").unwrap(), 50), "typed");
        assert_eq!(extract_element_text(&doc, doc.by_id("s").unwrap(), 50), "Two");
    }
}
