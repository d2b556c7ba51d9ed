use crate::actions::base::{CaptureContext, Captured, EventHandler};
use crate::actions::record::{ActionRecord, ActionType, ActionValue};
use crate::dom::{Document, NodeId};
use crate::page::{DomEvent, EventKind, Page};

const MODIFIER_KEYS: &[&str] = &["Shift", "Control", "Alt", "Meta", "AltGraph", "CapsLock", "OS"];

/// Keys still recorded while typing in an editable element.
const EDITABLE_EXCEPTIONS: &[&str] = &["Tab", "Enter"];

pub fn is_editable(doc: &Document, node: NodeId) -> bool {
    match doc.tag_name(node) {
        Some("input" | "textarea" | "select") => true,
        Some(_) => std::iter::once(node)
            .chain(doc.ancestors(node))
            .find_map(|candidate| doc.attr(candidate, "contenteditable"))
            .map_or(false, |value| value.is_empty() || value.eq_ignore_ascii_case("true")),
        None => false,
    }
}

/// `Ctrl+Shift+Alt+Meta+<code>`, modifiers in that order.
pub fn shortcut_name(event: &DomEvent) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if event.modifiers.ctrl {
        parts.push("Ctrl");
    }
    if event.modifiers.shift {
        parts.push("Shift");
    }
    if event.modifiers.alt {
        parts.push("Alt");
    }
    if event.modifiers.meta {
        parts.push("Meta");
    }
    let key = if event.code.is_empty() {
        event.key.as_str()
    } else {
        event.code.as_str()
    };
    parts.push(key);
    parts.join("+")
}

#[derive(Debug, Default)]
pub struct KeyboardHandler;

impl EventHandler for KeyboardHandler {
    fn name(&self) -> &'static str {
        "keyboard"
    }

    fn kinds(&self) -> &'static [EventKind] {
        &[EventKind::KeyDown]
    }

    fn handle(
        &mut self,
        ctx: &mut CaptureContext<'_>,
        page: &Page,
        event: &DomEvent,
    ) -> Option<Captured> {
        if event.key.is_empty() || MODIFIER_KEYS.contains(&event.key.as_str()) {
            return None;
        }
        let doc = &page.document;
        if is_editable(doc, event.target)
            && !event.modifiers.any_chord()
            && !EDITABLE_EXCEPTIONS.contains(&event.key.as_str())
        {
            return None;
        }

        let mut record = ActionRecord::new(
            ActionType::Keyboard,
            ActionValue {
                key: Some(shortcut_name(event)),
                value: Some(event.key.clone()),
                ..ActionValue::at(ctx.now_ms)
            },
        );
        let focus_target = doc.is_element(event.target)
            && !matches!(doc.tag_name(event.target), Some("html" | "body"));
        if focus_target {
            record = record.with_element(ctx.element(
                page,
                event.target,
                ctx.config.selector.click_min_score,
            ));
        }
        Some(Captured::Record(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;
    use crate::page::Modifiers;

    #[test]
    fn builds_shortcut_names() {
        let doc = parse_html("<body></body>").unwrap();
        let body = doc.body().unwrap();
        let event = DomEvent::key(EventKind::KeyDown, body, "s", "KeyS").with_modifiers(Modifiers {
            ctrl: true,
            shift: true,
            ..Modifiers::default()
        });
        assert_eq!(shortcut_name(&event), "Ctrl+Shift+KeyS");
        let plain = DomEvent::key(EventKind::KeyDown, body, "Escape", "");
        assert_eq!(shortcut_name(&plain), "Escape");
    }

    #[test]
    fn detects_editable_targets() {
        let doc = parse_html(
            r#"<body><div contenteditable="true"><p id="p">x</p></div><input id="i"><div id="d"></div></body>"#,
        )
        .unwrap();
        assert!(is_editable(&doc, doc.by_id("p").unwrap()));
        assert!(is_editable(&doc, doc.by_id("i").unwrap()));
        assert!(!is_editable(&doc, doc.by_id("d").unwrap()));
    }
}
