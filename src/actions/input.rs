use crate::actions::base::{CaptureContext, Captured, EventHandler};
use crate::actions::record::{ActionRecord, ActionType, ActionValue};
use crate::page::{DomEvent, EventKind, Page};
use crate::utils::accessibility::{input_type, label_text};
use crate::utils::text::normalize_whitespace;
use tracing::debug;

/// Input types whose edits arrive as `change`, not `input`.
const NON_TEXT_INPUT_TYPES: &[&str] = &["checkbox", "radio", "file"];

#[derive(Debug, Default)]
pub struct InputHandler;

impl EventHandler for InputHandler {
    fn name(&self) -> &'static str {
        "input"
    }

    fn kinds(&self) -> &'static [EventKind] {
        &[EventKind::Input]
    }

    fn handle(
        &mut self,
        ctx: &mut CaptureContext<'_>,
        page: &Page,
        event: &DomEvent,
    ) -> Option<Captured> {
        let doc = &page.document;
        let node = event.target;
        match doc.tag_name(node) {
            Some("textarea") => {}
            Some("input") if !NON_TEXT_INPUT_TYPES.contains(&input_type(doc, node).as_str()) => {}
            _ => return None,
        }

        let element = ctx.element(page, node, ctx.config.selector.click_min_score);
        let value = doc.value(node);
        let record = ActionRecord::new(
            ActionType::Input,
            ActionValue {
                value: Some(value.clone()),
                element_text: Some(ctx.element_text(page, node)),
                ..ActionValue::at(ctx.now_ms)
            },
        )
        .with_element(element);

        if let Some(last) = ctx.session.last_input_action() {
            let last_value = last.value().and_then(|data| data.value.as_deref());
            if last.primary_selector() == record.primary_selector() && last_value == Some(value.as_str()) {
                debug!("input unchanged since last record");
                return None;
            }
        }
        ctx.session.set_last_input_action(record.clone());
        Some(Captured::Record(record))
    }
}

/// `select` and `check` records from `change` events.
#[derive(Debug, Default)]
pub struct ChangeHandler;

impl EventHandler for ChangeHandler {
    fn name(&self) -> &'static str {
        "change"
    }

    fn kinds(&self) -> &'static [EventKind] {
        &[EventKind::Change]
    }

    fn handle(
        &mut self,
        ctx: &mut CaptureContext<'_>,
        page: &Page,
        event: &DomEvent,
    ) -> Option<Captured> {
        let doc = &page.document;
        let node = event.target;
        let min_score = ctx.config.selector.change_min_score;
        let record = match doc.tag_name(node) {
            Some("select") => {
                let option = doc.selected_option(node);
                ActionRecord::new(
                    ActionType::Select,
                    ActionValue {
                        value: Some(doc.value(node)),
                        selected_text: option
                            .map(|option| normalize_whitespace(&doc.text_content(option))),
                        ..ActionValue::at(ctx.now_ms)
                    },
                )
            }
            Some("input") if matches!(input_type(doc, node).as_str(), "checkbox" | "radio") => {
                ActionRecord::new(
                    ActionType::Check,
                    ActionValue {
                        checked: Some(doc.checked(node)),
                        value: doc.attr(node, "value").map(str::to_string),
                        element_text: label_text(doc, node),
                        ..ActionValue::at(ctx.now_ms)
                    },
                )
            }
            _ => return None,
        };
        Some(Captured::Record(
            record.with_element(ctx.element(page, node, min_score)),
        ))
    }
}
