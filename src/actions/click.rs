use crate::actions::base::{CaptureContext, Captured, EventHandler};
use crate::actions::record::{ActionRecord, ActionType, ActionValue};
use crate::dom::NodeId;
use crate::page::{DomEvent, EventKind, Page};
use tracing::debug;

/// click, double_click, right_click and shift_click.
#[derive(Debug, Default)]
pub struct ClickHandler;

impl ClickHandler {
    fn action_type(event: &DomEvent) -> ActionType {
        match event.kind {
            EventKind::DblClick => ActionType::DoubleClick,
            EventKind::ContextMenu => ActionType::RightClick,
            _ if event.modifiers.shift => ActionType::ShiftClick,
            _ => ActionType::Click,
        }
    }
}

/// `<select>` and its options are recorded by the change handler.
fn inside_select(page: &Page, node: NodeId) -> bool {
    let doc = &page.document;
    std::iter::once(node)
        .chain(doc.ancestors(node))
        .any(|candidate| doc.tag_name(candidate) == Some("select"))
}

/// Absolute `href` of the link enclosing `node`.
pub fn enclosing_link(page: &Page, node: NodeId) -> Option<String> {
    let doc = &page.document;
    let link = std::iter::once(node)
        .chain(doc.ancestors(node))
        .find(|candidate| doc.tag_name(*candidate) == Some("a") && doc.has_attr(*candidate, "href"))?;
    let href = doc.attr(link, "href")?;
    page.window
        .state
        .resolve(href)
        .map(|url| url.to_string())
        .ok()
}

impl EventHandler for ClickHandler {
    fn name(&self) -> &'static str {
        "click"
    }

    fn kinds(&self) -> &'static [EventKind] {
        &[EventKind::Click, EventKind::DblClick, EventKind::ContextMenu]
    }

    fn handle(
        &mut self,
        ctx: &mut CaptureContext<'_>,
        page: &Page,
        event: &DomEvent,
    ) -> Option<Captured> {
        if !page.document.is_element(event.target) {
            return None;
        }
        if inside_select(page, event.target) {
            debug!("click on select left to the change handler");
            return None;
        }
        // The second click of a double click arrives as click with detail 2;
        // the dblclick that follows carries it.
        if event.kind == EventKind::Click && event.detail > 1 {
            return None;
        }

        if event.kind == EventKind::Click {
            if let Some(href) = enclosing_link(page, event.target) {
                ctx.navigation.note_link_click(&href, ctx.now_ms);
            }
        }

        let element = ctx.element(page, event.target, ctx.config.selector.click_min_score);
        let value = ActionValue {
            position: event.client,
            element_text: Some(ctx.element_text(page, event.target)).filter(|text| !text.is_empty()),
            ..ActionValue::at(ctx.now_ms)
        };
        Some(Captured::Record(
            ActionRecord::new(Self::action_type(event), value).with_element(element),
        ))
    }
}
