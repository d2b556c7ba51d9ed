use crate::actions::base::{CaptureContext, Captured, EventHandler};
use crate::actions::record::{ActionRecord, ActionType, ActionValue};
use crate::page::{DomEvent, EventKind, Page};
use tracing::debug;

/// `drag_start`, `drop` and `drag_end`; the last two only after a start.
#[derive(Debug, Default)]
pub struct DragHandler {
    dragging: bool,
}

impl DragHandler {
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }
}

impl EventHandler for DragHandler {
    fn name(&self) -> &'static str {
        "drag"
    }

    fn kinds(&self) -> &'static [EventKind] {
        &[EventKind::DragStart, EventKind::Drop, EventKind::DragEnd]
    }

    fn handle(
        &mut self,
        ctx: &mut CaptureContext<'_>,
        page: &Page,
        event: &DomEvent,
    ) -> Option<Captured> {
        let action_type = match event.kind {
            EventKind::DragStart => {
                self.dragging = true;
                ActionType::DragStart
            }
            EventKind::Drop if self.dragging => ActionType::Drop,
            EventKind::DragEnd if self.dragging => {
                self.dragging = false;
                ActionType::DragEnd
            }
            _ => {
                debug!(kind = event.kind.as_str(), "no drag in progress");
                return None;
            }
        };
        let mut record = ActionRecord::new(
            action_type,
            ActionValue {
                position: event.client,
                ..ActionValue::at(ctx.now_ms)
            },
        );
        if page.document.is_element(event.target) {
            record = record.with_element(ctx.element(
                page,
                event.target,
                ctx.config.selector.click_min_score,
            ));
        }
        Some(Captured::Record(record))
    }
}
