use crate::actions::base::{CaptureContext, Captured, EventHandler};
use crate::actions::record::{ActionRecord, ActionType, ActionValue};
use crate::page::{DomEvent, EventKind, Page};
use tracing::debug;

/// `page_focus` when the tab comes back to the foreground. Window focus and
/// `visibilitychange` usually fire together; one debounce window covers both.
#[derive(Debug, Default)]
pub struct PageFocusHandler {
    last_emitted: Option<i64>,
}

impl EventHandler for PageFocusHandler {
    fn name(&self) -> &'static str {
        "page_focus"
    }

    fn kinds(&self) -> &'static [EventKind] {
        &[EventKind::Focus, EventKind::VisibilityChange]
    }

    fn handle(
        &mut self,
        ctx: &mut CaptureContext<'_>,
        page: &Page,
        event: &DomEvent,
    ) -> Option<Captured> {
        let activated = match event.kind {
            // Element focus events target the element; window focus targets the document.
            EventKind::Focus => event.target == page.document.root(),
            EventKind::VisibilityChange => page.window.state.visible,
            _ => false,
        };
        if !activated {
            return None;
        }
        if let Some(last) = self.last_emitted {
            if ctx.now_ms - last < ctx.config.capture.focus_debounce_ms {
                debug!("page focus debounced");
                return None;
            }
        }
        if ctx.navigation.is_navigating(ctx.now_ms) {
            debug!("page focus during navigation ignored");
            return None;
        }
        self.last_emitted = Some(ctx.now_ms);
        Some(Captured::Record(ActionRecord::new(
            ActionType::PageFocus,
            ActionValue {
                url: Some(page.url()),
                title: Some(page.window.state.title.clone()),
                page_index: Some(ctx.page_index),
                ..ActionValue::at(ctx.now_ms)
            },
        )))
    }
}
