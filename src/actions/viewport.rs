use crate::actions::base::{CaptureContext, Captured, EventHandler};
use crate::actions::record::{ActionRecord, ActionType, ActionValue};
use crate::page::{DomEvent, EventKind, Page};
use tracing::debug;

/// Scroll and resize bursts, flushed as at most one record each per frame.
#[derive(Debug, Default)]
pub struct ViewportHandler {
    scroll_pending: bool,
    resize_pending: bool,
}

impl ViewportHandler {
    pub fn has_pending(&self) -> bool {
        self.scroll_pending || self.resize_pending
    }
}

impl EventHandler for ViewportHandler {
    fn name(&self) -> &'static str {
        "viewport"
    }

    fn kinds(&self) -> &'static [EventKind] {
        &[EventKind::Scroll, EventKind::Resize]
    }

    fn handle(
        &mut self,
        ctx: &mut CaptureContext<'_>,
        _page: &Page,
        event: &DomEvent,
    ) -> Option<Captured> {
        match event.kind {
            EventKind::Scroll => self.scroll_pending = true,
            EventKind::Resize if ctx.session.is_executing_actions() => {
                debug!("resize while executing actions ignored");
            }
            EventKind::Resize => self.resize_pending = true,
            _ => {}
        }
        None
    }

    fn on_frame(&mut self, ctx: &mut CaptureContext<'_>, page: &Page) -> Vec<ActionRecord> {
        let state = &page.window.state;
        let mut out = Vec::new();
        if std::mem::take(&mut self.scroll_pending) {
            out.push(ActionRecord::new(
                ActionType::Scroll,
                ActionValue {
                    scroll: Some(state.scroll),
                    ..ActionValue::at(ctx.now_ms)
                },
            ));
        }
        if std::mem::take(&mut self.resize_pending) && !ctx.session.is_executing_actions() {
            out.push(ActionRecord::new(
                ActionType::WindowResize,
                ActionValue {
                    viewport: Some(state.viewport),
                    ..ActionValue::at(ctx.now_ms)
                },
            ));
        }
        out
    }
}
