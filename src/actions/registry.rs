use crate::actions::base::{CaptureContext, Captured, EventHandler};
use crate::actions::record::ActionRecord;
use crate::page::{DomEvent, EventKind, Page};
use std::collections::HashMap;
use tracing::trace;

/// Handlers indexed by the event kinds they listen to, in registration order.
pub struct HandlerRegistry {
    handlers: Vec<Box<dyn EventHandler>>,
    by_kind: HashMap<EventKind, Vec<usize>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            by_kind: HashMap::new(),
        }
    }

    pub fn register<H: EventHandler + 'static>(&mut self, handler: H) {
        let index = self.handlers.len();
        for kind in handler.kinds() {
            self.by_kind.entry(*kind).or_default().push(index);
        }
        self.handlers.push(Box::new(handler));
    }

    pub fn list_handlers(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|handler| handler.name()).collect()
    }

    pub fn listens_to(&self, kind: EventKind) -> bool {
        self.by_kind.contains_key(&kind)
    }

    pub fn dispatch(
        &mut self,
        ctx: &mut CaptureContext<'_>,
        page: &Page,
        event: &DomEvent,
    ) -> Vec<Captured> {
        let Some(indexes) = self.by_kind.get(&event.kind) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for index in indexes.clone() {
            let handler = &mut self.handlers[index];
            if let Some(captured) = handler.handle(ctx, page, event) {
                trace!(handler = handler.name(), kind = event.kind.as_str(), "captured");
                out.push(captured);
            }
        }
        out
    }

    pub fn on_frame(&mut self, ctx: &mut CaptureContext<'_>, page: &Page) -> Vec<ActionRecord> {
        let mut out = Vec::new();
        for handler in self.handlers.iter_mut() {
            out.extend(handler.on_frame(ctx, page));
        }
        out
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
