use crate::actions::navigation::NavigationTracker;
use crate::actions::record::{ActionElement, ActionRecord, ElementSnapshot};
use crate::actions::upload::PendingUpload;
use crate::core::{CaptureConfig, RecorderConfig, RecorderSession};
use crate::dom::NodeId;
use crate::page::{DomEvent, EventKind, Page};
use crate::selector::SelectorGenerator;
use crate::utils::preview::{element_preview, extract_element_text};

/// What a handler produced for one event.
#[derive(Debug)]
pub enum Captured {
    Record(ActionRecord),
    /// File reads still have to finish before the record exists.
    Upload(PendingUpload),
}

/// Everything a handler may read or update while handling one event.
pub struct CaptureContext<'a> {
    pub session: &'a mut RecorderSession,
    pub config: &'a RecorderConfig,
    pub selectors: &'a SelectorGenerator,
    pub navigation: &'a mut NavigationTracker,
    pub now_ms: i64,
    pub page_index: usize,
}

/// Selectors plus the preview snapshot for `node`.
pub fn describe_element(
    page: &Page,
    node: NodeId,
    selectors: &SelectorGenerator,
    capture: &CaptureConfig,
    min_score: u32,
) -> ActionElement {
    let doc = &page.document;
    let snapshot = ElementSnapshot {
        html: element_preview(doc, node, capture.preview_max_length),
        text: extract_element_text(doc, node, capture.element_text_max_length),
        tag_name: doc.tag_name(node).unwrap_or_default().to_string(),
    };
    ActionElement::new(selectors.generate(doc, node, min_score)).with_snapshot(snapshot)
}

impl<'a> CaptureContext<'a> {
    pub fn element(&self, page: &Page, node: NodeId, min_score: u32) -> ActionElement {
        describe_element(page, node, self.selectors, &self.config.capture, min_score)
    }

    pub fn element_text(&self, page: &Page, node: NodeId) -> String {
        extract_element_text(
            &page.document,
            node,
            self.config.capture.element_text_max_length,
        )
    }
}

/// A capture-phase listener for a fixed set of event kinds.
pub trait EventHandler {
    fn name(&self) -> &'static str;

    fn kinds(&self) -> &'static [EventKind];

    fn handle(
        &mut self,
        ctx: &mut CaptureContext<'_>,
        page: &Page,
        event: &DomEvent,
    ) -> Option<Captured>;

    /// Called once per animation frame; coalescing handlers flush here.
    fn on_frame(&mut self, _ctx: &mut CaptureContext<'_>, _page: &Page) -> Vec<ActionRecord> {
        Vec::new()
    }
}
