use crate::actions::{ActionRecord, ActionType, MemorySink};
use crate::core::{ManualClock, RecorderConfig};
use crate::dom::{query_shadow_all_str, NodeId};
use crate::errors::{RecorderError, Result};
use crate::page::{DomEvent, EventKind, Modifiers, Page};
use crate::recorder::Recorder;
use std::sync::Arc;

pub const TEST_URL: &str = "https://app.test/";

/// Virtual time every helper-built page starts at.
pub const TEST_EPOCH_MS: i64 = 1_700_000_000_000;

pub struct TestHelper;

impl TestHelper {
    pub fn clock() -> ManualClock {
        ManualClock::new(TEST_EPOCH_MS)
    }

    pub fn page(html: &str) -> Result<Page> {
        Self::page_at(html, TEST_URL)
    }

    pub fn page_at(html: &str, url: &str) -> Result<Page> {
        let mut page = Page::from_html(html, url)?;
        page.sync_clock(&Self::clock());
        Ok(page)
    }

    pub fn recorder(page: &Page) -> Result<(Recorder, MemorySink)> {
        Self::recorder_with_config(page, RecorderConfig::default())
    }

    pub fn recorder_with_config(page: &Page, config: RecorderConfig) -> Result<(Recorder, MemorySink)> {
        let sink = MemorySink::new();
        let recorder = Recorder::new(config, page)?.with_sink(Arc::new(sink.clone()));
        Ok((recorder, sink))
    }

    /// First node matching `selector`, shadow roots included.
    pub fn node(page: &Page, selector: &str) -> Result<NodeId> {
        query_shadow_all_str(&page.document, selector)?
            .into_iter()
            .next()
            .ok_or_else(|| RecorderError::NodeNotFound(selector.to_string()))
    }

    /// Trusted click at the centre of the element, as a real user makes it.
    pub fn click(page: &Page, node: NodeId) -> DomEvent {
        let center = page.document.rect(node).center();
        DomEvent::pointer(EventKind::Click, node, center.x, center.y)
    }

    pub fn shift_click(page: &Page, node: NodeId) -> DomEvent {
        Self::click(page, node).with_modifiers(Modifiers {
            shift: true,
            ..Modifiers::default()
        })
    }

    /// What `element.click()` produces: trusted, but no coordinates or count.
    pub fn programmatic_click(node: NodeId) -> DomEvent {
        DomEvent::new(EventKind::Click, node)
    }

    /// What `dispatchEvent(new MouseEvent('click'))` produces.
    pub fn untrusted_click(page: &Page, node: NodeId) -> DomEvent {
        Self::click(page, node).untrusted()
    }

    pub fn key_down(node: NodeId, key: &str) -> DomEvent {
        DomEvent::key(EventKind::KeyDown, node, key, key)
    }

    /// Sets the field's value and builds the `input` event the page would fire.
    pub fn type_into(page: &mut Page, node: NodeId, value: &str) -> DomEvent {
        page.document.set_value(node, value);
        DomEvent::new(EventKind::Input, node)
    }

    pub fn records_of_type(records: &[ActionRecord], action_type: ActionType) -> Vec<&ActionRecord> {
        records
            .iter()
            .filter(|record| record.action_type == action_type)
            .collect()
    }

    pub fn count_records_by_type(records: &[ActionRecord], action_type: ActionType) -> usize {
        Self::records_of_type(records, action_type).len()
    }

    pub fn primary_selectors(records: &[ActionRecord]) -> Vec<String> {
        records
            .iter()
            .filter_map(|record| record.primary_selector().map(str::to_string))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helper_pages_start_at_the_test_epoch() {
        let page = TestHelper::page("<body><button id='b'>Go</button></body>").unwrap();
        assert_eq!(page.now_ms(), TEST_EPOCH_MS);
        let button = TestHelper::node(&page, "#b").unwrap();
        assert!(!TestHelper::click(&page, button).has_synthetic_click_signature());
        assert!(TestHelper::programmatic_click(button).has_synthetic_click_signature());
        assert!(TestHelper::node(&page, "#missing").is_err());
    }

    #[test]
    fn dispatch_runs_to_completion_outside_a_runtime() {
        let mut page = TestHelper::page("<body><button id='b'>Go</button></body>").unwrap();
        let (mut recorder, sink) = TestHelper::recorder(&page).unwrap();
        let button = TestHelper::node(&page, "#b").unwrap();
        let mut click = TestHelper::click(&page, button);
        let emitted = tokio_test::block_on(recorder.dispatch(&mut page, &mut click));
        assert_eq!(emitted, 1);
        assert_eq!(
            TestHelper::count_records_by_type(&sink.records(), ActionType::Click),
            1
        );
    }
}
