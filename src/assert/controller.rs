//! Assert-mode state machine.
//!
//! ```text
//! Idle --arm--> AssertArmed --click on input type--> AssertModalOpen
//!                    ^                                     |
//!                    +------ confirm / cancel / Escape ----+
//! AssertArmed | AssertModalOpen --disarm--> Idle
//! ```
//!
//! Arming freezes the screen and installs the interception layer. While
//! armed, page events are blocked in the capture phase unless they come from
//! a tool panel; a blocked click is queued and turned into an assertion at
//! the next microtask checkpoint.

use crate::actions::base::describe_element;
use crate::actions::record::{ActionElement, ActionRecord, ActionType, ActionValue};
use crate::assert::freeze::ScreenFreeze;
use crate::assert::interceptor::InterceptionLayer;
use crate::assert::surface::{place_surface, AssertInputSurface, SurfaceAction, VariableItem};
use crate::assert::AssertType;
use crate::core::{AssertConfig, RecorderConfig, RecorderSession};
use crate::dom::{Document, NodeId};
use crate::page::{DomEvent, EventKind, Page};
use crate::selector::SelectorGenerator;
use crate::utils::accessibility::is_form_control;
use crate::utils::panel::is_in_tool_panel;
use crate::utils::preview::extract_element_text;
use serde::Serialize;
use tracing::{debug, info, warn};

pub const ASSERTED_ATTRIBUTE: &str = "data-recorder-asserted";
const HOVER_OUTLINE: &str = "2px solid #4f46e5";

const INTERCEPTED: &[EventKind] = &[
    EventKind::Click,
    EventKind::Submit,
    EventKind::MouseDown,
    EventKind::MouseUp,
    EventKind::KeyDown,
    EventKind::KeyUp,
    EventKind::Input,
    EventKind::Change,
    EventKind::DragStart,
    EventKind::Drag,
    EventKind::DragEnter,
    EventKind::DragOver,
    EventKind::DragLeave,
    EventKind::Drop,
    EventKind::DragEnd,
    EventKind::ContextMenu,
    EventKind::DblClick,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AssertState {
    Idle,
    AssertArmed,
    AssertModalOpen,
}

/// Outline on the hovered element; the original inline outline comes back on clear.
#[derive(Debug, Default)]
pub struct HoverHighlight {
    current: Option<(NodeId, Option<String>)>,
}

impl HoverHighlight {
    pub fn current(&self) -> Option<NodeId> {
        self.current.as_ref().map(|(node, _)| *node)
    }

    pub fn highlight(&mut self, doc: &mut Document, node: NodeId) {
        if self.current() == Some(node) || !doc.is_element(node) {
            return;
        }
        self.clear(doc);
        let original = doc.inline_style(node).get("outline").map(str::to_string);
        doc.set_style_property(node, "outline", HOVER_OUTLINE);
        self.current = Some((node, original));
    }

    pub fn clear(&mut self, doc: &mut Document) {
        let Some((node, original)) = self.current.take() else {
            return;
        };
        let mut style = doc.inline_style(node);
        match original {
            Some(outline) => style.set("outline", &outline),
            None => style.remove("outline"),
        }
        doc.set_inline_style(node, &style);
    }
}

/// Elements picked for assertions; disconnected ones are dropped periodically.
#[derive(Debug, Default)]
pub struct AssertedSet {
    nodes: Vec<NodeId>,
    last_cleanup: Option<i64>,
}

impl AssertedSet {
    pub fn insert(&mut self, doc: &mut Document, node: NodeId) {
        doc.set_attr(node, ASSERTED_ATTRIBUTE, "true");
        if !self.nodes.contains(&node) {
            self.nodes.push(node);
        }
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn cleanup(&mut self, doc: &Document) -> usize {
        let before = self.nodes.len();
        self.nodes.retain(|node| doc.is_connected(*node));
        before - self.nodes.len()
    }

    /// Runs `cleanup` at most once per `interval_ms`.
    pub fn cleanup_if_due(&mut self, doc: &Document, now: i64, interval_ms: i64) -> usize {
        let last = *self.last_cleanup.get_or_insert(now);
        if now - last < interval_ms {
            return 0;
        }
        self.last_cleanup = Some(now);
        let dropped = self.cleanup(doc);
        if dropped > 0 {
            debug!(dropped, "disconnected asserted elements dropped");
        }
        dropped
    }
}

/// What the page shows for `node`, offered as the default expected value.
pub fn default_expected(
    doc: &Document,
    node: NodeId,
    assert_type: AssertType,
    max_text_length: usize,
) -> String {
    match assert_type {
        AssertType::Value if is_form_control(doc, node) => doc.value(node),
        AssertType::Value | AssertType::Text | AssertType::ContainsText => {
            extract_element_text(doc, node, max_text_length)
        }
        _ => String::new(),
    }
}

struct OpenAssertion {
    surface: AssertInputSurface,
    element: ActionElement,
    element_text: String,
}

pub struct AssertController {
    state: AssertState,
    config: AssertConfig,
    interceptor: InterceptionLayer,
    freeze: ScreenFreeze,
    hover: HoverHighlight,
    asserted: AssertedSet,
    pending_click: Option<NodeId>,
    open: Option<OpenAssertion>,
}

impl std::fmt::Debug for AssertController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssertController")
            .field("state", &self.state)
            .field("freeze", &self.freeze)
            .field("interceptor", &self.interceptor)
            .field("asserted", &self.asserted.len())
            .finish()
    }
}

impl AssertController {
    pub fn new(config: &AssertConfig) -> Self {
        Self {
            state: AssertState::Idle,
            config: config.clone(),
            interceptor: InterceptionLayer::new(),
            freeze: ScreenFreeze::new(&config.panel_attribute),
            hover: HoverHighlight::default(),
            asserted: AssertedSet::default(),
            pending_click: None,
            open: None,
        }
    }

    pub fn state(&self) -> AssertState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.state != AssertState::Idle
    }

    pub fn freeze(&self) -> &ScreenFreeze {
        &self.freeze
    }

    pub fn interceptor(&self) -> &InterceptionLayer {
        &self.interceptor
    }

    pub fn asserted(&self) -> &AssertedSet {
        &self.asserted
    }

    pub fn hover(&self) -> &HoverHighlight {
        &self.hover
    }

    pub fn surface(&self) -> Option<&AssertInputSurface> {
        self.open.as_ref().map(|open| &open.surface)
    }

    pub fn has_pending_click(&self) -> bool {
        self.pending_click.is_some()
    }

    /// Idle -> AssertArmed. Re-arming only updates the assert type.
    pub fn arm(&mut self, session: &mut RecorderSession, page: &mut Page, assert_type: Option<AssertType>) {
        session.set_assert_mode(true, assert_type);
        if self.state != AssertState::Idle {
            debug!(?assert_type, "assert type changed while armed");
            return;
        }
        self.freeze.freeze(page);
        self.interceptor.install(&mut page.window);
        self.state = AssertState::AssertArmed;
        info!(?assert_type, "assert mode armed");
    }

    /// Any state -> Idle; tears down the surface, interceptors and freeze.
    pub fn disarm(&mut self, session: &mut RecorderSession, page: &mut Page) {
        session.set_assert_mode(false, None);
        if self.state == AssertState::Idle {
            return;
        }
        if let Some(open) = self.open.take() {
            open.surface.close(&mut page.document);
        }
        self.pending_click = None;
        self.hover.clear(&mut page.document);
        // Flushed timers must reach the real navigation and network APIs.
        self.interceptor.uninstall(&mut page.window);
        self.freeze.unfreeze(page);
        self.state = AssertState::Idle;
        info!("assert mode disarmed");
    }

    pub fn unfreeze_entire_screen(&mut self, page: &mut Page) -> bool {
        self.freeze.unfreeze(page)
    }

    pub fn clear_hover(&mut self, page: &mut Page) {
        self.hover.clear(&mut page.document);
    }

    /// Capture-phase listener while armed. Blocks page events and queues
    /// clicks; events inside tool panels pass through and drive the surface.
    pub fn handle_event(
        &mut self,
        session: &mut RecorderSession,
        page: &mut Page,
        event: &mut DomEvent,
    ) -> Option<ActionRecord> {
        if self.state == AssertState::Idle {
            return None;
        }
        if is_in_tool_panel(&page.document, event.target, &self.config.panel_attribute) {
            return self.handle_panel_event(session, page, event);
        }

        match event.kind {
            EventKind::MouseOver if session.hover_effects() => {
                self.hover.highlight(&mut page.document, event.target);
                return None;
            }
            EventKind::MouseOut if self.hover.current() == Some(event.target) => {
                self.hover.clear(&mut page.document);
                return None;
            }
            _ => {}
        }

        if INTERCEPTED.contains(&event.kind) || self.freeze.blocks(&page.document, event) {
            event.block();
        }
        match (event.kind, self.state) {
            (EventKind::KeyDown, AssertState::AssertModalOpen) if event.key == "Escape" => {
                self.cancel(page);
            }
            (EventKind::Click, AssertState::AssertArmed) => {
                self.pending_click = Some(event.target);
            }
            (EventKind::Click, _) => debug!("click ignored while the assert surface is open"),
            _ => {}
        }
        None
    }

    fn handle_panel_event(
        &mut self,
        session: &mut RecorderSession,
        page: &mut Page,
        event: &DomEvent,
    ) -> Option<ActionRecord> {
        let action = {
            let open = self.open.as_ref()?;
            if !open.surface.contains(&page.document, event.target) {
                return None;
            }
            match event.kind {
                EventKind::Click => open.surface.action_at(&page.document, event.target),
                EventKind::KeyDown if event.key == "Enter" => Some(SurfaceAction::Confirm),
                EventKind::KeyDown if event.key == "Escape" => Some(SurfaceAction::Cancel),
                _ => None,
            }
        };
        match action? {
            SurfaceAction::Confirm => self.confirm(session, page),
            SurfaceAction::Cancel => {
                self.cancel(page);
                None
            }
        }
    }

    /// Microtask checkpoint: turns the queued click into an assertion, or
    /// opens the input surface when the assert type needs a value.
    pub fn flush_pending_click(
        &mut self,
        session: &RecorderSession,
        config: &RecorderConfig,
        selectors: &SelectorGenerator,
        page: &mut Page,
    ) -> Option<ActionRecord> {
        let target = self.pending_click.take()?;
        if self.state != AssertState::AssertArmed {
            return None;
        }
        if !page.document.is_connected(target) {
            warn!(?target, "assert target left the document before it was handled");
            return None;
        }
        let assert_type = session.assert_type().unwrap_or(AssertType::Visible);
        let now = page.now_ms();

        let element = describe_element(
            page,
            target,
            selectors,
            &config.capture,
            config.selector.click_min_score,
        );
        let element_text =
            extract_element_text(&page.document, target, config.capture.element_text_max_length);
        self.freeze.freeze_element(&mut page.document, target, now);
        self.asserted.insert(&mut page.document, target);

        if !assert_type.requires_input() {
            return Some(assertion_record(
                assert_type,
                element,
                element_text,
                None,
                None,
                None,
                now,
            ));
        }

        let default_value = default_expected(
            &page.document,
            target,
            assert_type,
            config.capture.element_text_max_length,
        );
        let position = place_surface(
            page.document.rect(target),
            page.window.state.viewport,
            &self.config,
        );
        match AssertInputSurface::open(
            &mut page.document,
            target,
            assert_type,
            &default_value,
            position,
            &self.config,
        ) {
            Ok(surface) => {
                self.open = Some(OpenAssertion {
                    surface,
                    element,
                    element_text,
                });
                self.state = AssertState::AssertModalOpen;
                debug!(%assert_type, "assert surface opened");
            }
            Err(err) => warn!("assert surface could not be opened: {}", err),
        }
        None
    }

    /// AssertModalOpen -> AssertArmed, emitting the assertion.
    pub fn confirm(&mut self, session: &RecorderSession, page: &mut Page) -> Option<ActionRecord> {
        let open = self.open.take()?;
        self.state = AssertState::AssertArmed;
        let value = open.surface.value(&page.document);
        let assert_type = session.assert_type().unwrap_or(open.surface.assert_type);
        let query = open.surface.query().cloned();
        let api_request = open.surface.api_request().cloned();
        let record = assertion_record(
            assert_type,
            open.element,
            open.element_text,
            Some(value),
            query,
            api_request,
            page.now_ms(),
        );
        open.surface.close(&mut page.document);
        Some(record)
    }

    /// AssertModalOpen -> AssertArmed without a record.
    pub fn cancel(&mut self, page: &mut Page) -> bool {
        let Some(open) = self.open.take() else {
            return false;
        };
        open.surface.close(&mut page.document);
        self.state = AssertState::AssertArmed;
        debug!("assert surface cancelled");
        true
    }

    pub fn set_surface_value(&mut self, page: &mut Page, value: &str) -> bool {
        match &self.open {
            Some(open) => {
                open.surface.set_value(&mut page.document, value);
                true
            }
            None => false,
        }
    }

    pub fn insert_variable(&mut self, page: &mut Page, variable: &VariableItem) -> bool {
        match &self.open {
            Some(open) => {
                open.surface.insert_variable(&mut page.document, variable);
                true
            }
            None => false,
        }
    }

    pub fn attach_query(&mut self, payload: serde_json::Value) -> bool {
        match self.open.as_mut() {
            Some(open) => {
                open.surface.attach_query(payload);
                true
            }
            None => false,
        }
    }

    pub fn attach_api_request(&mut self, payload: serde_json::Value) -> bool {
        match self.open.as_mut() {
            Some(open) => {
                open.surface.attach_api_request(payload);
                true
            }
            None => false,
        }
    }

    /// Mutation observer checkpoint for the screen freeze.
    pub fn handle_mutations(&mut self, page: &mut Page) -> usize {
        self.freeze.handle_mutations(&mut page.document)
    }

    /// Frame boundary: periodic asserted-set cleanup.
    pub fn tick(&mut self, page: &Page) -> usize {
        self.asserted.cleanup_if_due(
            &page.document,
            page.now_ms(),
            self.config.asserted_cleanup_interval_ms,
        )
    }
}

fn assertion_record(
    assert_type: AssertType,
    element: ActionElement,
    element_text: String,
    value: Option<String>,
    query: Option<serde_json::Value>,
    api_request: Option<serde_json::Value>,
    now: i64,
) -> ActionRecord {
    ActionRecord::new(
        ActionType::Assert,
        ActionValue {
            assert_type: Some(assert_type),
            expected: value.clone(),
            value,
            element_text: Some(element_text).filter(|text| !text.is_empty()),
            query,
            api_request,
            ..ActionValue::at(now)
        },
    )
    .with_element(element)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Fixture {
        controller: AssertController,
        session: RecorderSession,
        config: RecorderConfig,
        selectors: SelectorGenerator,
        page: Page,
    }

    fn fixture(html: &str) -> Fixture {
        let config = RecorderConfig::default();
        Fixture {
            controller: AssertController::new(&config.assertion),
            session: RecorderSession::new(),
            selectors: SelectorGenerator::new(config.selector.clone()),
            config,
            page: Page::from_html(html, "https://app.test/").unwrap(),
        }
    }

    impl Fixture {
        fn click(&mut self, id: &str) -> Option<ActionRecord> {
            let target = self.page.document.by_id(id).unwrap();
            let mut event = DomEvent::pointer(EventKind::Click, target, 10.0, 10.0);
            let direct = self
                .controller
                .handle_event(&mut self.session, &mut self.page, &mut event);
            assert!(direct.is_none());
            assert!(event.default_prevented());
            self.controller.flush_pending_click(
                &self.session,
                &self.config,
                &self.selectors,
                &mut self.page,
            )
        }
    }

    #[test]
    fn non_input_types_emit_on_click() {
        let mut f = fixture(r#"<body><div id="banner" data-testid="banner">Welcome</div></body>"#);
        f.controller
            .arm(&mut f.session, &mut f.page, Some(AssertType::Visible));
        let record = f.click("banner").unwrap();
        assert_eq!(record.action_type, ActionType::Assert);
        assert_eq!(record.primary_selector(), Some(r#"[data-testid="banner"]"#));
        assert_eq!(
            record.value().and_then(|v| v.assert_type),
            Some(AssertType::Visible)
        );
        assert_eq!(f.controller.state(), AssertState::AssertArmed);
        assert!(f.controller.asserted().contains(f.page.document.by_id("banner").unwrap()));
    }

    #[test]
    fn value_flow_opens_surface_then_emits_on_enter() {
        let mut f = fixture(r#"<body><input id="email" value="abc"></body>"#);
        f.controller.arm(&mut f.session, &mut f.page, Some(AssertType::Value));
        assert!(f.click("email").is_none());
        assert_eq!(f.controller.state(), AssertState::AssertModalOpen);
        let surface = f.controller.surface().unwrap();
        assert_eq!(surface.value(&f.page.document), "abc");
        let input = surface.input;

        f.controller.set_surface_value(&mut f.page, "xyz");
        f.controller.attach_query(json!({"statement_id": 7}));
        let mut enter = DomEvent::key(EventKind::KeyDown, input, "Enter", "Enter");
        let record = f
            .controller
            .handle_event(&mut f.session, &mut f.page, &mut enter)
            .unwrap();
        assert!(!enter.default_prevented());
        let value = record.value().unwrap();
        assert_eq!(value.value.as_deref(), Some("xyz"));
        assert_eq!(value.query, Some(json!({"statement_id": 7})));
        assert_eq!(f.controller.state(), AssertState::AssertArmed);
        assert!(f.controller.surface().is_none());
    }

    #[test]
    fn escape_cancels_the_surface() {
        let mut f = fixture(r#"<body><p id="msg">Order placed</p><button id="b">x</button></body>"#);
        f.controller.arm(&mut f.session, &mut f.page, Some(AssertType::Text));
        f.click("msg");
        assert_eq!(
            f.controller.surface().map(|s| s.default_value.as_str()),
            Some("Order placed")
        );
        let button = f.page.document.by_id("b").unwrap();
        let mut escape = DomEvent::key(EventKind::KeyDown, button, "Escape", "Escape");
        assert!(f
            .controller
            .handle_event(&mut f.session, &mut f.page, &mut escape)
            .is_none());
        assert!(escape.default_prevented());
        assert_eq!(f.controller.state(), AssertState::AssertArmed);
    }

    #[test]
    fn disarm_restores_everything() {
        let mut f = fixture(r#"<body><div id="toast" class="toast">Saved</div></body>"#);
        let timers = f.page.window.timers();
        let navigation = f.page.window.navigation();
        f.controller
            .arm(&mut f.session, &mut f.page, Some(AssertType::ContainsText));
        assert!(f.session.is_assert_mode());
        f.click("toast");
        let toast = f.page.document.by_id("toast").unwrap();
        assert_eq!(f.controller.freeze().frozen_elements().len(), 1);

        f.controller.disarm(&mut f.session, &mut f.page);
        assert_eq!(f.controller.state(), AssertState::Idle);
        assert!(!f.session.is_assert_mode());
        assert!(std::rc::Rc::ptr_eq(&timers, &f.page.window.timers()));
        assert!(std::rc::Rc::ptr_eq(&navigation, &f.page.window.navigation()));
        assert!(f.page.document.attr(toast, "style").is_none());
        assert!(f
            .page
            .document
            .descendants(f.page.document.root())
            .iter()
            .all(|node| f.page.document.attr(*node, "data-recorder-panel").is_none()));
    }

    #[test]
    fn hover_outline_is_restored() {
        let mut f = fixture(r#"<body><a id="link" style="outline: none">Docs</a></body>"#);
        f.session.set_hover_effects(true);
        f.controller.arm(&mut f.session, &mut f.page, Some(AssertType::Visible));
        let link = f.page.document.by_id("link").unwrap();
        let mut over = DomEvent::new(EventKind::MouseOver, link);
        f.controller.handle_event(&mut f.session, &mut f.page, &mut over);
        assert_eq!(
            f.page.document.inline_style(link).get("outline"),
            Some(HOVER_OUTLINE)
        );
        let mut out = DomEvent::new(EventKind::MouseOut, link);
        f.controller.handle_event(&mut f.session, &mut f.page, &mut out);
        assert_eq!(f.page.document.inline_style(link).get("outline"), Some("none"));
    }

    #[test]
    fn asserted_cleanup_runs_on_interval() {
        let mut doc = crate::dom::parse_html(r#"<body><p id="a">A</p></body>"#).unwrap();
        let node = doc.by_id("a").unwrap();
        let mut set = AssertedSet::default();
        set.insert(&mut doc, node);
        assert_eq!(doc.attr(node, ASSERTED_ATTRIBUTE), Some("true"));
        doc.remove(node).unwrap();
        assert_eq!(set.cleanup_if_due(&doc, 0, 5_000), 0);
        assert_eq!(set.cleanup_if_due(&doc, 4_999, 5_000), 0);
        assert_eq!(set.cleanup_if_due(&doc, 5_000, 5_000), 1);
        assert!(set.is_empty());
    }
}
