//! The capture-phase listener set for normal recording. Uniform suppression
//! runs first, then navigation bookkeeping, then the per-kind handlers.

use crate::actions::base::{CaptureContext, Captured};
use crate::actions::click::ClickHandler;
use crate::actions::drag::DragHandler;
use crate::actions::focus::PageFocusHandler;
use crate::actions::input::{ChangeHandler, InputHandler};
use crate::actions::keyboard::KeyboardHandler;
use crate::actions::navigation::{NavigationTracker, UrlChangeCause};
use crate::actions::record::ActionRecord;
use crate::actions::registry::HandlerRegistry;
use crate::actions::upload::{PendingUpload, UploadHandler};
use crate::actions::viewport::ViewportHandler;
use crate::core::{RecorderConfig, RecorderSession};
use crate::page::{DomEvent, EventKind, Page, PageSignal};
use crate::selector::SelectorGenerator;
use crate::utils::panel::is_in_tool_panel;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppression {
    Paused,
    AssertMode,
    ToolPanel,
    Untrusted,
    SyntheticClick,
}

fn session_blocks_recording(session: &RecorderSession) -> bool {
    session.is_paused() || session.is_assert_mode()
}

/// Why `event` must not be recorded, if it must not.
pub fn suppression(
    session: &RecorderSession,
    config: &RecorderConfig,
    page: &Page,
    event: &DomEvent,
) -> Option<Suppression> {
    if session.is_paused() {
        return Some(Suppression::Paused);
    }
    if session.is_assert_mode() {
        return Some(Suppression::AssertMode);
    }
    if is_in_tool_panel(&page.document, event.target, &config.assertion.panel_attribute) {
        return Some(Suppression::ToolPanel);
    }
    if event.kind.is_click_family() {
        if !event.is_trusted {
            return Some(Suppression::Untrusted);
        }
        if event.has_synthetic_click_signature() {
            return Some(Suppression::SyntheticClick);
        }
    }
    None
}

fn url_change_cause(kind: EventKind) -> Option<UrlChangeCause> {
    match kind {
        EventKind::PopState => Some(UrlChangeCause::PopState),
        EventKind::HashChange => Some(UrlChangeCause::HashChange),
        EventKind::BeforeUnload => Some(UrlChangeCause::BeforeUnload),
        EventKind::Unload => Some(UrlChangeCause::Unload),
        EventKind::PageHide => Some(UrlChangeCause::PageHide),
        _ => None,
    }
}

fn is_user_gesture(event: &DomEvent) -> bool {
    event.is_trusted
        && match event.kind {
            EventKind::Click | EventKind::Submit => true,
            EventKind::KeyDown => event.key == "Enter",
            _ => false,
        }
}

pub struct CapturePipeline {
    registry: HandlerRegistry,
    navigation: NavigationTracker,
    selectors: SelectorGenerator,
    pending_uploads: Vec<PendingUpload>,
    page_index: usize,
}

impl CapturePipeline {
    pub fn new(config: &RecorderConfig, url: &str) -> Self {
        let mut registry = HandlerRegistry::new();
        registry.register(ClickHandler);
        registry.register(InputHandler);
        registry.register(ChangeHandler);
        registry.register(UploadHandler);
        registry.register(KeyboardHandler);
        registry.register(ViewportHandler::default());
        registry.register(DragHandler::default());
        registry.register(PageFocusHandler::default());
        Self {
            registry,
            navigation: NavigationTracker::new(config.navigation.clone(), url),
            selectors: SelectorGenerator::new(config.selector.clone()),
            pending_uploads: Vec::new(),
            page_index: 0,
        }
    }

    pub fn with_page_index(mut self, page_index: usize) -> Self {
        self.page_index = page_index;
        self
    }

    pub fn handler_names(&self) -> Vec<&'static str> {
        self.registry.list_handlers()
    }

    pub fn navigation(&self) -> &NavigationTracker {
        &self.navigation
    }

    pub fn selectors(&self) -> &SelectorGenerator {
        &self.selectors
    }

    pub fn handle_event(
        &mut self,
        session: &mut RecorderSession,
        config: &RecorderConfig,
        page: &Page,
        event: &DomEvent,
    ) -> Vec<ActionRecord> {
        let now = page.now_ms();
        if let Some(reason) = suppression(session, config, page, event) {
            debug!(kind = event.kind.as_str(), ?reason, "event not recorded");
            if url_change_cause(event.kind).is_some() {
                self.navigation.sync_url(&page.url());
            }
            return Vec::new();
        }
        if is_user_gesture(event) {
            self.navigation.note_user_gesture(now);
        }
        if let Some(cause) = url_change_cause(event.kind) {
            return self
                .navigation
                .on_url_change(cause, &page.url(), now)
                .map(|decision| decision.into_record(&page.window.state.title, self.page_index, now))
                .into_iter()
                .collect();
        }

        let mut ctx = CaptureContext {
            session,
            config,
            selectors: &self.selectors,
            navigation: &mut self.navigation,
            now_ms: now,
            page_index: self.page_index,
        };
        let mut records = Vec::new();
        for captured in self.registry.dispatch(&mut ctx, page, event) {
            match captured {
                Captured::Record(record) => records.push(record),
                Captured::Upload(upload) => self.pending_uploads.push(upload),
            }
        }
        records
    }

    /// Feeds what page scripts did since the last checkpoint into the
    /// navigation tracker.
    pub fn process_signals(
        &mut self,
        session: &RecorderSession,
        page: &Page,
        signals: &[PageSignal],
    ) -> Vec<ActionRecord> {
        let now = page.now_ms();
        let recording = !session.is_paused() && !session.is_assert_mode();
        let mut records = Vec::new();
        for signal in signals {
            let (cause, url) = match signal {
                PageSignal::ScriptNavigation { url } => {
                    debug!(%url, "script navigation");
                    self.navigation.note_auto_redirect(now);
                    continue;
                }
                PageSignal::ScriptReload => {
                    self.navigation.note_auto_redirect(now);
                    continue;
                }
                PageSignal::ScriptTimer { code } => {
                    self.navigation.note_script_timer(code, now);
                    continue;
                }
                PageSignal::PushState { url } => (UrlChangeCause::PushState, url),
                PageSignal::ReplaceState { url } => (UrlChangeCause::ReplaceState, url),
                PageSignal::PopState { url } => (UrlChangeCause::PopState, url),
                PageSignal::HashChange { url } => (UrlChangeCause::HashChange, url),
                PageSignal::Unload { url } => (UrlChangeCause::Unload, url),
            };
            if !recording {
                self.navigation.sync_url(url);
                continue;
            }
            if let Some(decision) = self.navigation.on_url_change(cause, url, now) {
                records.push(decision.into_record(&page.window.state.title, self.page_index, now));
            }
        }
        records
    }

    /// Frame boundary: coalesced scroll and resize records.
    pub fn on_frame(
        &mut self,
        session: &mut RecorderSession,
        config: &RecorderConfig,
        page: &Page,
    ) -> Vec<ActionRecord> {
        let mut ctx = CaptureContext {
            session,
            config,
            selectors: &self.selectors,
            navigation: &mut self.navigation,
            now_ms: page.now_ms(),
            page_index: self.page_index,
        };
        let records = self.registry.on_frame(&mut ctx, page);
        // Bursts queued before pausing or arming are dropped, not deferred.
        if session_blocks_recording(&*ctx.session) {
            if !records.is_empty() {
                debug!(dropped = records.len(), "queued viewport records dropped");
            }
            return Vec::new();
        }
        records
    }

    pub fn has_pending_uploads(&self) -> bool {
        !self.pending_uploads.is_empty()
    }

    pub fn take_pending_uploads(&mut self) -> Vec<PendingUpload> {
        std::mem::take(&mut self.pending_uploads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionType;
    use crate::page::Modifiers;

    fn setup(html: &str) -> (CapturePipeline, RecorderSession, RecorderConfig, Page) {
        let config = RecorderConfig::default();
        let page = Page::from_html(html, "https://app.test/").unwrap();
        let pipeline = CapturePipeline::new(&config, &page.url());
        (pipeline, RecorderSession::new(), config, page)
    }

    #[test]
    fn synthetic_and_panel_clicks_are_suppressed() {
        let (mut pipeline, mut session, config, page) = setup(
            r#"<body><button id="b">Go</button><div data-recorder-panel="query"><button id="p">Run</button></div></body>"#,
        );
        let button = page.document.by_id("b").unwrap();
        let panel_button = page.document.by_id("p").unwrap();

        let synthetic = DomEvent::new(EventKind::Click, button);
        assert!(pipeline.handle_event(&mut session, &config, &page, &synthetic).is_empty());
        let untrusted = DomEvent::pointer(EventKind::Click, button, 5.0, 5.0).untrusted();
        assert!(pipeline.handle_event(&mut session, &config, &page, &untrusted).is_empty());
        let in_panel = DomEvent::pointer(EventKind::Click, panel_button, 5.0, 5.0);
        assert!(pipeline.handle_event(&mut session, &config, &page, &in_panel).is_empty());

        let real = DomEvent::pointer(EventKind::Click, button, 5.0, 5.0);
        let records = pipeline.handle_event(&mut session, &config, &page, &real);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action_type, ActionType::Click);
    }

    #[test]
    fn pause_silences_every_handler() {
        let (mut pipeline, mut session, config, page) =
            setup(r#"<body><input id="q" value="x"></body>"#);
        let input = page.document.by_id("q").unwrap();
        session.set_paused(true);
        let event = DomEvent::new(EventKind::Input, input);
        assert!(pipeline.handle_event(&mut session, &config, &page, &event).is_empty());
        session.set_paused(false);
        assert_eq!(pipeline.handle_event(&mut session, &config, &page, &event).len(), 1);
    }

    #[test]
    fn repeated_input_is_deduplicated() {
        let (mut pipeline, mut session, config, mut page) =
            setup(r#"<body><input id="q" placeholder="Search"></body>"#);
        let input = page.document.by_id("q").unwrap();
        page.document.set_value(input, "shoes");
        let event = DomEvent::new(EventKind::Input, input);
        assert_eq!(pipeline.handle_event(&mut session, &config, &page, &event).len(), 1);
        assert!(pipeline.handle_event(&mut session, &config, &page, &event).is_empty());
        session.reset_last_input_action();
        assert_eq!(pipeline.handle_event(&mut session, &config, &page, &event).len(), 1);
    }

    #[test]
    fn typing_in_fields_is_not_keyboard_recorded() {
        let (mut pipeline, mut session, config, page) =
            setup(r#"<body><input id="q"></body>"#);
        let input = page.document.by_id("q").unwrap();
        let letter = DomEvent::key(EventKind::KeyDown, input, "a", "KeyA");
        assert!(pipeline.handle_event(&mut session, &config, &page, &letter).is_empty());
        let enter = DomEvent::key(EventKind::KeyDown, input, "Enter", "Enter");
        let records = pipeline.handle_event(&mut session, &config, &page, &enter);
        assert_eq!(records[0].value().and_then(|v| v.key.as_deref()), Some("Enter"));
        let select_all = DomEvent::key(EventKind::KeyDown, input, "a", "KeyA").with_modifiers(
            Modifiers {
                ctrl: true,
                ..Modifiers::default()
            },
        );
        let records = pipeline.handle_event(&mut session, &config, &page, &select_all);
        assert_eq!(records[0].value().and_then(|v| v.key.as_deref()), Some("Ctrl+KeyA"));
        let shift = DomEvent::key(EventKind::KeyDown, input, "Shift", "ShiftLeft");
        assert!(pipeline.handle_event(&mut session, &config, &page, &shift).is_empty());
    }

    #[test]
    fn scroll_bursts_collapse_to_one_record_per_frame() {
        let (mut pipeline, mut session, config, mut page) = setup("<body></body>");
        let root = page.document.root();
        for y in [10.0, 40.0, 90.0] {
            page.scroll_to(0.0, y);
            let event = DomEvent::new(EventKind::Scroll, root);
            assert!(pipeline.handle_event(&mut session, &config, &page, &event).is_empty());
        }
        let records = pipeline.on_frame(&mut session, &config, &page);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].value().and_then(|v| v.scroll).map(|p| p.y), Some(90.0));
        assert!(pipeline.on_frame(&mut session, &config, &page).is_empty());
    }

    #[test]
    fn queued_viewport_records_are_dropped_once_paused_or_armed() {
        let (mut pipeline, mut session, config, mut page) = setup("<body></body>");
        let root = page.document.root();
        page.scroll_to(0.0, 50.0);
        pipeline.handle_event(&mut session, &config, &page, &DomEvent::new(EventKind::Scroll, root));
        pipeline.handle_event(&mut session, &config, &page, &DomEvent::new(EventKind::Resize, root));
        session.set_paused(true);
        assert!(pipeline.on_frame(&mut session, &config, &page).is_empty());
        session.set_paused(false);
        assert!(pipeline.on_frame(&mut session, &config, &page).is_empty());

        pipeline.handle_event(&mut session, &config, &page, &DomEvent::new(EventKind::Scroll, root));
        session.set_assert_mode(true, None);
        assert!(pipeline.on_frame(&mut session, &config, &page).is_empty());
        session.set_assert_mode(false, None);
        assert!(pipeline.on_frame(&mut session, &config, &page).is_empty());
    }

    #[test]
    fn resize_is_ignored_while_executing_actions() {
        let (mut pipeline, mut session, config, page) = setup("<body></body>");
        session.set_executing_actions(true);
        let event = DomEvent::new(EventKind::Resize, page.document.root());
        pipeline.handle_event(&mut session, &config, &page, &event);
        assert!(pipeline.on_frame(&mut session, &config, &page).is_empty());
    }

    #[test]
    fn drop_without_dragstart_records_nothing() {
        let (mut pipeline, mut session, config, page) =
            setup(r#"<body><div id="zone">Drop here</div><div id="card">Card</div></body>"#);
        let zone = page.document.by_id("zone").unwrap();
        let card = page.document.by_id("card").unwrap();
        let stray = DomEvent::pointer(EventKind::Drop, zone, 3.0, 3.0);
        assert!(pipeline.handle_event(&mut session, &config, &page, &stray).is_empty());

        let sequence = [
            DomEvent::pointer(EventKind::DragStart, card, 1.0, 1.0),
            DomEvent::pointer(EventKind::Drop, zone, 3.0, 3.0),
            DomEvent::pointer(EventKind::DragEnd, card, 3.0, 3.0),
        ];
        let types: Vec<_> = sequence
            .iter()
            .flat_map(|event| pipeline.handle_event(&mut session, &config, &page, event))
            .map(|record| record.action_type)
            .collect();
        assert_eq!(
            types,
            vec![ActionType::DragStart, ActionType::Drop, ActionType::DragEnd]
        );
    }

    #[test]
    fn focus_signals_are_debounced() {
        let (mut pipeline, mut session, config, mut page) = setup("<body></body>");
        let root = page.document.root();
        let focus = DomEvent::new(EventKind::Focus, root);
        let visible = DomEvent::new(EventKind::VisibilityChange, root);
        assert_eq!(pipeline.handle_event(&mut session, &config, &page, &focus).len(), 1);
        assert!(pipeline.handle_event(&mut session, &config, &page, &visible).is_empty());
        page.advance_time(600);
        assert_eq!(pipeline.handle_event(&mut session, &config, &page, &visible).len(), 1);
    }

    #[test]
    fn push_state_then_popstate_after_click_is_not_recorded() {
        let (mut pipeline, mut session, config, mut page) =
            setup(r#"<body><button id="tab">Orders</button></body>"#);
        let tab = page.document.by_id("tab").unwrap();
        let click = DomEvent::pointer(EventKind::Click, tab, 2.0, 2.0);
        assert_eq!(pipeline.handle_event(&mut session, &config, &page, &click).len(), 1);

        page.advance_time(100);
        page.push_state("/orders").unwrap();
        let signals = page.take_signals();
        assert!(pipeline.process_signals(&session, &page, &signals).is_empty());
        page.advance_time(100);
        let popstate = DomEvent::new(EventKind::PopState, page.document.root());
        assert!(pipeline.handle_event(&mut session, &config, &page, &popstate).is_empty());
        assert_eq!(pipeline.navigation().last_known_url(), "https://app.test/orders");
    }

    #[test]
    fn script_redirect_is_not_recorded_but_user_navigation_is() {
        let (mut pipeline, session, _config, mut page) = setup("<body></body>");
        page.advance_time(10_000);
        page.location_assign("/login").unwrap();
        let signals = page.take_signals();
        assert!(pipeline.process_signals(&session, &page, &signals).is_empty());

        page.advance_time(10_000);
        page.navigate("https://app.test/pricing").unwrap();
        let signals = page.take_signals();
        let records = pipeline.process_signals(&session, &page, &signals);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action_type, ActionType::Navigate);
        assert_eq!(
            records[0].value().and_then(|v| v.url.as_deref()),
            Some("https://app.test/pricing")
        );
    }
}
