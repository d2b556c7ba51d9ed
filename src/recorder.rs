//! The injected recorder: one per page lifetime. Owns the mode flags, the
//! capture pipeline and the assert controller, and forwards every record to
//! the host through an [`ActionSink`].

use crate::actions::{
    ActionRecord, ActionSink, CapturePipeline, FileReader, TokioFileReader,
};
use crate::assert::{AssertController, AssertState, AssertType, VariableItem};
use crate::core::{RecorderConfig, RecorderSession};
use crate::errors::Result;
use crate::page::{DomEvent, Page};
use std::sync::Arc;
use tracing::{debug, error, info};

pub struct Recorder {
    config: RecorderConfig,
    session: RecorderSession,
    pipeline: CapturePipeline,
    assertions: AssertController,
    sink: Option<Arc<dyn ActionSink>>,
    file_reader: Arc<dyn FileReader>,
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("session", &self.session.id)
            .field("assertions", &self.assertions)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl Recorder {
    pub fn new(config: RecorderConfig, page: &Page) -> Result<Self> {
        config.validate()?;
        let pipeline = CapturePipeline::new(&config, &page.url());
        let assertions = AssertController::new(&config.assertion);
        let session = RecorderSession::new();
        info!(session = %session.id, url = %page.url(), "recorder attached");
        Ok(Self {
            config,
            session,
            pipeline,
            assertions,
            sink: None,
            file_reader: Arc::new(TokioFileReader),
        })
    }

    pub fn with_sink(mut self, sink: Arc<dyn ActionSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_file_reader(mut self, reader: Arc<dyn FileReader>) -> Self {
        self.file_reader = reader;
        self
    }

    pub fn with_page_index(mut self, page_index: usize) -> Self {
        self.pipeline = self.pipeline.with_page_index(page_index);
        self
    }

    pub fn set_sink(&mut self, sink: Arc<dyn ActionSink>) {
        self.sink = Some(sink);
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn session(&self) -> &RecorderSession {
        &self.session
    }

    pub fn pipeline(&self) -> &CapturePipeline {
        &self.pipeline
    }

    pub fn assertions(&self) -> &AssertController {
        &self.assertions
    }

    pub fn assert_state(&self) -> AssertState {
        self.assertions.state()
    }

    // ---- control surface ----

    pub fn set_pause_mode(&mut self, paused: bool) {
        self.session.set_paused(paused);
    }

    pub fn set_assert_mode(&mut self, page: &mut Page, enabled: bool, assert_type: Option<AssertType>) {
        if enabled {
            self.assertions.arm(&mut self.session, page, assert_type);
        } else {
            self.assertions.disarm(&mut self.session, page);
        }
    }

    pub fn reset_last_input_action(&mut self) {
        self.session.reset_last_input_action();
    }

    pub fn set_executing_actions_state(&mut self, executing: bool) {
        self.session.set_executing_actions(executing);
    }

    pub fn enable_hover_effects(&mut self) {
        self.session.set_hover_effects(true);
    }

    pub fn disable_hover_effects(&mut self, page: &mut Page) {
        self.session.set_hover_effects(false);
        self.assertions.clear_hover(page);
    }

    pub fn unfreeze_entire_screen(&mut self, page: &mut Page) -> bool {
        self.assertions.unfreeze_entire_screen(page)
    }

    // ---- assert surface ----

    pub fn set_assert_value(&mut self, page: &mut Page, value: &str) -> bool {
        self.assertions.set_surface_value(page, value)
    }

    pub fn insert_variable(&mut self, page: &mut Page, variable: &VariableItem) -> bool {
        self.assertions.insert_variable(page, variable)
    }

    pub fn attach_query(&mut self, payload: serde_json::Value) -> bool {
        self.assertions.attach_query(payload)
    }

    pub fn attach_api_request(&mut self, payload: serde_json::Value) -> bool {
        self.assertions.attach_api_request(payload)
    }

    pub fn confirm_assertion(&mut self, page: &mut Page) -> usize {
        let record = self.assertions.confirm(&self.session, page);
        self.emit_all(record)
    }

    pub fn cancel_assertion(&mut self, page: &mut Page) -> bool {
        self.assertions.cancel(page)
    }

    // ---- host hooks ----

    /// Capture-phase listener. The assert interceptor sees the event first;
    /// if it blocked the event the recording listeners never run.
    pub fn handle_event(&mut self, page: &mut Page, event: &mut DomEvent) -> usize {
        let mut emitted = 0;
        if self.assertions.is_armed() {
            let record = self.assertions.handle_event(&mut self.session, page, event);
            emitted += self.emit_all(record);
            if event.immediate_propagation_stopped() {
                debug!(kind = event.kind.as_str(), "event blocked by assert mode");
                return emitted;
            }
        }
        let records = self
            .pipeline
            .handle_event(&mut self.session, &self.config, page, event);
        emitted + self.emit_all(records)
    }

    /// Microtask checkpoint: page signals, freeze mutations and the queued
    /// assert click.
    pub fn sync(&mut self, page: &mut Page) -> usize {
        let signals = page.take_signals();
        let records = self.pipeline.process_signals(&self.session, page, &signals);
        let mut emitted = self.emit_all(records);

        if self.assertions.freeze().is_engaged() {
            let restored = self.assertions.handle_mutations(page);
            if restored > 0 {
                debug!(restored, "mutations handled while frozen");
            }
        }

        let record = self.assertions.flush_pending_click(
            &self.session,
            &self.config,
            self.pipeline.selectors(),
            page,
        );
        emitted += self.emit_all(record);
        emitted
    }

    /// `handle_event`, then the microtask checkpoint, then any file reads
    /// the event started.
    pub async fn dispatch(&mut self, page: &mut Page, event: &mut DomEvent) -> usize {
        let emitted = self.handle_event(page, event) + self.sync(page);
        emitted + self.flush_uploads().await
    }

    pub async fn flush_uploads(&mut self) -> usize {
        let mut emitted = 0;
        for upload in self.pipeline.take_pending_uploads() {
            let record = upload.resolve(self.file_reader.as_ref()).await;
            emitted += self.emit_all(record);
        }
        emitted
    }

    /// Frame boundary: runs the page's frame callbacks, then coalesced
    /// viewport records and periodic cleanup.
    pub fn on_animation_frame(&mut self, page: &mut Page) -> usize {
        page.run_animation_frame();
        let records = self.pipeline.on_frame(&mut self.session, &self.config, page);
        self.assertions.tick(page);
        self.emit_all(records)
    }

    fn emit_all(&self, records: impl IntoIterator<Item = ActionRecord>) -> usize {
        records
            .into_iter()
            .map(|record| self.emit(record))
            .filter(|sent| *sent)
            .count()
    }

    fn emit(&self, record: ActionRecord) -> bool {
        let Some(sink) = &self.sink else {
            error!(
                action = record.action_type.as_str(),
                "no action sink registered, record dropped"
            );
            return false;
        };
        match sink.send_action(record) {
            Ok(()) => true,
            Err(err) => {
                error!("failed to send action: {}", err);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{ActionType, MemorySink};
    use crate::page::EventKind;

    fn recorder(html: &str) -> (Recorder, MemorySink, Page) {
        let page = Page::from_html(html, "https://app.test/").unwrap();
        let sink = MemorySink::new();
        let recorder = Recorder::new(RecorderConfig::default(), &page)
            .unwrap()
            .with_sink(Arc::new(sink.clone()));
        (recorder, sink, page)
    }

    #[test]
    fn records_reach_the_sink() {
        let (mut recorder, sink, mut page) =
            recorder(r#"<body><button id="b" data-testid="go">Go</button></body>"#);
        let button = page.document.by_id("b").unwrap();
        let mut click = DomEvent::pointer(EventKind::Click, button, 4.0, 4.0);
        assert_eq!(recorder.handle_event(&mut page, &mut click), 1);
        assert_eq!(sink.records()[0].action_type, ActionType::Click);
    }

    #[test]
    fn missing_sink_drops_records() {
        let mut page =
            Page::from_html(r#"<body><button id="b">Go</button></body>"#, "https://app.test/")
                .unwrap();
        let mut recorder = Recorder::new(RecorderConfig::default(), &page).unwrap();
        let button = page.document.by_id("b").unwrap();
        let mut click = DomEvent::pointer(EventKind::Click, button, 4.0, 4.0);
        assert_eq!(recorder.handle_event(&mut page, &mut click), 0);
    }

    #[test]
    fn blocked_events_skip_the_pipeline() {
        let (mut recorder, sink, mut page) =
            recorder(r#"<body><button id="b">Go</button></body>"#);
        recorder.set_assert_mode(&mut page, true, Some(AssertType::Visible));
        let button = page.document.by_id("b").unwrap();
        let mut click = DomEvent::pointer(EventKind::Click, button, 4.0, 4.0);
        assert_eq!(recorder.handle_event(&mut page, &mut click), 0);
        assert!(click.default_prevented());
        assert_eq!(recorder.sync(&mut page), 1);
        assert_eq!(sink.records()[0].action_type, ActionType::Assert);

        recorder.set_assert_mode(&mut page, false, None);
        assert_eq!(recorder.assert_state(), AssertState::Idle);
        let mut click = DomEvent::pointer(EventKind::Click, button, 4.0, 4.0);
        recorder.handle_event(&mut page, &mut click);
        assert_eq!(sink.len(), 2);
    }
}
