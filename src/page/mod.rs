//! In-memory stand-in for the tracked browser tab: document, window state,
//! virtual-time event loop and the script-facing APIs that the assert-mode
//! interception layer swaps out.

pub mod event;
pub mod event_loop;
pub mod navigation;
pub mod timers;

pub use event::{DomEvent, EventKind, Modifiers};
pub use event_loop::{
    EventLoop, FrameId, FrameTask, PendingTimer, RepeatingTask, Task, TimerHandler, TimerId,
};
pub use navigation::{
    FetchRequest, NativeNavigation, NativeNetwork, NavigationApi, NetworkApi, NetworkEntry,
    NetworkLog, XhrId,
};
pub use timers::{NativeTimers, TimerApi};

use crate::core::Clock;
use crate::dom::{parse_html, Document};
use crate::errors::{RecorderError, Result};
use crate::page::event_loop::DueWork;
use crate::types::{Point, Viewport};
use crate::utils::text::cached_regex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use std::sync::OnceLock;
use tracing::debug;
use url::Url;

pub const BLANK_URL: &str = "about:blank";

/// Something a page script did that the recorder observes at its next
/// microtask checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageSignal {
    PushState { url: String },
    ReplaceState { url: String },
    PopState { url: String },
    HashChange { url: String },
    /// `location.assign`, `location.replace` or an `href` assignment.
    ScriptNavigation { url: String },
    ScriptReload,
    /// String-bodied `setTimeout`/`setInterval`.
    ScriptTimer { code: String },
    /// The document is about to unload towards `url`.
    Unload { url: String },
}

#[derive(Debug, Clone)]
pub struct WindowState {
    pub location: Url,
    pub history: Vec<Url>,
    pub history_index: usize,
    pub viewport: Viewport,
    pub scroll: Point,
    pub visible: bool,
    pub title: String,
    pub network: NetworkLog,
    signals: Vec<PageSignal>,
}

impl WindowState {
    pub fn new(location: Url) -> Self {
        Self {
            history: vec![location.clone()],
            history_index: 0,
            location,
            viewport: Viewport::default(),
            scroll: Point::default(),
            visible: true,
            title: String::new(),
            network: NetworkLog::default(),
            signals: Vec::new(),
        }
    }

    pub fn resolve(&self, url: &str) -> Result<Url> {
        self.location
            .join(url)
            .or_else(|_| Url::parse(url))
            .map_err(|err| RecorderError::InvalidUrl(format!("{}: {}", url, err)))
    }

    pub fn raise(&mut self, signal: PageSignal) {
        self.signals.push(signal);
    }

    pub fn take_signals(&mut self) -> Vec<PageSignal> {
        std::mem::take(&mut self.signals)
    }

    pub fn pending_signals(&self) -> &[PageSignal] {
        &self.signals
    }

    /// Moves the tab to `target`. Fragment-only changes stay in the document.
    pub(crate) fn commit_navigation(&mut self, target: Url, push: bool) {
        let same_document = {
            let mut current = self.location.clone();
            let mut next = target.clone();
            current.set_fragment(None);
            next.set_fragment(None);
            current == next && target.fragment().is_some()
        };
        if push {
            self.history.truncate(self.history_index + 1);
            self.history.push(target.clone());
            self.history_index = self.history.len() - 1;
        } else if let Some(entry) = self.history.get_mut(self.history_index) {
            *entry = target.clone();
        }
        if same_document {
            let changed = self.location.fragment() != target.fragment();
            self.location = target.clone();
            if changed {
                self.raise(PageSignal::HashChange {
                    url: target.to_string(),
                });
            }
            return;
        }
        self.raise(PageSignal::Unload {
            url: target.to_string(),
        });
        self.location = target;
    }
}

pub struct Window {
    pub state: WindowState,
    pub event_loop: EventLoop,
    timers: Rc<dyn TimerApi>,
    navigation: Rc<dyn NavigationApi>,
    network: Rc<dyn NetworkApi>,
}

impl std::fmt::Debug for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window")
            .field("location", &self.state.location.as_str())
            .field("event_loop", &self.event_loop)
            .field("timers", &self.timers.name())
            .field("navigation", &self.navigation.name())
            .field("network", &self.network.name())
            .finish()
    }
}

impl Window {
    pub fn new(location: Url) -> Self {
        Self {
            state: WindowState::new(location),
            event_loop: EventLoop::new(),
            timers: Rc::new(NativeTimers),
            navigation: Rc::new(NativeNavigation),
            network: Rc::new(NativeNetwork),
        }
    }

    pub fn timers(&self) -> Rc<dyn TimerApi> {
        self.timers.clone()
    }

    pub fn navigation(&self) -> Rc<dyn NavigationApi> {
        self.navigation.clone()
    }

    pub fn network(&self) -> Rc<dyn NetworkApi> {
        self.network.clone()
    }

    /// Installs `timers` and hands back whatever was installed before.
    pub fn replace_timers(&mut self, timers: Rc<dyn TimerApi>) -> Rc<dyn TimerApi> {
        std::mem::replace(&mut self.timers, timers)
    }

    pub fn replace_navigation(&mut self, navigation: Rc<dyn NavigationApi>) -> Rc<dyn NavigationApi> {
        std::mem::replace(&mut self.navigation, navigation)
    }

    pub fn replace_network(&mut self, network: Rc<dyn NetworkApi>) -> Rc<dyn NetworkApi> {
        std::mem::replace(&mut self.network, network)
    }
}

#[derive(Debug)]
pub struct Page {
    pub document: Document,
    pub window: Window,
}

impl Page {
    pub fn new(document: Document, url: &str) -> Result<Self> {
        let location = Url::parse(url)
            .map_err(|err| RecorderError::InvalidUrl(format!("{}: {}", url, err)))?;
        Ok(Self {
            document,
            window: Window::new(location),
        })
    }

    pub fn from_html(html: &str, url: &str) -> Result<Self> {
        Self::new(parse_html(html)?, url)
    }

    pub fn blank() -> Result<Self> {
        Self::new(Document::with_body(), BLANK_URL)
    }

    /// Swaps in the document of a freshly loaded page.
    pub fn load_document(&mut self, document: Document) {
        self.document = document;
    }

    pub fn url(&self) -> String {
        self.window.state.location.to_string()
    }

    pub fn now_ms(&self) -> i64 {
        self.window.event_loop.now_ms()
    }

    pub fn take_signals(&mut self) -> Vec<PageSignal> {
        self.window.state.take_signals()
    }

    /// Moves virtual time to `clock`'s reading. Only ever used before
    /// anything is scheduled, so pending timers keep their order.
    pub fn sync_clock(&mut self, clock: &dyn Clock) {
        self.window.event_loop.set_now(clock.now_ms());
    }

    // ---- timers ----

    pub fn set_timeout(&mut self, delay_ms: u64, callback: impl FnOnce(&mut Page) + 'static) -> TimerId {
        let timers = self.window.timers();
        timers.set_timeout(
            &mut self.window.event_loop,
            TimerHandler::Callback(Box::new(callback)),
            delay_ms,
        )
    }

    pub fn set_timeout_script(&mut self, code: &str, delay_ms: u64) -> TimerId {
        self.window.state.raise(PageSignal::ScriptTimer {
            code: code.to_string(),
        });
        let timers = self.window.timers();
        timers.set_timeout(
            &mut self.window.event_loop,
            TimerHandler::Script(code.to_string()),
            delay_ms,
        )
    }

    pub fn set_interval(&mut self, delay_ms: u64, callback: impl Fn(&mut Page) + 'static) -> TimerId {
        let timers = self.window.timers();
        timers.set_interval(&mut self.window.event_loop, Rc::new(callback), delay_ms)
    }

    pub fn set_interval_script(&mut self, code: &str, delay_ms: u64) -> TimerId {
        self.window.state.raise(PageSignal::ScriptTimer {
            code: code.to_string(),
        });
        let source = code.to_string();
        self.set_interval(delay_ms, move |page| page.evaluate_script(&source))
    }

    pub fn clear_timeout(&mut self, id: TimerId) {
        let timers = self.window.timers();
        timers.clear_timeout(&mut self.window.event_loop, id);
    }

    pub fn clear_interval(&mut self, id: TimerId) {
        let timers = self.window.timers();
        timers.clear_interval(&mut self.window.event_loop, id);
    }

    pub fn request_animation_frame(
        &mut self,
        callback: impl FnOnce(&mut Page, f64) + 'static,
    ) -> FrameId {
        let timers = self.window.timers();
        timers.request_animation_frame(&mut self.window.event_loop, Box::new(callback))
    }

    pub fn cancel_animation_frame(&mut self, id: FrameId) {
        let timers = self.window.timers();
        timers.cancel_animation_frame(&mut self.window.event_loop, id);
    }

    /// Runs every timer due within the next `delta_ms` of virtual time.
    pub fn advance_time(&mut self, delta_ms: i64) {
        let target = self.now_ms() + delta_ms.max(0);
        while let Some((due_at, work)) = self.window.event_loop.pop_due(target) {
            self.window.event_loop.set_now(due_at);
            match work {
                DueWork::Once(handler) => self.run_timer_handler(handler),
                DueWork::Repeat(callback) => callback(self),
            }
        }
        self.window.event_loop.set_now(target);
    }

    /// Runs the current batch of animation-frame callbacks.
    pub fn run_animation_frame(&mut self) -> usize {
        let frames = self.window.event_loop.take_frames();
        let count = frames.len();
        let timestamp = self.now_ms() as f64;
        for (_, callback) in frames {
            callback(self, timestamp);
        }
        count
    }

    pub fn run_timer_handler(&mut self, handler: TimerHandler) {
        match handler {
            TimerHandler::Callback(callback) => callback(self),
            TimerHandler::Script(code) => self.evaluate_script(&code),
        }
    }

    /// Understands the navigation one-liners pages put in string timers;
    /// anything else is ignored.
    pub fn evaluate_script(&mut self, code: &str) {
        if let Some(captures) = location_call_pattern().and_then(|re| re.captures(code)) {
            let url = captures[2].to_string();
            let result = if &captures[1] == "replace" {
                self.location_replace(&url)
            } else {
                self.location_assign(&url)
            };
            if let Err(err) = result {
                debug!("script navigation failed: {}", err);
            }
            return;
        }
        if let Some(captures) = href_assignment_pattern().and_then(|re| re.captures(code)) {
            if let Err(err) = self.set_location_href(&captures[1]) {
                debug!("script navigation failed: {}", err);
            }
            return;
        }
        if code.contains("location.reload") {
            self.reload();
            return;
        }
        debug!("ignoring script: {}", code);
    }

    // ---- history & location ----

    pub fn push_state(&mut self, url: &str) -> Result<()> {
        let navigation = self.window.navigation();
        navigation.push_state(&mut self.window.state, url)
    }

    pub fn replace_state(&mut self, url: &str) -> Result<()> {
        let navigation = self.window.navigation();
        navigation.replace_state(&mut self.window.state, url)
    }

    pub fn history_back(&mut self) {
        self.history_go(-1);
    }

    pub fn history_forward(&mut self) {
        self.history_go(1);
    }

    pub fn history_go(&mut self, delta: i64) {
        let navigation = self.window.navigation();
        navigation.go(&mut self.window.state, delta);
    }

    pub fn location_assign(&mut self, url: &str) -> Result<()> {
        let navigation = self.window.navigation();
        navigation.assign(&mut self.window.state, url)
    }

    pub fn location_replace(&mut self, url: &str) -> Result<()> {
        let navigation = self.window.navigation();
        navigation.replace(&mut self.window.state, url)
    }

    pub fn set_location_href(&mut self, url: &str) -> Result<()> {
        self.location_assign(url)
    }

    pub fn reload(&mut self) {
        let navigation = self.window.navigation();
        navigation.reload(&mut self.window.state);
    }

    /// Navigation the user starts from browser chrome (address bar, bookmark).
    pub fn navigate(&mut self, url: &str) -> Result<()> {
        let target = self.window.state.resolve(url)?;
        self.window.state.commit_navigation(target, true);
        Ok(())
    }

    /// The browser's own reload button.
    pub fn user_reload(&mut self) {
        let url = self.url();
        self.window.state.raise(PageSignal::Unload { url });
    }

    // ---- network ----

    pub fn xhr_open(&mut self, method: &str, url: &str) -> XhrId {
        let network = self.window.network();
        network.xhr_open(&mut self.window.state.network, method, url)
    }

    pub fn xhr_send(&mut self, id: XhrId, body: Option<String>) -> Result<()> {
        let network = self.window.network();
        network.xhr_send(&mut self.window.state.network, id, body)
    }

    pub fn fetch(&mut self, request: FetchRequest) -> Result<usize> {
        let network = self.window.network();
        network.fetch(&mut self.window.state.network, request)
    }

    // ---- viewport ----

    pub fn scroll_to(&mut self, x: f64, y: f64) {
        self.window.state.scroll = Point::new(x, y);
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.window.state.viewport = Viewport { width, height };
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.window.state.visible = visible;
    }
}

fn location_call_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(
        &PATTERN,
        r#"location\.(assign|replace)\(\s*['"]([^'"]+)['"]\s*\)"#,
    )
}

fn href_assignment_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(&PATTERN, r#"location(?:\.href)?\s*=\s*['"]([^'"]+)['"]"#)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn page() -> Page {
        Page::from_html("<body><p>hi</p></body>", "https://shop.test/home").unwrap()
    }

    #[test]
    fn timers_run_in_due_order() {
        let mut page = page();
        let log = Rc::new(RefCell::new(Vec::new()));
        for (delay, label) in [(30, "c"), (10, "a"), (10, "b")] {
            let log = log.clone();
            page.set_timeout(delay, move |_| log.borrow_mut().push(label));
        }
        page.advance_time(5);
        assert!(log.borrow().is_empty());
        page.advance_time(30);
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn intervals_repeat_until_cleared() {
        let mut page = page();
        let ticks = Rc::new(RefCell::new(0));
        let counter = ticks.clone();
        let id = page.set_interval(100, move |_| *counter.borrow_mut() += 1);
        page.advance_time(350);
        assert_eq!(*ticks.borrow(), 3);
        page.clear_interval(id);
        page.advance_time(500);
        assert_eq!(*ticks.borrow(), 3);
    }

    #[test]
    fn history_and_hash_changes_raise_signals() {
        let mut page = page();
        page.push_state("/cart").unwrap();
        page.history_back();
        page.set_location_href("#reviews").unwrap();
        let signals = page.take_signals();
        assert_eq!(
            signals,
            vec![
                PageSignal::PushState {
                    url: "https://shop.test/cart".to_string()
                },
                PageSignal::PopState {
                    url: "https://shop.test/home".to_string()
                },
                PageSignal::ScriptNavigation {
                    url: "https://shop.test/home#reviews".to_string()
                },
                PageSignal::HashChange {
                    url: "https://shop.test/home#reviews".to_string()
                },
            ]
        );
    }

    #[test]
    fn string_timer_navigates_when_it_fires() {
        let mut page = page();
        page.set_timeout_script("window.location.href = '/login'", 0);
        assert!(matches!(
            page.take_signals().as_slice(),
            [PageSignal::ScriptTimer { .. }]
        ));
        page.advance_time(0);
        assert_eq!(page.url(), "https://shop.test/login");
        assert!(page
            .take_signals()
            .contains(&PageSignal::Unload {
                url: "https://shop.test/login".to_string()
            }));
    }

    #[test]
    fn network_requests_are_logged() {
        let mut page = page();
        let xhr = page.xhr_open("post", "/api/cart");
        page.xhr_send(xhr, Some("{}".to_string())).unwrap();
        page.fetch(FetchRequest::get("/api/items")).unwrap();
        let sent = page.window.state.network.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].method, "POST");
        assert!(sent[1].via_fetch);
    }
}
