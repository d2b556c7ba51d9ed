//! Screen freeze: holds the page still while the user picks an assertion
//! target. Animations are paused by an injected style, timers are queued
//! instead of scheduled, removed nodes are put back, and outside pointer
//! input is blocked. Every step is best-effort; a failing step is logged and
//! the rest still run.

use crate::assert::frozen::FrozenElementRegistry;
use crate::assert::protection::ProtectionRegistry;
use crate::dom::{Document, MutationRecord, NodeId};
use crate::errors::{RecorderError, Result};
use crate::page::{
    DomEvent, EventKind, EventLoop, FrameId, FrameTask, Page, RepeatingTask, TimerApi,
    TimerHandler, TimerId,
};
use crate::utils::panel::is_in_tool_panel;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info, warn};

pub const FREEZE_STYLE_ID: &str = "__recorder-freeze-style";

const FREEZE_CSS: &str = "*, *::before, *::after { animation-play-state: paused !important; transition: none !important; }";

/// Synthetic timer ids live far above anything the event loop hands out.
const SYNTHETIC_ID_BASE: u64 = 1 << 48;

const BLOCKED_WHILE_FROZEN: &[EventKind] = &[
    EventKind::Click,
    EventKind::MouseDown,
    EventKind::MouseUp,
    EventKind::Wheel,
    EventKind::TouchStart,
];

struct QueuedTimeout {
    id: TimerId,
    handler: TimerHandler,
}

struct QueuedInterval {
    id: TimerId,
    callback: RepeatingTask,
    delay_ms: u64,
}

#[derive(Default)]
struct TimerQueue {
    timeouts: Vec<QueuedTimeout>,
    intervals: Vec<QueuedInterval>,
    next_id: u64,
    swallowed_frames: usize,
}

/// Timer API installed while frozen.
#[derive(Default)]
pub struct FrozenTimers {
    queue: RefCell<TimerQueue>,
}

impl FrozenTimers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queued_timeouts(&self) -> usize {
        self.queue.borrow().timeouts.len()
    }

    pub fn queued_intervals(&self) -> usize {
        self.queue.borrow().intervals.len()
    }

    pub fn swallowed_frames(&self) -> usize {
        self.queue.borrow().swallowed_frames
    }

    fn next_id(&self) -> TimerId {
        let mut queue = self.queue.borrow_mut();
        queue.next_id += 1;
        TimerId(SYNTHETIC_ID_BASE + queue.next_id)
    }

    fn drain(&self) -> (Vec<QueuedTimeout>, Vec<QueuedInterval>) {
        let mut queue = self.queue.borrow_mut();
        (
            std::mem::take(&mut queue.timeouts),
            std::mem::take(&mut queue.intervals),
        )
    }
}

impl TimerApi for FrozenTimers {
    fn set_timeout(&self, _event_loop: &mut EventLoop, handler: TimerHandler, delay_ms: u64) -> TimerId {
        let id = self.next_id();
        debug!(?id, delay_ms, "timeout queued while frozen");
        self.queue
            .borrow_mut()
            .timeouts
            .push(QueuedTimeout { id, handler });
        id
    }

    fn set_interval(&self, _event_loop: &mut EventLoop, callback: RepeatingTask, delay_ms: u64) -> TimerId {
        let id = self.next_id();
        debug!(?id, delay_ms, "interval queued while frozen");
        self.queue.borrow_mut().intervals.push(QueuedInterval {
            id,
            callback,
            delay_ms,
        });
        id
    }

    fn clear_timeout(&self, event_loop: &mut EventLoop, id: TimerId) {
        let mut queue = self.queue.borrow_mut();
        let before = queue.timeouts.len();
        queue.timeouts.retain(|timeout| timeout.id != id);
        if queue.timeouts.len() == before {
            event_loop.cancel(id);
        }
    }

    fn clear_interval(&self, event_loop: &mut EventLoop, id: TimerId) {
        let mut queue = self.queue.borrow_mut();
        let before = queue.intervals.len();
        queue.intervals.retain(|interval| interval.id != id);
        if queue.intervals.len() == before {
            event_loop.cancel(id);
        }
    }

    fn request_animation_frame(&self, event_loop: &mut EventLoop, callback: FrameTask) -> FrameId {
        drop(callback);
        self.queue.borrow_mut().swallowed_frames += 1;
        event_loop.request_frame(Box::new(|_, _| {}))
    }

    fn cancel_animation_frame(&self, event_loop: &mut EventLoop, id: FrameId) {
        event_loop.cancel_frame(id);
    }

    fn name(&self) -> &'static str {
        "frozen"
    }
}

struct InstalledTimers {
    frozen: Rc<FrozenTimers>,
    previous: Rc<dyn TimerApi>,
}

pub struct ScreenFreeze {
    engaged: bool,
    timers: Option<InstalledTimers>,
    style_node: Option<NodeId>,
    protection: ProtectionRegistry,
    frozen_elements: FrozenElementRegistry,
    panel_attribute: String,
}

impl std::fmt::Debug for ScreenFreeze {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreenFreeze")
            .field("engaged", &self.engaged)
            .field("protected", &self.protection.len())
            .field("frozen_elements", &self.frozen_elements.len())
            .finish()
    }
}

impl ScreenFreeze {
    pub fn new(panel_attribute: &str) -> Self {
        Self {
            engaged: false,
            timers: None,
            style_node: None,
            protection: ProtectionRegistry::new(panel_attribute),
            frozen_elements: FrozenElementRegistry::new(),
            panel_attribute: panel_attribute.to_string(),
        }
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    pub fn protection(&self) -> &ProtectionRegistry {
        &self.protection
    }

    pub fn frozen_elements(&self) -> &FrozenElementRegistry {
        &self.frozen_elements
    }

    /// The queue behind the installed timer API, while frozen.
    pub fn frozen_timers(&self) -> Option<Rc<FrozenTimers>> {
        self.timers.as_ref().map(|installed| installed.frozen.clone())
    }

    /// Engages the freeze. A second call while engaged does nothing.
    pub fn freeze(&mut self, page: &mut Page) -> bool {
        if self.engaged {
            debug!("screen already frozen");
            return false;
        }
        self.engaged = true;

        if let Err(err) = self.inject_style(&mut page.document) {
            warn!("freeze style not injected: {}", err);
        }

        let frozen = Rc::new(FrozenTimers::new());
        let previous = page.window.replace_timers(frozen.clone());
        self.timers = Some(InstalledTimers { frozen, previous });

        let protected = self.protection.snapshot(&page.document);
        page.document.observe_mutations();

        info!(protected, "screen frozen");
        true
    }

    /// Disengages the freeze and replays what was held back. Does nothing
    /// when not frozen.
    pub fn unfreeze(&mut self, page: &mut Page) -> bool {
        if !self.engaged {
            self.frozen_elements.unfreeze_all(&mut page.document);
            return false;
        }
        self.engaged = false;

        if let Some(style) = self.style_node.take() {
            if let Err(err) = page.document.remove(style) {
                warn!("freeze style already gone: {}", err);
            }
        }

        page.document.disconnect_observer();
        let detached = self.protection.detach_restored(&mut page.document);
        self.protection.clear();
        let unfrozen = self.frozen_elements.unfreeze_all(&mut page.document);

        let (timeouts, intervals) = match self.timers.take() {
            Some(installed) => {
                page.window.replace_timers(installed.previous);
                installed.frozen.drain()
            }
            None => (Vec::new(), Vec::new()),
        };
        let flushed = timeouts.len();
        for timeout in timeouts {
            page.run_timer_handler(timeout.handler);
        }
        let resumed = intervals.len();
        for interval in intervals {
            page.window
                .event_loop
                .resume_interval(interval.id, interval.callback, interval.delay_ms);
        }

        info!(flushed, resumed, detached, unfrozen, "screen unfrozen");
        true
    }

    fn inject_style(&mut self, doc: &mut Document) -> Result<()> {
        let parent = doc
            .head()
            .or_else(|| doc.body())
            .or_else(|| doc.document_element())
            .ok_or_else(|| RecorderError::NodeNotFound("document element".to_string()))?;
        let style = doc.create_element("style");
        doc.set_attr(style, "id", FREEZE_STYLE_ID);
        doc.set_text_content(style, FREEZE_CSS)?;
        doc.append_child(parent, style)?;
        self.style_node = Some(style);
        Ok(())
    }

    /// Freezes the transient container around `node`, if there is one.
    pub fn freeze_element(&mut self, doc: &mut Document, node: NodeId, now: i64) -> bool {
        match crate::assert::frozen::likely_to_disappear(doc, node) {
            Some(container) => self.frozen_elements.freeze(doc, container, now),
            None => false,
        }
    }

    /// Mutation observer callback: protects new nodes and puts back removed
    /// protected ones. Returns how many nodes were restored.
    pub fn handle_mutations(&mut self, doc: &mut Document) -> usize {
        if !self.engaged {
            return 0;
        }
        let mut restored = 0;
        for record in doc.take_mutations() {
            match record {
                MutationRecord::Added { node, .. } => {
                    self.protection.protect_subtree(doc, node);
                }
                MutationRecord::Removed { node, .. } => match self.protection.restore(doc, node) {
                    Ok(true) => restored += 1,
                    Ok(false) => {}
                    Err(err) => warn!(?node, "could not restore removed node: {}", err),
                },
            }
        }
        // Re-appending logs insertions of nodes that are already protected.
        doc.take_mutations();
        restored
    }

    /// Global blockers: pointer input and Escape from outside the tool panels.
    pub fn blocks(&self, doc: &Document, event: &DomEvent) -> bool {
        if !self.engaged || is_in_tool_panel(doc, event.target, &self.panel_attribute) {
            return false;
        }
        BLOCKED_WHILE_FROZEN.contains(&event.kind)
            || (event.kind == EventKind::KeyDown && event.key == "Escape")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn page() -> Page {
        Page::from_html(
            r#"<head></head><body><div class="toast" id="toast">Saved</div><button id="b">Go</button></body>"#,
            "https://app.test/",
        )
        .unwrap()
    }

    #[test]
    fn freezing_twice_engages_once() {
        let mut page = page();
        let native = page.window.timers();
        let mut freeze = ScreenFreeze::new("data-recorder-panel");
        assert!(freeze.freeze(&mut page));
        let installed = page.window.timers();
        assert!(!freeze.freeze(&mut page));
        assert!(Rc::ptr_eq(&installed, &page.window.timers()));
        assert_eq!(page.document.by_id(FREEZE_STYLE_ID).into_iter().count(), 1);

        assert!(freeze.unfreeze(&mut page));
        assert!(!freeze.unfreeze(&mut page));
        assert!(Rc::ptr_eq(&native, &page.window.timers()));
        assert!(page.document.by_id(FREEZE_STYLE_ID).is_none());
    }

    #[test]
    fn queued_timeout_runs_once_after_unfreeze() {
        let mut page = page();
        let mut freeze = ScreenFreeze::new("data-recorder-panel");
        freeze.freeze(&mut page);

        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        page.set_timeout(50, move |_| counter.set(counter.get() + 1));
        page.advance_time(1_000);
        assert_eq!(calls.get(), 0);

        freeze.unfreeze(&mut page);
        assert_eq!(calls.get(), 1);
        page.advance_time(1_000);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn intervals_resume_and_frames_are_swallowed() {
        let mut page = page();
        let mut freeze = ScreenFreeze::new("data-recorder-panel");
        freeze.freeze(&mut page);

        let ticks = Rc::new(Cell::new(0));
        let counter = ticks.clone();
        page.set_interval(100, move |_| counter.set(counter.get() + 1));
        let painted = Rc::new(Cell::new(false));
        let flag = painted.clone();
        page.request_animation_frame(move |_, _| flag.set(true));
        page.advance_time(500);
        assert_eq!(page.run_animation_frame(), 1);
        assert!(!painted.get());
        assert_eq!(ticks.get(), 0);
        assert_eq!(freeze.frozen_timers().map(|t| t.swallowed_frames()), Some(1));

        freeze.unfreeze(&mut page);
        page.advance_time(250);
        assert_eq!(ticks.get(), 2);
    }

    #[test]
    fn interval_ids_survive_unfreeze() {
        let mut page = page();
        let mut freeze = ScreenFreeze::new("data-recorder-panel");
        freeze.freeze(&mut page);

        let ticks = Rc::new(Cell::new(0));
        let counter = ticks.clone();
        let id = page.set_interval(100, move |_| counter.set(counter.get() + 1));

        freeze.unfreeze(&mut page);
        page.advance_time(250);
        assert_eq!(ticks.get(), 2);

        page.clear_interval(id);
        page.advance_time(1_000);
        assert_eq!(ticks.get(), 2);
        assert!(page.window.event_loop.pending_timers().is_empty());
    }

    #[test]
    fn removed_nodes_come_back_until_unfreeze() {
        let mut page = page();
        let toast = page.document.by_id("toast").unwrap();
        let mut freeze = ScreenFreeze::new("data-recorder-panel");
        freeze.freeze(&mut page);

        page.document.remove(toast).unwrap();
        assert_eq!(freeze.handle_mutations(&mut page.document), 1);
        assert!(page.document.is_connected(toast));

        freeze.unfreeze(&mut page);
        assert!(!page.document.is_connected(toast));
        assert!(!page.document.is_observing());
    }

    #[test]
    fn blocks_outside_pointer_input_and_escape() {
        let mut page = page();
        let button = page.document.by_id("b").unwrap();
        let mut freeze = ScreenFreeze::new("data-recorder-panel");
        let wheel = DomEvent::new(EventKind::Wheel, button);
        assert!(!freeze.blocks(&page.document, &wheel));
        freeze.freeze(&mut page);
        assert!(freeze.blocks(&page.document, &wheel));
        let escape = DomEvent::key(EventKind::KeyDown, button, "Escape", "Escape");
        assert!(freeze.blocks(&page.document, &escape));
        let letter = DomEvent::key(EventKind::KeyDown, button, "a", "KeyA");
        assert!(!freeze.blocks(&page.document, &letter));
    }
}
