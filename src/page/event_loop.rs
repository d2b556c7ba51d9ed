use crate::page::Page;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

pub type Task = Box<dyn FnOnce(&mut Page)>;
pub type RepeatingTask = Rc<dyn Fn(&mut Page)>;
pub type FrameTask = Box<dyn FnOnce(&mut Page, f64)>;

const FRAME_INTERVAL_MS: i64 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameId(pub u64);

/// What a one-shot timer runs: a callback, or a string of script source
/// (`setTimeout("location.href = '/next'", 0)`).
pub enum TimerHandler {
    Callback(Task),
    Script(String),
}

impl fmt::Debug for TimerHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerHandler::Callback(_) => f.write_str("Callback(..)"),
            TimerHandler::Script(code) => f.debug_tuple("Script").field(code).finish(),
        }
    }
}

enum Scheduled {
    Once(TimerHandler),
    Repeat(RepeatingTask),
}

struct ScheduledTimer {
    id: TimerId,
    due_at: i64,
    order: u64,
    interval_ms: Option<i64>,
    work: Scheduled,
}

pub(crate) enum DueWork {
    Once(TimerHandler),
    Repeat(RepeatingTask),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTimer {
    pub id: TimerId,
    pub due_at: i64,
    pub interval_ms: Option<i64>,
}

/// Virtual-time task queue: timers ordered by due time then scheduling order,
/// animation frames run in batches.
#[derive(Default)]
pub struct EventLoop {
    now_ms: i64,
    timers: Vec<ScheduledTimer>,
    frames: Vec<(FrameId, FrameTask)>,
    next_timer_id: u64,
    next_frame_id: u64,
    next_order: u64,
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("now_ms", &self.now_ms)
            .field("timers", &self.timers.len())
            .field("frames", &self.frames.len())
            .finish()
    }
}

impl EventLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> i64 {
        self.now_ms
    }

    pub(crate) fn set_now(&mut self, now_ms: i64) {
        self.now_ms = now_ms;
    }

    fn next_timer_id(&mut self) -> TimerId {
        self.next_timer_id += 1;
        TimerId(self.next_timer_id)
    }

    fn push(&mut self, id: TimerId, delay_ms: i64, interval_ms: Option<i64>, work: Scheduled) {
        self.next_order += 1;
        self.timers.push(ScheduledTimer {
            id,
            due_at: self.now_ms + delay_ms.max(0),
            order: self.next_order,
            interval_ms,
            work,
        });
    }

    pub fn schedule_timeout(&mut self, handler: TimerHandler, delay_ms: u64) -> TimerId {
        let id = self.next_timer_id();
        self.push(id, delay_ms as i64, None, Scheduled::Once(handler));
        id
    }

    pub fn schedule_interval(&mut self, callback: RepeatingTask, delay_ms: u64) -> TimerId {
        let id = self.next_timer_id();
        self.resume_interval(id, callback, delay_ms);
        id
    }

    /// Schedules an interval under an id handed out earlier, so the page's
    /// `clearInterval(id)` still reaches it.
    pub fn resume_interval(&mut self, id: TimerId, callback: RepeatingTask, delay_ms: u64) {
        self.cancel(id);
        // A zero interval would spin forever inside a single advance.
        let interval = (delay_ms as i64).max(1);
        self.push(id, interval, Some(interval), Scheduled::Repeat(callback));
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|timer| timer.id != id);
        self.timers.len() != before
    }

    pub fn request_frame(&mut self, callback: FrameTask) -> FrameId {
        self.next_frame_id += 1;
        let id = FrameId(self.next_frame_id);
        self.frames.push((id, callback));
        id
    }

    pub fn cancel_frame(&mut self, id: FrameId) {
        self.frames.retain(|(frame, _)| *frame != id);
    }

    pub fn pending_timers(&self) -> Vec<PendingTimer> {
        let mut pending: Vec<PendingTimer> = self
            .timers
            .iter()
            .map(|timer| PendingTimer {
                id: timer.id,
                due_at: timer.due_at,
                interval_ms: timer.interval_ms,
            })
            .collect();
        pending.sort_by_key(|timer| (timer.due_at, timer.id));
        pending
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }

    /// Removes the earliest timer due at or before `limit`. Intervals are
    /// re-queued under the same id before their callback is handed out.
    pub(crate) fn pop_due(&mut self, limit: i64) -> Option<(i64, DueWork)> {
        let index = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.due_at <= limit)
            .min_by_key(|(_, timer)| (timer.due_at, timer.order))
            .map(|(index, _)| index)?;
        let timer = self.timers.remove(index);
        let due_at = timer.due_at;
        match timer.work {
            Scheduled::Once(handler) => Some((due_at, DueWork::Once(handler))),
            Scheduled::Repeat(callback) => {
                let interval = timer.interval_ms.unwrap_or(1);
                self.next_order += 1;
                self.timers.push(ScheduledTimer {
                    id: timer.id,
                    due_at: due_at + interval,
                    order: self.next_order,
                    interval_ms: timer.interval_ms,
                    work: Scheduled::Repeat(callback.clone()),
                });
                Some((due_at, DueWork::Repeat(callback)))
            }
        }
    }

    pub(crate) fn take_frames(&mut self) -> Vec<(FrameId, FrameTask)> {
        std::mem::take(&mut self.frames)
    }

    pub fn frame_interval_ms() -> i64 {
        FRAME_INTERVAL_MS
    }
}
