use crate::page::event_loop::{EventLoop, FrameId, FrameTask, RepeatingTask, TimerHandler, TimerId};

/// `setTimeout`/`setInterval`/`requestAnimationFrame` and their cancel
/// counterparts, as reached by page scripts through `window`.
pub trait TimerApi {
    fn set_timeout(&self, event_loop: &mut EventLoop, handler: TimerHandler, delay_ms: u64)
        -> TimerId;
    fn set_interval(&self, event_loop: &mut EventLoop, callback: RepeatingTask, delay_ms: u64)
        -> TimerId;
    fn clear_timeout(&self, event_loop: &mut EventLoop, id: TimerId);
    fn clear_interval(&self, event_loop: &mut EventLoop, id: TimerId);
    fn request_animation_frame(&self, event_loop: &mut EventLoop, callback: FrameTask) -> FrameId;
    fn cancel_animation_frame(&self, event_loop: &mut EventLoop, id: FrameId);

    fn name(&self) -> &'static str;
}

/// The page's own timers: everything goes straight to the event loop.
#[derive(Debug, Default)]
pub struct NativeTimers;

impl TimerApi for NativeTimers {
    fn set_timeout(
        &self,
        event_loop: &mut EventLoop,
        handler: TimerHandler,
        delay_ms: u64,
    ) -> TimerId {
        event_loop.schedule_timeout(handler, delay_ms)
    }

    fn set_interval(
        &self,
        event_loop: &mut EventLoop,
        callback: RepeatingTask,
        delay_ms: u64,
    ) -> TimerId {
        event_loop.schedule_interval(callback, delay_ms)
    }

    fn clear_timeout(&self, event_loop: &mut EventLoop, id: TimerId) {
        event_loop.cancel(id);
    }

    fn clear_interval(&self, event_loop: &mut EventLoop, id: TimerId) {
        event_loop.cancel(id);
    }

    fn request_animation_frame(&self, event_loop: &mut EventLoop, callback: FrameTask) -> FrameId {
        event_loop.request_frame(callback)
    }

    fn cancel_animation_frame(&self, event_loop: &mut EventLoop, id: FrameId) {
        event_loop.cancel_frame(id);
    }

    fn name(&self) -> &'static str {
        "native"
    }
}
