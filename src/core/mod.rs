pub mod clock;
pub mod config;
pub mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AssertConfig, CaptureConfig, NavigationConfig, RecorderConfig, SelectorConfig};
pub use session::RecorderSession;
