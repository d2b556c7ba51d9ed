pub mod base;
pub mod click;
pub mod drag;
pub mod focus;
pub mod input;
pub mod keyboard;
pub mod navigation;
pub mod pipeline;
pub mod record;
pub mod registry;
pub mod sink;
pub mod upload;
pub mod viewport;

pub use base::{describe_element, CaptureContext, Captured, EventHandler};
pub use navigation::{NavigationDecision, NavigationTracker, UrlChangeCause};
pub use pipeline::{suppression, CapturePipeline, Suppression};
pub use record::{
    ActionData, ActionElement, ActionRecord, ActionType, ActionValue, ElementSnapshot, FileUpload,
    SelectorValue,
};
pub use registry::HandlerRegistry;
pub use sink::{ActionSink, ChannelSink, MemorySink};
pub use upload::{FileReader, PendingUpload, TokioFileReader};
