pub mod actions;
pub mod assert;
pub mod core;
pub mod dom;
pub mod errors;
pub mod page;
pub mod recorder;
pub mod scenario;
pub mod selector;
pub mod testing;
pub mod types;
pub mod utils;

pub use actions::{ActionRecord, ActionSink, ActionType, ChannelSink, MemorySink};
pub use assert::{AssertState, AssertType};
pub use crate::core::{RecorderConfig, RecorderSession};
pub use errors::{RecorderError, Result};
pub use page::{DomEvent, EventKind, Page};
pub use recorder::Recorder;
pub use selector::{generate_and_validate_selectors, SelectorExpr, SelectorGenerator};
pub use types::*;
