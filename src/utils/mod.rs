pub mod accessibility;
pub mod panel;
pub mod preview;
pub mod text;
pub mod visibility;

pub use accessibility::{accessible_name, is_form_control, label_text, role};
pub use panel::{is_in_tool_panel, tool_panel_name};
pub use preview::{element_preview, extract_element_text};
pub use text::{normalize_whitespace, truncate_chars};
pub use visibility::{is_rendered, is_visible};
