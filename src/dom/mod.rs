pub mod node;
pub mod parse;
pub mod query;
pub mod serialize;
pub mod style;

pub use node::{
    Document, ElementData, FileSource, MutationRecord, NodeId, NodeKind, SelectedFile,
};
pub use parse::parse_html;
pub use query::{
    is_plain_ident, query_all, query_rooted, query_shadow_all, query_shadow_all_str,
    quote_css_string, CssSelector,
};
pub use serialize::{open_tag, outer_html};
pub use style::InlineStyle;
