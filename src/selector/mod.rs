//! Selector generation: a ladder of semantic candidates, each accepted only
//! when it resolves back to exactly the target, then structural fallbacks.

pub mod candidate;
pub mod expr;
pub mod fallback;
pub mod generator;
pub mod matcher;

pub use candidate::{collect_candidates, CandidateKind, SelectorCandidate};
pub use expr::{resolves_uniquely_to, SelectorExpr};
pub use fallback::{ancestor_chain, css_path, is_ephemeral_class};
pub use generator::{generate_and_validate_selectors, SelectorGenerator, SelectorOptions};
pub use matcher::{find_matches, Engine, MatchSet};
