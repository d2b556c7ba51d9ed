//! Assert mode: a frozen, non-interactive page where clicks pick elements
//! to assert on instead of reaching the page.

pub mod controller;
pub mod freeze;
pub mod frozen;
pub mod interceptor;
pub mod protection;
pub mod surface;
pub mod types;

pub use controller::{default_expected, AssertController, AssertState, AssertedSet, HoverHighlight};
pub use freeze::{FrozenTimers, ScreenFreeze};
pub use frozen::{likely_to_disappear, FrozenElement, FrozenElementRegistry};
pub use interceptor::{BlockedNavigation, BlockedNetwork, InterceptionLayer};
pub use protection::{ProtectedNode, ProtectionRegistry};
pub use surface::{
    place_surface, AssertInputSurface, SurfaceAction, VariableItem, VariableItems, VariableLookup,
};
pub use types::AssertType;
