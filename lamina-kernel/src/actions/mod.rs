//! Action Registry for layer actions.
//!
//! Each action pairs an [`Operation`](crate::ops::Operation) with the
//! conditions under which it is enabled and shown. Menus are derived by
//! resolving every registered action against a context snapshot.

mod builtins;
mod registry;
mod types;

pub use builtins::{BUILTIN_PREFIX, CONVERT_DTYPE_SUBMENU, PROJECTIONS_SUBMENU};
pub use registry::ActionRegistry;
pub use types::{
    ActionDescriptor, ActionId, Condition, MenuEntry, Resolution, Submenu, ACTION_FIELDS,
    SUBMENU_FIELDS,
};
