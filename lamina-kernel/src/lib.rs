//! Lamina Kernel - context keys, conditions and layer actions.
//!
//! - [`context`] derives named facts from a [`LayerList`](lamina_api::LayerList).
//! - [`expr`] parses, checks and evaluates conditions over those facts.
//! - [`actions`] holds the registry that decides which actions are offered.
//! - [`ops`] implements the transformations actions run.

pub mod actions;
pub mod config;
pub mod context;
mod error;
pub mod expr;
pub mod ops;

pub use actions::{ActionDescriptor, ActionId, ActionRegistry, Condition, MenuEntry, Resolution};
pub use config::LaminaConfig;
pub use context::{
    snapshot, ContextKey, ContextKeys, ContextSnapshot, ContextValue, Schema, ValueKind,
};
pub use error::{
    CanvasTooLarge, ConfigError, DtypeFailure, EvalError, OperationError, ParseError,
    RegistryError,
};
pub use expr::{BinaryOp, Expr, UnaryOp};
pub use ops::{Operation, ProjectionMode};
