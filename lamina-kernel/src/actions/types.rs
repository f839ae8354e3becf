//! Core types for the action registry.

use std::fmt;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::context::{ContextSnapshot, Schema};
use crate::error::EvalError;
use crate::expr::Expr;
use crate::ops::Operation;

/// Fields a declarative action spec may contain.
pub const ACTION_FIELDS: [&str; 6] = [
    "description",
    "action",
    "mode",
    "enable_when",
    "show_when",
    "submenu",
];

/// Fields a declarative submenu spec may contain.
pub const SUBMENU_FIELDS: [&str; 1] = ["description"];

/// Unique identifier for an action, e.g. `lamina:duplicate_layer`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ActionId(pub String);

impl ActionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActionId {
    fn from(id: &str) -> Self {
        ActionId(id.to_string())
    }
}

impl From<String> for ActionId {
    fn from(id: String) -> Self {
        ActionId(id)
    }
}

/// When an action is enabled or shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Literal(bool),
    Expr(Expr),
}

impl Condition {
    pub fn eval(&self, context: &ContextSnapshot) -> Result<bool, EvalError> {
        match self {
            Condition::Literal(value) => Ok(*value),
            Condition::Expr(expr) => expr.eval_bool(context),
        }
    }

    pub fn check(&self, schema: &impl Schema) -> Result<(), EvalError> {
        match self {
            Condition::Literal(_) => Ok(()),
            Condition::Expr(expr) => expr.check(schema).map(|_| ()),
        }
    }

    pub fn expr(&self) -> Option<&Expr> {
        match self {
            Condition::Literal(_) => None,
            Condition::Expr(expr) => Some(expr),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Condition::Literal(value) => Value::Bool(*value),
            Condition::Expr(expr) => Value::String(expr.to_string()),
        }
    }
}

impl Default for Condition {
    fn default() -> Self {
        Condition::Literal(true)
    }
}

impl From<bool> for Condition {
    fn from(value: bool) -> Self {
        Condition::Literal(value)
    }
}

impl From<Expr> for Condition {
    fn from(expr: Expr) -> Self {
        Condition::Expr(expr)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Literal(value) => write!(f, "{}", value),
            Condition::Expr(expr) => write!(f, "{}", expr),
        }
    }
}

/// A registered action: what it does and when it is available.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionDescriptor {
    /// Human-readable label.
    pub description: String,
    pub action: Operation,
    pub enable_when: Condition,
    /// Falls back to the value of `enable_when` when unset.
    pub show_when: Option<Condition>,
    pub submenu: Option<String>,
}

impl ActionDescriptor {
    pub fn new(description: impl Into<String>, action: Operation) -> Self {
        Self {
            description: description.into(),
            action,
            enable_when: Condition::default(),
            show_when: None,
            submenu: None,
        }
    }

    pub fn enable_when(mut self, condition: impl Into<Condition>) -> Self {
        self.enable_when = condition.into();
        self
    }

    pub fn show_when(mut self, condition: impl Into<Condition>) -> Self {
        self.show_when = Some(condition.into());
        self
    }

    pub fn in_submenu(mut self, submenu: impl Into<String>) -> Self {
        self.submenu = Some(submenu.into());
        self
    }

    /// Every condition expression, with the field it came from.
    pub fn conditions(&self) -> impl Iterator<Item = (&'static str, &Condition)> {
        std::iter::once(("enable_when", &self.enable_when))
            .chain(self.show_when.as_ref().map(|c| ("show_when", c)))
    }

    /// The declarative form accepted by `ActionRegistry::register_spec`.
    pub fn to_spec(&self) -> Value {
        let mut spec = Map::new();
        spec.insert("description".into(), json!(self.description));
        spec.insert("action".into(), json!(self.action.name()));
        if let Some(mode) = self.action.mode() {
            spec.insert("mode".into(), json!(mode));
        }
        spec.insert("enable_when".into(), self.enable_when.to_value());
        if let Some(show_when) = &self.show_when {
            spec.insert("show_when".into(), show_when.to_value());
        }
        if let Some(submenu) = &self.submenu {
            spec.insert("submenu".into(), json!(submenu));
        }
        Value::Object(spec)
    }
}

/// A named group of actions. Submenus carry no enablement logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submenu {
    pub id: String,
    pub description: String,
}

/// Evaluated availability of one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub enabled: bool,
    pub visible: bool,
}

/// A visible item in a resolved menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MenuEntry {
    Action {
        id: ActionId,
        description: String,
        enabled: bool,
    },
    Submenu {
        id: String,
        description: String,
        items: Vec<MenuEntry>,
    },
}

impl MenuEntry {
    pub fn id(&self) -> &str {
        match self {
            MenuEntry::Action { id, .. } => id.as_str(),
            MenuEntry::Submenu { id, .. } => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextKey;
    use crate::ops::ProjectionMode;

    #[test]
    fn test_spec_fields_are_declared() {
        let max = Operation::Project(ProjectionMode::Max);
        let descriptor = ActionDescriptor::new("Max projection", max)
            .enable_when(ContextKey::ActiveLayerNdim.expr().ge(2))
            .show_when(true)
            .in_submenu("group:projections");
        let spec = descriptor.to_spec();
        let fields: Vec<&str> = spec
            .as_object()
            .map(|o| o.keys().map(String::as_str).collect())
            .unwrap_or_default();
        assert_eq!(fields.len(), ACTION_FIELDS.len());
        assert!(fields.iter().all(|f| ACTION_FIELDS.contains(f)));
        assert_eq!(spec["enable_when"], json!("active_layer_ndim >= 2"));
        assert_eq!(spec["mode"], json!("max"));
    }

    #[test]
    fn test_conditions_lists_show_when_only_when_set() {
        let descriptor = ActionDescriptor::new("Duplicate", Operation::Duplicate);
        let fields: Vec<_> = descriptor.conditions().map(|(field, _)| field).collect();
        assert_eq!(fields, vec!["enable_when"]);
    }
}
