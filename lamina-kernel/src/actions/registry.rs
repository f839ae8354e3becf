//! Action Registry - central store for all layer actions.

use std::collections::HashMap;
use std::sync::OnceLock;

use indexmap::IndexMap;
use lamina_api::{LayerId, LayerList};
use serde_json::Value;
use tracing::debug;

use super::types::{
    ActionDescriptor, ActionId, Condition, MenuEntry, Resolution, Submenu, ACTION_FIELDS,
    SUBMENU_FIELDS,
};
use crate::config::LaminaConfig;
use crate::context::{ContextKeys, ContextSnapshot};
use crate::error::{EvalError, OperationError, RegistryError};
use crate::expr::Expr;
use crate::ops::Operation;

/// Central registry of all actions.
///
/// Every descriptor is validated on registration, so evaluating a
/// registered condition against a snapshot of the layer list cannot fail.
#[derive(Debug, Default)]
pub struct ActionRegistry {
    actions: Vec<(ActionId, ActionDescriptor)>,
    by_id: HashMap<ActionId, usize>,
    submenus: IndexMap<String, Submenu>,
}

static BUILTIN: OnceLock<Result<ActionRegistry, RegistryError>> = OnceLock::new();

impl ActionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh registry holding the built-in actions.
    pub fn with_builtins() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.register_builtin_actions()?;
        Ok(registry)
    }

    /// The process-wide built-in table, built on first use.
    pub fn builtin() -> Result<&'static ActionRegistry, RegistryError> {
        BUILTIN
            .get_or_init(Self::with_builtins)
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Built-in actions followed by the submenus and actions declared in `config`.
    pub fn with_config(config: &LaminaConfig) -> Result<Self, RegistryError> {
        let mut registry = Self::with_builtins()?;
        for (id, spec) in &config.submenus {
            registry.register_submenu_spec(id, spec)?;
        }
        for (id, spec) in &config.actions {
            registry.register_spec(id, spec)?;
        }
        Ok(registry)
    }

    /// Register an action after validating its submenu and conditions.
    pub fn register(
        &mut self,
        id: impl Into<ActionId>,
        descriptor: ActionDescriptor,
    ) -> Result<(), RegistryError> {
        let id = id.into();
        if self.by_id.contains_key(&id) {
            return Err(RegistryError::DuplicateAction(id));
        }
        if let Some(submenu) = &descriptor.submenu {
            if !self.submenus.contains_key(submenu) {
                return Err(RegistryError::UnknownSubmenu {
                    action: id,
                    submenu: submenu.clone(),
                });
            }
        }
        for (field, condition) in descriptor.conditions() {
            match condition.check(&ContextKeys) {
                Ok(()) => {}
                Err(EvalError::UndefinedVariable(name)) => {
                    return Err(RegistryError::UndefinedVariable {
                        action: id,
                        field,
                        name,
                    });
                }
                Err(source) => {
                    return Err(RegistryError::TypeMismatch {
                        action: id,
                        field,
                        source,
                    });
                }
            }
        }

        debug!(action = %id, operation = %descriptor.action, "registered action");
        let idx = self.actions.len();
        self.by_id.insert(id.clone(), idx);
        self.actions.push((id, descriptor));
        Ok(())
    }

    /// Register an action from its declarative JSON form.
    pub fn register_spec(&mut self, id: &str, spec: &Value) -> Result<(), RegistryError> {
        let fields = check_fields(id, spec, &ACTION_FIELDS)?;

        let description = required_str(id, fields, "description")?;
        let action = required_str(id, fields, "action")?;
        let mode = optional_str(id, fields, "mode")?;
        let operation =
            Operation::from_parts(action, mode).map_err(|reason| RegistryError::InvalidField {
                id: id.to_string(),
                field: "action",
                reason,
            })?;

        let mut descriptor = ActionDescriptor::new(description, operation);
        if let Some(condition) = condition_field(id, fields, "enable_when")? {
            descriptor.enable_when = condition;
        }
        descriptor.show_when = condition_field(id, fields, "show_when")?;
        descriptor.submenu = optional_str(id, fields, "submenu")?.map(str::to_string);

        self.register(id, descriptor)
    }

    /// Register a submenu that actions can be placed into.
    pub fn register_submenu(
        &mut self,
        id: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<(), RegistryError> {
        let id = id.into();
        if self.submenus.contains_key(&id) {
            return Err(RegistryError::DuplicateSubmenu(id));
        }
        debug!(submenu = %id, "registered submenu");
        let submenu = Submenu {
            id: id.clone(),
            description: description.into(),
        };
        self.submenus.insert(id, submenu);
        Ok(())
    }

    /// Register a submenu from its declarative JSON form.
    pub fn register_submenu_spec(&mut self, id: &str, spec: &Value) -> Result<(), RegistryError> {
        let fields = check_fields(id, spec, &SUBMENU_FIELDS)?;
        let description = required_str(id, fields, "description")?;
        self.register_submenu(id, description)
    }

    /// Get an action by ID.
    pub fn get(&self, id: &str) -> Option<&ActionDescriptor> {
        self.by_id
            .get(&ActionId::from(id))
            .map(|&idx| &self.actions[idx].1)
    }

    pub fn submenu(&self, id: &str) -> Option<&Submenu> {
        self.submenus.get(id)
    }

    /// All actions in registration order.
    pub fn actions(&self) -> impl Iterator<Item = (&ActionId, &ActionDescriptor)> {
        self.actions.iter().map(|(id, descriptor)| (id, descriptor))
    }

    pub fn submenus(&self) -> impl Iterator<Item = &Submenu> {
        self.submenus.values()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Whether one action is enabled and visible in `context`.
    pub fn resolve_one(
        descriptor: &ActionDescriptor,
        context: &ContextSnapshot,
    ) -> Result<Resolution, EvalError> {
        let enabled = descriptor.enable_when.eval(context)?;
        let visible = match &descriptor.show_when {
            Some(condition) => condition.eval(context)?,
            None => enabled,
        };
        Ok(Resolution { enabled, visible })
    }

    /// Resolve every action, in registration order.
    pub fn resolve(
        &self,
        context: &ContextSnapshot,
    ) -> Result<Vec<(&ActionId, Resolution)>, EvalError> {
        let resolved = self
            .actions
            .iter()
            .map(|(id, descriptor)| Ok((id, Self::resolve_one(descriptor, context)?)))
            .collect::<Result<Vec<_>, EvalError>>()?;
        debug!(
            actions = resolved.len(),
            enabled = resolved.iter().filter(|(_, r)| r.enabled).count(),
            "resolved actions"
        );
        Ok(resolved)
    }

    /// Ids of the actions enabled in `context`, in registration order.
    pub fn enabled_ids(&self, context: &ContextSnapshot) -> Result<Vec<&ActionId>, EvalError> {
        self.ids_where(context, |resolution| resolution.enabled)
    }

    /// Ids of the actions visible in `context`, in registration order.
    pub fn visible_ids(&self, context: &ContextSnapshot) -> Result<Vec<&ActionId>, EvalError> {
        self.ids_where(context, |resolution| resolution.visible)
    }

    fn ids_where(
        &self,
        context: &ContextSnapshot,
        keep: impl Fn(&Resolution) -> bool,
    ) -> Result<Vec<&ActionId>, EvalError> {
        Ok(self
            .resolve(context)?
            .into_iter()
            .filter(|(_, resolution)| keep(resolution))
            .map(|(id, _)| id)
            .collect())
    }

    /// The visible menu tree for `context`.
    ///
    /// A submenu appears where its first action was registered, and only if
    /// at least one of its actions is visible.
    pub fn menu(&self, context: &ContextSnapshot) -> Result<Vec<MenuEntry>, EvalError> {
        let mut entries = Vec::new();
        let mut grouped: IndexMap<&str, Vec<MenuEntry>> = IndexMap::new();
        let mut slots: HashMap<&str, usize> = HashMap::new();

        for (id, resolution) in self.resolve(context)? {
            let Some(descriptor) = self.get(id.as_str()) else {
                continue;
            };
            if let Some(submenu) = descriptor.submenu.as_deref() {
                if !slots.contains_key(submenu) {
                    slots.insert(submenu, entries.len());
                    entries.push(None);
                }
                let items = grouped.entry(submenu).or_default();
                if resolution.visible {
                    items.push(MenuEntry::Action {
                        id: id.clone(),
                        description: descriptor.description.clone(),
                        enabled: resolution.enabled,
                    });
                }
            } else if resolution.visible {
                entries.push(Some(MenuEntry::Action {
                    id: id.clone(),
                    description: descriptor.description.clone(),
                    enabled: resolution.enabled,
                }));
            }
        }

        for (submenu, items) in grouped {
            if items.is_empty() {
                continue;
            }
            let (Some(&slot), Some(info)) = (slots.get(submenu), self.submenus.get(submenu)) else {
                continue;
            };
            entries[slot] = Some(MenuEntry::Submenu {
                id: info.id.clone(),
                description: info.description.clone(),
                items,
            });
        }
        Ok(entries.into_iter().flatten().collect())
    }

    /// Run the operation behind `id` on `layers`.
    pub fn invoke(
        &self,
        id: &str,
        layers: &mut LayerList,
    ) -> Result<Vec<LayerId>, OperationError> {
        let descriptor = self
            .get(id)
            .ok_or_else(|| RegistryError::UnknownAction(id.to_string()))?;
        debug!(action = %id, operation = %descriptor.action, "invoking action");
        descriptor.action.apply(layers)
    }

    /// Every variable referenced by any condition, with the action using it.
    pub fn condition_names(&self) -> Vec<(&ActionId, &str)> {
        self.actions
            .iter()
            .flat_map(|(id, descriptor)| {
                descriptor
                    .conditions()
                    .filter_map(|(_, condition)| condition.expr())
                    .flat_map(Expr::names)
                    .map(move |name| (id, name))
            })
            .collect()
    }
}

fn check_fields<'a>(
    id: &str,
    spec: &'a Value,
    schema: &[&str],
) -> Result<&'a serde_json::Map<String, Value>, RegistryError> {
    let fields = spec.as_object().ok_or_else(|| RegistryError::InvalidField {
        id: id.to_string(),
        field: "spec",
        reason: "expected an object".to_string(),
    })?;
    if let Some(unknown) = fields.keys().find(|key| !schema.contains(&key.as_str())) {
        return Err(RegistryError::UnknownField {
            id: id.to_string(),
            field: unknown.clone(),
        });
    }
    Ok(fields)
}

fn optional_str<'a>(
    id: &str,
    fields: &'a serde_json::Map<String, Value>,
    field: &'static str,
) -> Result<Option<&'a str>, RegistryError> {
    match fields.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(RegistryError::InvalidField {
            id: id.to_string(),
            field,
            reason: format!("expected a string, got {}", other),
        }),
    }
}

fn required_str<'a>(
    id: &str,
    fields: &'a serde_json::Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, RegistryError> {
    optional_str(id, fields, field)?.ok_or_else(|| RegistryError::MissingField {
        id: id.to_string(),
        field,
    })
}

fn condition_field(
    id: &str,
    fields: &serde_json::Map<String, Value>,
    field: &'static str,
) -> Result<Option<Condition>, RegistryError> {
    match fields.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(value)) => Ok(Some(Condition::Literal(*value))),
        Some(Value::String(source)) => Expr::parse(source)
            .map(|expr| Some(Condition::Expr(expr)))
            .map_err(|source| RegistryError::Parse {
                id: id.to_string(),
                field,
                source,
            }),
        Some(other) => Err(RegistryError::InvalidField {
            id: id.to_string(),
            field,
            reason: format!("expected a bool or an expression string, got {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextKey, ContextValue};
    use serde_json::json;

    fn registry() -> ActionRegistry {
        let mut registry = ActionRegistry::new();
        registry.register_submenu("group:more", "More").unwrap();
        registry
            .register(
                "test:duplicate",
                ActionDescriptor::new("Duplicate", Operation::Duplicate)
                    .enable_when(ContextKey::HasActiveLayer.expr()),
            )
            .unwrap();
        registry
            .register(
                "test:toggle",
                ActionDescriptor::new("Toggle", Operation::ToggleVisibility)
                    .enable_when(ContextKey::NumSelectedLayers.expr().ge(1))
                    .show_when(true)
                    .in_submenu("group:more"),
            )
            .unwrap();
        registry
    }

    fn context(active: bool, selected: i64) -> ContextSnapshot {
        let mut values: Vec<(&str, ContextValue)> = ContextKey::ALL
            .into_iter()
            .map(|key| (key.name(), key.default_value()))
            .collect();
        values.push(("has_active_layer", active.into()));
        values.push(("num_selected_layers", selected.into()));
        ContextSnapshot::from_values(values)
    }

    #[test]
    fn test_register_rejects_duplicates_and_unknown_submenus() {
        let mut registry = registry();
        assert_eq!(
            registry.register(
                "test:duplicate",
                ActionDescriptor::new("Again", Operation::Duplicate)
            ),
            Err(RegistryError::DuplicateAction(ActionId::from("test:duplicate")))
        );
        assert!(matches!(
            registry.register(
                "test:orphan",
                ActionDescriptor::new("Orphan", Operation::Duplicate).in_submenu("group:nope"),
            ),
            Err(RegistryError::UnknownSubmenu { .. })
        ));
        assert_eq!(
            registry.register_submenu("group:more", "Again"),
            Err(RegistryError::DuplicateSubmenu("group:more".to_string()))
        );
    }

    #[test]
    fn test_register_validates_conditions() {
        let mut registry = ActionRegistry::new();
        let undefined = ActionDescriptor::new("Bad", Operation::Duplicate)
            .enable_when(Expr::name("num_widgets").gt(0));
        assert_eq!(
            registry.register("test:bad", undefined),
            Err(RegistryError::UndefinedVariable {
                action: ActionId::from("test:bad"),
                field: "enable_when",
                name: "num_widgets".to_string(),
            })
        );

        let mismatched = ActionDescriptor::new("Bad", Operation::Duplicate)
            .show_when(ContextKey::ActiveLayerType.expr().gt(1));
        assert!(matches!(
            registry.register("test:bad", mismatched),
            Err(RegistryError::TypeMismatch { field: "show_when", .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_show_when_defaults_to_enable_value() {
        let registry = registry();
        let resolved = registry.resolve(&context(false, 0)).unwrap();
        assert_eq!(resolved[0].0.as_str(), "test:duplicate");
        assert_eq!(resolved[0].1, Resolution { enabled: false, visible: false });
        assert_eq!(resolved[1].1, Resolution { enabled: false, visible: true });

        let resolved = registry.resolve(&context(true, 1)).unwrap();
        assert_eq!(resolved[0].1, Resolution { enabled: true, visible: true });
        assert_eq!(resolved[1].1, Resolution { enabled: true, visible: true });
    }

    #[test]
    fn test_enabled_and_visible_subsets() {
        let registry = registry();
        fn ids(found: Vec<&ActionId>) -> Vec<&str> {
            found.into_iter().map(ActionId::as_str).collect()
        }

        let idle = context(false, 0);
        assert!(registry.enabled_ids(&idle).unwrap().is_empty());
        assert_eq!(ids(registry.visible_ids(&idle).unwrap()), vec!["test:toggle"]);

        let busy = context(true, 2);
        assert_eq!(
            ids(registry.enabled_ids(&busy).unwrap()),
            vec!["test:duplicate", "test:toggle"]
        );
        assert_eq!(
            ids(registry.visible_ids(&busy).unwrap()),
            vec!["test:duplicate", "test:toggle"]
        );
    }

    #[test]
    fn test_menu_groups_submenu_items() {
        let registry = registry();
        let menu = registry.menu(&context(false, 0)).unwrap();
        assert_eq!(
            menu,
            vec![MenuEntry::Submenu {
                id: "group:more".to_string(),
                description: "More".to_string(),
                items: vec![MenuEntry::Action {
                    id: ActionId::from("test:toggle"),
                    description: "Toggle".to_string(),
                    enabled: false,
                }],
            }]
        );

        let menu = registry.menu(&context(true, 1)).unwrap();
        let ids: Vec<&str> = menu.iter().map(MenuEntry::id).collect();
        assert_eq!(ids, vec!["test:duplicate", "group:more"]);
    }

    #[test]
    fn test_register_spec() {
        let mut registry = registry();
        registry
            .register_spec(
                "test:sum",
                &json!({
                    "description": "Sum projection",
                    "action": "project",
                    "mode": "sum",
                    "enable_when": "num_selected_layers == 1 and active_layer_ndim >= 2",
                    "submenu": "group:more",
                }),
            )
            .unwrap();
        let descriptor = registry.get("test:sum").unwrap();
        assert_eq!(descriptor.action.to_string(), "project(sum)");
        assert_eq!(descriptor.show_when, None);

        assert_eq!(
            registry.register_spec(
                "test:x",
                &json!({"description": "X", "action": "duplicate", "keybinding": "K"})
            ),
            Err(RegistryError::UnknownField {
                id: "test:x".to_string(),
                field: "keybinding".to_string(),
            })
        );
        assert!(matches!(
            registry.register_spec(
                "test:x",
                &json!({"description": "X", "action": "duplicate", "enable_when": "a =="})
            ),
            Err(RegistryError::Parse { field: "enable_when", .. })
        ));
        assert!(matches!(
            registry.register_spec("test:x", &json!({"action": "duplicate"})),
            Err(RegistryError::MissingField { field: "description", .. })
        ));
        assert!(matches!(
            registry.register_spec(
                "test:x",
                &json!({"description": "X", "action": "project", "mode": "mode"})
            ),
            Err(RegistryError::InvalidField { field: "action", .. })
        ));
    }

    #[test]
    fn test_spec_round_trip() {
        let source = registry();
        let mut copy = ActionRegistry::new();
        copy.register_submenu("group:more", "More").unwrap();
        for (id, descriptor) in source.actions() {
            copy.register_spec(id.as_str(), &descriptor.to_spec()).unwrap();
        }
        for (id, descriptor) in source.actions() {
            assert_eq!(copy.get(id.as_str()), Some(descriptor));
        }
    }

    #[test]
    fn test_invoke_unknown_action() {
        let registry = registry();
        let mut layers = LayerList::new();
        assert_eq!(
            registry.invoke("test:nope", &mut layers),
            Err(OperationError::Registry(RegistryError::UnknownAction(
                "test:nope".to_string()
            )))
        );
    }
}
