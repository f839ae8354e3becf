//! The built-in layer actions.

use lamina_api::{DType, LayerKind};

use super::registry::ActionRegistry;
use super::types::ActionDescriptor;
use crate::context::ContextKey;
use crate::error::RegistryError;
use crate::expr::Expr;
use crate::ops::{Operation, ProjectionMode};

pub const CONVERT_DTYPE_SUBMENU: &str = "group:convert_dtype";
pub const PROJECTIONS_SUBMENU: &str = "group:projections";

/// Prefix shared by every built-in action id.
pub const BUILTIN_PREFIX: &str = "lamina:";

fn builtin_id(name: &str) -> String {
    format!("{}{}", BUILTIN_PREFIX, name)
}

/// True when the active layer carries array data.
fn active_layer_is_array() -> Expr {
    let kind = ContextKey::ActiveLayerType.expr();
    kind.clone().equals("image") | kind.equals("labels")
}

impl ActionRegistry {
    pub(crate) fn register_builtin_actions(&mut self) -> Result<(), RegistryError> {
        // ====================================================================
        // Layer actions
        // ====================================================================

        self.register(
            builtin_id("duplicate_layer"),
            ActionDescriptor::new("Duplicate Layer", Operation::Duplicate)
                .enable_when(ContextKey::HasActiveLayer.expr()),
        )?;

        let image_or_shapes = ContextKey::NumSelectedImageLayers.expr().ge(1)
            | ContextKey::NumSelectedShapesLayers.expr().ge(1);
        self.register(
            builtin_id("convert_to_labels"),
            ActionDescriptor::new("Convert to Labels", Operation::ConvertType(LayerKind::Labels))
                .enable_when(image_or_shapes.clone() & ContextKey::AllSelectedLayersSameType.expr())
                .show_when(image_or_shapes),
        )?;

        let has_labels = ContextKey::NumSelectedLabelsLayers.expr().ge(1);
        self.register(
            builtin_id("convert_to_image"),
            ActionDescriptor::new("Convert to Image", Operation::ConvertType(LayerKind::Image))
                .enable_when(has_labels.clone() & ContextKey::AllSelectedLayersLabels.expr())
                .show_when(has_labels),
        )?;

        self.register(
            builtin_id("toggle_visibility"),
            ActionDescriptor::new("Toggle Visibility", Operation::ToggleVisibility)
                .enable_when(ContextKey::NumSelectedLayers.expr().ge(1))
                .show_when(true),
        )?;

        // ====================================================================
        // Data type conversion
        // ====================================================================

        self.register_submenu(CONVERT_DTYPE_SUBMENU, "Convert data type")?;
        for dtype in DType::INTEGERS {
            self.register(
                builtin_id(&format!("to_{}", dtype)),
                ActionDescriptor::new(
                    format!("Convert to {}", dtype),
                    Operation::ConvertDtype(dtype),
                )
                .enable_when(
                    ContextKey::AllSelectedLayersLabels.expr()
                        & ContextKey::ActiveLayerDtype.expr().not_equals(dtype.name()),
                )
                .show_when(ContextKey::AllSelectedLayersLabels.expr())
                .in_submenu(CONVERT_DTYPE_SUBMENU),
            )?;
        }

        // ====================================================================
        // Projections
        // ====================================================================

        self.register_submenu(PROJECTIONS_SUBMENU, "Make Projection")?;
        let single_array_layer =
            ContextKey::NumSelectedLayers.expr().equals(1) & active_layer_is_array();
        for mode in ProjectionMode::ALL {
            self.register(
                builtin_id(&format!("{}_projection", mode)),
                ActionDescriptor::new(
                    format!("{} projection", capitalize(mode.name())),
                    Operation::Project(mode),
                )
                .enable_when(single_array_layer.clone() & ContextKey::ActiveLayerNdim.expr().ge(2))
                .show_when(single_array_layer.clone())
                .in_submenu(PROJECTIONS_SUBMENU),
            )?;
        }

        Ok(())
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
