//! Context keys - named facts derived from a layer list and its selection.
//!
//! The key set is closed. A snapshot always carries a value for every key,
//! falling back to `false`, `0` or `""` when there is nothing to describe.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use lamina_api::{LayerKind, LayerList};
use serde::{Deserialize, Serialize};

use crate::expr::Expr;

/// A primitive context value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl ContextValue {
    /// Truthiness: `false`, `0` and `""` are falsy.
    pub fn truthy(&self) -> bool {
        match self {
            ContextValue::Bool(b) => *b,
            ContextValue::Int(n) => *n != 0,
            ContextValue::Str(s) => !s.is_empty(),
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            ContextValue::Bool(_) => ValueKind::Bool,
            ContextValue::Int(_) => ValueKind::Int,
            ContextValue::Str(_) => ValueKind::Str,
        }
    }
}

impl fmt::Display for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextValue::Bool(b) => write!(f, "{}", b),
            ContextValue::Int(n) => write!(f, "{}", n),
            ContextValue::Str(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<bool> for ContextValue {
    fn from(b: bool) -> Self {
        ContextValue::Bool(b)
    }
}

impl From<i64> for ContextValue {
    fn from(n: i64) -> Self {
        ContextValue::Int(n)
    }
}

impl From<i32> for ContextValue {
    fn from(n: i32) -> Self {
        ContextValue::Int(n as i64)
    }
}

impl From<usize> for ContextValue {
    fn from(n: usize) -> Self {
        ContextValue::Int(n as i64)
    }
}

impl From<&str> for ContextValue {
    fn from(s: &str) -> Self {
        ContextValue::Str(s.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(s: String) -> Self {
        ContextValue::Str(s)
    }
}

/// The type of a context value, used for static checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Int,
    Str,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Str => "str",
        };
        f.write_str(name)
    }
}

/// Every fact the action registry may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContextKey {
    NumLayers,
    NumSelectedLayers,
    NumSelectedImageLayers,
    NumSelectedLabelsLayers,
    NumSelectedPointsLayers,
    NumSelectedShapesLayers,
    NumVisibleSelectedLayers,
    AllSelectedLayersSameType,
    AllSelectedLayersLabels,
    HasActiveLayer,
    ActiveLayerType,
    ActiveLayerNdim,
    ActiveLayerDtype,
    ActiveLayerIsRgb,
}

impl ContextKey {
    pub const ALL: [ContextKey; 14] = [
        ContextKey::NumLayers,
        ContextKey::NumSelectedLayers,
        ContextKey::NumSelectedImageLayers,
        ContextKey::NumSelectedLabelsLayers,
        ContextKey::NumSelectedPointsLayers,
        ContextKey::NumSelectedShapesLayers,
        ContextKey::NumVisibleSelectedLayers,
        ContextKey::AllSelectedLayersSameType,
        ContextKey::AllSelectedLayersLabels,
        ContextKey::HasActiveLayer,
        ContextKey::ActiveLayerType,
        ContextKey::ActiveLayerNdim,
        ContextKey::ActiveLayerDtype,
        ContextKey::ActiveLayerIsRgb,
    ];

    /// The variable name used in expressions.
    pub fn name(self) -> &'static str {
        match self {
            ContextKey::NumLayers => "num_layers",
            ContextKey::NumSelectedLayers => "num_selected_layers",
            ContextKey::NumSelectedImageLayers => "num_selected_image_layers",
            ContextKey::NumSelectedLabelsLayers => "num_selected_labels_layers",
            ContextKey::NumSelectedPointsLayers => "num_selected_points_layers",
            ContextKey::NumSelectedShapesLayers => "num_selected_shapes_layers",
            ContextKey::NumVisibleSelectedLayers => "num_visible_selected_layers",
            ContextKey::AllSelectedLayersSameType => "all_selected_layers_same_type",
            ContextKey::AllSelectedLayersLabels => "all_selected_layers_labels",
            ContextKey::HasActiveLayer => "has_active_layer",
            ContextKey::ActiveLayerType => "active_layer_type",
            ContextKey::ActiveLayerNdim => "active_layer_ndim",
            ContextKey::ActiveLayerDtype => "active_layer_dtype",
            ContextKey::ActiveLayerIsRgb => "active_layer_is_rgb",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ContextKey::NumLayers => "Number of layers in the list.",
            ContextKey::NumSelectedLayers => "Number of selected layers.",
            ContextKey::NumSelectedImageLayers => "Number of selected image layers.",
            ContextKey::NumSelectedLabelsLayers => "Number of selected labels layers.",
            ContextKey::NumSelectedPointsLayers => "Number of selected points layers.",
            ContextKey::NumSelectedShapesLayers => "Number of selected shapes layers.",
            ContextKey::NumVisibleSelectedLayers => "Number of selected layers that are visible.",
            ContextKey::AllSelectedLayersSameType => {
                "True when at least one layer is selected and all are of one type."
            }
            ContextKey::AllSelectedLayersLabels => {
                "True when at least one layer is selected and all are labels."
            }
            ContextKey::HasActiveLayer => "True when there is an active layer.",
            ContextKey::ActiveLayerType => "Type string of the active layer, or empty.",
            ContextKey::ActiveLayerNdim => "Data dimensionality of the active layer, or 0.",
            ContextKey::ActiveLayerDtype => "Dtype of the active layer's array data, or empty.",
            ContextKey::ActiveLayerIsRgb => "True when the active layer is an RGB image.",
        }
    }

    pub fn kind(self) -> ValueKind {
        match self {
            ContextKey::NumLayers
            | ContextKey::NumSelectedLayers
            | ContextKey::NumSelectedImageLayers
            | ContextKey::NumSelectedLabelsLayers
            | ContextKey::NumSelectedPointsLayers
            | ContextKey::NumSelectedShapesLayers
            | ContextKey::NumVisibleSelectedLayers
            | ContextKey::ActiveLayerNdim => ValueKind::Int,
            ContextKey::AllSelectedLayersSameType
            | ContextKey::AllSelectedLayersLabels
            | ContextKey::HasActiveLayer
            | ContextKey::ActiveLayerIsRgb => ValueKind::Bool,
            ContextKey::ActiveLayerType | ContextKey::ActiveLayerDtype => ValueKind::Str,
        }
    }

    /// Value used when the layer list offers nothing to derive from.
    pub fn default_value(self) -> ContextValue {
        match self.kind() {
            ValueKind::Bool => ContextValue::Bool(false),
            ValueKind::Int => ContextValue::Int(0),
            ValueKind::Str => ContextValue::Str(String::new()),
        }
    }

    /// This key as an expression variable.
    pub fn expr(self) -> Expr {
        Expr::Name(self.name().to_string())
    }

    /// Derive this key's value from a layer list.
    fn derive(self, layers: &LayerList) -> ContextValue {
        let count_kind =
            |kind: LayerKind| layers.selected().filter(|l| l.kind() == kind).count();
        let active = layers.active();
        match self {
            ContextKey::NumLayers => layers.len().into(),
            ContextKey::NumSelectedLayers => layers.selection().len().into(),
            ContextKey::NumSelectedImageLayers => count_kind(LayerKind::Image).into(),
            ContextKey::NumSelectedLabelsLayers => count_kind(LayerKind::Labels).into(),
            ContextKey::NumSelectedPointsLayers => count_kind(LayerKind::Points).into(),
            ContextKey::NumSelectedShapesLayers => count_kind(LayerKind::Shapes).into(),
            ContextKey::NumVisibleSelectedLayers => {
                layers.selected().filter(|l| l.visible()).count().into()
            }
            ContextKey::AllSelectedLayersSameType => {
                let mut kinds = layers.selected().map(|l| l.kind());
                match kinds.next() {
                    Some(first) => kinds.all(|kind| kind == first).into(),
                    None => false.into(),
                }
            }
            ContextKey::AllSelectedLayersLabels => {
                let selected = layers.selection().len();
                (selected > 0 && count_kind(LayerKind::Labels) == selected).into()
            }
            ContextKey::HasActiveLayer => active.is_some().into(),
            ContextKey::ActiveLayerType => active
                .map(|l| ContextValue::from(l.type_string()))
                .unwrap_or_else(|| self.default_value()),
            ContextKey::ActiveLayerNdim => active
                .map(|l| ContextValue::from(l.ndim()))
                .unwrap_or_else(|| self.default_value()),
            ContextKey::ActiveLayerDtype => active
                .and_then(|l| l.dtype())
                .map(|dtype| ContextValue::from(dtype.name()))
                .unwrap_or_else(|| self.default_value()),
            ContextKey::ActiveLayerIsRgb => active.map(|l| l.is_rgb()).unwrap_or(false).into(),
        }
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ContextKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContextKey::ALL
            .into_iter()
            .find(|key| key.name() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Declared names and kinds that expressions may reference.
pub trait Schema {
    fn kind_of(&self, name: &str) -> Option<ValueKind>;
}

/// The schema made of every [`ContextKey`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextKeys;

impl Schema for ContextKeys {
    fn kind_of(&self, name: &str) -> Option<ValueKind> {
        name.parse::<ContextKey>().ok().map(ContextKey::kind)
    }
}

/// Snapshot of every context key for `layers`.
pub fn snapshot(layers: &LayerList) -> ContextSnapshot {
    ContextSnapshot::from_layers(layers)
}

/// An immutable mapping from context key names to values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContextSnapshot {
    values: HashMap<String, ContextValue>,
}

impl ContextSnapshot {
    /// Derive a value for every key from `layers`.
    pub fn from_layers(layers: &LayerList) -> Self {
        let values = ContextKey::ALL
            .into_iter()
            .map(|key| (key.name().to_string(), key.derive(layers)))
            .collect();
        Self { values }
    }

    /// A snapshot built from explicit values, e.g. for tests. Keys are not
    /// required to be context keys.
    pub fn from_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ContextValue>,
    {
        Self {
            values: values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ContextValue> {
        self.values.get(name)
    }

    pub fn key(&self, key: ContextKey) -> &ContextValue {
        // from_layers fills every key; hand-built snapshots may not.
        self.values
            .get(key.name())
            .unwrap_or_else(|| missing(key.kind()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContextValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

static MISSING_BOOL: ContextValue = ContextValue::Bool(false);
static MISSING_INT: ContextValue = ContextValue::Int(0);
static MISSING_STR: ContextValue = ContextValue::Str(String::new());

/// Static twin of [`ContextKey::default_value`] for borrowed lookups.
fn missing(kind: ValueKind) -> &'static ContextValue {
    match kind {
        ValueKind::Bool => &MISSING_BOOL,
        ValueKind::Int => &MISSING_INT,
        ValueKind::Str => &MISSING_STR,
    }
}

impl Schema for ContextSnapshot {
    fn kind_of(&self, name: &str) -> Option<ValueKind> {
        self.get(name).map(ContextValue::kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lamina_api::Layer;
    use ndarray::{array, ArrayD, IxDyn};

    #[test]
    fn test_names_round_trip() {
        for key in ContextKey::ALL {
            assert_eq!(key.name().parse::<ContextKey>(), Ok(key));
        }
        assert!("num_widgets".parse::<ContextKey>().is_err());
    }

    #[test]
    fn test_empty_list_snapshot_is_total() {
        let snapshot = ContextSnapshot::from_layers(&LayerList::new());
        assert_eq!(snapshot.len(), ContextKey::ALL.len());
        for key in ContextKey::ALL {
            assert_eq!(snapshot.get(key.name()), Some(&key.default_value()));
        }
    }

    #[test]
    fn test_snapshot_describes_selection() {
        let mut layers = LayerList::new();
        let image = layers
            .append(Layer::image(ArrayD::<f32>::zeros(IxDyn(&[3, 8, 8]))))
            .unwrap();
        let labels = layers
            .append(Layer::labels(ArrayD::<u16>::zeros(IxDyn(&[8, 8]))).unwrap())
            .unwrap();
        layers.append(Layer::points(array![[0.0, 0.0]])).unwrap();
        layers.set_active(image).unwrap();
        layers.select(labels).unwrap();

        let snapshot = ContextSnapshot::from_layers(&layers);
        assert_eq!(snapshot.key(ContextKey::NumLayers), &ContextValue::Int(3));
        assert_eq!(snapshot.key(ContextKey::NumSelectedLayers), &ContextValue::Int(2));
        assert_eq!(snapshot.key(ContextKey::NumSelectedImageLayers), &ContextValue::Int(1));
        assert_eq!(snapshot.key(ContextKey::NumSelectedPointsLayers), &ContextValue::Int(0));
        assert_eq!(
            snapshot.key(ContextKey::AllSelectedLayersSameType),
            &ContextValue::Bool(false)
        );
        assert_eq!(snapshot.key(ContextKey::ActiveLayerType), &ContextValue::from("image"));
        assert_eq!(snapshot.key(ContextKey::ActiveLayerNdim), &ContextValue::Int(3));
        assert_eq!(snapshot.key(ContextKey::ActiveLayerDtype), &ContextValue::from("float32"));
    }

    #[test]
    fn test_all_labels_requires_selection() {
        let mut layers = LayerList::new();
        let id = layers
            .append(Layer::labels(ArrayD::<i32>::zeros(IxDyn(&[2, 2]))).unwrap())
            .unwrap();
        let snapshot = ContextSnapshot::from_layers(&layers);
        assert_eq!(
            snapshot.key(ContextKey::AllSelectedLayersLabels),
            &ContextValue::Bool(false)
        );

        layers.set_active(id).unwrap();
        let snapshot = ContextSnapshot::from_layers(&layers);
        assert_eq!(
            snapshot.key(ContextKey::AllSelectedLayersLabels),
            &ContextValue::Bool(true)
        );
    }

    #[test]
    fn test_truthiness() {
        assert!(!ContextValue::Int(0).truthy());
        assert!(ContextValue::Int(2).truthy());
        assert!(!ContextValue::from("").truthy());
        assert!(ContextValue::from("labels").truthy());
    }

    #[test]
    fn test_missing_keys_fall_back_to_their_kind_default() {
        let empty = ContextSnapshot::default();
        assert_eq!(empty.key(ContextKey::NumLayers), &ContextValue::Int(0));
        assert_eq!(empty.key(ContextKey::ActiveLayerType), &ContextValue::Str(String::new()));
        for key in ContextKey::ALL {
            assert_eq!(empty.key(key), &key.default_value(), "{}", key);
        }
    }
}
