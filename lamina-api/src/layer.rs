//! Layers - a typed payload plus the display state shared by every kind.

use indexmap::IndexMap;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::array::ArrayData;
use crate::dtype::DType;
use crate::event::{next_layer_id, EventField, LayerEvents, LayerId};

/// Errors raised when a layer's kind-specific constraints would be violated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayerError {
    #[error("labels data must be integer-typed, got {0}")]
    NonIntegerLabels(DType),

    #[error("{field} has {found} entries but the layer has {expected} dimensions")]
    DimensionMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("cannot replace {expected} data with {found} data")]
    KindChange { expected: LayerKind, found: LayerKind },

    #[error("invalid shape {index}: {reason}")]
    InvalidShape { index: usize, reason: String },

    #[error("unknown layer type: {0}")]
    UnknownKind(String),
}

/// The closed set of layer kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Image,
    Labels,
    Points,
    Shapes,
}

impl LayerKind {
    pub const ALL: [LayerKind; 4] = [
        LayerKind::Image,
        LayerKind::Labels,
        LayerKind::Points,
        LayerKind::Shapes,
    ];

    /// Lowercase tag, e.g. `"labels"`.
    pub fn type_string(self) -> &'static str {
        match self {
            LayerKind::Image => "image",
            LayerKind::Labels => "labels",
            LayerKind::Points => "points",
            LayerKind::Shapes => "shapes",
        }
    }

    /// Name given to new layers that were not named explicitly.
    pub fn default_name(self) -> &'static str {
        match self {
            LayerKind::Image => "Image",
            LayerKind::Labels => "Labels",
            LayerKind::Points => "Points",
            LayerKind::Shapes => "Shapes",
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_string())
    }
}

impl FromStr for LayerKind {
    type Err = LayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LayerKind::ALL
            .into_iter()
            .find(|kind| kind.type_string() == s)
            .ok_or_else(|| LayerError::UnknownKind(s.to_string()))
    }
}

/// Geometry of a single entry in a shapes layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeType {
    Rectangle,
    Ellipse,
    Polygon,
    Line,
    Path,
}

/// One shape: its type and an `(M, D)` vertex array.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub shape_type: ShapeType,
    pub vertices: Array2<f64>,
}

impl Shape {
    pub fn new(shape_type: ShapeType, vertices: Array2<f64>) -> Self {
        Self {
            shape_type,
            vertices,
        }
    }

    pub fn ndim(&self) -> usize {
        self.vertices.ncols()
    }
}

/// The kind-specific payload of a layer.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerData {
    Image { data: ArrayData, rgb: bool },
    Labels(ArrayData),
    /// `(N, D)` point coordinates.
    Points(Array2<f64>),
    Shapes(Vec<Shape>),
}

impl LayerData {
    pub fn kind(&self) -> LayerKind {
        match self {
            LayerData::Image { .. } => LayerKind::Image,
            LayerData::Labels(_) => LayerKind::Labels,
            LayerData::Points(_) => LayerKind::Points,
            LayerData::Shapes(_) => LayerKind::Shapes,
        }
    }

    /// Number of world dimensions the payload spans.
    pub fn ndim(&self) -> usize {
        match self {
            LayerData::Image { data, .. } | LayerData::Labels(data) => data.ndim(),
            LayerData::Points(coords) => coords.ncols(),
            LayerData::Shapes(shapes) => shapes.first().map(Shape::ndim).unwrap_or(2),
        }
    }

    /// The array payload of image and labels layers.
    pub fn array(&self) -> Option<&ArrayData> {
        match self {
            LayerData::Image { data, .. } | LayerData::Labels(data) => Some(data),
            LayerData::Points(_) | LayerData::Shapes(_) => None,
        }
    }

    fn validate(&self) -> Result<(), LayerError> {
        match self {
            LayerData::Labels(data) if !data.dtype().is_integer() => {
                Err(LayerError::NonIntegerLabels(data.dtype()))
            }
            LayerData::Shapes(shapes) => {
                let ndim = self.ndim();
                for (index, shape) in shapes.iter().enumerate() {
                    if shape.vertices.nrows() == 0 {
                        return Err(LayerError::InvalidShape {
                            index,
                            reason: "no vertices".to_string(),
                        });
                    }
                    if shape.ndim() != ndim {
                        return Err(LayerError::InvalidShape {
                            index,
                            reason: format!("{} dimensions, expected {}", shape.ndim(), ndim),
                        });
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// Display state shared by every layer kind; carried across conversions.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseState {
    pub name: String,
    pub scale: Vec<f64>,
    pub translate: Vec<f64>,
    pub opacity: f64,
    pub visible: bool,
    pub metadata: IndexMap<String, serde_json::Value>,
}

/// A layer owned by a [`LayerList`](crate::LayerList).
#[derive(Debug)]
pub struct Layer {
    id: LayerId,
    name: String,
    data: LayerData,
    scale: Vec<f64>,
    translate: Vec<f64>,
    opacity: f64,
    visible: bool,
    pub metadata: IndexMap<String, serde_json::Value>,
    pub events: LayerEvents,
}

impl Layer {
    /// Build a layer with default display state.
    pub fn new(data: LayerData) -> Result<Self, LayerError> {
        data.validate()?;
        Ok(Self::assemble(data))
    }

    fn assemble(data: LayerData) -> Self {
        let ndim = data.ndim();
        let id = next_layer_id();
        Self {
            id,
            name: data.kind().default_name().to_string(),
            data,
            scale: vec![1.0; ndim],
            translate: vec![0.0; ndim],
            opacity: 1.0,
            visible: true,
            metadata: IndexMap::new(),
            events: LayerEvents::new(id),
        }
    }

    /// Build a layer from a payload and the base state of another layer.
    pub fn create(data: LayerData, state: BaseState) -> Result<Self, LayerError> {
        let mut layer = Self::new(data)?;
        let ndim = layer.ndim();
        check_len("scale", ndim, state.scale.len())?;
        check_len("translate", ndim, state.translate.len())?;
        layer.name = state.name;
        layer.scale = state.scale;
        layer.translate = state.translate;
        layer.opacity = state.opacity;
        layer.visible = state.visible;
        layer.metadata = state.metadata;
        Ok(layer)
    }

    pub fn image(data: impl Into<ArrayData>) -> Self {
        Self::assemble(LayerData::Image {
            data: data.into(),
            rgb: false,
        })
    }

    pub fn labels(data: impl Into<ArrayData>) -> Result<Self, LayerError> {
        Self::new(LayerData::Labels(data.into()))
    }

    pub fn points(coords: Array2<f64>) -> Self {
        Self::assemble(LayerData::Points(coords))
    }

    pub fn shapes(shapes: Vec<Shape>) -> Result<Self, LayerError> {
        Self::new(LayerData::Shapes(shapes))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_scale(mut self, scale: Vec<f64>) -> Result<Self, LayerError> {
        check_len("scale", self.ndim(), scale.len())?;
        self.scale = scale;
        Ok(self)
    }

    pub fn with_translate(mut self, translate: Vec<f64>) -> Result<Self, LayerError> {
        check_len("translate", self.ndim(), translate.len())?;
        self.translate = translate;
        Ok(self)
    }

    /// A deep copy with a new id and a fresh observer set.
    pub fn deep_copy(&self) -> Self {
        let id = next_layer_id();
        Self {
            id,
            name: self.name.clone(),
            data: self.data.clone(),
            scale: self.scale.clone(),
            translate: self.translate.clone(),
            opacity: self.opacity,
            visible: self.visible,
            metadata: self.metadata.clone(),
            events: LayerEvents::new(id),
        }
    }

    /// Snapshot of the state that survives a change of kind.
    pub fn base_state(&self) -> BaseState {
        BaseState {
            name: self.name.clone(),
            scale: self.scale.clone(),
            translate: self.translate.clone(),
            opacity: self.opacity,
            visible: self.visible,
            metadata: self.metadata.clone(),
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn kind(&self) -> LayerKind {
        self.data.kind()
    }

    pub fn type_string(&self) -> &'static str {
        self.kind().type_string()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &LayerData {
        &self.data
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    /// Element type of image and labels payloads.
    pub fn dtype(&self) -> Option<DType> {
        self.data.array().map(ArrayData::dtype)
    }

    pub fn is_rgb(&self) -> bool {
        matches!(self.data, LayerData::Image { rgb: true, .. })
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    pub fn translate(&self) -> &[f64] {
        &self.translate
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.events.emit(EventField::Name);
    }

    /// Replace the payload with data of the same kind and dimensionality.
    pub fn set_data(&mut self, data: LayerData) -> Result<(), LayerError> {
        if data.kind() != self.kind() {
            return Err(LayerError::KindChange {
                expected: self.kind(),
                found: data.kind(),
            });
        }
        data.validate()?;
        check_len("data", self.ndim(), data.ndim())?;
        self.data = data;
        self.events.emit(EventField::Data);
        Ok(())
    }

    pub fn set_scale(&mut self, scale: Vec<f64>) -> Result<(), LayerError> {
        check_len("scale", self.ndim(), scale.len())?;
        self.scale = scale;
        self.events.emit(EventField::Scale);
        Ok(())
    }

    pub fn set_opacity(&mut self, opacity: f64) {
        self.opacity = opacity.clamp(0.0, 1.0);
        self.events.emit(EventField::Opacity);
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        self.events.emit(EventField::Visible);
    }

    /// Mark an image layer as RGB(A). Ignored for other kinds.
    pub fn set_rgb(&mut self, value: bool) {
        if let LayerData::Image { rgb, .. } = &mut self.data {
            *rgb = value;
        }
    }
}

fn check_len(field: &'static str, expected: usize, found: usize) -> Result<(), LayerError> {
    if expected == found {
        Ok(())
    } else {
        Err(LayerError::DimensionMismatch {
            field,
            expected,
            found,
        })
    }
}
