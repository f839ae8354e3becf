//! Scene files - a JSON description of a layer list and its selection.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use lamina_api::{ArrayData, DType, Layer, LayerData, LayerKind, LayerList, Shape, ShapeType};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scene {
    pub layers: Vec<SceneLayer>,
}

/// One layer entry. Array kinds use `shape`/`dtype`/`fill`; points use
/// `points`; shapes use `shapes`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneLayer {
    pub kind: LayerKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub shape: Vec<usize>,
    #[serde(default)]
    pub dtype: Option<DType>,
    #[serde(default)]
    pub fill: f64,
    #[serde(default)]
    pub rgb: bool,
    #[serde(default)]
    pub points: Vec<Vec<f64>>,
    #[serde(default)]
    pub shapes: Vec<SceneShape>,
    #[serde(default)]
    pub scale: Option<Vec<f64>>,
    #[serde(default)]
    pub translate: Option<Vec<f64>>,
    #[serde(default)]
    pub opacity: Option<f64>,
    #[serde(default)]
    pub visible: Option<bool>,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneShape {
    pub shape_type: ShapeType,
    pub vertices: Vec<Vec<f64>>,
}

impl Scene {
    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("reading scene {}", path.display()))?;
        Self::from_json(&source).with_context(|| format!("parsing scene {}", path.display()))
    }

    pub fn from_json(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// Build the layer list, applying `selected` and `active` flags.
    pub fn build(&self) -> Result<LayerList> {
        let mut layers = LayerList::new();
        let mut active = None;
        for (index, entry) in self.layers.iter().enumerate() {
            let layer = entry
                .to_layer()
                .with_context(|| format!("layer {} ({})", index, entry.kind))?;
            let id = layers.append(layer)?;
            if entry.selected || entry.active {
                layers.select(id)?;
            }
            if entry.active {
                if active.is_some() {
                    bail!("more than one layer is marked active");
                }
                active = Some(id);
            }
        }
        if let Some(id) = active {
            // set_active narrows the selection, so restore the others.
            let selected = layers.selected_ids();
            layers.set_active(id)?;
            for other in selected {
                layers.select(other)?;
            }
        }
        Ok(layers)
    }
}

impl SceneLayer {
    fn to_layer(&self) -> Result<Layer> {
        let data = match self.kind {
            LayerKind::Image => LayerData::Image {
                data: self.array()?,
                rgb: self.rgb,
            },
            LayerKind::Labels => LayerData::Labels(self.array()?),
            LayerKind::Points => LayerData::Points(matrix(&self.points, 2)?),
            LayerKind::Shapes => LayerData::Shapes(
                self.shapes
                    .iter()
                    .map(|s| Ok(Shape::new(s.shape_type, matrix(&s.vertices, 2)?)))
                    .collect::<Result<Vec<_>>>()?,
            ),
        };

        let mut layer = Layer::new(data)?;
        if let Some(name) = &self.name {
            layer = layer.with_name(name.clone());
        }
        if let Some(scale) = &self.scale {
            layer = layer.with_scale(scale.clone())?;
        }
        if let Some(translate) = &self.translate {
            layer = layer.with_translate(translate.clone())?;
        }
        if let Some(opacity) = self.opacity {
            layer.set_opacity(opacity);
        }
        if let Some(visible) = self.visible {
            layer.set_visible(visible);
        }
        Ok(layer)
    }

    fn array(&self) -> Result<ArrayData> {
        if self.shape.is_empty() {
            bail!("{} layers need a shape", self.kind);
        }
        let default = match self.kind {
            LayerKind::Labels => DType::Int32,
            _ => DType::Float32,
        };
        let dtype = self.dtype.unwrap_or(default);
        Ok(ArrayData::filled(&self.shape, dtype, self.fill)?)
    }
}

/// Rows of equal length into an `(N, D)` matrix. Empty input gives `(0, ndim)`.
fn matrix(rows: &[Vec<f64>], ndim: usize) -> Result<Array2<f64>> {
    let width = rows.first().map(Vec::len).unwrap_or(ndim);
    if rows.iter().any(|row| row.len() != width) {
        bail!("rows have different lengths");
    }
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Ok(Array2::from_shape_vec((rows.len(), width), flat)?)
}

/// A printable summary of one layer.
#[derive(Debug, Serialize)]
pub struct LayerSummary {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: LayerKind,
    pub ndim: usize,
    pub dtype: Option<DType>,
    pub shape: Option<Vec<usize>>,
    pub scale: Vec<f64>,
    pub visible: bool,
    pub selected: bool,
    pub active: bool,
}

pub fn summarize(layers: &LayerList) -> Vec<LayerSummary> {
    let active = layers.selection().active();
    layers
        .iter()
        .map(|layer| LayerSummary {
            id: layer.id().0,
            name: layer.name().to_string(),
            kind: layer.kind(),
            ndim: layer.ndim(),
            dtype: layer.dtype(),
            shape: layer.data().array().map(|a| a.shape().to_vec()),
            scale: layer.scale().to_vec(),
            visible: layer.visible(),
            selected: layers.selection().contains(layer.id()),
            active: active == Some(layer.id()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &str = r#"{
        "layers": [
            {"kind": "image", "name": "stack", "shape": [4, 8, 8], "dtype": "uint16", "fill": 3},
            {"kind": "labels", "name": "cells", "shape": [8, 8], "scale": [0.5, 0.5], "selected": true},
            {"kind": "points", "points": [[0, 1], [2, 3]], "active": true},
            {"kind": "shapes", "shapes": [{"shape_type": "rectangle", "vertices": [[0, 0], [4, 4]]}]}
        ]
    }"#;

    #[test]
    fn test_build_scene() {
        let layers = Scene::from_json(SCENE).unwrap().build().unwrap();
        assert_eq!(layers.names(), vec!["stack", "cells", "Points", "Shapes"]);
        assert_eq!(layers[0].dtype(), Some(DType::UInt16));
        assert_eq!(layers[0].data().array().map(ArrayData::sum), Some(768.0));
        assert_eq!(layers[1].dtype(), Some(DType::Int32));
        assert_eq!(layers[1].scale(), &[0.5, 0.5]);
        assert_eq!(layers.selected_ids(), vec![layers[1].id(), layers[2].id()]);
        assert_eq!(layers.active().map(Layer::name), Some("Points"));
    }

    #[test]
    fn test_summary() {
        let layers = Scene::from_json(SCENE).unwrap().build().unwrap();
        let summary = summarize(&layers);
        assert_eq!(summary.len(), 4);
        assert!(summary[2].active);
        assert!(summary[1].selected && !summary[1].active);
        assert_eq!(summary[0].shape, Some(vec![4, 8, 8]));
        assert_eq!(summary[3].shape, None);
    }

    #[test]
    fn test_invalid_scenes() {
        let float_labels = r#"{"layers": [{"kind": "labels", "shape": [2], "dtype": "float32"}]}"#;
        assert!(Scene::from_json(float_labels).unwrap().build().is_err());

        let two_active = r#"{"layers": [
            {"kind": "points", "points": [[0, 0]], "active": true},
            {"kind": "points", "points": [[1, 1]], "active": true}
        ]}"#;
        assert!(Scene::from_json(two_active).unwrap().build().is_err());

        let ragged = r#"{"layers": [{"kind": "points", "points": [[0, 0], [1]]}]}"#;
        assert!(Scene::from_json(ragged).unwrap().build().is_err());

        assert!(Scene::from_json(r#"{"layers": [], "extra": 1}"#).is_err());
    }
}
