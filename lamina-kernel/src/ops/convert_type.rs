use lamina_api::{ArrayData, Layer, LayerData, LayerId, LayerKind, LayerList};
use tracing::debug;

use super::rasterize::rasterize;
use crate::error::{CanvasTooLarge, OperationError};

/// Whether a layer holding `data` can become a `target` layer.
pub fn is_supported_conversion(data: &LayerData, target: LayerKind) -> bool {
    match (data, target) {
        (LayerData::Image { .. }, LayerKind::Labels) => true,
        (LayerData::Labels(_), LayerKind::Image) => true,
        (LayerData::Shapes(shapes), LayerKind::Labels) => shapes.iter().all(|s| s.ndim() == 2),
        _ => false,
    }
}

/// Replace every selected layer with a `target` layer built from its data.
///
/// All selected layers are checked and converted before any is replaced.
/// Replacements keep the position, base state and selection status of the
/// layer they replace.
pub fn convert_type(
    layers: &mut LayerList,
    target: LayerKind,
) -> Result<Vec<LayerId>, OperationError> {
    if let Some(layer) = layers
        .selected()
        .find(|l| !is_supported_conversion(l.data(), target))
    {
        return Err(OperationError::UnsupportedConversion {
            layer: layer.name().to_string(),
            from: layer.kind(),
            to: target,
        });
    }

    let mut replacements = Vec::new();
    for layer in layers.selected() {
        let data = convert_data(layer.data(), target).map_err(|source| {
            OperationError::CanvasTooLarge {
                layer: layer.name().to_string(),
                source,
            }
        })?;
        replacements.push((layer.id(), Layer::create(data, layer.base_state())?));
    }

    let mut replaced = Vec::new();
    for (id, replacement) in replacements {
        let Some(index) = layers.index_of(id) else {
            continue;
        };
        let new_id = replacement.id();
        layers.replace(index, replacement)?;
        debug!(source = %id, replacement = %new_id, %target, "converted layer type");
        replaced.push(new_id);
    }
    Ok(replaced)
}

fn convert_data(data: &LayerData, target: LayerKind) -> Result<LayerData, CanvasTooLarge> {
    let converted = match (data, target) {
        (LayerData::Image { data, .. }, LayerKind::Labels) if data.dtype().is_integer() => {
            LayerData::Labels(data.clone())
        }
        (LayerData::Image { data, .. }, LayerKind::Labels) => {
            // Truncation toward zero; `as` saturates and maps NaN to 0.
            LayerData::Labels(ArrayData::Int64(data.to_f64().mapv(|v| v.trunc() as i64)))
        }
        (LayerData::Labels(data), _) => LayerData::Image {
            data: data.clone(),
            rgb: false,
        },
        (LayerData::Shapes(shapes), _) => {
            LayerData::Labels(ArrayData::Int64(rasterize(shapes)?))
        }
        (other, _) => other.clone(),
    };
    Ok(converted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lamina_api::{DType, Shape, ShapeType};
    use ndarray::{array, ArrayD, IxDyn};

    #[test]
    fn test_float_image_truncates_into_labels() {
        let mut layers = LayerList::new();
        let image = Layer::image(array![[1.9, -2.7], [0.0, 3.0]].into_dyn()).with_name("img");
        let id = layers.append(image).unwrap();
        layers.set_active(id).unwrap();

        let new_ids = convert_type(&mut layers, LayerKind::Labels).unwrap();
        let labels = &layers[0];
        assert_eq!(new_ids, vec![labels.id()]);
        assert_eq!(labels.type_string(), "labels");
        assert_eq!(labels.name(), "img");
        assert_eq!(labels.dtype(), Some(DType::Int64));
        assert_eq!(
            labels.data().array(),
            Some(&ArrayData::Int64(array![[1, -2], [0, 3]].into_dyn()))
        );
        assert_eq!(layers.active().map(Layer::id), Some(labels.id()));
    }

    #[test]
    fn test_integer_image_keeps_dtype() {
        let mut layers = LayerList::new();
        let id = layers
            .append(Layer::image(ArrayD::<u16>::zeros(IxDyn(&[3, 3]))))
            .unwrap();
        layers.set_active(id).unwrap();
        convert_type(&mut layers, LayerKind::Labels).unwrap();
        assert_eq!(layers[0].dtype(), Some(DType::UInt16));
    }

    #[test]
    fn test_unsupported_pair_mutates_nothing() {
        let mut layers = LayerList::new();
        let labels = layers
            .append(Layer::labels(ArrayD::<u8>::zeros(IxDyn(&[2, 2]))).unwrap())
            .unwrap();
        let points = layers.append(Layer::points(array![[0.0, 0.0]])).unwrap();
        layers.select_all();

        assert!(matches!(
            convert_type(&mut layers, LayerKind::Image),
            Err(OperationError::UnsupportedConversion { from: LayerKind::Points, .. })
        ));
        assert_eq!(layers[0].id(), labels);
        assert_eq!(layers[1].id(), points);
    }

    #[test]
    fn test_three_dimensional_shapes_are_unsupported() {
        let shapes = vec![Shape::new(
            ShapeType::Path,
            array![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]],
        )];
        let data = LayerData::Shapes(shapes);
        assert!(!is_supported_conversion(&data, LayerKind::Labels));
    }

    #[test]
    fn test_oversized_shapes_fail_without_touching_the_list() {
        let mut layers = LayerList::new();
        let image = layers
            .append(Layer::image(ArrayD::<u8>::zeros(IxDyn(&[2, 2]))))
            .unwrap();
        let rect = Shape::new(ShapeType::Rectangle, array![[0.0, 0.0], [1e12, 1.0]]);
        let far = layers
            .append(Layer::shapes(vec![rect]).unwrap().with_name("far"))
            .unwrap();
        layers.select_all();

        assert!(matches!(
            convert_type(&mut layers, LayerKind::Labels),
            Err(OperationError::CanvasTooLarge { ref layer, .. }) if layer == "far"
        ));
        assert_eq!(layers[0].id(), image);
        assert_eq!(layers[0].type_string(), "image");
        assert_eq!(layers[1].id(), far);
        assert_eq!(layers[1].type_string(), "shapes");
    }
}
