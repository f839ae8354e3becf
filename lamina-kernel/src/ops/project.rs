use lamina_api::{
    with_array, ArrayData, BaseState, Element, IntoArrayData, Layer, LayerData, LayerId, LayerList,
};
use ndarray::{ArrayD, ArrayView1, Axis};
use tracing::{debug, warn};

use super::ProjectionMode;
use crate::error::OperationError;

/// Reduce the active layer along its first axis into a new image layer.
///
/// The active layer must be the only selected one and carry array data with
/// at least two dimensions. The result is appended and made active; the
/// source layer is left untouched.
pub fn project(layers: &mut LayerList, mode: ProjectionMode) -> Result<LayerId, OperationError> {
    let source = layers.active().ok_or(OperationError::NoActiveLayer)?;
    if layers.selection().len() != 1 {
        return Err(OperationError::NotReducible(format!(
            "{} layers are selected, expected exactly one",
            layers.selection().len()
        )));
    }
    let data = match source.data() {
        LayerData::Image { data, .. } | LayerData::Labels(data) => data,
        other => {
            return Err(OperationError::NotReducible(format!(
                "{} layers have no array data",
                other.kind()
            )));
        }
    };
    if data.ndim() < 2 {
        return Err(OperationError::NotReducible(format!(
            "{} has {} dimension(s), need at least 2",
            source.name(),
            data.ndim()
        )));
    }
    if data.shape()[0] == 0 {
        return Err(OperationError::NotReducible(format!(
            "{} has an empty first axis",
            source.name()
        )));
    }

    let projected = reduce(data, mode);
    let ndim = projected.ndim();
    let state = BaseState {
        name: format!("{} {}-proj", source.name(), mode),
        scale: source.scale()[1..].to_vec(),
        translate: source.translate()[1..].to_vec(),
        opacity: source.opacity(),
        visible: source.visible(),
        metadata: source.metadata.clone(),
    };
    let rgb = source.is_rgb() && ndim >= 3;
    let source_id = source.id();

    let layer = Layer::create(LayerData::Image { data: projected, rgb }, state)?;
    let id = layers.append(layer)?;
    layers.set_active(id)?;

    debug!(source = %source_id, projection = %id, %mode, "projected layer");
    Ok(id)
}

/// Reduce `data` along axis 0.
pub(crate) fn reduce(data: &ArrayData, mode: ProjectionMode) -> ArrayData {
    with_array!(data, a => reduce_array(a, mode))
}

fn reduce_array<T>(a: &ArrayD<T>, mode: ProjectionMode) -> ArrayData
where
    T: Element,
    ArrayD<T>: IntoArrayData,
{
    let axis = Axis(0);
    match mode {
        ProjectionMode::Max => a
            .map_axis(axis, |lane| extreme(lane, |v, best| v > best))
            .into_array_data(),
        ProjectionMode::Min => a
            .map_axis(axis, |lane| extreme(lane, |v, best| v < best))
            .into_array_data(),
        ProjectionMode::Sum if T::DTYPE.is_integer() => {
            let mut saturated = 0usize;
            let sums = a.map_axis(axis, |lane| {
                let total: i128 = lane.iter().filter_map(|v| v.to_i128()).sum();
                i64::try_from(total).unwrap_or_else(|_| {
                    saturated += 1;
                    if total < 0 { i64::MIN } else { i64::MAX }
                })
            });
            if saturated > 0 {
                warn!(pixels = saturated, "sum projection saturated at int64 bounds");
            }
            ArrayData::Int64(sums)
        }
        ProjectionMode::Sum => {
            ArrayData::Float64(a.map_axis(axis, |lane| lane.iter().map(|v| v.to_f64()).sum()))
        }
        ProjectionMode::Mean => ArrayData::Float64(a.map_axis(axis, |lane| mean(&widen(lane)))),
        ProjectionMode::Std => ArrayData::Float64(a.map_axis(axis, |lane| {
            let values = widen(lane);
            let mean = mean(&values);
            let variance =
                values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64;
            variance.sqrt()
        })),
        ProjectionMode::Median => ArrayData::Float64(a.map_axis(axis, |lane| {
            let mut values = widen(lane);
            values.sort_by(f64::total_cmp);
            let mid = values.len() / 2;
            if values.len() % 2 == 1 {
                values[mid]
            } else {
                (values[mid - 1] + values[mid]) / 2.0
            }
        })),
    }
}

fn extreme<T: Element>(lane: ArrayView1<'_, T>, better: fn(T, T) -> bool) -> T {
    lane.iter()
        .copied()
        .reduce(|best, v| if better(v, best) { v } else { best })
        .unwrap_or(T::ZERO)
}

fn widen<T: Element>(lane: ArrayView1<'_, T>) -> Vec<f64> {
    lane.iter().map(|v| v.to_f64()).collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use lamina_api::DType;
    use ndarray::{array, IxDyn};

    fn stack() -> ArrayData {
        // Two 2x2 planes.
        ArrayData::Int16(
            array![[[1, 5], [3, 0]], [[4, 2], [3, 8]]]
                .into_dyn(),
        )
    }

    #[test]
    fn test_reductions() {
        let data = stack();
        let max = reduce(&data, ProjectionMode::Max);
        assert_eq!(max.dtype(), DType::Int16);
        assert_eq!(max, ArrayData::Int16(array![[4, 5], [3, 8]].into_dyn()));

        let min = reduce(&data, ProjectionMode::Min);
        assert_eq!(min, ArrayData::Int16(array![[1, 2], [3, 0]].into_dyn()));

        let sum = reduce(&data, ProjectionMode::Sum);
        assert_eq!(sum, ArrayData::Int64(array![[5, 7], [6, 8]].into_dyn()));

        let mean = reduce(&data, ProjectionMode::Mean);
        assert_eq!(mean, ArrayData::Float64(array![[2.5, 3.5], [3.0, 4.0]].into_dyn()));

        let std = reduce(&data, ProjectionMode::Std);
        assert_eq!(std, ArrayData::Float64(array![[1.5, 1.5], [0.0, 4.0]].into_dyn()));

        let median = reduce(&data, ProjectionMode::Median);
        assert_eq!(median, ArrayData::Float64(array![[2.5, 3.5], [3.0, 4.0]].into_dyn()));
    }

    #[test]
    fn test_integer_sum_saturates() {
        let data = ArrayData::Int64(array![[i64::MAX, -5], [1, i64::MIN]].into_dyn());
        let sum = reduce(&data, ProjectionMode::Sum);
        assert_eq!(sum, ArrayData::Int64(array![i64::MAX, i64::MIN].into_dyn()));
    }

    #[test]
    fn test_float_sum_stays_float() {
        let data = ArrayData::Float32(ArrayD::from_elem(IxDyn(&[3, 2]), 0.5));
        let sum = reduce(&data, ProjectionMode::Sum);
        assert_eq!(sum, ArrayData::Float64(array![1.5, 1.5].into_dyn()));
    }

    #[test]
    fn test_projection_layer() {
        let mut layers = LayerList::new();
        let source = Layer::labels(stack())
            .unwrap()
            .with_name("cells")
            .with_scale(vec![2.0, 0.5, 0.25])
            .unwrap();
        let source_id = layers.append(source).unwrap();
        layers.set_active(source_id).unwrap();

        let id = project(&mut layers, ProjectionMode::Max).unwrap();
        let projected = layers.get_by_id(id).unwrap();
        assert_eq!(projected.name(), "cells max-proj");
        assert_eq!(projected.type_string(), "image");
        assert_eq!(projected.scale(), &[0.5, 0.25]);
        assert_eq!(projected.translate(), &[0.0, 0.0]);
        assert_eq!(layers.index_of(id), Some(1));
        assert_eq!(layers.active().map(Layer::id), Some(id));
        assert_eq!(layers.get_by_id(source_id).unwrap().ndim(), 3);
    }

    #[test]
    fn test_preconditions() {
        let mut layers = LayerList::new();
        assert_eq!(
            project(&mut layers, ProjectionMode::Sum),
            Err(OperationError::NoActiveLayer)
        );

        let flat = layers
            .append(Layer::image(ArrayD::<f64>::zeros(IxDyn(&[5]))))
            .unwrap();
        layers.set_active(flat).unwrap();
        assert!(matches!(
            project(&mut layers, ProjectionMode::Sum),
            Err(OperationError::NotReducible(_))
        ));

        let points = layers.append(Layer::points(array![[0.0, 1.0]])).unwrap();
        layers.set_active(points).unwrap();
        assert!(matches!(
            project(&mut layers, ProjectionMode::Mean),
            Err(OperationError::NotReducible(_))
        ));

        let image = layers
            .append(Layer::image(ArrayD::<f64>::zeros(IxDyn(&[2, 2]))))
            .unwrap();
        layers.set_active(image).unwrap();
        layers.select(points).unwrap();
        assert!(matches!(
            project(&mut layers, ProjectionMode::Max),
            Err(OperationError::NotReducible(_))
        ));
        assert_eq!(layers.len(), 3);
    }
}
