use lamina_api::{DType, LayerData, LayerId, LayerKind, LayerList};
use tracing::{debug, warn};

use crate::error::{DtypeFailure, OperationError};

/// Cast every selected labels layer to the integer dtype `dtype`.
///
/// Layers are converted independently. A layer whose values do not fit is
/// left unchanged and reported in [`OperationError::DataLoss`] once the
/// remaining layers have been processed.
pub fn convert_dtype(layers: &mut LayerList, dtype: DType) -> Result<Vec<LayerId>, OperationError> {
    if let Some(layer) = layers.selected().find(|l| l.kind() != LayerKind::Labels) {
        return Err(OperationError::KindMismatch {
            layer: layer.name().to_string(),
            expected: LayerKind::Labels,
            found: layer.kind(),
        });
    }
    if !dtype.is_integer() {
        return Err(OperationError::InvalidDtype(dtype));
    }

    let mut converted = Vec::new();
    let mut failures = Vec::new();
    for id in layers.selected_ids() {
        let Some(layer) = layers.get_by_id_mut(id) else {
            continue;
        };
        if layer.dtype() == Some(dtype) {
            converted.push(id);
            continue;
        }
        let cast = match layer.data().array() {
            Some(data) => data.try_cast(dtype),
            None => continue,
        };
        match cast {
            Ok(data) => {
                layer.set_data(LayerData::Labels(data))?;
                converted.push(id);
            }
            Err(source) => {
                warn!(layer = %layer.name(), error = %source, "dtype conversion would lose data");
                failures.push(DtypeFailure {
                    layer: layer.name().to_string(),
                    source,
                });
            }
        }
    }

    debug!(%dtype, converted = converted.len(), failed = failures.len(), "converted dtype");
    if failures.is_empty() {
        Ok(converted)
    } else {
        Err(OperationError::DataLoss(failures))
    }
}
