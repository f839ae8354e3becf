use lamina_api::{LayerId, LayerList};
use tracing::debug;

use crate::error::OperationError;

/// Copy the active layer and insert the copy right after it.
///
/// The copy gets a fresh identity and observer set, a `"<name> copy"` name
/// that is unique in the list, and becomes the active layer.
pub fn duplicate(layers: &mut LayerList) -> Result<LayerId, OperationError> {
    let source = layers.active().ok_or(OperationError::NoActiveLayer)?;
    let source_id = source.id();
    let name = copy_name(layers, source.name());
    let copy = source.deep_copy().with_name(name);

    let index = layers
        .index_of(source_id)
        .ok_or(OperationError::NoActiveLayer)?;
    let id = layers.insert(index + 1, copy)?;
    layers.set_active(id)?;

    debug!(source = %source_id, copy = %id, "duplicated layer");
    Ok(id)
}

/// `"<name> copy"`, or the first free `"<name> copy [n]"`.
fn copy_name(layers: &LayerList, name: &str) -> String {
    let base = format!("{} copy", name);
    if !layers.contains_name(&base) {
        return base;
    }
    let mut n = 1;
    loop {
        let candidate = format!("{} [{}]", base, n);
        if !layers.contains_name(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lamina_api::Layer;
    use ndarray::{array, ArrayD, IxDyn};

    #[test]
    fn test_requires_active_layer() {
        let mut layers = LayerList::new();
        layers.append(Layer::points(array![[0.0, 0.0]])).unwrap();
        assert_eq!(duplicate(&mut layers), Err(OperationError::NoActiveLayer));
        assert_eq!(layers.len(), 1);
    }

    #[test]
    fn test_copy_is_inserted_after_source_and_activated() {
        let mut layers = LayerList::new();
        let a = layers.append(Layer::points(array![[1.0, 2.0]]).with_name("a")).unwrap();
        layers.append(Layer::points(array![[3.0, 4.0]]).with_name("b")).unwrap();
        layers.set_active(a).unwrap();

        let id = duplicate(&mut layers).unwrap();
        assert_eq!(layers.names(), vec!["a", "a copy", "b"]);
        assert_eq!(layers.selected_ids(), vec![id]);
        assert_eq!(layers.active().map(Layer::id), Some(id));
        assert_eq!(layers[1].data(), layers[0].data());
    }

    #[test]
    fn test_repeated_copies_get_unique_names() {
        let mut layers = LayerList::new();
        let id = layers
            .append(Layer::image(ArrayD::<u8>::zeros(IxDyn(&[2, 2]))).with_name("img"))
            .unwrap();
        for _ in 0..3 {
            layers.set_active(id).unwrap();
            duplicate(&mut layers).unwrap();
        }
        assert_eq!(
            layers.names(),
            vec!["img", "img copy [2]", "img copy [1]", "img copy"]
        );
    }
}
