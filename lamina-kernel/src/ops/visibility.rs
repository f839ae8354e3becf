use lamina_api::{LayerId, LayerList};
use tracing::debug;

/// Flip the `visible` flag of every selected layer.
pub fn toggle_visibility(layers: &mut LayerList) -> Vec<LayerId> {
    let ids = layers.selected_ids();
    for &id in &ids {
        if let Some(layer) = layers.get_by_id_mut(id) {
            let visible = !layer.visible();
            layer.set_visible(visible);
        }
    }
    debug!(count = ids.len(), "toggled visibility");
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use lamina_api::Layer;
    use ndarray::array;

    #[test]
    fn test_toggles_selected_only() {
        let mut layers = LayerList::new();
        let a = layers.append(Layer::points(array![[0.0, 0.0]])).unwrap();
        let b = layers.append(Layer::points(array![[1.0, 1.0]])).unwrap();
        layers.set_active(a).unwrap();

        assert_eq!(toggle_visibility(&mut layers), vec![a]);
        assert!(!layers.get_by_id(a).unwrap().visible());
        assert!(layers.get_by_id(b).unwrap().visible());

        toggle_visibility(&mut layers);
        assert!(layers.get_by_id(a).unwrap().visible());
    }
}
