//! Ordered layer collection with a selection.

use std::collections::HashSet;
use std::ops::Index;
use thiserror::Error;

use crate::event::LayerId;
use crate::layer::Layer;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayerListError {
    #[error("{0} is already in the list")]
    DuplicateLayer(LayerId),

    #[error("{0} is not in the list")]
    UnknownLayer(LayerId),

    #[error("index {index} out of range for {len} layers")]
    OutOfRange { index: usize, len: usize },
}

/// The set of selected layers and the active one among them.
///
/// Only [`LayerList`] mutates a selection, so it can keep it a subset of
/// its members.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    selected: HashSet<LayerId>,
    active: Option<LayerId>,
}

impl Selection {
    pub fn contains(&self, id: LayerId) -> bool {
        self.selected.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn active(&self) -> Option<LayerId> {
        self.active
    }

    pub fn ids(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.selected.iter().copied()
    }
}

/// An ordered sequence of uniquely-identified layers.
#[derive(Debug, Default)]
pub struct LayerList {
    layers: Vec<Layer>,
    selection: Selection,
}

impl LayerList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Layer> {
        self.layers.get_mut(index)
    }

    pub fn get_by_id(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.id() == id)
    }

    pub fn get_by_id_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|layer| layer.id() == id)
    }

    pub fn index_of(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|layer| layer.id() == id)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.layers.iter().any(|layer| layer.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.layers.iter().map(Layer::name).collect()
    }

    /// Add a layer at the end. Does not change the selection.
    pub fn append(&mut self, layer: Layer) -> Result<LayerId, LayerListError> {
        let index = self.layers.len();
        self.insert(index, layer)
    }

    /// Insert a layer before `index` (`index == len` appends).
    pub fn insert(&mut self, index: usize, layer: Layer) -> Result<LayerId, LayerListError> {
        let id = layer.id();
        if self.index_of(id).is_some() {
            return Err(LayerListError::DuplicateLayer(id));
        }
        if index > self.layers.len() {
            return Err(LayerListError::OutOfRange {
                index,
                len: self.layers.len(),
            });
        }
        self.layers.insert(index, layer);
        Ok(id)
    }

    /// Remove a layer, dropping it from the selection as well.
    pub fn remove(&mut self, id: LayerId) -> Option<Layer> {
        let index = self.index_of(id)?;
        self.selection.selected.remove(&id);
        if self.selection.active == Some(id) {
            self.selection.active = None;
        }
        Some(self.layers.remove(index))
    }

    /// Put `layer` at `index` in place of the current occupant, which is
    /// returned. The replacement inherits its selection and active status.
    pub fn replace(&mut self, index: usize, layer: Layer) -> Result<Layer, LayerListError> {
        let new_id = layer.id();
        match self.index_of(new_id) {
            Some(existing) if existing != index => {
                return Err(LayerListError::DuplicateLayer(new_id));
            }
            _ => {}
        }
        let len = self.layers.len();
        let slot = self
            .layers
            .get_mut(index)
            .ok_or(LayerListError::OutOfRange { index, len })?;
        let old = std::mem::replace(slot, layer);
        let old_id = old.id();
        if self.selection.selected.remove(&old_id) {
            self.selection.selected.insert(new_id);
        }
        if self.selection.active == Some(old_id) {
            self.selection.active = Some(new_id);
        }
        Ok(old)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Selected layers in collection order.
    pub fn selected(&self) -> impl Iterator<Item = &Layer> {
        self.layers
            .iter()
            .filter(|layer| self.selection.contains(layer.id()))
    }

    /// Ids of the selected layers in collection order.
    pub fn selected_ids(&self) -> Vec<LayerId> {
        self.selected().map(Layer::id).collect()
    }

    pub fn active(&self) -> Option<&Layer> {
        self.selection.active.and_then(|id| self.get_by_id(id))
    }

    pub fn active_mut(&mut self) -> Option<&mut Layer> {
        let id = self.selection.active?;
        self.get_by_id_mut(id)
    }

    /// Make `id` the active layer and the only selected one.
    pub fn set_active(&mut self, id: LayerId) -> Result<(), LayerListError> {
        self.require(id)?;
        self.selection.selected.clear();
        self.selection.selected.insert(id);
        self.selection.active = Some(id);
        Ok(())
    }

    /// Add `id` to the selection without changing the active layer.
    pub fn select(&mut self, id: LayerId) -> Result<(), LayerListError> {
        self.require(id)?;
        self.selection.selected.insert(id);
        Ok(())
    }

    pub fn deselect(&mut self, id: LayerId) {
        self.selection.selected.remove(&id);
        if self.selection.active == Some(id) {
            self.selection.active = None;
        }
    }

    pub fn select_all(&mut self) {
        self.selection.selected = self.layers.iter().map(Layer::id).collect();
    }

    pub fn clear_selection(&mut self) {
        self.selection = Selection::default();
    }

    fn require(&self, id: LayerId) -> Result<(), LayerListError> {
        self.index_of(id)
            .map(|_| ())
            .ok_or(LayerListError::UnknownLayer(id))
    }
}

impl Index<usize> for LayerList {
    type Output = Layer;

    fn index(&self, index: usize) -> &Layer {
        &self.layers[index]
    }
}

impl<'a> IntoIterator for &'a LayerList {
    type Item = &'a Layer;
    type IntoIter = std::slice::Iter<'a, Layer>;

    fn into_iter(self) -> Self::IntoIter {
        self.layers.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};

    fn image(name: &str) -> Layer {
        Layer::image(ArrayD::<f64>::zeros(IxDyn(&[4, 4]))).with_name(name)
    }

    #[test]
    fn test_append_keeps_order_and_selection() {
        let mut list = LayerList::new();
        let a = list.append(image("a")).unwrap();
        let b = list.append(image("b")).unwrap();
        assert_eq!(list.names(), vec!["a", "b"]);
        assert_eq!(list.index_of(b), Some(1));
        assert_eq!(list.get_by_id(a).map(Layer::name), Some("a"));
        assert!(list.selection().is_empty());
    }

    #[test]
    fn test_set_active_selects_only_that_layer() {
        let mut list = LayerList::new();
        let a = list.append(image("a")).unwrap();
        let b = list.append(image("b")).unwrap();
        list.select_all();
        list.set_active(b).unwrap();
        assert_eq!(list.selected_ids(), vec![b]);
        assert_eq!(list.active().map(Layer::id), Some(b));
        assert!(!list.selection().contains(a));
    }

    #[test]
    fn test_remove_drops_selection() {
        let mut list = LayerList::new();
        let a = list.append(image("a")).unwrap();
        list.set_active(a).unwrap();
        let removed = list.remove(a).unwrap();
        assert_eq!(removed.id(), a);
        assert!(list.selection().is_empty());
        assert!(list.active().is_none());
    }

    #[test]
    fn test_replace_transfers_selection() {
        let mut list = LayerList::new();
        let a = list.append(image("a")).unwrap();
        list.append(image("b")).unwrap();
        list.set_active(a).unwrap();

        let replacement = image("a2");
        let new_id = replacement.id();
        let old = list.replace(0, replacement).unwrap();

        assert_eq!(old.id(), a);
        assert_eq!(list[0].id(), new_id);
        assert_eq!(list.selected_ids(), vec![new_id]);
        assert_eq!(list.selection().active(), Some(new_id));
    }

    #[test]
    fn test_selection_requires_membership() {
        let mut list = LayerList::new();
        let stray = image("stray");
        assert_eq!(
            list.set_active(stray.id()),
            Err(LayerListError::UnknownLayer(stray.id()))
        );
        assert!(list.insert(3, stray).is_err());
    }
}
