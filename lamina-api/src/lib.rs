//! Lamina API - the layer data model shared by the action kernel and hosts.
//!
//! - `dtype` / `array`: element types and typed n-dimensional payloads
//! - `layer`: the closed set of layer kinds and their display state
//! - `event`: per-field observers owned by each layer
//! - `layer_list`: the ordered collection and its selection

mod array;
mod dtype;
mod event;
mod layer;
mod layer_list;

pub use array::*;
pub use dtype::*;
pub use event::*;
pub use layer::*;
pub use layer_list::*;
