//! Per-field observers attached to a layer.
//!
//! Every field emitter owned by a layer starts with exactly one subscriber,
//! the group forwarder, which re-emits to the layer-wide `any` emitter.
//! External callbacks are never copied when a layer is duplicated or
//! converted; the new layer builds its own [`LayerEvents`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId(pub u64);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

/// Counter for generating unique layer IDs.
static LAYER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a new unique layer ID.
pub fn next_layer_id() -> LayerId {
    LayerId(LAYER_ID_COUNTER.fetch_add(1, Ordering::SeqCst))
}

/// Identifier returned by [`EventEmitter::connect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(pub u64);

static CALLBACK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// The mutable layer fields that emit change events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventField {
    Name,
    Data,
    Scale,
    Opacity,
    Visible,
}

impl EventField {
    pub const ALL: [EventField; 5] = [
        EventField::Name,
        EventField::Data,
        EventField::Scale,
        EventField::Opacity,
        EventField::Visible,
    ];
}

/// A change notification delivered to callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerEvent {
    /// The layer whose field changed.
    pub source: LayerId,
    pub field: EventField,
}

/// Callback signature for layer events.
pub type Callback = Arc<dyn Fn(&LayerEvent) + Send + Sync>;

enum Subscriber {
    /// Implicit hookup forwarding to the owner's `any` emitter.
    Group,
    External(CallbackId, Callback),
}

/// An ordered list of subscribers for one field.
#[derive(Default)]
pub struct EventEmitter {
    subscribers: Vec<Subscriber>,
}

impl EventEmitter {
    fn grouped() -> Self {
        Self {
            subscribers: vec![Subscriber::Group],
        }
    }

    /// Attach a callback, returning a handle for [`disconnect`](Self::disconnect).
    pub fn connect<F>(&mut self, callback: F) -> CallbackId
    where
        F: Fn(&LayerEvent) + Send + Sync + 'static,
    {
        let id = CallbackId(CALLBACK_ID_COUNTER.fetch_add(1, Ordering::SeqCst));
        self.subscribers.push(Subscriber::External(id, Arc::new(callback)));
        id
    }

    /// Detach a callback. Returns `false` if it was not connected here.
    pub fn disconnect(&mut self, id: CallbackId) -> bool {
        let before = self.subscribers.len();
        self.subscribers
            .retain(|s| !matches!(s, Subscriber::External(cid, _) if *cid == id));
        before != self.subscribers.len()
    }

    /// Number of subscribers, including the implicit group hookup.
    pub fn callbacks(&self) -> usize {
        self.subscribers.len()
    }

    /// Number of callbacks attached through [`connect`](Self::connect).
    pub fn external_callbacks(&self) -> usize {
        self.subscribers
            .iter()
            .filter(|s| matches!(s, Subscriber::External(..)))
            .count()
    }

    fn emit(&self, event: &LayerEvent, group: &EventEmitter) {
        for subscriber in &self.subscribers {
            match subscriber {
                Subscriber::Group => group.emit_external(event),
                Subscriber::External(_, callback) => callback(event),
            }
        }
    }

    fn emit_external(&self, event: &LayerEvent) {
        for subscriber in &self.subscribers {
            if let Subscriber::External(_, callback) = subscriber {
                callback(event);
            }
        }
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("callbacks", &self.callbacks())
            .finish()
    }
}

/// The observer set owned by a single layer.
#[derive(Debug)]
pub struct LayerEvents {
    source: LayerId,
    pub name: EventEmitter,
    pub data: EventEmitter,
    pub scale: EventEmitter,
    pub opacity: EventEmitter,
    pub visible: EventEmitter,
    /// Receives every field event through the group hookups.
    pub any: EventEmitter,
}

impl LayerEvents {
    /// A fresh observer set for the layer `source`.
    pub fn new(source: LayerId) -> Self {
        Self {
            source,
            name: EventEmitter::grouped(),
            data: EventEmitter::grouped(),
            scale: EventEmitter::grouped(),
            opacity: EventEmitter::grouped(),
            visible: EventEmitter::grouped(),
            any: EventEmitter::default(),
        }
    }

    /// The layer these events are emitted for.
    pub fn source(&self) -> LayerId {
        self.source
    }

    pub fn emitter(&self, field: EventField) -> &EventEmitter {
        match field {
            EventField::Name => &self.name,
            EventField::Data => &self.data,
            EventField::Scale => &self.scale,
            EventField::Opacity => &self.opacity,
            EventField::Visible => &self.visible,
        }
    }

    pub fn emitter_mut(&mut self, field: EventField) -> &mut EventEmitter {
        match field {
            EventField::Name => &mut self.name,
            EventField::Data => &mut self.data,
            EventField::Scale => &mut self.scale,
            EventField::Opacity => &mut self.opacity,
            EventField::Visible => &mut self.visible,
        }
    }

    /// Notify subscribers of `field` that it changed.
    pub fn emit(&self, field: EventField) {
        let event = LayerEvent {
            source: self.source,
            field,
        };
        self.emitter(field).emit(&event, &self.any);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_fresh_events_have_group_hookup_only() {
        let events = LayerEvents::new(LayerId(7));
        assert_eq!(events.source(), LayerId(7));
        for field in EventField::ALL {
            assert_eq!(events.emitter(field).callbacks(), 1);
            assert_eq!(events.emitter(field).external_callbacks(), 0);
        }
    }

    #[test]
    fn test_emit_reaches_field_and_group_callbacks() {
        let mut events = LayerEvents::new(LayerId(1));
        let field_hits = Arc::new(AtomicUsize::new(0));
        let group_hits = Arc::new(AtomicUsize::new(0));

        let hits = field_hits.clone();
        events.data.connect(move |event| {
            assert_eq!(event.field, EventField::Data);
            hits.fetch_add(1, Ordering::SeqCst);
        });
        let hits = group_hits.clone();
        events.any.connect(move |_| {
            hits.fetch_add(1, Ordering::SeqCst);
        });

        events.emit(EventField::Data);
        events.emit(EventField::Visible);

        assert_eq!(field_hits.load(Ordering::SeqCst), 1);
        assert_eq!(group_hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_disconnect() {
        let mut events = LayerEvents::new(LayerId(1));
        let id = events.name.connect(|_| {});
        assert_eq!(events.name.callbacks(), 2);
        assert!(events.name.disconnect(id));
        assert!(!events.name.disconnect(id));
        assert_eq!(events.name.callbacks(), 1);
    }
}
