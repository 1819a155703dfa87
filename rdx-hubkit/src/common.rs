//! Contains common, primitive types shared across the hub.
//!
//! This module defines the identifier types used to address listeners,
//! service listeners and service registrations. Using distinct types keeps
//! the different id spaces from being mixed up.

use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, Key, SlotMap};
use std::fmt;

new_key_type! {
    /// Uniquely and safely identifies an event listener registered on the hub.
    ///
    /// This key is returned when a listener (or a topic subscription) is
    /// added. Keys are versioned, so a removed listener's id never matches a
    /// listener registered later in the same slot.
    pub struct ListenerId;

    /// Uniquely identifies a service listener.
    pub struct ServiceListenerId;
}

/// Identifies a service registration.
///
/// Ids come from a monotonic counter owned by the hub and are never reused,
/// not even after [`Hub::reset`](crate::hub::Hub::reset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(pub u64);

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A slot map that remembers insertion order.
///
/// Dispatch order on the hub is registration order, which a plain `SlotMap`
/// does not preserve once slots get recycled.
pub(crate) struct OrderedSlots<K: Key, V> {
    slots: SlotMap<K, V>,
    order: Vec<K>,
}

impl<K: Key, V> OrderedSlots<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            slots: SlotMap::with_key(),
            order: Vec::new(),
        }
    }

    pub(crate) fn insert(&mut self, value: V) -> K {
        let key = self.slots.insert(value);
        self.order.push(key);
        key
    }

    pub(crate) fn remove(&mut self, key: K) -> Option<V> {
        let value = self.slots.remove(key)?;
        self.order.retain(|k| *k != key);
        Some(value)
    }

    pub(crate) fn contains_key(&self, key: K) -> bool {
        self.slots.contains_key(key)
    }

    /// Keeps the entries for which `keep` returns true. Returns how many were dropped.
    pub(crate) fn retain(&mut self, mut keep: impl FnMut(K, &V) -> bool) -> usize {
        let before = self.order.len();
        let slots = &mut self.slots;
        self.order.retain(|&key| {
            let kept = slots.get(key).map_or(false, |value| keep(key, value));
            if !kept {
                slots.remove(key);
            }
            kept
        });
        before - self.order.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (K, &V)> + '_ {
        self.order
            .iter()
            .filter_map(|&key| self.slots.get(key).map(|value| (key, value)))
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.order.clear();
    }
}

impl<K: Key, V> Default for OrderedSlots<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
