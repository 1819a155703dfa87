//! Defines the event types delivered by the hub.
//!
//! [`Event`] is the payload of the event bus and of topic pub/sub.
//! [`ServiceEvent`] is what service listeners receive when a matching service
//! arrives or departs.

use crate::component::ComponentRef;
use crate::service::ServiceReference;
use serde_json::{Map, Value};
use std::fmt;

/// A key/value record sent through the event bus.
///
/// The bus stamps the sending component as `source`, and pub/sub stamps the
/// `topic`. Every listener invocation receives its own clone; cloning copies
/// nested arrays and objects, so a receiver may keep its copy without
/// affecting the sender or other receivers.
#[derive(Clone, Default)]
pub struct Event {
    source: Option<ComponentRef>,
    topic: Option<String>,
    data: Map<String, Value>,
}

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.data.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// The component that sent the event. Set by the bus on delivery.
    pub fn source(&self) -> Option<&ComponentRef> {
        self.source.as_ref()
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    pub(crate) fn set_source(&mut self, source: ComponentRef) {
        self.source = Some(source);
    }

    pub(crate) fn set_topic(&mut self, topic: impl Into<String>) {
        self.topic = Some(topic.into());
    }
}

impl From<Map<String, Value>> for Event {
    fn from(data: Map<String, Value>) -> Self {
        Self {
            source: None,
            topic: None,
            data,
        }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("source", &self.source.as_ref().map(|source| source.name()))
            .field("topic", &self.topic)
            .field("data", &self.data)
            .finish()
    }
}

/// The two phases a service listener is told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceEventKind {
    /// Fired once a matching service has been registered.
    Registered,
    /// Fired while a matching service is being unregistered. The reference is
    /// still readable for the duration of the notification.
    Unregistering,
}

/// Notification delivered to service listeners.
#[derive(Debug, Clone)]
pub struct ServiceEvent {
    pub kind: ServiceEventKind,
    pub reference: ServiceReference,
}

impl ServiceEvent {
    pub fn kind(&self) -> ServiceEventKind {
        self.kind
    }

    pub fn reference(&self) -> &ServiceReference {
        &self.reference
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clones_do_not_share_nested_values() {
        let original = Event::new()
            .with("x", 1)
            .with("nested", json!({ "list": [1, 2, 3] }));

        let mut copy = original.clone();
        copy.insert("x", 2);
        if let Some(Value::Object(nested)) = copy.data.get_mut("nested") {
            nested.insert("list".to_string(), json!([]));
        }

        assert_eq!(original.get("x"), Some(&json!(1)));
        assert_eq!(original.get("nested"), Some(&json!({ "list": [1, 2, 3] })));
        assert_eq!(copy.get("x"), Some(&json!(2)));
    }

    #[test]
    fn events_built_from_maps_have_no_source_or_topic() {
        let mut data = Map::new();
        data.insert("k".to_string(), json!("v"));
        let event = Event::from(data);

        assert!(event.source().is_none());
        assert!(event.topic().is_none());
        assert_eq!(event.get("k"), Some(&json!("v")));
    }
}
