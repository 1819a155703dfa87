//! The event bus and the topic pub/sub layered over it.
//!
//! Dispatch is synchronous: [`Hub::send_event`] returns once every interested
//! listener has run. The listener list is snapshotted before dispatch, so a
//! callback may register or remove listeners, send events, or publish
//! services without invalidating the iteration.

use crate::common::{ListenerId, OrderedSlots};
use crate::component::{same_component, ComponentRef, ComponentSelector};
use crate::error::{HubError, HubResult};
use crate::events::Event;
use crate::hub::Hub;
use parking_lot::RwLock;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, trace};

/// Decides whether a listener is interested in an event.
pub type MatchFn = Arc<dyn Fn(&Event) -> bool + Send + Sync>;

/// Receives the events a listener matched.
pub type Callback = Arc<dyn Fn(&Event) + Send + Sync>;

/// Wraps a closure as a [`Callback`].
///
/// Keep the returned `Arc` around to later narrow
/// [`Hub::unregister_listener`] or [`Hub::unsubscribe`] to this callback.
pub fn callback<F>(f: F) -> Callback
where
    F: Fn(&Event) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wraps a closure as a [`MatchFn`].
pub fn matcher<F>(f: F) -> MatchFn
where
    F: Fn(&Event) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

/// The two halves of a listener, given as a configuration object.
#[derive(Clone, Default)]
pub struct ListenerConfig {
    pub matcher: Option<MatchFn>,
    pub callback: Option<Callback>,
}

impl ListenerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn matching(mut self, matcher: MatchFn) -> Self {
        self.matcher = Some(matcher);
        self
    }

    pub fn calling(mut self, callback: Callback) -> Self {
        self.callback = Some(callback);
        self
    }
}

#[derive(Clone)]
pub(crate) struct Listener {
    owner: ComponentRef,
    matcher: MatchFn,
    callback: Callback,
}

/// Storage for the hub's listeners.
#[derive(Clone, Default)]
pub(crate) struct EventBus {
    listeners: Arc<RwLock<OrderedSlots<ListenerId, Listener>>>,
}

impl EventBus {
    fn insert(&self, listener: Listener) -> ListenerId {
        self.listeners.write().insert(listener)
    }

    fn snapshot(&self) -> Vec<(ListenerId, Listener)> {
        self.listeners
            .read()
            .iter()
            .map(|(id, listener)| (id, listener.clone()))
            .collect()
    }

    fn is_live(&self, id: ListenerId) -> bool {
        self.listeners.read().contains_key(id)
    }

    fn remove(&self, id: ListenerId) -> bool {
        self.listeners.write().remove(id).is_some()
    }

    /// Removes the listeners owned by `owner`, narrowed to `callback` when given.
    pub(crate) fn remove_owned_by(&self, owner: &ComponentRef, callback: Option<&Callback>) -> usize {
        self.listeners.write().retain(|_, listener| {
            let owned = same_component(&listener.owner, owner);
            let selected = callback.map_or(true, |cb| Arc::ptr_eq(&listener.callback, cb));
            !(owned && selected)
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub(crate) fn clear(&self) {
        self.listeners.write().clear();
    }
}

// Event bus API.
impl Hub {
    /// Registers a listener owned by a plugged component.
    ///
    /// The matcher is any closure, while the callback is a shared
    /// [`Callback`] (see [`callback`]): keep a clone of it to later remove
    /// exactly this listener with [`Hub::unregister_listener`]. Callbacks are
    /// told apart by `Arc` identity; matchers never are.
    ///
    /// Returns `UnknownComponent` when `component` is not plugged.
    pub fn register_listener<M>(
        &self,
        component: &ComponentRef,
        matcher: M,
        callback: Callback,
    ) -> HubResult<ListenerId>
    where
        M: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        self.register_configurable_listener(
            component,
            ListenerConfig::new()
                .matching(Arc::new(matcher))
                .calling(callback),
        )
    }

    /// Registers a listener described by a [`ListenerConfig`].
    ///
    /// Both `matcher` and `callback` are required.
    pub fn register_configurable_listener(
        &self,
        component: &ComponentRef,
        config: ListenerConfig,
    ) -> HubResult<ListenerId> {
        let (Some(matcher), Some(callback)) = (config.matcher, config.callback) else {
            return Err(HubError::InvalidArguments(
                "cannot register the listener - match and callback must be defined".to_string(),
            ));
        };
        let Some(owner) = self.components.name_of(component) else {
            return Err(HubError::UnknownComponent(component.name()));
        };

        let id = self.bus.insert(Listener {
            owner: component.clone(),
            matcher,
            callback,
        });
        debug!(component = %owner, ?id, "Listener registered.");
        Ok(id)
    }

    /// Removes the listeners of a component, narrowed to one callback when given.
    ///
    /// Unknown components are ignored. Returns the number of removed listeners.
    pub fn unregister_listener(
        &self,
        component: impl Into<ComponentSelector>,
        callback: Option<&Callback>,
    ) -> usize {
        let owner = match component.into() {
            ComponentSelector::Name(name) => match self.components.find(&name) {
                Some(owner) => owner,
                None => return 0,
            },
            ComponentSelector::Ref(owner) => owner,
        };
        let removed = self.bus.remove_owned_by(&owner, callback);
        if removed > 0 {
            debug!(component = %owner.name(), removed, "Listeners unregistered.");
        }
        removed
    }

    /// Removes a single listener. Returns `false` when the id is stale.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.bus.remove(id)
    }

    pub fn listener_count(&self) -> usize {
        self.bus.len()
    }

    /// Sends an event to every matching listener not owned by `sender`.
    ///
    /// Each listener gets its own clone carrying `source = sender`. Listeners
    /// run in registration order; a listener removed by an earlier callback
    /// of the same dispatch is skipped. Returns `true` when at least one
    /// callback ran.
    pub fn send_event(&self, sender: &ComponentRef, event: &Event) -> bool {
        let mut delivered = false;
        for (id, listener) in self.bus.snapshot() {
            if same_component(&listener.owner, sender) || !self.bus.is_live(id) {
                continue;
            }
            let mut copy = event.clone();
            copy.set_source(sender.clone());
            if (listener.matcher)(&copy) {
                trace!(from = %sender.name(), to = %listener.owner.name(), ?id, "Delivering event.");
                (listener.callback)(&copy);
                delivered = true;
            }
        }
        delivered
    }
}

// Topic pub/sub API.
impl Hub {
    /// Subscribes `component` to the topics matching `pattern`.
    ///
    /// The pattern is a regular expression searched anywhere in the topic,
    /// so `"foo/bar"` also matches `"foo/barbaz"`. When `filter` is given it
    /// must also accept the event. An empty pattern is a no-op and returns
    /// `Ok(None)`.
    pub fn subscribe(
        &self,
        component: &ComponentRef,
        pattern: &str,
        callback: Callback,
        filter: Option<MatchFn>,
    ) -> HubResult<Option<ListenerId>> {
        if pattern.is_empty() {
            return Ok(None);
        }
        let regex = Regex::new(pattern)?;
        let matcher: MatchFn = Arc::new(move |event: &Event| {
            let on_topic = event.topic().map_or(false, |topic| regex.is_match(topic));
            on_topic && filter.as_ref().map_or(true, |accept| accept(event))
        });
        let id = self.register_configurable_listener(
            component,
            ListenerConfig::new().matching(matcher).calling(callback),
        )?;
        debug!(component = %component.name(), pattern, ?id, "Topic subscription added.");
        Ok(Some(id))
    }

    /// Removes subscriptions of `component` that use `callback`.
    pub fn unsubscribe(&self, component: impl Into<ComponentSelector>, callback: &Callback) -> usize {
        self.unregister_listener(component, Some(callback))
    }

    /// Publishes an event on a topic. Returns `false` when the topic is empty
    /// or nobody received the event.
    pub fn publish(&self, component: &ComponentRef, topic: &str, mut event: Event) -> bool {
        if topic.is_empty() {
            return false;
        }
        event.set_topic(topic);
        self.send_event(component, &event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listener_config_requires_both_halves() {
        let config = ListenerConfig::new().calling(callback(|_| {}));
        assert!(config.matcher.is_none());
        assert!(config.callback.is_some());
    }

    #[test]
    fn matcher_helper_wraps_closures() {
        let is_ping = matcher(|event| event.get("kind").and_then(|k| k.as_str()) == Some("ping"));
        assert!(is_ping(&Event::new().with("kind", "ping")));
        assert!(!is_ping(&Event::new()));
    }
}
