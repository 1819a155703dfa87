//! The hub that composes the whole system.

use crate::bus::EventBus;
use crate::component::ComponentRegistry;
use crate::config::HubConfig;
use crate::service::ServiceRegistry;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// The hub.
///
/// This struct is the central point of control. It owns the plugged
/// components, the event listeners and the service registry. `Hub` is a
/// cheap handle: clones share the same state, which is how components keep
/// a reference to the hub they were registered on.
///
/// The API is split by concern: component lifecycle in
/// [`component`](crate::component), events and pub/sub in
/// [`bus`](crate::bus), bindings in [`binder`](crate::binder) and services in
/// [`service`](crate::service).
#[derive(Clone)]
pub struct Hub {
    config: Arc<HubConfig>,
    pub(crate) components: ComponentRegistry,
    pub(crate) bus: EventBus,
    pub(crate) services: ServiceRegistry,
}

impl Hub {
    /// Creates a hub with the default configuration.
    pub fn new() -> Self {
        Self::with_config(HubConfig::default())
    }

    /// Creates a new `Hub` with the given configuration.
    pub fn with_config(config: HubConfig) -> Self {
        Self {
            config: Arc::new(config),
            components: ComponentRegistry::default(),
            bus: EventBus::default(),
            services: ServiceRegistry::default(),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub(crate) fn label(&self) -> &str {
        &self.config.label
    }

    pub fn is_started(&self) -> bool {
        self.components.is_started()
    }

    /// Starts the hub, calling `start` on every plugged component in
    /// registration order. Does nothing when already started.
    pub fn start(&self) -> &Self {
        if self.components.set_started(true) {
            return self;
        }
        let components = self.components.snapshot();
        info!(hub = %self.label(), components = components.len(), "Hub starting.");
        for component in components {
            component.start();
        }
        self
    }

    /// Stops the hub, calling `stop` on every plugged component in
    /// registration order. Does nothing when not started.
    pub fn stop(&self) -> &Self {
        if !self.components.set_started(false) {
            return self;
        }
        let components = self.components.snapshot();
        info!(hub = %self.label(), components = components.len(), "Hub stopping.");
        for component in components {
            component.stop();
        }
        self
    }

    /// Stops the hub and drops every component, listener and service.
    ///
    /// Outstanding service references become invalid. Service ids keep
    /// counting from where they were.
    pub fn reset(&self) -> &Self {
        self.stop();
        self.components.clear();
        self.bus.clear();
        self.services.clear();
        info!(hub = %self.label(), "Hub reset.");
        self
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Hub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hub")
            .field("label", &self.config.label)
            .field("started", &self.is_started())
            .field("components", &self.components.len())
            .field("listeners", &self.bus.len())
            .finish()
    }
}
