//! The component contract and the component registry.
//!
//! A component is any `Arc<dyn Component>`. The hub keeps plugged components
//! in registration order, which is also the order used by [`Hub::start`] and
//! [`Hub::stop`].

use crate::config::ComponentConfig;
use crate::contract::{conforms_to, Contract, Inspect, MemberKind, LIFECYCLE_MEMBERS};
use crate::error::{HubError, HubResult};
use crate::hub::Hub;
use crate::members::{data_args, Arg, Members};
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// The lifecycle contract every pluggable object implements.
///
/// All methods take `&self`: components are shared between the hub, the
/// bindings they take part in and the services they publish, so any mutable
/// state lives behind interior mutability.
pub trait Component: Send + Sync + 'static {
    /// The component's name. Must be non-empty and unique within a hub.
    fn name(&self) -> String;

    /// Called once on registration with the hub handle and the configuration.
    ///
    /// Components that need the hub later keep a clone of the handle.
    fn configure(&self, hub: &Hub, config: &ComponentConfig);

    fn start(&self);

    fn stop(&self);

    /// Named members reachable by bindings, contracts and services.
    fn members(&self) -> Option<&Members> {
        None
    }
}

/// A shared reference to a component.
pub type ComponentRef = Arc<dyn Component>;

/// Compares two component references by identity.
pub fn same_component(a: &ComponentRef, b: &ComponentRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Invokes a function member on a component with data arguments.
///
/// Members from the component's table take precedence; `name`, `start` and
/// `stop` fall back to the lifecycle methods.
pub fn invoke(component: &ComponentRef, method: &str, args: &[Value]) -> HubResult<Value> {
    invoke_with(component, method, &data_args(args))
}

/// Invokes a function member on a component. Arguments may carry handles.
pub fn invoke_with(component: &ComponentRef, method: &str, args: &[Arg]) -> HubResult<Value> {
    if let Some(members) = component.members() {
        if members.kind(method).is_some() {
            return members
                .call(method, args)
                .ok_or_else(|| HubError::no_such_member(component.describe(), method));
        }
    }
    match method {
        "name" => Ok(Value::String(component.name())),
        "start" => {
            component.start();
            Ok(Value::Null)
        }
        "stop" => {
            component.stop();
            Ok(Value::Null)
        }
        "configure" => Err(HubError::InvalidArguments(
            "configure is only invoked by the hub on registration".to_string(),
        )),
        _ => Err(HubError::no_such_member(component.describe(), method)),
    }
}

impl Inspect for dyn Component {
    fn describe(&self) -> String {
        format!("component {:?}", self.name())
    }

    fn member_kind(&self, name: &str) -> Option<MemberKind> {
        if let Some(kind) = self.members().and_then(|members| members.kind(name)) {
            return Some(kind);
        }
        LIFECYCLE_MEMBERS
            .contains(&name)
            .then_some(MemberKind::Function)
    }
}

/// Checks that a component satisfies the component contract at runtime.
///
/// The trait guarantees the lifecycle methods exist; what can still go wrong
/// is an empty name or a member table shadowing a lifecycle member with data.
pub(crate) fn validate_component(component: &ComponentRef) -> HubResult<()> {
    let name = component.name();
    if name.is_empty() {
        return Err(HubError::invalid_component(name, "component name is empty"));
    }
    let report = conforms_to(&**component, &Contract::component());
    if !report.is_conformant() {
        return Err(HubError::invalid_component(name, report.to_string()));
    }
    Ok(())
}

/// Designates a component either by name or by reference.
#[derive(Clone)]
pub enum ComponentSelector {
    Name(String),
    Ref(ComponentRef),
}

impl ComponentSelector {
    /// True when the selector carries nothing to resolve.
    pub(crate) fn is_blank(&self) -> bool {
        matches!(self, ComponentSelector::Name(name) if name.is_empty())
    }

    pub(crate) fn label(&self) -> String {
        match self {
            ComponentSelector::Name(name) => name.clone(),
            ComponentSelector::Ref(component) => component.name(),
        }
    }
}

impl From<&str> for ComponentSelector {
    fn from(name: &str) -> Self {
        ComponentSelector::Name(name.to_string())
    }
}

impl From<String> for ComponentSelector {
    fn from(name: String) -> Self {
        ComponentSelector::Name(name)
    }
}

impl From<&String> for ComponentSelector {
    fn from(name: &String) -> Self {
        ComponentSelector::Name(name.clone())
    }
}

impl From<ComponentRef> for ComponentSelector {
    fn from(component: ComponentRef) -> Self {
        ComponentSelector::Ref(component)
    }
}

impl From<&ComponentRef> for ComponentSelector {
    fn from(component: &ComponentRef) -> Self {
        ComponentSelector::Ref(component.clone())
    }
}

impl fmt::Debug for ComponentSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentSelector::Name(name) => f.debug_tuple("Name").field(name).finish(),
            ComponentSelector::Ref(component) => {
                f.debug_tuple("Ref").field(&component.name()).finish()
            }
        }
    }
}

/// A plugged component under its resolved name.
///
/// The name is resolved once at registration so that registry lookups never
/// call back into component code while holding the lock.
#[derive(Clone)]
struct Plugged {
    component: ComponentRef,
    name: String,
    leaving: bool,
}

/// Ordered storage of plugged components plus the `started` flag.
#[derive(Clone, Default)]
pub(crate) struct ComponentRegistry {
    plugged: Arc<RwLock<Vec<Plugged>>>,
    started: Arc<AtomicBool>,
}

impl ComponentRegistry {
    /// Appends a component unless its resolved name or its reference is already plugged.
    fn insert(&self, component: &ComponentRef, name: String) -> Option<String> {
        let mut plugged = self.plugged.write();
        let taken = plugged.iter().any(|existing| {
            same_component(&existing.component, component) || existing.name == name
        });
        if taken {
            return None;
        }
        plugged.push(Plugged {
            component: component.clone(),
            name: name.clone(),
            leaving: false,
        });
        Some(name)
    }

    /// Flags a plugged component as leaving. Returns its resolved name, or
    /// `None` when it is not plugged or already leaving.
    fn begin_leave(&self, component: &ComponentRef) -> Option<String> {
        let mut plugged = self.plugged.write();
        let entry = plugged
            .iter_mut()
            .find(|entry| same_component(&entry.component, component))?;
        if entry.leaving {
            return None;
        }
        entry.leaving = true;
        Some(entry.name.clone())
    }

    fn remove(&self, component: &ComponentRef) {
        self.plugged
            .write()
            .retain(|entry| !same_component(&entry.component, component));
    }

    pub(crate) fn find(&self, name: &str) -> Option<ComponentRef> {
        if name.is_empty() {
            return None;
        }
        self.plugged
            .read()
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.component.clone())
    }

    pub(crate) fn name_of(&self, component: &ComponentRef) -> Option<String> {
        self.plugged
            .read()
            .iter()
            .find(|entry| same_component(&entry.component, component))
            .map(|entry| entry.name.clone())
    }

    pub(crate) fn contains(&self, component: &ComponentRef) -> bool {
        self.plugged
            .read()
            .iter()
            .any(|entry| same_component(&entry.component, component))
    }

    pub(crate) fn snapshot(&self) -> Vec<ComponentRef> {
        self.plugged
            .read()
            .iter()
            .map(|entry| entry.component.clone())
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.plugged.read().len()
    }

    pub(crate) fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Sets the `started` flag and returns its previous value.
    pub(crate) fn set_started(&self, started: bool) -> bool {
        self.started.swap(started, Ordering::SeqCst)
    }

    pub(crate) fn clear(&self) {
        self.plugged.write().clear();
    }

    /// Resolves a selector against the plugged components.
    ///
    /// Names must be plugged; `unknown` builds the error for a miss. A direct
    /// reference only has to be a valid component.
    pub(crate) fn resolve(
        &self,
        selector: &ComponentSelector,
        unknown: fn(String) -> HubError,
    ) -> HubResult<ComponentRef> {
        match selector {
            ComponentSelector::Name(name) => self.find(name).ok_or_else(|| unknown(name.clone())),
            ComponentSelector::Ref(component) => {
                validate_component(component)?;
                Ok(component.clone())
            }
        }
    }
}

// Public API implementation block.
impl Hub {
    /// Registers a component with an empty configuration.
    pub fn register_component(&self, component: ComponentRef) -> HubResult<&Self> {
        self.register_component_with(component, ComponentConfig::default())
    }

    /// Registers a component on the hub.
    ///
    /// If a component with the same resolved name (or the very same
    /// component) is already plugged, the call returns without side effects.
    /// Otherwise the component is appended, renamed when the configuration
    /// carries `component_name`, configured, and started in place when the
    /// hub is already running.
    pub fn register_component_with(
        &self,
        component: ComponentRef,
        config: ComponentConfig,
    ) -> HubResult<&Self> {
        validate_component(&component)?;

        let name = config
            .component_name()
            .map_or_else(|| component.name(), str::to_owned);
        let Some(name) = self.components.insert(&component, name) else {
            debug!(hub = %self.label(), component = %component.name(), "Component already plugged, ignoring registration.");
            return Ok(self);
        };
        info!(hub = %self.label(), component = %name, "Component registered.");

        component.configure(self, &config);

        if self.components.is_started() && self.config().late_join_start {
            debug!(component = %name, "Hub already started, starting late joiner.");
            component.start();
        }
        Ok(self)
    }

    /// Unregisters a component, by name or by reference.
    ///
    /// Does nothing when the component is not plugged or already leaving.
    /// Otherwise its services are unregistered (listeners see the departures),
    /// `stop` is called, its event listeners are removed and, last, it leaves
    /// the component list. Until then it can still be looked up.
    pub fn unregister_component(&self, component: impl Into<ComponentSelector>) -> HubResult<&Self> {
        let component = match component.into() {
            ComponentSelector::Name(name) => match self.components.find(&name) {
                Some(component) => component,
                None => return Ok(self),
            },
            ComponentSelector::Ref(component) => {
                validate_component(&component)?;
                component
            }
        };

        let Some(name) = self.components.begin_leave(&component) else {
            return Ok(self);
        };

        let withdrawn = self.services.unregister_all_from(&component);
        component.stop();
        let listeners = self.bus.remove_owned_by(&component, None);
        self.components.remove(&component);
        info!(
            hub = %self.label(),
            component = %name,
            services = withdrawn,
            listeners,
            "Component unregistered."
        );
        Ok(self)
    }

    /// Looks up a plugged component by its resolved name.
    pub fn get_component(&self, name: &str) -> Option<ComponentRef> {
        self.components.find(name)
    }

    /// All plugged components, in registration order.
    pub fn get_components(&self) -> Vec<ComponentRef> {
        self.components.snapshot()
    }

    /// The resolved name of a plugged component, honoring `component_name` overrides.
    pub fn component_name(&self, component: &ComponentRef) -> Option<String> {
        self.components.name_of(component)
    }

    pub fn is_plugged(&self, component: &ComponentRef) -> bool {
        self.components.contains(component)
    }
}
