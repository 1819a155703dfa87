//! The service registry.
//!
//! Services are publications of a component under a [`Contract`],
//! independent of the component's name. Consumers look them up by contract
//! and property predicates, and service listeners hear about arrivals and
//! departures.
//!
//! A [`ServiceReference`] stays bound to its registration: once the service
//! is unregistered, every read through the reference fails. Unregistering a
//! registration twice fails as well.

use crate::common::{OrderedSlots, ServiceId, ServiceListenerId};
use crate::component::{same_component, validate_component, ComponentRef};
use crate::contract::{conforms_to, Contract};
use crate::error::{HubError, HubResult};
use crate::events::{ServiceEvent, ServiceEventKind};
use crate::hub::Hub;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Reserved property holding the registration id.
pub const SERVICE_ID: &str = "service.id";
/// Reserved property holding the contract name.
pub const SERVICE_CONTRACT: &str = "service.contract";
/// Reserved property holding the publisher's name.
pub const SERVICE_PUBLISHER: &str = "service.publisher";

struct RegistrationState {
    id: ServiceId,
    contract: Contract,
    publisher: ComponentRef,
    properties: Map<String, Value>,
    registered: AtomicBool,
}

impl RegistrationState {
    fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }

    fn ensure_registered(&self) -> HubResult<()> {
        if self.is_registered() {
            Ok(())
        } else {
            Err(HubError::StaleServiceReference(self.id))
        }
    }
}

/// The publisher-side handle of a service, returned by [`Hub::register_service`].
#[derive(Clone)]
pub struct ServiceRegistration {
    state: Arc<RegistrationState>,
}

impl ServiceRegistration {
    pub fn id(&self) -> ServiceId {
        self.state.id
    }

    pub fn contract(&self) -> &Contract {
        &self.state.contract
    }

    pub fn is_registered(&self) -> bool {
        self.state.is_registered()
    }

    pub fn properties(&self) -> &Map<String, Value> {
        &self.state.properties
    }

    pub fn reference(&self) -> ServiceReference {
        ServiceReference {
            state: self.state.clone(),
        }
    }

    fn is(&self, other: &ServiceRegistration) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl fmt::Debug for ServiceRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistration")
            .field("id", &self.state.id)
            .field("contract", &self.state.contract.name())
            .field("registered", &self.is_registered())
            .finish()
    }
}

/// The consumer-side view of a registration.
#[derive(Clone)]
pub struct ServiceReference {
    state: Arc<RegistrationState>,
}

impl ServiceReference {
    pub fn id(&self) -> ServiceId {
        self.state.id
    }

    pub fn contract(&self) -> &Contract {
        &self.state.contract
    }

    /// Whether the backing registration is still registered.
    pub fn is_valid(&self) -> bool {
        self.state.is_registered()
    }

    /// The service object. Fails once the service is unregistered.
    pub fn service(&self) -> HubResult<ComponentRef> {
        self.state.ensure_registered()?;
        Ok(self.state.publisher.clone())
    }

    pub fn properties(&self) -> HubResult<&Map<String, Value>> {
        self.state.ensure_registered()?;
        Ok(&self.state.properties)
    }

    pub fn property(&self, name: &str) -> HubResult<Option<&Value>> {
        Ok(self.properties()?.get(name))
    }

    /// Property lookup for predicates: a stale reference has no properties.
    pub fn property_str(&self, name: &str) -> Option<&str> {
        self.property(name).ok().flatten().and_then(Value::as_str)
    }

    pub fn is_same(&self, other: &ServiceReference) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl fmt::Debug for ServiceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceReference")
            .field("id", &self.state.id)
            .field("contract", &self.state.contract.name())
            .field("valid", &self.is_valid())
            .finish()
    }
}

/// Predicate over service references.
pub type ServiceFilter = Arc<dyn Fn(&ServiceReference) -> bool + Send + Sync>;

/// Receives service events.
pub type ServiceCallback = Arc<dyn Fn(&ServiceEvent) + Send + Sync>;

/// Listens for services arriving and departing.
///
/// Without a contract the listener hears about every service; with one, only
/// about services registered under an equal contract. The optional filter
/// narrows further.
#[derive(Clone)]
pub struct ServiceListener {
    contract: Option<Contract>,
    filter: Option<ServiceFilter>,
    callback: ServiceCallback,
}

impl ServiceListener {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&ServiceEvent) + Send + Sync + 'static,
    {
        Self {
            contract: None,
            filter: None,
            callback: Arc::new(callback),
        }
    }

    pub fn contract(mut self, contract: Contract) -> Self {
        self.contract = Some(contract);
        self
    }

    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&ServiceReference) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    fn matches(&self, reference: &ServiceReference) -> bool {
        let contract_ok = self
            .contract
            .as_ref()
            .map_or(true, |contract| contract == reference.contract());
        contract_ok && self.filter.as_ref().map_or(true, |accept| accept(reference))
    }
}

/// The hub's service state.
#[derive(Clone, Default)]
pub(crate) struct ServiceRegistry {
    registrations: Arc<RwLock<Vec<ServiceRegistration>>>,
    listeners: Arc<RwLock<OrderedSlots<ServiceListenerId, ServiceListener>>>,
    next_id: Arc<AtomicU64>,
}

impl ServiceRegistry {
    fn next_id(&self) -> ServiceId {
        ServiceId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn live(&self) -> Vec<ServiceRegistration> {
        self.registrations.read().clone()
    }

    fn take(&self, registration: &ServiceRegistration) -> Option<ServiceRegistration> {
        let mut registrations = self.registrations.write();
        let index = registrations
            .iter()
            .position(|live| live.is(registration))?;
        Some(registrations.remove(index))
    }

    fn notify(&self, kind: ServiceEventKind, registration: &ServiceRegistration) {
        let listeners: Vec<ServiceListener> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        let event = ServiceEvent {
            kind,
            reference: registration.reference(),
        };
        for listener in listeners.iter().filter(|l| l.matches(&event.reference)) {
            (listener.callback)(&event);
        }
    }

    fn withdraw(&self, registration: &ServiceRegistration) -> HubResult<()> {
        let Some(registration) = self.take(registration) else {
            return Err(HubError::UnknownServiceRegistration(registration.id()));
        };
        self.notify(ServiceEventKind::Unregistering, &registration);
        registration.state.registered.store(false, Ordering::SeqCst);
        debug!(id = %registration.id(), contract = registration.contract().name(), "Service unregistered.");
        Ok(())
    }

    /// Unregisters every live service published by `component`, in registration order.
    pub(crate) fn unregister_all_from(&self, component: &ComponentRef) -> usize {
        self.live()
            .iter()
            .filter(|registration| same_component(&registration.state.publisher, component))
            .filter(|registration| self.withdraw(registration).is_ok())
            .count()
    }

    /// Drops every registration and listener without notifications.
    pub(crate) fn clear(&self) {
        let registrations = std::mem::take(&mut *self.registrations.write());
        for registration in registrations {
            registration.state.registered.store(false, Ordering::SeqCst);
        }
        self.listeners.write().clear();
    }
}

// Service registry API.
impl Hub {
    /// Registers `component` as a service under `contract`.
    pub fn register_service(
        &self,
        contract: &Contract,
        component: &ComponentRef,
    ) -> HubResult<ServiceRegistration> {
        self.register_service_with(contract, component, Map::new())
    }

    /// Registers `component` as a service under `contract` with properties.
    ///
    /// The reserved `service.*` keys override caller-supplied values.
    /// Matching service listeners are notified before this returns.
    pub fn register_service_with(
        &self,
        contract: &Contract,
        component: &ComponentRef,
        properties: Map<String, Value>,
    ) -> HubResult<ServiceRegistration> {
        if contract.name().is_empty() {
            return Err(HubError::InvalidServiceRegistration(
                "the contract has no name".to_string(),
            ));
        }
        validate_component(component)
            .map_err(|err| HubError::InvalidServiceRegistration(err.to_string()))?;
        if self.config().verify_service_contracts {
            let report = conforms_to(&**component, contract);
            if !report.is_conformant() {
                return Err(HubError::InvalidServiceRegistration(report.to_string()));
            }
        }

        let id = self.services.next_id();
        let publisher = self
            .component_name(component)
            .unwrap_or_else(|| component.name());
        let mut properties = properties;
        properties.insert(SERVICE_ID.to_string(), Value::from(id.0));
        properties.insert(SERVICE_CONTRACT.to_string(), Value::from(contract.name()));
        properties.insert(SERVICE_PUBLISHER.to_string(), Value::from(publisher.as_str()));

        let registration = ServiceRegistration {
            state: Arc::new(RegistrationState {
                id,
                contract: contract.clone(),
                publisher: component.clone(),
                properties,
                registered: AtomicBool::new(true),
            }),
        };
        self.services
            .registrations
            .write()
            .push(registration.clone());
        debug!(%id, contract = contract.name(), %publisher, "Service registered.");

        self.services
            .notify(ServiceEventKind::Registered, &registration);
        Ok(registration)
    }

    /// Unregisters a service.
    ///
    /// Fails with `UnknownServiceRegistration` when the registration is not
    /// live, including a second call for the same registration. Listeners
    /// are told about the departure while the reference is still readable.
    pub fn unregister_service(&self, registration: &ServiceRegistration) -> HubResult<()> {
        self.services.withdraw(registration)
    }

    /// Live references, optionally restricted to a contract, in registration order.
    pub fn get_service_references(&self, contract: Option<&Contract>) -> Vec<ServiceReference> {
        self.get_service_references_matching(contract, |_| true)
    }

    /// Live references restricted to a contract and accepted by `filter`.
    pub fn get_service_references_matching<F>(
        &self,
        contract: Option<&Contract>,
        filter: F,
    ) -> Vec<ServiceReference>
    where
        F: Fn(&ServiceReference) -> bool,
    {
        self.services
            .live()
            .iter()
            .filter(|registration| contract.map_or(true, |c| c == registration.contract()))
            .map(ServiceRegistration::reference)
            .filter(|reference| filter(reference))
            .collect()
    }

    /// The first live reference registered under `contract`.
    pub fn get_service_reference(&self, contract: &Contract) -> Option<ServiceReference> {
        self.get_service_references(Some(contract)).into_iter().next()
    }

    /// The service object behind the first reference registered under `contract`.
    pub fn get_service(&self, contract: &Contract) -> Option<ComponentRef> {
        self.get_service_reference(contract)?.service().ok()
    }

    /// The service objects behind every reference registered under `contract`.
    pub fn get_services(&self, contract: &Contract) -> Vec<ComponentRef> {
        self.get_service_references(Some(contract))
            .iter()
            .filter_map(|reference| reference.service().ok())
            .collect()
    }

    pub fn register_service_listener(&self, listener: ServiceListener) -> ServiceListenerId {
        let id = self.services.listeners.write().insert(listener);
        debug!(?id, "Service listener registered.");
        id
    }

    /// Returns `false` when the listener was not registered.
    pub fn unregister_service_listener(&self, id: ServiceListenerId) -> bool {
        self.services.listeners.write().remove(id).is_some()
    }
}
