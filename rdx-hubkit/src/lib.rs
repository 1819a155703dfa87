//! # Hubkit
//!
//! An in-process component hub for Rust.
//!
//! Hubkit plugs *components* (objects implementing a four-method lifecycle)
//! into a central [`Hub`](hub::Hub), wires them together through direct
//! bindings or a publish/subscribe event bus, and keeps a registry of
//! *services* looked up by contract.
//!
//! ## Core Concepts
//!
//! - **Component**: anything implementing [`Component`](component::Component):
//!   `name`, `configure`, `start`, `stop`, plus an optional table of named
//!   [`Members`](members::Members).
//! - **Contract**: a named capability set checked structurally against a
//!   component's members. Bindings can enforce one and inject a proxy that
//!   exposes only its members.
//! - **Event bus**: synchronous fan-out to every matching listener except the
//!   sender, with regex topics layered on top.
//! - **Services**: publications under a contract with properties, predicate
//!   lookups and arrival/departure listeners.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use hubkit::prelude::*;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! struct Greeter {
//!     members: Members,
//! }
//!
//! impl Component for Greeter {
//!     fn name(&self) -> String {
//!         "greeter".to_string()
//!     }
//!     fn configure(&self, _hub: &Hub, _config: &ComponentConfig) {}
//!     fn start(&self) {}
//!     fn stop(&self) {}
//!     fn members(&self) -> Option<&Members> {
//!         Some(&self.members)
//!     }
//! }
//!
//! fn main() -> Result<(), HubError> {
//!     let hub = Hub::new();
//!     let greeter: ComponentRef = Arc::new(Greeter {
//!         members: Members::new().with_method("hello", |_| json!("hello")),
//!     });
//!
//!     hub.register_component(greeter.clone())?.start();
//!
//!     let contract = Contract::new("Greeting").method("hello");
//!     hub.register_service(&contract, &greeter)?;
//!
//!     if let Some(service) = hub.get_service(&contract) {
//!         println!("{}", invoke(&service, "hello", &[])?);
//!     }
//!
//!     hub.reset();
//!     Ok(())
//! }
//! ```

pub const HUB_NAME: &str = "Hubkit";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Declare all the modules in the crate.
pub mod binder;
pub mod bus;
pub mod common;
pub mod component;
pub mod config;
pub mod contract;
pub mod error;
pub mod events;
pub mod hub;
pub mod members;
pub mod proxy;
pub mod service;

/// A prelude module for easy importing of the most common Hubkit types.
pub mod prelude {
    pub use crate::binder::{Binding, Injection};
    pub use crate::bus::{callback, matcher, Callback, ListenerConfig, MatchFn};
    pub use crate::common::{ListenerId, ServiceId, ServiceListenerId};
    pub use crate::component::{invoke, invoke_with, same_component, Component, ComponentRef, ComponentSelector};
    pub use crate::config::{ComponentConfig, HubConfig};
    pub use crate::contract::{conforms_to, Conformance, Contract, Inspect, MemberKind, Violation};
    pub use crate::error::{HubError, HubResult};
    pub use crate::events::{Event, ServiceEvent, ServiceEventKind};
    pub use crate::hub::Hub;
    pub use crate::members::{Arg, Handle, Member, Members};
    pub use crate::proxy::ContractProxy;
    pub use crate::service::{
        ServiceListener, ServiceReference, ServiceRegistration, SERVICE_CONTRACT, SERVICE_ID,
        SERVICE_PUBLISHER,
    };
}
