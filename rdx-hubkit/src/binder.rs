//! One-shot wiring of two components.
//!
//! A [`Binding`] names a source component, a destination component and where
//! the source goes on the destination. An optional contract is enforced on
//! the source and, unless disabled, the destination receives a proxy that
//! exposes only the contract's members.

use crate::component::{ComponentRef, ComponentSelector};
use crate::contract::{conforms_to, Contract};
use crate::error::{HubError, HubResult};
use crate::hub::Hub;
use crate::members::{Arg, Handle, Member};
use crate::proxy::ContractProxy;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A closure injecting the handle into the destination.
pub type InjectFn = Arc<dyn Fn(&ComponentRef, Handle) + Send + Sync>;

/// Where the source lands on the destination.
#[derive(Clone)]
pub enum Injection {
    /// Called with the destination and the handle.
    Function(InjectFn),
    /// A member of the destination's member table: assigned when absent or
    /// holding data, called with the handle when it is a function.
    Member(String),
}

impl Injection {
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&ComponentRef, Handle) + Send + Sync + 'static,
    {
        Injection::Function(Arc::new(f))
    }

    fn is_blank(&self) -> bool {
        matches!(self, Injection::Member(member) if member.is_empty())
    }
}

impl From<&str> for Injection {
    fn from(member: &str) -> Self {
        Injection::Member(member.to_string())
    }
}

impl From<String> for Injection {
    fn from(member: String) -> Self {
        Injection::Member(member)
    }
}

impl fmt::Debug for Injection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Injection::Function(_) => f.write_str("Function(..)"),
            Injection::Member(member) => f.debug_tuple("Member").field(member).finish(),
        }
    }
}

/// Describes a binding. Consumed by [`Hub::bind`].
///
/// ```
/// use hubkit::binder::Binding;
/// use hubkit::contract::Contract;
///
/// let binding = Binding::new()
///     .component("backend")
///     .to("frontend")
///     .into_member("backend")
///     .contract(Contract::new("UserService").method("login"));
/// # let _ = binding;
/// ```
#[derive(Clone, Debug, Default)]
pub struct Binding {
    component: Option<ComponentSelector>,
    to: Option<ComponentSelector>,
    into: Option<Injection>,
    contract: Option<Contract>,
    proxy: Option<bool>,
}

impl Binding {
    pub fn new() -> Self {
        Self::default()
    }

    /// The component being injected.
    pub fn component(mut self, component: impl Into<ComponentSelector>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// The component receiving the injection.
    pub fn to(mut self, to: impl Into<ComponentSelector>) -> Self {
        self.to = Some(to.into());
        self
    }

    /// Injects into a named member of the destination.
    pub fn into_member(mut self, member: impl Into<String>) -> Self {
        self.into = Some(Injection::Member(member.into()));
        self
    }

    /// Injects by calling `f` with the destination and the handle.
    pub fn into_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&ComponentRef, Handle) + Send + Sync + 'static,
    {
        self.into = Some(Injection::function(f));
        self
    }

    pub fn injection(mut self, injection: Injection) -> Self {
        self.into = Some(injection);
        self
    }

    pub fn contract(mut self, contract: Contract) -> Self {
        self.contract = Some(contract);
        self
    }

    /// Whether a contract binding injects a proxy. Defaults to `true`.
    pub fn proxy(mut self, proxy: bool) -> Self {
        self.proxy = Some(proxy);
        self
    }
}

impl Hub {
    /// Performs a binding.
    ///
    /// Every check happens before the injection, so a failed binding leaves
    /// the destination untouched.
    pub fn bind(&self, binding: Binding) -> HubResult<&Self> {
        let Binding {
            component,
            to,
            into,
            contract,
            proxy,
        } = binding;

        let component = component
            .filter(|selector| !selector.is_blank())
            .ok_or(HubError::MissingBindingField("component"))?;
        let to = to
            .filter(|selector| !selector.is_blank())
            .ok_or(HubError::MissingBindingField("to"))?;
        let into = into
            .filter(|injection| !injection.is_blank())
            .ok_or(HubError::MissingBindingField("into"))?;

        let source = self
            .components
            .resolve(&component, HubError::UnknownSourceComponent)?;

        let handle = match contract {
            Some(contract) => {
                let report = conforms_to(&*source, &contract);
                if !report.is_conformant() {
                    return Err(HubError::ContractViolation(report));
                }
                if proxy.unwrap_or(true) {
                    Handle::Proxy(Arc::new(ContractProxy::new(contract, source.clone())))
                } else {
                    Handle::Component(source.clone())
                }
            }
            None => Handle::Component(source.clone()),
        };

        let destination = self
            .components
            .resolve(&to, HubError::UnknownDestinationComponent)?;

        inject(&destination, into, handle)?;
        debug!(
            from = %component.label(),
            to = %to.label(),
            "Components bound."
        );
        Ok(self)
    }
}

fn inject(destination: &ComponentRef, into: Injection, handle: Handle) -> HubResult<()> {
    let member = match into {
        Injection::Function(f) => {
            f(destination, handle);
            return Ok(());
        }
        Injection::Member(member) => member,
    };

    let Some(members) = destination.members() else {
        return Err(HubError::UnsupportedInjectionTarget {
            component: destination.name(),
            member,
            reason: "the destination exposes no members",
        });
    };
    match members.get(&member) {
        Some(Member::Method(method)) => {
            method(&[Arg::Handle(handle)]);
        }
        Some(Member::Field(_)) | Some(Member::Reference(_)) | None => {
            members.set_reference(member, handle)
        }
    }
    Ok(())
}
