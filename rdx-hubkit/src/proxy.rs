//! Contract-shaped forwarding proxies.

use crate::component::{invoke_with, ComponentRef};
use crate::contract::{Contract, Inspect, MemberKind};
use crate::error::{HubError, HubResult};
use crate::members::{data_args, Arg, Handle, Member};
use serde_json::Value;
use std::collections::BTreeMap;

/// Exposes exactly the members of one contract, backed by a component.
///
/// Function members forward to the original component, so calls behave as
/// if made on the component itself. Data members are captured when the proxy
/// is built.
pub struct ContractProxy {
    contract: Contract,
    target: ComponentRef,
    captured: BTreeMap<String, Member>,
}

impl ContractProxy {
    /// Builds a proxy for `contract` in front of `target`.
    ///
    /// The caller is expected to have checked conformance; data members the
    /// target does not expose are simply left uncaptured.
    pub fn new(contract: Contract, target: ComponentRef) -> Self {
        let captured = match target.members() {
            Some(members) => contract
                .members()
                .filter(|(_, kind)| *kind == MemberKind::Data)
                .filter_map(|(name, _)| members.get(name).map(|member| (name.to_string(), member)))
                .collect(),
            None => BTreeMap::new(),
        };
        Self {
            contract,
            target,
            captured,
        }
    }

    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    /// The proxied component. Exposed for introspection; callers should go
    /// through the contract members instead.
    #[doc(hidden)]
    pub fn target(&self) -> &ComponentRef {
        &self.target
    }

    pub fn call(&self, method: &str, args: &[Value]) -> HubResult<Value> {
        self.call_with(method, &data_args(args))
    }

    /// Forwards a call to the target when `method` is a function member of the contract.
    pub fn call_with(&self, method: &str, args: &[Arg]) -> HubResult<Value> {
        match self.contract.kind_of(method) {
            Some(MemberKind::Function) => invoke_with(&self.target, method, args),
            _ => Err(HubError::no_such_member(self.describe(), method)),
        }
    }

    pub fn field(&self, name: &str) -> Option<Value> {
        match self.captured.get(name)? {
            Member::Field(value) => Some(value.clone()),
            _ => None,
        }
    }

    pub fn reference(&self, name: &str) -> Option<Handle> {
        match self.captured.get(name)? {
            Member::Reference(handle) => Some(handle.clone()),
            _ => None,
        }
    }
}

impl Inspect for ContractProxy {
    fn describe(&self) -> String {
        format!("{} proxy of {}", self.contract.name(), self.target.name())
    }

    fn member_kind(&self, name: &str) -> Option<MemberKind> {
        self.contract.kind_of(name)
    }
}
