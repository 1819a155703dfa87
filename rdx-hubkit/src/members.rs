//! The reflective member table components expose for bindings, contracts and
//! services.
//!
//! Lifecycle members come from the [`Component`](crate::component::Component)
//! trait. Everything else a component wants to make reachable by name
//! (business methods, setters, injected references, plain data) lives in a
//! [`Members`] table.

use crate::component::{invoke_with, ComponentRef};
use crate::contract::{Inspect, MemberKind};
use crate::error::HubResult;
use crate::proxy::ContractProxy;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// An argument passed to a method member: plain data or an injected component.
#[derive(Debug, Clone)]
pub enum Arg {
    Value(Value),
    Handle(Handle),
}

impl Arg {
    pub fn value(&self) -> Option<&Value> {
        match self {
            Arg::Value(value) => Some(value),
            Arg::Handle(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.value().and_then(Value::as_str)
    }

    pub fn handle(&self) -> Option<&Handle> {
        match self {
            Arg::Value(_) => None,
            Arg::Handle(handle) => Some(handle),
        }
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Arg::Value(value)
    }
}

impl From<Handle> for Arg {
    fn from(handle: Handle) -> Self {
        Arg::Handle(handle)
    }
}

/// Wraps data arguments for a method call.
pub(crate) fn data_args(args: &[Value]) -> Vec<Arg> {
    args.iter().cloned().map(Arg::Value).collect()
}

/// A callable member.
///
/// The binder calls function members with the injected handle as the only
/// argument, so any method can act as a setter.
pub type MethodFn = Arc<dyn Fn(&[Arg]) -> Value + Send + Sync>;

/// One named member of a [`Members`] table.
#[derive(Clone)]
pub enum Member {
    Method(MethodFn),
    Field(Value),
    Reference(Handle),
}

impl Member {
    pub fn kind(&self) -> MemberKind {
        match self {
            Member::Method(_) => MemberKind::Function,
            Member::Field(_) | Member::Reference(_) => MemberKind::Data,
        }
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Method(_) => f.write_str("Method(..)"),
            Member::Field(value) => f.debug_tuple("Field").field(value).finish(),
            Member::Reference(handle) => f.debug_tuple("Reference").field(handle).finish(),
        }
    }
}

/// A component's named members.
///
/// Lookups clone the member out of the table before running it, so a method
/// may freely read or write the table it lives in.
#[derive(Default)]
pub struct Members {
    table: RwLock<BTreeMap<String, Member>>,
}

impl Members {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method(
        mut self,
        name: impl Into<String>,
        method: impl Fn(&[Arg]) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.table
            .get_mut()
            .insert(name.into(), Member::Method(Arc::new(method)));
        self
    }

    /// Adds a method that receives the first handle among its arguments.
    ///
    /// Called without a handle it does nothing. Returns `null` either way.
    pub fn with_setter(
        self,
        name: impl Into<String>,
        setter: impl Fn(Handle) + Send + Sync + 'static,
    ) -> Self {
        self.with_method(name, move |args| {
            if let Some(handle) = args.iter().find_map(Arg::handle) {
                setter(handle.clone());
            }
            Value::Null
        })
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.table
            .get_mut()
            .insert(name.into(), Member::Field(value.into()));
        self
    }

    pub fn get(&self, name: &str) -> Option<Member> {
        self.table.read().get(name).cloned()
    }

    pub fn kind(&self, name: &str) -> Option<MemberKind> {
        self.table.read().get(name).map(Member::kind)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.read().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.table.read().keys().cloned().collect()
    }

    /// Runs the method called `name`. `None` when there is no such method.
    pub fn call(&self, name: &str, args: &[Arg]) -> Option<Value> {
        match self.get(name)? {
            Member::Method(method) => Some(method(args)),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<Value> {
        match self.get(name)? {
            Member::Field(value) => Some(value),
            _ => None,
        }
    }

    pub fn reference(&self, name: &str) -> Option<Handle> {
        match self.get(name)? {
            Member::Reference(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn set_field(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.table
            .write()
            .insert(name.into(), Member::Field(value.into()));
    }

    pub fn set_reference(&self, name: impl Into<String>, handle: Handle) {
        self.table
            .write()
            .insert(name.into(), Member::Reference(handle));
    }

    pub fn remove(&self, name: &str) -> Option<Member> {
        self.table.write().remove(name)
    }
}

impl fmt::Debug for Members {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.table.read().iter()).finish()
    }
}

/// What the binder injects: the component itself or a contract-shaped proxy.
#[derive(Clone)]
pub enum Handle {
    Component(ComponentRef),
    Proxy(Arc<ContractProxy>),
}

impl Handle {
    /// Invokes a function member through the handle with data arguments.
    pub fn call(&self, method: &str, args: &[Value]) -> HubResult<Value> {
        self.call_with(method, &data_args(args))
    }

    /// Invokes a function member through the handle.
    pub fn call_with(&self, method: &str, args: &[Arg]) -> HubResult<Value> {
        match self {
            Handle::Component(component) => invoke_with(component, method, args),
            Handle::Proxy(proxy) => proxy.call_with(method, args),
        }
    }

    /// Reads a data member through the handle.
    pub fn field(&self, name: &str) -> Option<Value> {
        match self {
            Handle::Component(component) => component.members()?.field(name),
            Handle::Proxy(proxy) => proxy.field(name),
        }
    }

    pub fn as_component(&self) -> Option<&ComponentRef> {
        match self {
            Handle::Component(component) => Some(component),
            Handle::Proxy(_) => None,
        }
    }

    pub fn as_proxy(&self) -> Option<&ContractProxy> {
        match self {
            Handle::Component(_) => None,
            Handle::Proxy(proxy) => Some(proxy.as_ref()),
        }
    }

    pub fn is_proxy(&self) -> bool {
        matches!(self, Handle::Proxy(_))
    }

    /// The component behind the handle.
    pub fn target(&self) -> &ComponentRef {
        match self {
            Handle::Component(component) => component,
            Handle::Proxy(proxy) => proxy.target(),
        }
    }
}

impl From<ComponentRef> for Handle {
    fn from(component: ComponentRef) -> Self {
        Handle::Component(component)
    }
}

impl Inspect for Handle {
    fn describe(&self) -> String {
        match self {
            Handle::Component(component) => component.describe(),
            Handle::Proxy(proxy) => proxy.describe(),
        }
    }

    fn member_kind(&self, name: &str) -> Option<MemberKind> {
        match self {
            Handle::Component(component) => component.member_kind(name),
            Handle::Proxy(proxy) => proxy.member_kind(name),
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handle::Component(component) => write!(f, "Handle::Component({})", component.name()),
            Handle::Proxy(proxy) => write!(f, "Handle::Proxy({})", proxy.describe()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_members_report_their_kind() {
        let members = Members::new()
            .with_method("hello", |_| json!("hello"))
            .with_setter("greeter", |_| {})
            .with_field("language", "fr");

        assert_eq!(members.kind("hello"), Some(MemberKind::Function));
        assert_eq!(members.kind("greeter"), Some(MemberKind::Function));
        assert_eq!(members.kind("language"), Some(MemberKind::Data));
        assert_eq!(members.kind("missing"), None);
        assert_eq!(members.names(), vec!["greeter", "hello", "language"]);
    }

    #[test]
    fn call_runs_methods_only() {
        let members = Members::new()
            .with_method("sum", |args| {
                json!(args
                    .iter()
                    .filter_map(|arg| arg.value().and_then(Value::as_i64))
                    .sum::<i64>())
            })
            .with_field("language", "fr");

        assert_eq!(members.call("sum", &data_args(&[json!(2), json!(3)])), Some(json!(5)));
        assert_eq!(members.call("language", &[]), None);
        assert_eq!(members.field("language"), Some(json!("fr")));
    }

    #[test]
    fn setters_pick_the_handle_among_their_arguments() {
        let seen = Arc::new(RwLock::new(Vec::new()));
        let sink = seen.clone();
        let members = Members::new().with_setter("attach", move |handle: Handle| {
            sink.write().push(handle.is_proxy());
        });

        assert_eq!(members.call("attach", &data_args(&[json!(1)])), Some(Value::Null));
        assert!(seen.read().is_empty());
    }

    #[test]
    fn set_field_overwrites_existing_member() {
        let members = Members::new().with_method("x", |_| Value::Null);
        members.set_field("x", 3);
        assert_eq!(members.kind("x"), Some(MemberKind::Data));
        assert_eq!(members.field("x"), Some(json!(3)));
    }
}
