//! Error types for the hub.
//!
//! Every variant is a programmer error raised synchronously to the caller of
//! a command (registration, binding, service calls). Queries never fail for
//! "not found" and event delivery reports a plain `bool`.

use crate::common::ServiceId;
use crate::contract::Conformance;
use thiserror::Error;

/// Hub errors
#[derive(Debug, Error)]
pub enum HubError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{name:?} is not a valid component: {reason}")]
    InvalidComponent { name: String, reason: String },

    #[error("component {0:?} is not plugged to the hub")]
    UnknownComponent(String),

    #[error("cannot bind components: source {0:?} is not plugged to the hub")]
    UnknownSourceComponent(String),

    #[error("cannot bind components: destination {0:?} is not plugged to the hub")]
    UnknownDestinationComponent(String),

    #[error("cannot bind components: '{0}' must be defined")]
    MissingBindingField(&'static str),

    #[error("cannot bind components: {0}")]
    ContractViolation(Conformance),

    #[error("cannot inject into {member:?} of {component:?}: {reason}")]
    UnsupportedInjectionTarget {
        component: String,
        member: String,
        reason: &'static str,
    },

    #[error("invalid service registration: {0}")]
    InvalidServiceRegistration(String),

    #[error("unknown service registration {0}")]
    UnknownServiceRegistration(ServiceId),

    #[error("service reference {0} is no longer valid")]
    StaleServiceReference(ServiceId),

    #[error("invalid topic pattern: {0}")]
    InvalidTopicPattern(#[from] regex::Error),

    #[error("{target} has no callable member {member:?}")]
    NoSuchMember { target: String, member: String },

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl HubError {
    pub fn invalid_component(name: impl Into<String>, reason: impl Into<String>) -> Self {
        HubError::InvalidComponent {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn no_such_member(target: impl Into<String>, member: impl Into<String>) -> Self {
        HubError::NoSuchMember {
            target: target.into(),
            member: member.into(),
        }
    }
}

/// Result type for hub operations
pub type HubResult<T> = Result<T, HubError>;
