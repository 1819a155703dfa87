//! Structural contracts and the conformance checker.
//!
//! A [`Contract`] is a named capability set: a set of members, each either a
//! function or a data member. Nothing ever declares which contracts it
//! implements; an object conforms when it exposes every member of the
//! contract with the matching category.

use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// The basic category of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Function,
    Data,
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberKind::Function => f.write_str("function"),
            MemberKind::Data => f.write_str("data"),
        }
    }
}

/// The member names every component answers to through its lifecycle.
pub const LIFECYCLE_MEMBERS: [&str; 4] = ["name", "configure", "start", "stop"];

/// A named capability set.
///
/// Contracts compare by value: two contracts with the same name and the same
/// members are the same contract for service lookups, whatever order the
/// members were declared in. Members iterate sorted by name.
///
/// ```
/// use hubkit::contract::{Contract, MemberKind};
///
/// let greeter = Contract::new("Greeter").method("hello").field("language");
/// assert_eq!(greeter.kind_of("hello"), Some(MemberKind::Function));
/// assert_eq!(greeter.kind_of("language"), Some(MemberKind::Data));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Contract {
    name: String,
    members: BTreeMap<String, MemberKind>,
}

impl Contract {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: BTreeMap::new(),
        }
    }

    /// The synthetic reference contract every component must satisfy.
    pub fn component() -> Self {
        LIFECYCLE_MEMBERS
            .iter()
            .fold(Contract::new("Component"), |contract, member| contract.method(*member))
    }

    /// Adds a function member.
    pub fn method(self, name: impl Into<String>) -> Self {
        self.member(name, MemberKind::Function)
    }

    /// Adds a data member.
    pub fn field(self, name: impl Into<String>) -> Self {
        self.member(name, MemberKind::Data)
    }

    /// Adds a member, replacing the category of an existing one with the same name.
    pub fn member(mut self, name: impl Into<String>, kind: MemberKind) -> Self {
        self.members.insert(name.into(), kind);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> impl Iterator<Item = (&str, MemberKind)> + '_ {
        self.members.iter().map(|(name, kind)| (name.as_str(), *kind))
    }

    pub fn kind_of(&self, member: &str) -> Option<MemberKind> {
        self.members.get(member).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Anything whose members can be looked up by name.
pub trait Inspect {
    /// A short human-readable label used in reports and logs.
    fn describe(&self) -> String;

    /// The category of the member called `name`, or `None` when absent.
    fn member_kind(&self, name: &str) -> Option<MemberKind>;
}

/// One reason an object does not conform to a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    Missing {
        member: String,
    },
    KindMismatch {
        member: String,
        expected: MemberKind,
        found: MemberKind,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Missing { member } => write!(f, "member {member:?} missing"),
            Violation::KindMismatch {
                member,
                expected,
                found,
            } => write!(
                f,
                "member {member:?} has a type mismatch: {expected} != {found}"
            ),
        }
    }
}

/// The itemized result of a conformance check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conformance {
    object: String,
    contract: String,
    violations: Vec<Violation>,
}

impl Conformance {
    pub fn is_conformant(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    pub fn contract(&self) -> &str {
        &self.contract
    }
}

impl fmt::Display for Conformance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_conformant() {
            return write!(f, "{} conforms to {}", self.object, self.contract);
        }
        write!(f, "{} does not conform to {}: ", self.object, self.contract)?;
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

/// Checks `object` against every member of `contract`.
///
/// Never fails: the caller decides whether non-conformance is fatal.
pub fn conforms_to<T: Inspect + ?Sized>(object: &T, contract: &Contract) -> Conformance {
    let violations: Vec<Violation> = contract
        .members()
        .filter_map(|(member, expected)| match object.member_kind(member) {
            None => Some(Violation::Missing {
                member: member.to_string(),
            }),
            Some(found) if found != expected => Some(Violation::KindMismatch {
                member: member.to_string(),
                expected,
                found,
            }),
            Some(_) => None,
        })
        .collect();

    let object = object.describe();
    for violation in &violations {
        warn!(%object, contract = contract.name(), "object not conform to contract - {violation}");
    }

    Conformance {
        object,
        contract: contract.name().to_string(),
        violations,
    }
}
