//! Authorization predicates
//!
//! Each pipeline declares the requirements it needs as a slice of
//! [`Requirement`]s. [`authorize`] evaluates them in order and stops at the
//! first one that fails, so a role check listed before an ownership check is
//! always reported first.

use crate::identity::{Identity, Role};
use std::fmt;

/// A single authorization predicate
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Requirement<'a> {
    /// Any verified identity
    Authenticated,
    /// Exact role match
    Role(Role),
    /// The identity must be the given owner (`uploaded_by`)
    Owner(&'a str),
}

/// Why a request was refused
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DenyReason {
    Unauthenticated,
    RoleRequired(Role),
    NotOwner,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "authentication required"),
            Self::RoleRequired(role) => write!(f, "role '{}' required", role),
            Self::NotOwner => write!(f, "caller is not the owner"),
        }
    }
}

/// Outcome of evaluating a requirement chain
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Convert into a `Result`, mapping a deny to its reason
    pub fn into_result(self) -> Result<(), DenyReason> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny(reason) => Err(reason),
        }
    }
}

fn check(identity: &Identity, requirement: &Requirement<'_>) -> Decision {
    match requirement {
        Requirement::Authenticated => Decision::Allow,
        Requirement::Role(role) if identity.role == *role => Decision::Allow,
        Requirement::Role(role) => Decision::Deny(DenyReason::RoleRequired(*role)),
        Requirement::Owner(owner) if identity.user_id == *owner => Decision::Allow,
        Requirement::Owner(_) => Decision::Deny(DenyReason::NotOwner),
    }
}

/// Evaluate `requirements` in order against an optional identity
pub fn authorize(identity: Option<&Identity>, requirements: &[Requirement<'_>]) -> Decision {
    let Some(identity) = identity else {
        return Decision::Deny(DenyReason::Unauthenticated);
    };

    requirements
        .iter()
        .map(|r| check(identity, r))
        .find(|d| !d.is_allowed())
        .unwrap_or(Decision::Allow)
}
