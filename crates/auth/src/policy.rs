//! Route-level authorization policy.
//!
//! Rules are plain data: a table of `(method, route) -> requirement` evaluated
//! against the identity the authentication filter established (if any).
//!
//! - No IO
//! - No panics
//! - Unknown routes require an identity (deny by default)

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use warden_core::UserId;

use crate::{Identity, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    /// No identity on a route that needs one (HTTP 401).
    #[error("authentication required")]
    Unauthenticated,

    /// Identity present but the role/ownership check failed (HTTP 403).
    #[error("forbidden: {0}")]
    Forbidden(String),
}

/// What a route demands from the caller.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum Requirement {
    Public,
    Authenticated,
    Role(Role),
}

/// One row of the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    pub method: &'static str,
    pub route: &'static str,
    pub requirement: Requirement,
}

impl RouteRule {
    pub const fn new(method: &'static str, route: &'static str, requirement: Requirement) -> Self {
        Self {
            method,
            route,
            requirement,
        }
    }
}

/// Static route table plus the fallback requirement for unlisted routes.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    rules: HashMap<(String, String), Requirement>,
    fallback: Requirement,
}

impl RoutePolicy {
    pub fn new(rules: impl IntoIterator<Item = RouteRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|r| ((r.method.to_ascii_uppercase(), r.route.to_string()), r.requirement))
            .collect();

        Self {
            rules,
            fallback: Requirement::Authenticated,
        }
    }

    /// Requirement for a matched route template (e.g. `/admin/delete/:id`).
    pub fn requirement_for(&self, method: &str, route: &str) -> Requirement {
        self.rules
            .get(&(method.to_ascii_uppercase(), route.to_string()))
            .copied()
            .unwrap_or(self.fallback)
    }

    pub fn check(&self, method: &str, route: &str, identity: Option<&Identity>) -> Result<(), AuthzError> {
        authorize(identity, self.requirement_for(method, route))
    }
}

/// Evaluate a single requirement.
pub fn authorize(identity: Option<&Identity>, requirement: Requirement) -> Result<(), AuthzError> {
    match (requirement, identity) {
        (Requirement::Public, _) => Ok(()),
        (_, None) => Err(AuthzError::Unauthenticated),
        (Requirement::Authenticated, Some(_)) => Ok(()),
        (Requirement::Role(required), Some(identity)) if identity.role() == required => Ok(()),
        (Requirement::Role(required), Some(_)) => {
            Err(AuthzError::Forbidden(format!("requires {required}")))
        }
    }
}

/// Ownership rule: the actor must own the target record, unless the actor is an admin.
pub fn authorize_owner(identity: &Identity, owner: UserId) -> Result<(), AuthzError> {
    if identity.user_id() == owner || identity.is_admin() {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(format!(
            "user {} does not own resource of user {owner}",
            identity.user_id()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RoutePolicy {
        RoutePolicy::new([
            RouteRule::new("POST", "/login", Requirement::Public),
            RouteRule::new("GET", "/profile", Requirement::Authenticated),
            RouteRule::new("GET", "/admin/all-users", Requirement::Role(Role::Admin)),
            RouteRule::new("PATCH", "/admin/promote", Requirement::Role(Role::User)),
        ])
    }

    fn user() -> Identity {
        Identity::new(UserId::new(1), "john", Role::User)
    }

    fn admin() -> Identity {
        Identity::new(UserId::new(2), "root", Role::Admin)
    }

    #[test]
    fn public_routes_admit_anonymous_callers() {
        assert!(policy().check("POST", "/login", None).is_ok());
    }

    #[test]
    fn protected_routes_reject_anonymous_with_unauthenticated() {
        assert_eq!(
            policy().check("GET", "/profile", None),
            Err(AuthzError::Unauthenticated)
        );
        assert_eq!(
            policy().check("GET", "/admin/all-users", None),
            Err(AuthzError::Unauthenticated)
        );
    }

    #[test]
    fn role_mismatch_is_forbidden() {
        assert!(matches!(
            policy().check("GET", "/admin/all-users", Some(&user())),
            Err(AuthzError::Forbidden(_))
        ));
        assert!(policy().check("GET", "/admin/all-users", Some(&admin())).is_ok());

        // Promotion is for regular users only.
        assert!(policy().check("PATCH", "/admin/promote", Some(&user())).is_ok());
        assert!(matches!(
            policy().check("PATCH", "/admin/promote", Some(&admin())),
            Err(AuthzError::Forbidden(_))
        ));
    }

    #[test]
    fn unknown_routes_require_an_identity() {
        assert_eq!(
            policy().requirement_for("GET", "/nowhere"),
            Requirement::Authenticated
        );
        assert_eq!(
            policy().check("GET", "/nowhere", None),
            Err(AuthzError::Unauthenticated)
        );
    }

    #[test]
    fn method_matching_is_case_insensitive() {
        assert_eq!(policy().requirement_for("post", "/login"), Requirement::Public);
    }

    #[test]
    fn owners_and_admins_pass_the_ownership_rule() {
        assert!(authorize_owner(&user(), UserId::new(1)).is_ok());
        assert!(authorize_owner(&admin(), UserId::new(1)).is_ok());
        assert!(matches!(
            authorize_owner(&user(), UserId::new(3)),
            Err(AuthzError::Forbidden(_))
        ));
    }
}
