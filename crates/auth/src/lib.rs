//! `warden-auth`: token issuance/verification and authorization policy.
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod claims;
pub mod identity;
pub mod password;
pub mod policy;
pub mod roles;
pub mod rules;
pub mod token;

pub use claims::{AccessClaims, RefreshClaims, TokenValidationError, validate_window};
pub use identity::Identity;
pub use password::{PasswordError, PasswordHasher};
pub use policy::{AuthzError, Requirement, RoutePolicy, RouteRule, authorize, authorize_owner};
pub use roles::{Role, UnknownRole};
pub use token::{AccessTokenVerifier, TokenCodec, TokenError};
