//! Token codec: signs and verifies access and refresh tokens.
//!
//! Both token classes are HS256 JWTs signed with the same process-wide
//! secret. The pinned subject tells them apart, so a refresh token is never
//! accepted where an access token is expected (and vice versa).
//!
//! Verification order:
//! 1. signature and presence of `sub`/`iss`/`iat`/`exp`
//! 2. subject
//! 3. issuer
//! 4. validity window (`iat <= now < exp`)
//!
//! Any failed step rejects the token outright.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

use warden_core::UserId;

use crate::claims::{ACCESS_SUBJECT, AccessClaims, ISSUER, REFRESH_SUBJECT, RefreshClaims};
use crate::{Identity, Role, TokenValidationError, validate_window};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Bad signature, malformed structure or missing claims.
    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("unexpected token subject '{0}'")]
    WrongSubject(String),

    #[error("unexpected token issuer '{0}'")]
    WrongIssuer(String),

    #[error(transparent)]
    Window(#[from] TokenValidationError),

    #[error("failed to sign token: {0}")]
    Encode(String),
}

impl TokenError {
    pub fn is_expired(&self) -> bool {
        matches!(self, TokenError::Window(TokenValidationError::Expired))
    }
}

/// Verifies bearer access tokens into a request identity.
///
/// The HTTP layer depends on this seam rather than on the concrete codec.
pub trait AccessTokenVerifier: Send + Sync {
    fn verify_access(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, TokenError>;
}

/// HS256 codec for access and refresh tokens.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl core::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

/// Registered claims shared by both token classes; everything else lands in `private`.
#[derive(Debug, Deserialize)]
struct RawClaims {
    sub: String,
    iss: String,
    iat: i64,
    exp: i64,
    #[serde(flatten)]
    private: Map<String, JsonValue>,
}

#[derive(Debug, Deserialize)]
struct AccessPrivate {
    id: UserId,
    username: String,
    role: Role,
}

#[derive(Debug, Deserialize)]
struct RefreshPrivate {
    username: String,
}

impl TokenCodec {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    pub fn issue_access_token(&self, user_id: UserId, username: &str, role: Role) -> Result<String, TokenError> {
        self.issue_access_token_at(user_id, username, role, Utc::now())
    }

    pub fn issue_access_token_at(
        &self,
        user_id: UserId,
        username: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        self.sign(&AccessClaims::new(user_id, username, role, now))
    }

    pub fn verify_access_token(&self, token: &str) -> Result<Identity, TokenError> {
        self.verify_access_token_at(token, Utc::now())
    }

    pub fn verify_access_token_at(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, TokenError> {
        let private: AccessPrivate = self.decode_checked(token, ACCESS_SUBJECT, now)?;
        Ok(Identity::new(private.id, private.username, private.role))
    }

    pub fn issue_refresh_token(&self, username: &str) -> Result<String, TokenError> {
        self.issue_refresh_token_at(username, Utc::now())
    }

    pub fn issue_refresh_token_at(&self, username: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        self.sign(&RefreshClaims::new(username, now))
    }

    /// Verify a refresh token and return the username it was issued to.
    pub fn verify_refresh_token(&self, token: &str) -> Result<String, TokenError> {
        self.verify_refresh_token_at(token, Utc::now())
    }

    pub fn verify_refresh_token_at(&self, token: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let private: RefreshPrivate = self.decode_checked(token, REFRESH_SUBJECT, now)?;
        Ok(private.username)
    }

    fn sign<C: serde::Serialize>(&self, claims: &C) -> Result<String, TokenError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenError::Encode(e.to_string()))
    }

    fn decode_checked<P: DeserializeOwned>(
        &self,
        token: &str,
        subject: &str,
        now: DateTime<Utc>,
    ) -> Result<P, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // The window is checked below against the caller's clock.
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "iat", "sub", "iss"]);

        let raw = jsonwebtoken::decode::<RawClaims>(token, &self.decoding, &validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?
            .claims;

        if raw.sub != subject {
            return Err(TokenError::WrongSubject(raw.sub));
        }
        if raw.iss != ISSUER {
            return Err(TokenError::WrongIssuer(raw.iss));
        }
        validate_window(raw.iat, raw.exp, now)?;

        serde_json::from_value(JsonValue::Object(raw.private))
            .map_err(|e| TokenError::Invalid(format!("claims: {e}")))
    }
}

impl AccessTokenVerifier for TokenCodec {
    fn verify_access(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, TokenError> {
        self.verify_access_token_at(token, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    const SECRET: &str = "test-secret";

    fn codec() -> TokenCodec {
        TokenCodec::new(SECRET)
    }

    #[test]
    fn access_token_round_trips_identity() {
        let codec = codec();
        let token = codec
            .issue_access_token(UserId::new(5), "maria123", Role::Admin)
            .unwrap();

        let identity = codec.verify_access_token(&token).unwrap();
        assert_eq!(identity.user_id(), UserId::new(5));
        assert_eq!(identity.username(), "maria123");
        assert_eq!(identity.role(), Role::Admin);
        assert_eq!(identity.authority(), "ROLE_ADMIN");
    }

    #[test]
    fn refresh_token_round_trips_username() {
        let codec = codec();
        let token = codec.issue_refresh_token("john").unwrap();
        assert_eq!(codec.verify_refresh_token(&token).unwrap(), "john");
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let codec = codec();
        let refresh = codec.issue_refresh_token("john").unwrap();

        let err = codec.verify_access_token(&refresh).unwrap_err();
        assert_eq!(err, TokenError::WrongSubject(REFRESH_SUBJECT.to_string()));
    }

    #[test]
    fn access_token_is_not_a_refresh_token() {
        let codec = codec();
        let access = codec
            .issue_access_token(UserId::new(1), "john", Role::User)
            .unwrap();

        let err = codec.verify_refresh_token(&access).unwrap_err();
        assert_eq!(err, TokenError::WrongSubject(ACCESS_SUBJECT.to_string()));
    }

    #[test]
    fn access_token_expires_exactly_after_sixty_minutes() {
        let codec = codec();
        let issued = Utc::now();
        let token = codec
            .issue_access_token_at(UserId::new(1), "john", Role::User, issued)
            .unwrap();

        let expires_at = issued + Duration::minutes(60);
        assert!(codec
            .verify_access_token_at(&token, expires_at - Duration::seconds(1))
            .is_ok());

        let err = codec
            .verify_access_token_at(&token, expires_at + Duration::seconds(1))
            .unwrap_err();
        assert!(err.is_expired());
    }

    #[test]
    fn refresh_token_expires_after_seven_days() {
        let codec = codec();
        let issued = Utc::now();
        let token = codec.issue_refresh_token_at("john", issued).unwrap();

        assert!(codec
            .verify_refresh_token_at(&token, issued + Duration::days(7) - Duration::seconds(1))
            .is_ok());
        assert!(codec
            .verify_refresh_token_at(&token, issued + Duration::days(7) + Duration::seconds(1))
            .unwrap_err()
            .is_expired());
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let token = TokenCodec::new("other-secret")
            .issue_access_token(UserId::new(1), "john", Role::User)
            .unwrap();

        assert!(matches!(
            codec().verify_access_token(&token),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let codec = codec();
        let token = codec
            .issue_access_token(UserId::new(1), "john", Role::User)
            .unwrap();
        let elevated = codec
            .issue_access_token(UserId::new(1), "john", Role::Admin)
            .unwrap();

        // Graft the ADMIN payload onto the USER signature.
        let parts: Vec<&str> = token.split('.').collect();
        let elevated_parts: Vec<&str> = elevated.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], elevated_parts[1], parts[2]);

        assert!(matches!(
            codec.verify_access_token(&forged),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn foreign_issuer_is_rejected() {
        let mut claims = AccessClaims::new(UserId::new(1), "john", Role::User, Utc::now());
        claims.iss = "SOMEONE_ELSE".to_string();
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(
            codec().verify_access_token(&token),
            Err(TokenError::WrongIssuer("SOMEONE_ELSE".to_string()))
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            codec().verify_access_token("not.a.jwt"),
            Err(TokenError::Invalid(_))
        ));
        assert!(codec().verify_refresh_token("").is_err());
    }

    proptest! {
        #[test]
        fn any_identity_survives_issue_then_verify(
            id in 1i64..i64::MAX,
            username in "[a-zA-Z0-9_.-]{2,100}",
            admin in any::<bool>(),
        ) {
            let codec = codec();
            let role = if admin { Role::Admin } else { Role::User };
            let token = codec.issue_access_token(UserId::new(id), &username, role).unwrap();

            let identity = codec.verify_access_token(&token).unwrap();
            prop_assert_eq!(identity.user_id(), UserId::new(id));
            prop_assert_eq!(identity.username(), username.as_str());
            prop_assert_eq!(identity.role(), role);
        }
    }
}
