//! Bearer token verification.
//!
//! Session issuance belongs to the identity subsystem; the control API only
//! needs a [`TokenVerifier`]. [`JwtAuthority`] is the shared-secret HS256
//! implementation the server ships with, and it can also mint tokens for
//! the `tctl token` command.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tenantctl_common::config::ControlConfig;
use tenantctl_common::error::{ControlError, Result};

/// An authenticated operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    /// Token subject.
    pub subject: String,
}

/// Verifies bearer credentials presented to the control API.
pub trait TokenVerifier: Send + Sync {
    /// Verifies `token` and returns the operator it identifies.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` if the token is malformed, expired, forged,
    /// or names an unknown operator.
    fn verify(&self, token: &str) -> Result<Operator>;
}

/// Claims carried by every operator token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Operator name.
    pub sub: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
}

/// HS256 token authority backed by a shared secret.
#[derive(Clone)]
pub struct JwtAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime_secs: u64,
    operators: Vec<String>,
}

impl std::fmt::Debug for JwtAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuthority")
            .field("lifetime_secs", &self.lifetime_secs)
            .field("operators", &self.operators)
            .finish_non_exhaustive()
    }
}

impl JwtAuthority {
    /// Creates an authority signing with `secret`.
    #[must_use]
    pub fn new(secret: &str, lifetime_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime_secs,
            operators: Vec::new(),
        }
    }

    /// Restricts verification to the named operators. Empty admits anyone.
    #[must_use]
    pub fn with_operators(mut self, operators: Vec<String>) -> Self {
        self.operators = operators;
        self
    }

    /// Builds an authority from the server configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no secret is configured.
    pub fn from_config(config: &ControlConfig) -> Result<Self> {
        let secret = config.require_secret()?;
        Ok(Self::new(secret, config.token_lifetime_secs).with_operators(config.operators.clone()))
    }

    /// Issues a signed token for `subject`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if signing fails.
    pub fn issue(&self, subject: &str) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        let lifetime = i64::try_from(self.lifetime_secs).unwrap_or(i64::MAX);
        self.sign(&Claims {
            sub: subject.to_string(),
            iat: now,
            exp: now.saturating_add(lifetime),
        })
    }

    fn sign(&self, claims: &Claims) -> Result<String> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding).map_err(|e| {
            ControlError::Config {
                message: format!("failed to sign token: {e}"),
            }
        })
    }
}

impl TokenVerifier for JwtAuthority {
    fn verify(&self, token: &str) -> Result<Operator> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["sub", "exp"]);

        let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => ControlError::Unauthorized {
                    message: "token expired".into(),
                },
                _ => ControlError::Unauthorized {
                    message: format!("invalid token: {e}"),
                },
            })?;

        if !self.operators.is_empty() && !self.operators.contains(&claims.sub) {
            return Err(ControlError::Unauthorized {
                message: format!("unknown operator '{}'", claims.sub),
            });
        }
        Ok(Operator {
            subject: claims.sub,
        })
    }
}

/// Extracts the credential from an `Authorization`-style value.
///
/// Accepts both `Bearer <token>` and a bare token.
#[must_use]
pub fn bearer_token(value: &str) -> Option<&str> {
    let value = value.trim();
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .unwrap_or(value)
        .trim();
    if token.is_empty() { None } else { Some(token) }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn issued_token_verifies() {
        let authority = JwtAuthority::new(SECRET, 3600);
        let token = authority.issue("admin").unwrap();
        let operator = authority.verify(&token).unwrap();
        assert_eq!(operator.subject, "admin");
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = JwtAuthority::new("other", 3600).issue("admin").unwrap();
        let err = JwtAuthority::new(SECRET, 3600).verify(&token).unwrap_err();
        assert!(matches!(err, ControlError::Unauthorized { .. }));
    }

    #[test]
    fn expired_token_is_rejected() {
        let authority = JwtAuthority::new(SECRET, 3600);
        let now = chrono::Utc::now().timestamp();
        let token = authority
            .sign(&Claims {
                sub: "admin".into(),
                iat: now - 7200,
                exp: now - 3600,
            })
            .unwrap();
        let err = authority.verify(&token).unwrap_err();
        assert_eq!(err.to_string(), "unauthorized: token expired");
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let authority = JwtAuthority::new(SECRET, 3600).with_operators(vec!["admin".into()]);
        let token = authority.issue("mallory").unwrap();
        assert!(authority.verify(&token).is_err());
        let token = authority.issue("admin").unwrap();
        assert!(authority.verify(&token).is_ok());
    }

    #[test]
    fn garbage_is_rejected() {
        let err = JwtAuthority::new(SECRET, 3600).verify("not.a.jwt").unwrap_err();
        assert_eq!(err.code(), 401);
    }

    #[test]
    fn bearer_prefix_is_optional() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("Bearer   "), None);
    }

    #[test]
    fn config_without_secret_cannot_build_authority() {
        assert!(JwtAuthority::from_config(&ControlConfig::default()).is_err());
    }
}
