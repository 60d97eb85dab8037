//! Dashboard bearer credential

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Claims read from a session JWT
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID)
    #[serde(default)]
    pub sub: Option<String>,

    /// Expiration timestamp
    #[serde(default)]
    pub exp: Option<i64>,

    /// Issued at timestamp
    #[serde(default)]
    pub iat: Option<i64>,
}

/// A bearer token with whatever expiry information could be read from it
#[derive(Debug)]
pub struct Credential {
    raw: SecretString,
    claims: SessionClaims,
}

impl Credential {
    /// Wrap a raw token, reading JWT claims when it is one.
    ///
    /// The signature is not checked; the backend does that on every request.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        let raw = raw.into();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        let claims = match decode::<SessionClaims>(&raw, &DecodingKey::from_secret(b""), &validation)
        {
            Ok(data) => data.claims,
            Err(e) => {
                debug!("Bearer token is opaque ({}), expiry unknown", e);
                SessionClaims::default()
            }
        };

        Self {
            raw: SecretString::from(raw),
            claims,
        }
    }

    /// Fresh secret copy for handing to a request
    pub fn bearer(&self) -> SecretString {
        SecretString::from(self.raw.expose_secret().to_owned())
    }

    pub fn expose(&self) -> &str {
        self.raw.expose_secret()
    }

    pub fn subject(&self) -> Option<&str> {
        self.claims.sub.as_deref()
    }

    /// Expiration time, if the token carries one
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.claims.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }

    pub fn is_expired(&self) -> bool {
        self.claims
            .exp
            .is_some_and(|exp| exp < Utc::now().timestamp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn jwt(exp: i64) -> String {
        let claims = SessionClaims {
            sub: Some("user_123".to_string()),
            exp: Some(exp),
            iat: Some(0),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test")).unwrap()
    }

    #[test]
    fn test_expired_jwt() {
        let credential = Credential::from_raw(jwt(Utc::now().timestamp() - 60));
        assert!(credential.is_expired());
        assert_eq!(credential.subject(), Some("user_123"));
    }

    #[test]
    fn test_valid_jwt() {
        let exp = Utc::now().timestamp() + 3600;
        let credential = Credential::from_raw(jwt(exp));
        assert!(!credential.is_expired());
        assert_eq!(credential.expires_at().unwrap().timestamp(), exp);
    }

    #[test]
    fn test_opaque_token_never_expires_locally() {
        let credential = Credential::from_raw("not-a-jwt");
        assert!(!credential.is_expired());
        assert!(credential.expires_at().is_none());
        assert_eq!(credential.expose(), "not-a-jwt");
    }
}
