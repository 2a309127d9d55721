//! The authentication subsystem is an external collaborator: given an `Authorization: Bearer
//! <jwt>` header, it yields a verified user identifier or nothing. The core neither issues nor
//! rotates these tokens; it only consumes the result of decoding one.

use crate::user;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("access denied")]
pub struct AccessDenied;

/// The auth collaborator's verification parameters, loaded from configuration (§10.C).
#[derive(Clone)]
pub struct Config {
    pub secret: String,
    pub algorithm: Algorithm,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
}

/// Verifies a bearer token and returns the user id it authenticates. Absence of a header, a
/// malformed header, or a failed signature/expiry check are all folded into [`AccessDenied`]; the
/// core treats them identically (§6 "the core treats absence as an unauthenticated request").
pub fn verify_bearer(header: Option<&str>, config: &Config) -> Result<user::Id, AccessDenied> {
    let token = header
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(AccessDenied)?;
    let key = DecodingKey::from_secret(config.secret.as_bytes());
    let validation = Validation::new(config.algorithm);
    let data = jsonwebtoken::decode::<Claims>(token, &key, &validation).map_err(|_| AccessDenied)?;
    user::Id::new(data.claims.sub).ok_or(AccessDenied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn config() -> Config {
        Config {
            secret: "test-secret".to_owned(),
            algorithm: Algorithm::HS256,
        }
    }

    #[test]
    fn missing_header_is_denied() {
        assert!(verify_bearer(None, &config()).is_err());
    }

    #[test]
    fn valid_token_yields_user_id() {
        let claims = Claims {
            sub: "u1".to_owned(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(config().secret.as_bytes()),
        )
        .unwrap();
        let header = format!("Bearer {}", token);
        let user_id = verify_bearer(Some(&header), &config()).unwrap();
        assert_eq!(user_id, user::Id::new("u1").unwrap());
    }

    #[test]
    fn wrong_secret_is_denied() {
        let claims = Claims {
            sub: "u1".to_owned(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"other-secret"),
        )
        .unwrap();
        let header = format!("Bearer {}", token);
        assert!(verify_bearer(Some(&header), &config()).is_err());
    }
}
