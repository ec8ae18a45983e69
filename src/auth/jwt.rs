use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::error::AccountError;

/// Session lifetime. Tokens are not refreshable or revocable.
const TOKEN_TTL_HOURS: i64 = 24;

/// JWT payload used for authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,     // user ID
    pub email: String, // as stored at registration
    pub iat: usize,    // issued at (unix timestamp)
    pub exp: usize,    // expires at (unix timestamp)
}

/// Holds JWT signing and verification keys.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue(&self, user_id: Uuid, email: &str) -> Result<String, AccountError> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::hours(TOKEN_TTL_HOURS);
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AccountError::CryptoUnavailable(e.to_string()))?;
        debug!(user_id = %user_id, "session token issued");
        Ok(token)
    }

    /// TokenExpired only when the signature checks out and the expiry has
    /// passed; anything else is TokenInvalid. Both reject the request.
    pub fn verify(&self, token: &str) -> Result<Claims, AccountError> {
        let data =
            decode::<Claims>(token, &self.decoding, &Validation::default()).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => AccountError::TokenExpired,
                    _ => AccountError::TokenInvalid,
                }
            })?;
        debug!(user_id = %data.claims.sub, "session token verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_and_verify_roundtrip() {
        let keys = TokenKeys::new("test-secret");
        let user_id = Uuid::new_v4();
        let token = keys.issue(user_id, "a@x.com").expect("issue token");
        let claims = keys.verify(&token).expect("verify token");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "a@x.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn verify_rejects_garbage() {
        let keys = TokenKeys::new("test-secret");
        assert!(matches!(
            keys.verify("not-a-token"),
            Err(AccountError::TokenInvalid)
        ));
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let keys = TokenKeys::new("test-secret");
        let other = TokenKeys::new("other-secret");
        let token = keys.issue(Uuid::new_v4(), "a@x.com").expect("issue token");
        assert!(matches!(
            other.verify(&token),
            Err(AccountError::TokenInvalid)
        ));
    }

    #[test]
    fn verify_distinguishes_expiry() {
        let keys = TokenKeys::new("test-secret");
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "a@x.com".into(),
            iat: (now - TimeDuration::hours(25)).unix_timestamp() as usize,
            exp: (now - TimeDuration::hours(1)).unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).expect("encode");
        assert!(matches!(
            keys.verify(&token),
            Err(AccountError::TokenExpired)
        ));
    }
}
