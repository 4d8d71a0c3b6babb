use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use taskboard_types::api::Claims;

/// Issues and verifies HS256 bearer tokens with a single shared secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            ttl,
        }
    }

    pub fn issue(&self, user_id: Uuid, email: &str) -> anyhow::Result<String> {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            iat: now,
            exp: now.saturating_add(self.ttl.as_secs() as usize),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(token)
    }

    /// Checks signature, structure and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.decoding, &self.validation).map(|data| data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-secret-key-that-is-long-enough", Duration::from_secs(3600))
    }

    #[test]
    fn issued_token_verifies() {
        let tokens = service();
        let user_id = Uuid::new_v4();

        let token = tokens.issue(user_id, "a@x.com").unwrap();
        let claims = tokens.verify(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn garbage_and_foreign_tokens_fail() {
        let tokens = service();
        assert!(tokens.verify("not.a.token").is_err());
        assert!(tokens.verify("").is_err());

        let other = TokenService::new("a-completely-different-secret", Duration::from_secs(3600));
        let token = other.issue(Uuid::new_v4(), "a@x.com").unwrap();
        assert!(tokens.verify(&token).is_err());
    }

    #[test]
    fn tampered_token_fails() {
        let tokens = service();
        let token = tokens.issue(Uuid::new_v4(), "a@x.com").unwrap();

        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_claims = {
            let other = tokens.issue(Uuid::new_v4(), "evil@x.com").unwrap();
            other.split('.').nth(1).unwrap().to_string()
        };
        parts[1] = &forged_claims;
        assert!(tokens.verify(&parts.join(".")).is_err());
    }

    #[test]
    fn expired_token_fails() {
        let tokens = service();
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "a@x.com".into(),
            iat: 1_000,
            exp: 2_000,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &tokens.encoding).unwrap();
        assert!(tokens.verify(&token).is_err());
    }

    #[test]
    fn huge_ttl_saturates_instead_of_overflowing() {
        let tokens = TokenService::new("test-secret-key-that-is-long-enough", Duration::MAX);
        let token = tokens.issue(Uuid::new_v4(), "a@x.com").unwrap();
        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.exp, usize::MAX);
    }
}
