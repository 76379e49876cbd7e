//! JWT token issuance and validation.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use nodepanel_core::db::unix_timestamp;

use super::claims::{ADMIN_SUBJECT, Claims};

/// Issues and validates HS256 admin tokens.
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: i64,
}

impl JwtManager {
    /// Create a new `JwtManager` with the given secret.
    pub fn new(secret: &[u8], ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl_secs,
        }
    }

    pub const fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Issue an admin token. Returns the token and its expiry.
    pub fn issue(&self) -> Result<(String, i64), jsonwebtoken::errors::Error> {
        let now = unix_timestamp();
        let exp = now + self.ttl_secs;

        let claims = Claims {
            sub: ADMIN_SUBJECT.to_string(),
            iat: now,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok((token, exp))
    }

    /// Validate a token and return its claims. Only admin tokens are accepted.
    pub fn validate(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.sub = Some(ADMIN_SUBJECT.to_string());
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)?;
        Ok(data.claims)
    }
}
