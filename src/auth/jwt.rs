use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::models::User;

/// Lifetime of a login token and of the cookie carrying it.
pub const TOKEN_TTL_HOURS: i64 = 2;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    pub user_id: String,
    pub username: String,
    pub role_id: String,
    pub role_name: String,
    pub exp: i64,
}

impl Claims {
    pub fn for_user(user: &User, issued_at: DateTime<Utc>) -> Self {
        Self {
            user_id: user.id.to_hex(),
            username: user.username.clone(),
            role_id: user.role_id.clone(),
            role_name: user.role_name.clone(),
            exp: (issued_at + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        }
    }
}

/// Signs and checks HS256 tokens with the process-wide secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenIssuer {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::default();
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, String> {
        self.issue_at(user, Utc::now())
    }

    pub fn issue_at(&self, user: &User, issued_at: DateTime<Utc>) -> Result<String, String> {
        encode_token(&Claims::for_user(user, issued_at), &self.encoding)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, String> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| format!("JWT decode failed: {e}"))
    }
}

fn encode_token(claims: &Claims, key: &EncodingKey) -> Result<String, String> {
    encode(&Header::default(), claims, key).map_err(|e| format!("JWT encode failed: {e}"))
}
