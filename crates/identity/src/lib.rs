//! Bearer-token codec. Only the subject id in the payload matters to the
//! rest of the system; everything else is transport detail.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::domain::{CallerIdentity, UserId};

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub ttl_seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

pub fn mint_token(
    cfg: &TokenConfig,
    user_id: UserId,
    username: Option<&str>,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let exp = now + Duration::seconds(cfg.ttl_seconds);
    let claims = Claims {
        id: user_id,
        username: username.map(str::to_string),
        iat: now.timestamp(),
        exp: exp.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(cfg.secret.as_bytes()),
    )
}

/// Checks signature and expiry.
pub fn verify_token(cfg: &TokenConfig, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(cfg.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

/// Token part of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Never fails: a missing or unverifiable token is an anonymous caller.
pub fn resolve(cfg: &TokenConfig, header_value: Option<&str>) -> CallerIdentity {
    header_value
        .and_then(bearer_token)
        .and_then(|token| verify_token(cfg, token).ok())
        .map(|claims| CallerIdentity::Subject(claims.id))
        .unwrap_or(CallerIdentity::Anonymous)
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
