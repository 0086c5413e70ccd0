use std::{convert::Infallible, sync::Arc};

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
    Json,
};
use identity::{bearer_token, resolve, verify_token};
use shared::{
    domain::{CallerIdentity, UserId},
    error::{ApiError, ErrorCode},
};

use crate::app_state::AppState;

/// Identity for read paths. Never rejects.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Caller(pub(crate) CallerIdentity);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        Ok(Self(resolve(&state.tokens, header_value)))
    }
}

/// Identity for write paths: 401 without a token, 403 with a bad one.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AuthenticatedUser(pub(crate) UserId);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthenticatedUser {
    type Rejection = (StatusCode, Json<ApiError>);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(ApiError::new(
                        ErrorCode::Unauthorized,
                        "access denied: no token provided",
                    )),
                )
            })?;

        let claims = verify_token(&state.tokens, token).map_err(|_| {
            (
                StatusCode::FORBIDDEN,
                Json(ApiError::new(ErrorCode::Forbidden, "access denied: invalid token")),
            )
        })?;
        Ok(Self(claims.id))
    }
}
