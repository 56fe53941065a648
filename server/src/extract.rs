use axum::extract::{FromRef, FromRequestParts};
use axum::http::{header::AUTHORIZATION, request::Parts};
use platform_api::ApiError;
use platform_authn::{bearer_token, decode_token};

use crate::http::AppState;
use crate::routes::failure;

/// Caller resolved from an `Authorization: Bearer` token.
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: i32,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| ApiError::unauthorized("No token, authorization denied"))?;
        let claims = decode_token(token, &state.config.auth)
            .map_err(|_| ApiError::unauthorized("Token is not valid"))?;
        let user = state
            .accounts
            .find(claims.user_id)
            .await
            .map_err(failure("Authentication failed"))?
            .filter(|user| user.is_active)
            .ok_or_else(|| ApiError::unauthorized("Token is not valid"))?;
        Ok(Self { id: user.id })
    }
}
