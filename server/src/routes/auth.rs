use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use axum_extra::extract::WithRejection;
use platform_api::{ApiError, ApiResult};
use products_tutoring::{AccountService, Credentials, Registration, UserSummary};
use serde::Serialize;

use super::failure;
use crate::{extract::CurrentUser, http::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}

#[derive(Serialize)]
struct SessionResponse {
    message: &'static str,
    token: String,
    user: UserSummary,
}

#[derive(Serialize)]
struct MeResponse {
    user: UserSummary,
}

async fn register(
    State(accounts): State<AccountService>,
    WithRejection(Json(input), _): WithRejection<Json<Registration>, ApiError>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let session = accounts
        .register(input)
        .await
        .map_err(failure("Server error during registration"))?;
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            message: "User registered successfully",
            token: session.token,
            user: session.user,
        }),
    ))
}

async fn login(
    State(accounts): State<AccountService>,
    WithRejection(Json(input), _): WithRejection<Json<Credentials>, ApiError>,
) -> ApiResult<Json<SessionResponse>> {
    let session = accounts
        .login(input)
        .await
        .map_err(failure("Server error during login"))?;
    Ok(Json(SessionResponse {
        message: "Login successful",
        token: session.token,
        user: session.user,
    }))
}

async fn me(user: CurrentUser, State(accounts): State<AccountService>) -> ApiResult<Json<MeResponse>> {
    let user = accounts.me(user.id).await.map_err(failure("Server error"))?;
    Ok(Json(MeResponse { user }))
}
