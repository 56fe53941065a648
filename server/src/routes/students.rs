use axum::{Json, Router, extract::State, routing::get};
use axum_extra::extract::WithRejection;
use entity::student_profiles;
use platform_api::{ApiError, ApiResult};
use products_tutoring::{StudentProfileInput, StudentService};
use serde::Serialize;

use super::failure;
use crate::{extract::CurrentUser, http::AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/profile", get(my_profile).post(save_profile))
}

#[derive(Serialize)]
struct SavedProfile {
    message: &'static str,
    profile: student_profiles::Model,
}

#[derive(Serialize)]
struct ProfileResponse {
    profile: student_profiles::Model,
}

async fn save_profile(
    user: CurrentUser,
    State(students): State<StudentService>,
    WithRejection(Json(input), _): WithRejection<Json<StudentProfileInput>, ApiError>,
) -> ApiResult<Json<SavedProfile>> {
    let profile = students
        .save(user.id, input)
        .await
        .map_err(failure("Failed to save profile"))?;
    Ok(Json(SavedProfile {
        message: "Profile saved successfully",
        profile,
    }))
}

async fn my_profile(
    user: CurrentUser,
    State(students): State<StudentService>,
) -> ApiResult<Json<ProfileResponse>> {
    let profile = students
        .mine(user.id)
        .await
        .map_err(failure("Failed to fetch profile"))?;
    Ok(Json(ProfileResponse { profile }))
}
