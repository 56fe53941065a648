use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch},
};
use axum_extra::extract::WithRejection;
use entity::tutor_profiles::{self, Availability};
use platform_api::{ApiError, ApiResult};
use products_tutoring::{DirectoryFilter, PublicTutor, TutorProfileInput, TutorService};
use serde::Serialize;

use super::failure;
use crate::{extract::CurrentUser, http::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(my_profile).post(save_profile))
        .route("/availability", patch(toggle_availability))
        .route("/all", get(directory))
        .route("/{id}", get(public_profile))
}

#[derive(Serialize)]
struct SavedProfile {
    message: &'static str,
    profile: tutor_profiles::Model,
}

#[derive(Serialize)]
struct ProfileResponse<T> {
    profile: T,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AvailabilityResponse {
    message: &'static str,
    availability_status: Availability,
}

#[derive(Serialize)]
struct DirectoryResponse {
    count: usize,
    tutors: Vec<PublicTutor>,
}

async fn save_profile(
    user: CurrentUser,
    State(tutors): State<TutorService>,
    WithRejection(Json(input), _): WithRejection<Json<TutorProfileInput>, ApiError>,
) -> ApiResult<Json<SavedProfile>> {
    let profile = tutors
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
    State(tutors): State<TutorService>,
) -> ApiResult<Json<ProfileResponse<tutor_profiles::Model>>> {
    let profile = tutors
        .mine(user.id)
        .await
        .map_err(failure("Failed to fetch profile"))?;
    Ok(Json(ProfileResponse { profile }))
}

async fn toggle_availability(
    user: CurrentUser,
    State(tutors): State<TutorService>,
) -> ApiResult<Json<AvailabilityResponse>> {
    let availability_status = tutors
        .toggle_availability(user.id)
        .await
        .map_err(failure("Failed to update availability"))?;
    Ok(Json(AvailabilityResponse {
        message: "Availability updated",
        availability_status,
    }))
}

async fn directory(
    State(tutors): State<TutorService>,
    WithRejection(Query(filter), _): WithRejection<Query<DirectoryFilter>, ApiError>,
) -> ApiResult<Json<DirectoryResponse>> {
    let tutors = tutors
        .directory(filter)
        .await
        .map_err(failure("Failed to fetch tutors"))?;
    Ok(Json(DirectoryResponse {
        count: tutors.len(),
        tutors,
    }))
}

async fn public_profile(
    State(tutors): State<TutorService>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, ApiError>,
) -> ApiResult<Json<ProfileResponse<PublicTutor>>> {
    let profile = tutors
        .public(id)
        .await
        .map_err(failure("Failed to fetch tutor"))?;
    Ok(Json(ProfileResponse { profile }))
}
