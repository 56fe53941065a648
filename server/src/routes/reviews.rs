use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use axum_extra::extract::WithRejection;
use entity::reviews;
use platform_api::{ApiError, ApiResult};
use products_tutoring::{
    CanReview, NewReview, RatingSummary, ReviewPatch, ReviewService, ReviewWithStudent,
    ReviewWithTutor,
};
use serde::Serialize;

use super::{MessageResponse, failure};
use crate::{extract::CurrentUser, http::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(submit))
        .route("/tutor/{tutor_id}", get(list_for_tutor))
        .route("/my-reviews", get(my_reviews))
        .route("/can-review/{tutor_id}", get(can_review))
        .route("/{review_id}", put(update).delete(remove))
}

#[derive(Serialize)]
struct ReviewResponse {
    message: &'static str,
    review: reviews::Model,
}

#[derive(Serialize)]
struct TutorReviewsResponse {
    reviews: Vec<ReviewWithStudent>,
    stats: RatingSummary,
}

#[derive(Serialize)]
struct MyReviewsResponse {
    reviews: Vec<ReviewWithTutor>,
}

async fn submit(
    user: CurrentUser,
    State(service): State<ReviewService>,
    WithRejection(Json(input), _): WithRejection<Json<NewReview>, ApiError>,
) -> ApiResult<(StatusCode, Json<ReviewResponse>)> {
    let review = service
        .submit(user.id, input)
        .await
        .map_err(failure("Failed to create review"))?;
    Ok((
        StatusCode::CREATED,
        Json(ReviewResponse {
            message: "Review submitted successfully",
            review,
        }),
    ))
}

async fn list_for_tutor(
    State(service): State<ReviewService>,
    WithRejection(Path(tutor_id), _): WithRejection<Path<i32>, ApiError>,
) -> ApiResult<Json<TutorReviewsResponse>> {
    let context = "Failed to fetch reviews";
    let reviews = service
        .list_for_tutor(tutor_id)
        .await
        .map_err(failure(context))?;
    let stats = service.aggregate(tutor_id).await.map_err(failure(context))?;
    Ok(Json(TutorReviewsResponse { reviews, stats }))
}

async fn my_reviews(
    user: CurrentUser,
    State(service): State<ReviewService>,
) -> ApiResult<Json<MyReviewsResponse>> {
    let reviews = service
        .list_mine(user.id)
        .await
        .map_err(failure("Failed to fetch your reviews"))?;
    Ok(Json(MyReviewsResponse { reviews }))
}

async fn update(
    user: CurrentUser,
    State(service): State<ReviewService>,
    WithRejection(Path(review_id), _): WithRejection<Path<i32>, ApiError>,
    WithRejection(Json(patch), _): WithRejection<Json<ReviewPatch>, ApiError>,
) -> ApiResult<Json<ReviewResponse>> {
    let review = service
        .update(review_id, user.id, patch)
        .await
        .map_err(failure("Failed to update review"))?;
    Ok(Json(ReviewResponse {
        message: "Review updated successfully",
        review,
    }))
}

async fn remove(
    user: CurrentUser,
    State(service): State<ReviewService>,
    WithRejection(Path(review_id), _): WithRejection<Path<i32>, ApiError>,
) -> ApiResult<Json<MessageResponse>> {
    service
        .delete(review_id, user.id)
        .await
        .map_err(failure("Failed to delete review"))?;
    Ok(Json(MessageResponse {
        message: "Review deleted successfully",
    }))
}

async fn can_review(
    user: CurrentUser,
    State(service): State<ReviewService>,
    WithRejection(Path(tutor_id), _): WithRejection<Path<i32>, ApiError>,
) -> ApiResult<Json<CanReview>> {
    let verdict = service
        .can_review(tutor_id, user.id)
        .await
        .map_err(failure("Failed to check review status"))?;
    Ok(Json(verdict))
}
