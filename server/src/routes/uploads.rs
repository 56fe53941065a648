use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    routing::post,
};
use axum_extra::extract::WithRejection;
use platform_api::{ApiError, ApiResult};
use products_tutoring::ImageService;
use serde::{Deserialize, Serialize};

use super::{MessageResponse, failure};
use crate::{extract::CurrentUser, http::AppState};

/// Room for base64 expansion of a maximum-size image plus the JSON wrapper.
fn body_limit(max_image_bytes: usize) -> usize {
    max_image_bytes / 3 * 4 + 64 * 1024
}

pub fn router(max_image_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/image", post(upload).delete(remove))
        .layer(DefaultBodyLimit::max(body_limit(max_image_bytes)))
}

#[derive(Debug, Default, Deserialize)]
struct UploadRequest {
    #[serde(default)]
    image: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteRequest {
    #[serde(default)]
    public_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    message: &'static str,
    url: String,
    public_id: String,
}

async fn upload(
    _user: CurrentUser,
    State(images): State<ImageService>,
    WithRejection(Json(request), _): WithRejection<Json<UploadRequest>, ApiError>,
) -> ApiResult<Json<UploadResponse>> {
    let uploaded = images
        .upload(request.image)
        .await
        .map_err(failure("Failed to upload image"))?;
    Ok(Json(UploadResponse {
        message: "Image uploaded successfully",
        url: uploaded.url,
        public_id: uploaded.public_id,
    }))
}

async fn remove(
    _user: CurrentUser,
    State(images): State<ImageService>,
    WithRejection(Json(request), _): WithRejection<Json<DeleteRequest>, ApiError>,
) -> ApiResult<Json<MessageResponse>> {
    images
        .delete(request.public_id)
        .await
        .map_err(failure("Failed to delete image"))?;
    Ok(Json(MessageResponse {
        message: "Image deleted successfully",
    }))
}
