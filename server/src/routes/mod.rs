pub mod auth;
pub mod reviews;
pub mod students;
pub mod tutors;
pub mod uploads;

use platform_api::ApiError;
use products_tutoring::ServiceError;
use serde::Serialize;

/// Map a service failure onto the HTTP envelope. Store and internal errors
/// surface as `context`; their cause is only logged.
pub fn failure(context: &'static str) -> impl Fn(ServiceError) -> ApiError {
    move |err| match err {
        ServiceError::InvalidArgument(msg) | ServiceError::Conflict(msg) => {
            ApiError::BadRequest(msg)
        }
        ServiceError::NotFound(msg) => ApiError::NotFound(msg),
        ServiceError::Unauthenticated(msg) => ApiError::Unauthorized(msg),
        ServiceError::Forbidden(msg) => ApiError::Forbidden(msg),
        ServiceError::Unavailable(msg) => ApiError::Unavailable(msg),
        ServiceError::Store(err) => ApiError::internal(context, err),
        ServiceError::Internal(err) => ApiError::internal(context, err),
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
