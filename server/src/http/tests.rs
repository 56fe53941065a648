use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use migration::{Migrator, MigratorTrait};
use platform_db::Store;
use products_tutoring::{ImageStore, UploadedImage};
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

use super::{AppState, build_router};
use crate::config::AppConfig;

struct FakeImages;

#[async_trait]
impl ImageStore for FakeImages {
    async fn upload(&self, _image: &str, folder: &str) -> anyhow::Result<UploadedImage> {
        Ok(UploadedImage {
            url: "https://img.example/avatar.png".into(),
            public_id: format!("{folder}/avatar"),
        })
    }

    async fn destroy(&self, _public_id: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

async fn app_with(image_store: Option<Arc<dyn ImageStore>>) -> Router {
    let conn = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&conn, None).await.unwrap();
    let store = Store::new(conn, Duration::from_secs(5));
    let config = AppConfig::from_lookup(|key| match key {
        "JWT_SECRET" => Some("router-test-secret".into()),
        "CLOUDINARY_FOLDER" => Some("profiles".into()),
        _ => None,
    })
    .unwrap();
    build_router(AppState::new(store, Arc::new(config), image_store))
}

async fn app() -> Router {
    app_with(None).await
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn register(app: &Router, email: &str, role: &str) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "email": email, "password": "password123", "role": role })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["token"].as_str().unwrap().to_string()
}

/// Registers a tutor with a profile; returns the profile id.
async fn tutor(app: &Router, email: &str, name: &str) -> i64 {
    let token = register(app, email, "tutor").await;
    let (status, body) = call(
        app,
        Method::POST,
        "/api/tutors/profile",
        Some(&token),
        Some(json!({ "displayName": name, "subjects": ["Physics"], "moduleCodes": ["phy101"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["profile"]["id"].as_i64().unwrap()
}

async fn student(app: &Router, email: &str, name: &str) -> String {
    let token = register(app, email, "student").await;
    let (status, body) = call(
        app,
        Method::POST,
        "/api/students/profile",
        Some(&token),
        Some(json!({ "displayName": name })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    token
}

#[tokio::test]
async fn root_and_health() {
    let app = app().await;
    let (status, body) = call(&app, Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Genius Prep API is running!");

    let (status, body) = call(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["db_ok"], true);
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let app = app().await;
    let (status, body) = call(&app, Method::GET, "/api/reviews/my-reviews", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "No token, authorization denied");

    let (status, body) = call(
        &app,
        Method::GET,
        "/api/reviews/my-reviews",
        Some("not-a-jwt"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Token is not valid");
}

#[tokio::test]
async fn login_and_me() {
    let app = app().await;
    register(&app, "Kim@Example.test", "student").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "kim@example.test", "password": "wrong-one" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "kim@example.test", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Login successful");
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = call(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "kim@example.test");
    assert_eq!(body["user"]["role"], "student");
}

#[tokio::test]
async fn review_lifecycle_over_http() {
    let app = app().await;
    let tutor_id = tutor(&app, "tess@example.test", "Tess").await;
    let alice = student(&app, "alice@example.test", "Alice").await;
    let bob = student(&app, "bob@example.test", "Bob").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/reviews",
        Some(&alice),
        Some(json!({ "tutorId": tutor_id.to_string(), "rating": "5", "reviewText": "Great" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["message"], "Review submitted successfully");
    let review_id = body["review"]["id"].as_i64().unwrap();

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/reviews",
        Some(&alice),
        Some(json!({ "tutorId": tutor_id, "rating": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "You have already reviewed this tutor. You can edit your existing review."
    );

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/reviews",
        Some(&bob),
        Some(json!({ "tutorId": tutor_id, "rating": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(
        &app,
        Method::GET,
        &format!("/api/reviews/tutor/{tutor_id}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"], json!({ "totalReviews": 2, "averageRating": "4.5" }));
    let reviews = body["reviews"].as_array().unwrap();
    assert_eq!(reviews.len(), 2);
    assert!(reviews.iter().any(|r| r["student_name"] == "Alice"));

    let (status, body) = call(
        &app,
        Method::GET,
        &format!("/api/reviews/can-review/{tutor_id}"),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["canReview"], false);
    assert_eq!(body["reason"], "Already reviewed");
    assert_eq!(body["existingReview"]["id"], review_id);

    let (status, body) = call(
        &app,
        Method::PUT,
        &format!("/api/reviews/{review_id}"),
        Some(&bob),
        Some(json!({ "rating": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body["error"],
        "Review not found or you don't have permission to edit it"
    );

    let (status, body) = call(
        &app,
        Method::PUT,
        &format!("/api/reviews/{review_id}"),
        Some(&alice),
        Some(json!({ "rating": 3, "reviewText": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["review"]["rating"], 3);
    assert_eq!(body["review"]["review_text"], Value::Null);

    let (status, body) = call(&app, Method::GET, "/api/reviews/my-reviews", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reviews"][0]["tutor_name"], "Tess");

    let (status, body) = call(
        &app,
        Method::DELETE,
        &format!("/api/reviews/{review_id}"),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Review deleted successfully");

    let (_, body) = call(
        &app,
        Method::GET,
        &format!("/api/reviews/tutor/{tutor_id}"),
        None,
        None,
    )
    .await;
    assert_eq!(body["stats"], json!({ "totalReviews": 1, "averageRating": "4.0" }));
}

#[tokio::test]
async fn malformed_input_is_a_bad_request() {
    let app = app().await;
    let alice = student(&app, "alice@example.test", "Alice").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/reviews",
        Some(&alice),
        Some(json!({ "tutorId": 1, "rating": 9 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Rating must be between 1 and 5");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/reviews",
        Some(&alice),
        Some(json!({ "tutorId": "0", "rating": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Tutor ID and rating are required");

    let (status, _) = call(
        &app,
        Method::GET,
        "/api/reviews/tutor/not-a-number",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn directory_filters_and_toggle() {
    let app = app().await;
    let tutor_token = register(&app, "tess@example.test", "tutor").await;
    let (status, _) = call(
        &app,
        Method::POST,
        "/api/tutors/profile",
        Some(&tutor_token),
        Some(json!({ "displayName": "Tess", "subjects": ["Physics"], "moduleCodes": ["phy101"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    tutor(&app, "max@example.test", "Max").await;

    let (status, body) = call(
        &app,
        Method::GET,
        "/api/tutors/all?moduleCode=PHY101",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let (status, body) = call(
        &app,
        Method::PATCH,
        "/api/tutors/availability",
        Some(&tutor_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["availabilityStatus"], "inactive");

    let (_, body) = call(
        &app,
        Method::GET,
        "/api/tutors/all?availabilityStatus=active",
        None,
        None,
    )
    .await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["tutors"][0]["display_name"], "Max");

    let student_token = student(&app, "sam@example.test", "Sam").await;
    let (status, _) = call(
        &app,
        Method::POST,
        "/api/tutors/profile",
        Some(&student_token),
        Some(json!({ "displayName": "Sam" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn uploads_depend_on_configuration() {
    let image = "data:image/png;base64,iVBORw0KGgo=";

    let app = app().await;
    let token = register(&app, "pic@example.test", "student").await;
    let (status, _) = call(
        &app,
        Method::POST,
        "/api/upload/image",
        Some(&token),
        Some(json!({ "image": image })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let app = app_with(Some(Arc::new(FakeImages))).await;
    let token = register(&app, "pic@example.test", "student").await;
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/upload/image",
        Some(&token),
        Some(json!({ "image": image })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["publicId"], "profiles/avatar");

    let (status, body) = call(
        &app,
        Method::DELETE,
        "/api/upload/image",
        Some(&token),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No public ID provided");
}
