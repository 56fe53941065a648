mod common;

use entity::reviews;
use products_tutoring::{NewReview, ReviewPatch, ServiceError};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait, PaginatorTrait};

fn review(tutor_id: i32, rating: i64, text: &str) -> NewReview {
    NewReview {
        tutor_id: Some(tutor_id.into()),
        rating: Some(rating),
        review_text: Some(text.into()),
    }
}

async fn review_count(env: &common::TestEnv) -> u64 {
    reviews::Entity::find()
        .count(env.store.conn())
        .await
        .unwrap()
}

#[tokio::test]
async fn submit_update_delete_scenario() {
    let env = common::setup().await;
    let (_, tutor_id) = env.tutor("tutor@example.test", "Tess").await;
    let (alice, alice_profile) = env.student("alice@example.test", "Alice").await;
    let (bob, _) = env.student("bob@example.test", "Bob").await;

    let created = env
        .reviews
        .submit(alice, review(tutor_id, 5, "Great tutor"))
        .await
        .unwrap();
    assert_eq!(created.tutor_id, tutor_id);
    assert_eq!(created.student_id, alice_profile);
    assert_eq!(created.rating, 5);
    assert!(created.is_published);

    let err = env
        .reviews
        .submit(alice, review(tutor_id, 2, "Changed my mind"))
        .await
        .unwrap_err();
    assert!(
        matches!(&err, ServiceError::Conflict(msg) if msg.contains("already reviewed")),
        "unexpected error: {err:?}"
    );

    let updated = env
        .reviews
        .update(
            created.id,
            alice,
            ReviewPatch {
                rating: Some(4),
                review_text: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.rating, 4);
    assert_eq!(updated.review_text.as_deref(), Some("Great tutor"));
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at >= created.updated_at);

    let err = env.reviews.delete(created.id, bob).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
    assert_eq!(review_count(&env).await, 1);

    env.reviews.delete(created.id, alice).await.unwrap();
    let listed = env.reviews.list_for_tutor(tutor_id).await.unwrap();
    assert!(listed.is_empty());
    let stats = env.reviews.aggregate(tutor_id).await.unwrap();
    assert_eq!(stats.total_reviews, 0);
    assert_eq!(stats.average_rating(), "0.0");

    let err = env.reviews.delete(created.id, alice).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn duplicate_submit_keeps_original_row() {
    let env = common::setup().await;
    let (_, tutor_id) = env.tutor("tutor@example.test", "Tess").await;
    let (alice, _) = env.student("alice@example.test", "Alice").await;

    env.reviews
        .submit(alice, review(tutor_id, 5, "First"))
        .await
        .unwrap();
    assert!(
        env.reviews
            .submit(alice, review(tutor_id, 1, "Second"))
            .await
            .is_err()
    );

    let rows = reviews::Entity::find()
        .all(env.store.conn())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].rating, 5);
    assert_eq!(rows[0].review_text.as_deref(), Some("First"));
}

#[tokio::test]
async fn unique_index_violation_maps_to_conflict() {
    let env = common::setup().await;
    let (_, tutor_id) = env.tutor("tutor@example.test", "Tess").await;
    let (alice, alice_profile) = env.student("alice@example.test", "Alice").await;

    // Simulates a concurrent writer landing between the lookup and the insert.
    let now = chrono::Utc::now().into();
    reviews::ActiveModel {
        tutor_id: Set(tutor_id),
        student_id: Set(alice_profile),
        rating: Set(3),
        review_text: Set(None),
        is_published: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(env.store.conn())
    .await
    .unwrap();

    let err = env
        .reviews
        .submit(alice, review(tutor_id, 5, "Racing"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
    assert_eq!(review_count(&env).await, 1);
}

#[tokio::test]
async fn out_of_range_ratings_are_rejected_without_writes() {
    let env = common::setup().await;
    let (_, tutor_id) = env.tutor("tutor@example.test", "Tess").await;
    let (alice, _) = env.student("alice@example.test", "Alice").await;

    for rating in [0, 6, -1] {
        let err = env
            .reviews
            .submit(alice, review(tutor_id, rating, "x"))
            .await
            .unwrap_err();
        assert!(
            matches!(&err, ServiceError::InvalidArgument(msg) if msg == "Rating must be between 1 and 5"),
            "rating {rating}: {err:?}"
        );
    }
    assert_eq!(review_count(&env).await, 0);
}

#[tokio::test]
async fn submit_preconditions() {
    let env = common::setup().await;
    let (_, tutor_id) = env.tutor("tutor@example.test", "Tess").await;
    let (alice, _) = env.student("alice@example.test", "Alice").await;
    let bare = env.register("bare@example.test", "student").await;

    let err = env
        .reviews
        .submit(
            alice,
            NewReview {
                tutor_id: Some(tutor_id.into()),
                rating: None,
                review_text: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(&err, ServiceError::InvalidArgument(msg) if msg == "Tutor ID and rating are required"));

    for missing_tutor in [0, -3] {
        let err = env
            .reviews
            .submit(alice, review(missing_tutor, 4, "x"))
            .await
            .unwrap_err();
        assert!(matches!(&err, ServiceError::InvalidArgument(msg) if msg == "Tutor ID and rating are required"));
    }

    let err = env
        .reviews
        .submit(bare, review(tutor_id, 4, "x"))
        .await
        .unwrap_err();
    assert!(matches!(&err, ServiceError::NotFound(msg) if msg.starts_with("Student profile not found")));

    let err = env
        .reviews
        .submit(alice, review(tutor_id + 100, 4, "x"))
        .await
        .unwrap_err();
    assert!(matches!(&err, ServiceError::NotFound(msg) if msg == "Tutor not found"));

    let long = "a".repeat(501);
    let err = env
        .reviews
        .submit(alice, review(tutor_id, 4, &long))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidArgument(_)));
}

#[tokio::test]
async fn deactivated_tutors_cannot_be_reviewed() {
    let env = common::setup().await;
    let (_, tutor_id) = env.tutor("tutor@example.test", "Tess").await;
    let (alice, _) = env.student("alice@example.test", "Alice").await;

    env.accounts
        .set_active("tutor@example.test", false)
        .await
        .unwrap();
    let err = env
        .reviews
        .submit(alice, review(tutor_id, 4, "x"))
        .await
        .unwrap_err();
    assert!(matches!(&err, ServiceError::NotFound(msg) if msg == "Tutor not found"));
}

#[tokio::test]
async fn non_owner_update_leaves_row_unchanged() {
    let env = common::setup().await;
    let (_, tutor_id) = env.tutor("tutor@example.test", "Tess").await;
    let (alice, _) = env.student("alice@example.test", "Alice").await;
    let (bob, _) = env.student("bob@example.test", "Bob").await;

    let created = env
        .reviews
        .submit(alice, review(tutor_id, 5, "Mine"))
        .await
        .unwrap();
    let err = env
        .reviews
        .update(
            created.id,
            bob,
            ReviewPatch {
                rating: Some(1),
                review_text: Some("Hijacked".into()),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(&err, ServiceError::NotFound(msg) if msg.contains("permission to edit")));

    let row = reviews::Entity::find_by_id(created.id)
        .one(env.store.conn())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row, created);
}

#[tokio::test]
async fn update_validates_and_clears_text() {
    let env = common::setup().await;
    let (_, tutor_id) = env.tutor("tutor@example.test", "Tess").await;
    let (alice, _) = env.student("alice@example.test", "Alice").await;
    let created = env
        .reviews
        .submit(alice, review(tutor_id, 5, "Some words"))
        .await
        .unwrap();

    let err = env
        .reviews
        .update(
            created.id,
            alice,
            ReviewPatch {
                rating: Some(9),
                review_text: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidArgument(_)));

    let cleared = env
        .reviews
        .update(
            created.id,
            alice,
            ReviewPatch {
                rating: None,
                review_text: Some("   ".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(cleared.review_text, None);
    assert_eq!(cleared.rating, 5);
}

#[tokio::test]
async fn aggregate_counts_only_published_reviews() {
    let env = common::setup().await;
    let (_, tutor_id) = env.tutor("tutor@example.test", "Tess").await;
    let mut ids = Vec::new();
    for (i, rating) in [5, 4, 4, 2].into_iter().enumerate() {
        let (user, _) = env
            .student(&format!("s{i}@example.test"), &format!("Student {i}"))
            .await;
        let created = env
            .reviews
            .submit(user, review(tutor_id, rating, ""))
            .await
            .unwrap();
        assert_eq!(created.review_text, None);
        ids.push(created.id);
    }

    let stats = env.reviews.aggregate(tutor_id).await.unwrap();
    assert_eq!(stats.total_reviews, 4);
    assert_eq!(stats.average_rating(), "3.8");

    env.reviews.set_published(ids[3], false).await.unwrap();
    let stats = env.reviews.aggregate(tutor_id).await.unwrap();
    assert_eq!(stats.total_reviews, 3);
    assert_eq!(stats.average_rating(), "4.3");

    let listed = env.reviews.list_for_tutor(tutor_id).await.unwrap();
    assert_eq!(listed.len(), 3);
    assert!(listed.iter().all(|r| r.review.is_published));
    assert_eq!(listed[0].review.id, ids[2]);
    assert_eq!(listed[0].student_name.as_deref(), Some("Student 2"));
}

#[tokio::test]
async fn my_reviews_include_unpublished_and_tutor_details() {
    let env = common::setup().await;
    let (_, first) = env.tutor("t1@example.test", "First Tutor").await;
    let (_, second) = env.tutor("t2@example.test", "Second Tutor").await;
    let (alice, _) = env.student("alice@example.test", "Alice").await;

    let a = env
        .reviews
        .submit(alice, review(first, 5, "one"))
        .await
        .unwrap();
    env.reviews
        .submit(alice, review(second, 3, "two"))
        .await
        .unwrap();
    env.reviews.set_published(a.id, false).await.unwrap();

    let mine = env.reviews.list_mine(alice).await.unwrap();
    assert_eq!(mine.len(), 2);
    assert_eq!(mine[0].tutor_name.as_deref(), Some("Second Tutor"));
    assert_eq!(mine[1].tutor_name.as_deref(), Some("First Tutor"));
    assert!(!mine[1].review.is_published);

    let json = serde_json::to_value(&mine[0]).unwrap();
    assert_eq!(json["tutor_id"], second);
    assert_eq!(json["tutor_name"], "Second Tutor");
    assert_eq!(json["review_text"], "two");

    let bare = env.register("bare@example.test", "student").await;
    let err = env.reviews.list_mine(bare).await.unwrap_err();
    assert!(matches!(&err, ServiceError::NotFound(msg) if msg == "Student profile not found"));
}

#[tokio::test]
async fn can_review_reports_reason() {
    let env = common::setup().await;
    let (_, tutor_id) = env.tutor("tutor@example.test", "Tess").await;
    let (alice, _) = env.student("alice@example.test", "Alice").await;
    let bare = env.register("bare@example.test", "student").await;

    let check = env.reviews.can_review(tutor_id, bare).await.unwrap();
    assert!(!check.can_review);
    assert_eq!(check.reason, Some("No profile"));

    let check = env.reviews.can_review(tutor_id, alice).await.unwrap();
    assert!(check.can_review);
    assert!(check.reason.is_none());

    let check = env.reviews.can_review(tutor_id + 100, alice).await.unwrap();
    assert!(check.can_review);
    let err = env
        .reviews
        .submit(alice, review(tutor_id + 100, 4, "x"))
        .await
        .unwrap_err();
    assert!(matches!(&err, ServiceError::NotFound(msg) if msg == "Tutor not found"));

    let created = env
        .reviews
        .submit(alice, review(tutor_id, 4, "ok"))
        .await
        .unwrap();
    let check = env.reviews.can_review(tutor_id, alice).await.unwrap();
    assert!(!check.can_review);
    assert_eq!(check.reason, Some("Already reviewed"));
    assert_eq!(check.existing_review.map(|r| r.id), Some(created.id));
}

#[tokio::test]
async fn removing_a_profile_cascades_to_its_reviews() {
    let env = common::setup().await;
    let (_, tutor_id) = env.tutor("tutor@example.test", "Tess").await;
    let (alice, alice_profile) = env.student("alice@example.test", "Alice").await;
    env.reviews
        .submit(alice, review(tutor_id, 4, "ok"))
        .await
        .unwrap();

    entity::student_profiles::Entity::delete_by_id(alice_profile)
        .exec(env.store.conn())
        .await
        .unwrap();
    assert_eq!(review_count(&env).await, 0);
}
