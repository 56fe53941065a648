//! Demo data for local development. Safe to run repeatedly.

use entity::{reviews, student_profiles, tutor_profiles, users};
use platform_authn::AuthConfig;
use platform_db::Store;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use crate::accounts::{AccountService, Registration};
use crate::error::{ServiceError, ServiceResult};
use crate::reviews::{NewReview, ReviewService};
use crate::students::{StudentProfileInput, StudentService};
use crate::tutors::{TutorProfileInput, TutorService};

pub const DEMO_PASSWORD: &str = "password123";
pub const DEMO_TUTOR_EMAIL: &str = "tutor@geniusprep.dev";
pub const DEMO_STUDENT_EMAILS: [&str; 2] = ["student1@geniusprep.dev", "student2@geniusprep.dev"];

#[derive(Debug, Clone)]
pub struct SeededRecords {
    pub tutor: tutor_profiles::Model,
    pub students: Vec<student_profiles::Model>,
    pub reviews: Vec<reviews::Model>,
}

pub async fn seed_demo(store: &Store, auth: &AuthConfig) -> ServiceResult<SeededRecords> {
    let accounts = AccountService::new(store.clone(), auth.clone());
    let tutors = TutorService::new(store.clone());
    let students = StudentService::new(store.clone());
    let review_service = ReviewService::new(store.clone());

    let tutor_user = ensure_user(store, &accounts, DEMO_TUTOR_EMAIL, "tutor").await?;
    let tutor = tutors
        .save(
            tutor_user.id,
            TutorProfileInput {
                display_name: Some("Dr. Ada Byron".into()),
                bio: Some("Mathematics and computing tutor with a soft spot for proofs.".into()),
                qualifications: Some("PhD Mathematics".into()),
                subjects: Some(vec!["Mathematics".into(), "Computer Science".into()]),
                module_codes: Some(vec!["MATH1001".into(), "CS101".into()]),
                hourly_rate: Some(45.0),
                years_experience: Some(8),
                ..Default::default()
            },
        )
        .await?;

    let demo_students = [
        ("Grace H.", "Undergraduate", 5, "Clear explanations and great examples."),
        ("Linus T.", "High School", 4, "Helped me get through calculus."),
    ];
    let mut seeded_students = Vec::new();
    let mut seeded_reviews = Vec::new();
    for (email, (name, level, rating, text)) in DEMO_STUDENT_EMAILS.iter().zip(demo_students) {
        let user = ensure_user(store, &accounts, email, "student").await?;
        let profile = students
            .save(
                user.id,
                StudentProfileInput {
                    display_name: Some(name.into()),
                    education_level: Some(level.into()),
                    subjects_interested: Some(vec!["Mathematics".into()]),
                    ..Default::default()
                },
            )
            .await?;

        let review = match review_service
            .submit(
                user.id,
                NewReview {
                    tutor_id: Some(tutor.id.into()),
                    rating: Some(rating),
                    review_text: Some(text.into()),
                },
            )
            .await
        {
            Ok(review) => review,
            Err(ServiceError::Conflict(_)) => existing_review(store, tutor.id, profile.id).await?,
            Err(err) => return Err(err),
        };
        seeded_students.push(profile);
        seeded_reviews.push(review);
    }

    tracing::info!(
        tutor_id = tutor.id,
        students = seeded_students.len(),
        reviews = seeded_reviews.len(),
        "demo data ready"
    );
    Ok(SeededRecords {
        tutor,
        students: seeded_students,
        reviews: seeded_reviews,
    })
}

async fn ensure_user(
    store: &Store,
    accounts: &AccountService,
    email: &str,
    role: &str,
) -> ServiceResult<users::Model> {
    let existing = store
        .run(
            users::Entity::find()
                .filter(users::Column::Email.eq(email))
                .one(store.conn()),
        )
        .await?;
    if let Some(user) = existing {
        return Ok(user);
    }
    let session = accounts
        .register(Registration {
            email: Some(email.into()),
            password: Some(DEMO_PASSWORD.into()),
            role: Some(role.into()),
        })
        .await?;
    accounts
        .find(session.user.id)
        .await?
        .ok_or_else(|| ServiceError::Internal(anyhow::anyhow!("seeded user {email} vanished")))
}

async fn existing_review(
    store: &Store,
    tutor_id: i32,
    student_id: i32,
) -> ServiceResult<reviews::Model> {
    store
        .run(
            reviews::Entity::find()
                .filter(reviews::Column::TutorId.eq(tutor_id))
                .filter(reviews::Column::StudentId.eq(student_id))
                .one(store.conn()),
        )
        .await?
        .ok_or_else(|| ServiceError::Internal(anyhow::anyhow!("seeded review vanished")))
}
