#![allow(dead_code)]

use std::time::Duration;

use migration::{Migrator, MigratorTrait};
use platform_authn::AuthConfig;
use products_tutoring::{
    AccountService, Registration, ReviewService, Store, StudentProfileInput, StudentService,
    TutorProfileInput, TutorService,
};
use sea_orm::Database;

pub struct TestEnv {
    pub store: Store,
    pub accounts: AccountService,
    pub tutors: TutorService,
    pub students: StudentService,
    pub reviews: ReviewService,
}

pub async fn setup() -> TestEnv {
    let conn = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&conn, None).await.unwrap();
    let store = Store::new(conn, Duration::from_secs(5));
    TestEnv {
        accounts: AccountService::new(store.clone(), AuthConfig::new("test-secret")),
        tutors: TutorService::new(store.clone()),
        students: StudentService::new(store.clone()),
        reviews: ReviewService::new(store.clone()),
        store,
    }
}

impl TestEnv {
    pub async fn register(&self, email: &str, role: &str) -> i32 {
        self.accounts
            .register(Registration {
                email: Some(email.into()),
                password: Some("password123".into()),
                role: Some(role.into()),
            })
            .await
            .unwrap()
            .user
            .id
    }

    /// Returns (user id, tutor profile id).
    pub async fn tutor(&self, email: &str, name: &str) -> (i32, i32) {
        let user_id = self.register(email, "tutor").await;
        let profile = self
            .tutors
            .save(
                user_id,
                TutorProfileInput {
                    display_name: Some(name.into()),
                    subjects: Some(vec!["Mathematics".into()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        (user_id, profile.id)
    }

    /// Returns (user id, student profile id).
    pub async fn student(&self, email: &str, name: &str) -> (i32, i32) {
        let user_id = self.register(email, "student").await;
        let profile = self
            .students
            .save(
                user_id,
                StudentProfileInput {
                    display_name: Some(name.into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        (user_id, profile.id)
    }
}
