use entity::tutor_profiles::{self, Availability};
use entity::users::{self, Role};
use platform_db::Store;
use sea_orm::sea_query::{Expr, OnConflict, SimpleExpr};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseBackend, EntityTrait, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{ServiceError, ServiceResult};
use crate::validate::{
    flexible_int, max_chars, normalize_list, normalize_module_code, normalize_module_codes, now,
    optional_text, required_text,
};

pub const MAX_BIO_CHARS: usize = 2000;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorProfileInput {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub qualifications: Option<String>,
    #[serde(default)]
    pub subjects: Option<Vec<String>>,
    #[serde(default)]
    pub module_codes: Option<Vec<String>>,
    #[serde(default)]
    pub hourly_rate: Option<f64>,
    #[serde(default, deserialize_with = "flexible_int")]
    pub years_experience: Option<i64>,
    #[serde(default)]
    pub availability_status: Option<String>,
    #[serde(default)]
    pub profile_picture_url: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryFilter {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub availability_status: Option<String>,
    #[serde(default)]
    pub module_code: Option<String>,
}

/// Tutor profile as shown to other users.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PublicTutor {
    #[serde(flatten)]
    pub profile: tutor_profiles::Model,
    pub email: String,
    pub is_verified: bool,
}

#[derive(Clone, Debug)]
pub struct TutorService {
    store: Store,
}

impl TutorService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    async fn require_tutor(&self, user_id: i32) -> ServiceResult<()> {
        let user = self
            .store
            .run(users::Entity::find_by_id(user_id).one(self.store.conn()))
            .await?;
        match user {
            Some(user) if user.role == Role::Tutor => Ok(()),
            Some(_) => Err(ServiceError::forbidden(
                "Only tutors can manage a tutor profile",
            )),
            None => Err(ServiceError::not_found("User not found")),
        }
    }

    async fn by_user(&self, user_id: i32) -> ServiceResult<Option<tutor_profiles::Model>> {
        let profile = self
            .store
            .run(
                tutor_profiles::Entity::find()
                    .filter(tutor_profiles::Column::UserId.eq(user_id))
                    .one(self.store.conn()),
            )
            .await?;
        Ok(profile)
    }

    /// Create or wholesale replace the caller's profile. The availability
    /// status is left alone when the input omits it.
    #[instrument(skip(self, input))]
    pub async fn save(
        &self,
        user_id: i32,
        input: TutorProfileInput,
    ) -> ServiceResult<tutor_profiles::Model> {
        self.require_tutor(user_id).await?;

        let display_name = required_text(input.display_name, "Display name is required")?;
        max_chars("Display name", Some(&display_name), 100)?;
        let bio = optional_text(input.bio);
        max_chars("Bio", bio.as_deref(), MAX_BIO_CHARS)?;
        let subjects = normalize_list(input.subjects.unwrap_or_default());
        let module_codes = normalize_module_codes(input.module_codes.unwrap_or_default())?;
        if let Some(rate) = input.hourly_rate {
            if !rate.is_finite() || rate < 0.0 {
                return Err(ServiceError::invalid("Hourly rate must be a non-negative number"));
            }
        }
        let years_experience = input
            .years_experience
            .map(|years| {
                i32::try_from(years)
                    .ok()
                    .filter(|y| *y >= 0)
                    .ok_or_else(|| ServiceError::invalid("Years of experience must be non-negative"))
            })
            .transpose()?;
        let availability = input
            .availability_status
            .as_deref()
            .map(|raw| {
                Availability::parse(raw).ok_or_else(|| {
                    ServiceError::invalid("Availability status must be active or inactive")
                })
            })
            .transpose()?;

        let now = now();
        let model = tutor_profiles::ActiveModel {
            user_id: Set(user_id),
            display_name: Set(display_name),
            bio: Set(bio),
            qualifications: Set(optional_text(input.qualifications)),
            subjects: Set(subjects),
            module_codes: Set(module_codes),
            hourly_rate: Set(input.hourly_rate),
            years_experience: Set(years_experience),
            availability_status: Set(availability.unwrap_or_default()),
            profile_picture_url: Set(optional_text(input.profile_picture_url)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let mut replace = vec![
            tutor_profiles::Column::DisplayName,
            tutor_profiles::Column::Bio,
            tutor_profiles::Column::Qualifications,
            tutor_profiles::Column::Subjects,
            tutor_profiles::Column::ModuleCodes,
            tutor_profiles::Column::HourlyRate,
            tutor_profiles::Column::YearsExperience,
            tutor_profiles::Column::ProfilePictureUrl,
            tutor_profiles::Column::UpdatedAt,
        ];
        if availability.is_some() {
            replace.push(tutor_profiles::Column::AvailabilityStatus);
        }

        self.store
            .run(
                tutor_profiles::Entity::insert(model)
                    .on_conflict(
                        OnConflict::column(tutor_profiles::Column::UserId)
                            .update_columns(replace)
                            .to_owned(),
                    )
                    .exec_without_returning(self.store.conn()),
            )
            .await?;

        self.by_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::Internal(anyhow::anyhow!("saved tutor profile vanished")))
    }

    pub async fn mine(&self, user_id: i32) -> ServiceResult<tutor_profiles::Model> {
        self.by_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Profile not found"))
    }

    /// Public view by profile id; hidden once the owner is deactivated.
    pub async fn public(&self, profile_id: i32) -> ServiceResult<PublicTutor> {
        let found = self
            .store
            .run(
                tutor_profiles::Entity::find_by_id(profile_id)
                    .find_also_related(users::Entity)
                    .one(self.store.conn()),
            )
            .await?;
        match found {
            Some((profile, Some(user))) if user.is_active => Ok(PublicTutor {
                profile,
                email: user.email,
                is_verified: user.is_verified,
            }),
            _ => Err(ServiceError::not_found("Tutor not found")),
        }
    }

    /// Profiles of active users, newest first.
    pub async fn directory(&self, filter: DirectoryFilter) -> ServiceResult<Vec<PublicTutor>> {
        let backend = self.store.backend();
        let mut query = tutor_profiles::Entity::find()
            .find_also_related(users::Entity)
            .filter(users::Column::IsActive.eq(true));

        if let Some(subject) = optional_text(filter.subject) {
            query = query.filter(list_contains(backend, "subjects", &subject));
        }
        if let Some(raw) = optional_text(filter.availability_status) {
            let status = Availability::parse(&raw).ok_or_else(|| {
                ServiceError::invalid("Availability status must be active or inactive")
            })?;
            query = query.filter(tutor_profiles::Column::AvailabilityStatus.eq(status));
        }
        if let Some(raw) = optional_text(filter.module_code) {
            let code = normalize_module_code(&raw).unwrap_or_else(|| raw.to_ascii_uppercase());
            query = query.filter(list_contains(backend, "module_codes", &code));
        }

        let rows = self
            .store
            .run(
                query
                    .order_by_desc(tutor_profiles::Column::CreatedAt)
                    .order_by_desc(tutor_profiles::Column::Id)
                    .all(self.store.conn()),
            )
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|(profile, user)| {
                user.map(|user| PublicTutor {
                    profile,
                    email: user.email,
                    is_verified: user.is_verified,
                })
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn toggle_availability(&self, user_id: i32) -> ServiceResult<Availability> {
        let flipped = Expr::cust(
            "CASE WHEN availability_status = 'active' THEN 'inactive' ELSE 'active' END",
        );
        let result = self
            .store
            .run(
                tutor_profiles::Entity::update_many()
                    .col_expr(tutor_profiles::Column::AvailabilityStatus, flipped)
                    .col_expr(tutor_profiles::Column::UpdatedAt, Expr::value(now()))
                    .filter(tutor_profiles::Column::UserId.eq(user_id))
                    .exec(self.store.conn()),
            )
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Profile not found"));
        }
        Ok(self.mine(user_id).await?.availability_status)
    }
}

/// Membership test against a JSON array column of `tutor_profiles`.
fn list_contains(backend: DatabaseBackend, column: &str, value: &str) -> SimpleExpr {
    match backend {
        DatabaseBackend::Postgres => Expr::cust_with_values(
            format!(r#""tutor_profiles"."{column}" @> ?"#),
            [serde_json::json!([value])],
        ),
        _ => Expr::cust_with_values(
            format!(
                r#"EXISTS (SELECT 1 FROM json_each("tutor_profiles"."{column}") WHERE json_each.value = ?)"#
            ),
            [value.to_string()],
        ),
    }
}
