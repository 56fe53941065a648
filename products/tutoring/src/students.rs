use entity::student_profiles;
use entity::users::{self, Role};
use platform_db::Store;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};
use serde::Deserialize;
use tracing::instrument;

use crate::error::{ServiceError, ServiceResult};
use crate::validate::{max_chars, normalize_list, now, optional_text, required_text};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfileInput {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub education_level: Option<String>,
    #[serde(default)]
    pub subjects_interested: Option<Vec<String>>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub profile_picture_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct StudentService {
    store: Store,
}

impl StudentService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    #[instrument(skip(self, input))]
    pub async fn save(
        &self,
        user_id: i32,
        input: StudentProfileInput,
    ) -> ServiceResult<student_profiles::Model> {
        let user = self
            .store
            .run(users::Entity::find_by_id(user_id).one(self.store.conn()))
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))?;
        if user.role != Role::Student {
            return Err(ServiceError::forbidden(
                "Only students can manage a student profile",
            ));
        }

        let display_name = required_text(input.display_name, "Display name is required")?;
        max_chars("Display name", Some(&display_name), 100)?;
        let education_level = optional_text(input.education_level);
        max_chars("Education level", education_level.as_deref(), 100)?;
        let location = optional_text(input.location);
        max_chars("Location", location.as_deref(), 200)?;

        let now = now();
        let model = student_profiles::ActiveModel {
            user_id: Set(user_id),
            display_name: Set(display_name),
            education_level: Set(education_level),
            subjects_interested: Set(normalize_list(
                input.subjects_interested.unwrap_or_default(),
            )),
            location: Set(location),
            profile_picture_url: Set(optional_text(input.profile_picture_url)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        self.store
            .run(
                student_profiles::Entity::insert(model)
                    .on_conflict(
                        OnConflict::column(student_profiles::Column::UserId)
                            .update_columns([
                                student_profiles::Column::DisplayName,
                                student_profiles::Column::EducationLevel,
                                student_profiles::Column::SubjectsInterested,
                                student_profiles::Column::Location,
                                student_profiles::Column::ProfilePictureUrl,
                                student_profiles::Column::UpdatedAt,
                            ])
                            .to_owned(),
                    )
                    .exec_without_returning(self.store.conn()),
            )
            .await?;

        self.find(user_id).await?.ok_or_else(|| {
            ServiceError::Internal(anyhow::anyhow!("saved student profile vanished"))
        })
    }

    pub async fn mine(&self, user_id: i32) -> ServiceResult<student_profiles::Model> {
        self.find(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Profile not found"))
    }

    async fn find(&self, user_id: i32) -> ServiceResult<Option<student_profiles::Model>> {
        let profile = self
            .store
            .run(
                student_profiles::Entity::find()
                    .filter(student_profiles::Column::UserId.eq(user_id))
                    .one(self.store.conn()),
            )
            .await?;
        Ok(profile)
    }
}
