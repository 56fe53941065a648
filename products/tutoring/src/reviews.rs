//! Star-rating reviews left by students for tutors.
//!
//! A student has at most one review per tutor. The schema enforces this with
//! `idx_reviews_tutor_student`; the lookup in [`ReviewService::submit`] only
//! exists to produce a friendlier message, and a unique violation that slips
//! past it is reported the same way.
//!
//! Every mutation is scoped by a [`ReviewOwner`], which can only be obtained
//! by resolving the caller's student profile on the server.

use entity::{reviews, student_profiles, tutor_profiles, users};
use platform_db::Store;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, FromQueryResult, QueryFilter,
    QueryOrder, QuerySelect,
};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use tracing::instrument;

use crate::error::{ServiceError, ServiceResult};
use crate::validate::{flexible_int, max_chars, now, optional_text};

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;
pub const MAX_REVIEW_TEXT_CHARS: usize = 500;

pub const MSG_REQUIRED: &str = "Tutor ID and rating are required";
pub const MSG_RATING_RANGE: &str = "Rating must be between 1 and 5";
pub const MSG_PROFILE_REQUIRED: &str =
    "Student profile not found. Please complete your profile first.";
pub const MSG_STUDENT_PROFILE_NOT_FOUND: &str = "Student profile not found";
pub const MSG_TUTOR_NOT_FOUND: &str = "Tutor not found";
pub const MSG_ALREADY_REVIEWED: &str =
    "You have already reviewed this tutor. You can edit your existing review.";
pub const MSG_EDIT_NOT_FOUND: &str = "Review not found or you don't have permission to edit it";
pub const MSG_DELETE_NOT_FOUND: &str =
    "Review not found or you don't have permission to delete it";
pub const REASON_NO_PROFILE: &str = "No profile";
pub const REASON_ALREADY_REVIEWED: &str = "Already reviewed";

/// Student profile id of the caller, used as the ownership predicate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReviewOwner(i32);

impl ReviewOwner {
    pub fn student_id(self) -> i32 {
        self.0
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    #[serde(default, deserialize_with = "flexible_int")]
    pub tutor_id: Option<i64>,
    #[serde(default, deserialize_with = "flexible_int")]
    pub rating: Option<i64>,
    #[serde(default)]
    pub review_text: Option<String>,
}

/// Merge-patch: absent fields keep their value, an empty `review_text`
/// clears it.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPatch {
    #[serde(default, deserialize_with = "flexible_int")]
    pub rating: Option<i64>,
    #[serde(default)]
    pub review_text: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReviewWithStudent {
    #[serde(flatten)]
    pub review: reviews::Model,
    pub student_name: Option<String>,
    pub student_picture: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReviewWithTutor {
    #[serde(flatten)]
    pub review: reviews::Model,
    pub tutor_name: Option<String>,
    pub tutor_picture: Option<String>,
}

/// Count and rating total of a tutor's published reviews.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RatingSummary {
    pub total_reviews: i64,
    pub rating_sum: i64,
}

impl RatingSummary {
    pub fn mean(&self) -> f64 {
        if self.total_reviews == 0 {
            0.0
        } else {
            self.rating_sum as f64 / self.total_reviews as f64
        }
    }

    /// Mean rounded half away from zero to one decimal, e.g. `"4.3"`.
    pub fn average_rating(&self) -> String {
        format!("{:.1}", (self.mean() * 10.0).round() / 10.0)
    }
}

impl Serialize for RatingSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("RatingSummary", 2)?;
        state.serialize_field("totalReviews", &self.total_reviews)?;
        state.serialize_field("averageRating", &self.average_rating())?;
        state.end()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanReview {
    pub can_review: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_review: Option<reviews::Model>,
}

#[derive(Debug, FromQueryResult)]
struct RatingTotals {
    total: i64,
    rating_sum: Option<i64>,
}

#[derive(Clone, Debug)]
pub struct ReviewService {
    store: Store,
}

impl ReviewService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    async fn owner(&self, user_id: i32) -> ServiceResult<Option<ReviewOwner>> {
        let profile = self
            .store
            .run(
                student_profiles::Entity::find()
                    .filter(student_profiles::Column::UserId.eq(user_id))
                    .one(self.store.conn()),
            )
            .await?;
        Ok(profile.map(|p| ReviewOwner(p.id)))
    }

    async fn require_owner(&self, user_id: i32, message: &str) -> ServiceResult<ReviewOwner> {
        self.owner(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(message))
    }

    async fn existing(
        &self,
        tutor_id: i32,
        owner: ReviewOwner,
    ) -> ServiceResult<Option<reviews::Model>> {
        let review = self
            .store
            .run(
                reviews::Entity::find()
                    .filter(reviews::Column::TutorId.eq(tutor_id))
                    .filter(reviews::Column::StudentId.eq(owner.0))
                    .one(self.store.conn()),
            )
            .await?;
        Ok(review)
    }

    async fn tutor_is_reviewable(&self, tutor_id: i32) -> ServiceResult<bool> {
        let found = self
            .store
            .run(
                tutor_profiles::Entity::find_by_id(tutor_id)
                    .find_also_related(users::Entity)
                    .one(self.store.conn()),
            )
            .await?;
        Ok(matches!(found, Some((_, Some(user))) if user.is_active))
    }

    #[instrument(skip(self, input), fields(tutor_id = ?input.tutor_id))]
    pub async fn submit(&self, user_id: i32, input: NewReview) -> ServiceResult<reviews::Model> {
        let tutor_id = input.tutor_id.filter(|id| *id > 0);
        let (Some(tutor_id), Some(rating)) = (tutor_id, input.rating) else {
            return Err(ServiceError::invalid(MSG_REQUIRED));
        };
        let rating = checked_rating(rating)?;
        let text = optional_text(input.review_text);
        max_chars("Review text", text.as_deref(), MAX_REVIEW_TEXT_CHARS)?;

        let owner = self.require_owner(user_id, MSG_PROFILE_REQUIRED).await?;
        let tutor_id =
            i32::try_from(tutor_id).map_err(|_| ServiceError::not_found(MSG_TUTOR_NOT_FOUND))?;
        if !self.tutor_is_reviewable(tutor_id).await? {
            return Err(ServiceError::not_found(MSG_TUTOR_NOT_FOUND));
        }
        if self.existing(tutor_id, owner).await?.is_some() {
            return Err(ServiceError::conflict(MSG_ALREADY_REVIEWED));
        }

        let now = now();
        let model = reviews::ActiveModel {
            tutor_id: Set(tutor_id),
            student_id: Set(owner.0),
            rating: Set(rating),
            review_text: Set(text),
            is_published: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        match self.store.run(model.insert(self.store.conn())).await {
            Ok(review) => {
                tracing::info!(review_id = review.id, "review submitted");
                Ok(review)
            }
            Err(err) if err.is_unique_violation() => {
                Err(ServiceError::conflict(MSG_ALREADY_REVIEWED))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Published reviews for a tutor, newest first.
    pub async fn list_for_tutor(&self, tutor_id: i32) -> ServiceResult<Vec<ReviewWithStudent>> {
        let rows = self
            .store
            .run(
                reviews::Entity::find()
                    .filter(reviews::Column::TutorId.eq(tutor_id))
                    .filter(reviews::Column::IsPublished.eq(true))
                    .find_also_related(student_profiles::Entity)
                    .order_by_desc(reviews::Column::CreatedAt)
                    .order_by_desc(reviews::Column::Id)
                    .all(self.store.conn()),
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(|(review, student)| ReviewWithStudent {
                review,
                student_name: student.as_ref().map(|s| s.display_name.clone()),
                student_picture: student.and_then(|s| s.profile_picture_url),
            })
            .collect())
    }

    pub async fn aggregate(&self, tutor_id: i32) -> ServiceResult<RatingSummary> {
        let totals = self
            .store
            .run(
                reviews::Entity::find()
                    .select_only()
                    .column_as(Expr::col(reviews::Column::Id).count(), "total")
                    .column_as(Expr::col(reviews::Column::Rating).sum(), "rating_sum")
                    .filter(reviews::Column::TutorId.eq(tutor_id))
                    .filter(reviews::Column::IsPublished.eq(true))
                    .into_model::<RatingTotals>()
                    .one(self.store.conn()),
            )
            .await?;
        Ok(totals
            .map(|t| RatingSummary {
                total_reviews: t.total,
                rating_sum: t.rating_sum.unwrap_or(0),
            })
            .unwrap_or_default())
    }

    /// Every review the caller wrote, published or not.
    pub async fn list_mine(&self, user_id: i32) -> ServiceResult<Vec<ReviewWithTutor>> {
        let owner = self
            .require_owner(user_id, MSG_STUDENT_PROFILE_NOT_FOUND)
            .await?;
        let rows = self
            .store
            .run(
                reviews::Entity::find()
                    .filter(reviews::Column::StudentId.eq(owner.0))
                    .find_also_related(tutor_profiles::Entity)
                    .order_by_desc(reviews::Column::CreatedAt)
                    .order_by_desc(reviews::Column::Id)
                    .all(self.store.conn()),
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(|(review, tutor)| ReviewWithTutor {
                review,
                tutor_name: tutor.as_ref().map(|t| t.display_name.clone()),
                tutor_picture: tutor.and_then(|t| t.profile_picture_url),
            })
            .collect())
    }

    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        review_id: i32,
        user_id: i32,
        patch: ReviewPatch,
    ) -> ServiceResult<reviews::Model> {
        let owner = self
            .require_owner(user_id, MSG_STUDENT_PROFILE_NOT_FOUND)
            .await?;
        let rating = patch.rating.map(checked_rating).transpose()?;
        let text = patch.review_text.map(|t| optional_text(Some(t)));
        if let Some(text) = &text {
            max_chars("Review text", text.as_deref(), MAX_REVIEW_TEXT_CHARS)?;
        }

        let mut update = reviews::Entity::update_many()
            .col_expr(reviews::Column::UpdatedAt, Expr::value(now()))
            .filter(reviews::Column::Id.eq(review_id))
            .filter(reviews::Column::StudentId.eq(owner.0));
        if let Some(rating) = rating {
            update = update.col_expr(reviews::Column::Rating, Expr::value(rating));
        }
        if let Some(text) = text {
            update = update.col_expr(reviews::Column::ReviewText, Expr::value(text));
        }

        let result = self.store.run(update.exec(self.store.conn())).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found(MSG_EDIT_NOT_FOUND));
        }
        self.find(review_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(MSG_EDIT_NOT_FOUND))
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, review_id: i32, user_id: i32) -> ServiceResult<()> {
        let owner = self
            .require_owner(user_id, MSG_STUDENT_PROFILE_NOT_FOUND)
            .await?;
        let result = self
            .store
            .run(
                reviews::Entity::delete_many()
                    .filter(reviews::Column::Id.eq(review_id))
                    .filter(reviews::Column::StudentId.eq(owner.0))
                    .exec(self.store.conn()),
            )
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found(MSG_DELETE_NOT_FOUND));
        }
        Ok(())
    }

    /// Only checks the caller's side: a missing or deactivated tutor still
    /// reports `can_review: true`, and [`ReviewService::submit`] rejects it.
    pub async fn can_review(&self, tutor_id: i32, user_id: i32) -> ServiceResult<CanReview> {
        let Some(owner) = self.owner(user_id).await? else {
            return Ok(CanReview {
                can_review: false,
                reason: Some(REASON_NO_PROFILE),
                existing_review: None,
            });
        };
        Ok(match self.existing(tutor_id, owner).await? {
            Some(review) => CanReview {
                can_review: false,
                reason: Some(REASON_ALREADY_REVIEWED),
                existing_review: Some(review),
            },
            None => CanReview {
                can_review: true,
                reason: None,
                existing_review: None,
            },
        })
    }

    /// Moderation: hide or restore a review regardless of its author.
    #[instrument(skip(self))]
    pub async fn set_published(
        &self,
        review_id: i32,
        published: bool,
    ) -> ServiceResult<reviews::Model> {
        let result = self
            .store
            .run(
                reviews::Entity::update_many()
                    .col_expr(reviews::Column::IsPublished, Expr::value(published))
                    .col_expr(reviews::Column::UpdatedAt, Expr::value(now()))
                    .filter(reviews::Column::Id.eq(review_id))
                    .exec(self.store.conn()),
            )
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Review not found"));
        }
        tracing::info!(review_id, published, "review visibility changed");
        self.find(review_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Review not found"))
    }

    async fn find(&self, review_id: i32) -> ServiceResult<Option<reviews::Model>> {
        let review = self
            .store
            .run(reviews::Entity::find_by_id(review_id).one(self.store.conn()))
            .await?;
        Ok(review)
    }
}

fn checked_rating(rating: i64) -> ServiceResult<i32> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(ServiceError::invalid(MSG_RATING_RANGE));
    }
    Ok(rating as i32)
}
