use sea_orm::entity::prelude::*;
use serde::Serialize;

/// Star rating left by a student for a tutor.
///
/// `(tutor_id, student_id)` is unique in the schema; at most one review
/// exists per pair.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "reviews")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub tutor_id: i32,
    #[sea_orm(indexed)]
    pub student_id: i32,
    pub rating: i32,
    #[sea_orm(column_type = "Text", nullable)]
    pub review_text: Option<String>,
    pub is_published: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tutor_profiles::Entity",
        from = "Column::TutorId",
        to = "super::tutor_profiles::Column::Id",
        on_delete = "Cascade"
    )]
    Tutor,
    #[sea_orm(
        belongs_to = "super::student_profiles::Entity",
        from = "Column::StudentId",
        to = "super::student_profiles::Column::Id",
        on_delete = "Cascade"
    )]
    Student,
}

impl Related<super::tutor_profiles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tutor.def()
    }
}

impl Related<super::student_profiles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
