use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::StringList;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "tutor_profiles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub user_id: i32,
    pub display_name: String,
    pub bio: Option<String>,
    pub qualifications: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub subjects: StringList,
    #[sea_orm(column_type = "JsonBinary")]
    pub module_codes: StringList,
    pub hourly_rate: Option<f64>,
    pub years_experience: Option<i32>,
    pub availability_status: Availability,
    pub profile_picture_url: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(has_many = "super::reviews::Entity")]
    Review,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::reviews::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Review.def()
    }
}

#[derive(
    Copy, Clone, Debug, Default, EnumIter, DeriveActiveEnum, Eq, PartialEq, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    #[default]
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
}

impl Availability {
    pub fn toggled(self) -> Self {
        match self {
            Availability::Active => Availability::Inactive,
            Availability::Inactive => Availability::Active,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "active" => Some(Availability::Active),
            "inactive" => Some(Availability::Inactive),
            _ => None,
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}
