use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum TutorProfiles {
    Table,
    Id,
    UserId,
    DisplayName,
    Bio,
    Qualifications,
    Subjects,
    ModuleCodes,
    HourlyRate,
    YearsExperience,
    AvailabilityStatus,
    ProfilePictureUrl,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum StudentProfiles {
    Table,
    Id,
    UserId,
    DisplayName,
    EducationLevel,
    SubjectsInterested,
    Location,
    ProfilePictureUrl,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TutorProfiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TutorProfiles::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TutorProfiles::UserId).integer().not_null())
                    .col(
                        ColumnDef::new(TutorProfiles::DisplayName)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(ColumnDef::new(TutorProfiles::Bio).text())
                    .col(ColumnDef::new(TutorProfiles::Qualifications).text())
                    .col(&mut json_list(TutorProfiles::Subjects))
                    .col(&mut json_list(TutorProfiles::ModuleCodes))
                    .col(ColumnDef::new(TutorProfiles::HourlyRate).double())
                    .col(ColumnDef::new(TutorProfiles::YearsExperience).integer())
                    .col(
                        ColumnDef::new(TutorProfiles::AvailabilityStatus)
                            .string_len(16)
                            .not_null()
                            .default("active")
                            .check(
                                Expr::col(TutorProfiles::AvailabilityStatus)
                                    .is_in(["active", "inactive"]),
                            ),
                    )
                    .col(ColumnDef::new(TutorProfiles::ProfilePictureUrl).string_len(1024))
                    .col(&mut timestamp(TutorProfiles::CreatedAt))
                    .col(&mut timestamp(TutorProfiles::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tutor_profiles_user")
                            .from(TutorProfiles::Table, TutorProfiles::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tutor_profiles_user")
                    .table(TutorProfiles::Table)
                    .col(TutorProfiles::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tutor_profiles_availability")
                    .table(TutorProfiles::Table)
                    .col(TutorProfiles::AvailabilityStatus)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(StudentProfiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StudentProfiles::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(StudentProfiles::UserId).integer().not_null())
                    .col(
                        ColumnDef::new(StudentProfiles::DisplayName)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(ColumnDef::new(StudentProfiles::EducationLevel).string_len(100))
                    .col(&mut json_list(StudentProfiles::SubjectsInterested))
                    .col(ColumnDef::new(StudentProfiles::Location).string_len(200))
                    .col(ColumnDef::new(StudentProfiles::ProfilePictureUrl).string_len(1024))
                    .col(&mut timestamp(StudentProfiles::CreatedAt))
                    .col(&mut timestamp(StudentProfiles::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_student_profiles_user")
                            .from(StudentProfiles::Table, StudentProfiles::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_student_profiles_user")
                    .table(StudentProfiles::Table)
                    .col(StudentProfiles::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(StudentProfiles::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(TutorProfiles::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}

fn json_list<T: IntoIden>(column: T) -> ColumnDef {
    ColumnDef::new(column)
        .json_binary()
        .not_null()
        .default(Expr::cust("'[]'"))
        .to_owned()
}

fn timestamp<T: IntoIden>(column: T) -> ColumnDef {
    ColumnDef::new(column)
        .timestamp_with_time_zone()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}
