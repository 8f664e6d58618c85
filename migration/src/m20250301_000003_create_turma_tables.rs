use sea_orm_migration::{prelude::*, schema::*};

use crate::m20250301_000001_create_tenancy_tables::{Organizations, Students};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Turmas::Table)
                    .if_not_exists()
                    .col(pk_uuid(Turmas::Id))
                    .col(uuid(Turmas::OrganizationId).not_null())
                    .col(string(Turmas::Name).not_null())
                    .col(string(Turmas::CourseName).not_null())
                    .col(string(Turmas::InstructorName).not_null())
                    .col(string(Turmas::Room).not_null())
                    .col(integer(Turmas::MaxStudents).default(20).not_null())
                    .col(string_len(Turmas::Status, 20).default("ACTIVE").not_null())
                    .col(
                        timestamp_with_time_zone(Turmas::CreatedAt)
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_turmas_organization_id")
                            .from(Turmas::Table, Turmas::OrganizationId)
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_turmas_organization_id")
                    .table(Turmas::Table)
                    .col(Turmas::OrganizationId)
                    .to_owned(),
            )
            .await?;

        // Roster: one row per (turma, student)
        manager
            .create_table(
                Table::create()
                    .table(TurmaStudents::Table)
                    .if_not_exists()
                    .col(pk_uuid(TurmaStudents::Id))
                    .col(uuid(TurmaStudents::TurmaId).not_null())
                    .col(uuid(TurmaStudents::StudentId).not_null())
                    .col(
                        string_len(TurmaStudents::Status, 20)
                            .default("ACTIVE")
                            .not_null(),
                    )
                    .col(
                        timestamp_with_time_zone(TurmaStudents::EnrolledAt)
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_turma_students_turma_id")
                            .from(TurmaStudents::Table, TurmaStudents::TurmaId)
                            .to(Turmas::Table, Turmas::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_turma_students_student_id")
                            .from(TurmaStudents::Table, TurmaStudents::StudentId)
                            .to(Students::Table, Students::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_turma_students_turma_student")
                    .table(TurmaStudents::Table)
                    .col(TurmaStudents::TurmaId)
                    .col(TurmaStudents::StudentId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TurmaLessons::Table)
                    .if_not_exists()
                    .col(pk_uuid(TurmaLessons::Id))
                    .col(uuid(TurmaLessons::TurmaId).not_null())
                    .col(integer(TurmaLessons::LessonNumber).not_null())
                    .col(string(TurmaLessons::Title).not_null())
                    .col(date(TurmaLessons::LessonDate).not_null())
                    .col(time(TurmaLessons::StartTime).not_null())
                    .col(integer(TurmaLessons::DurationMinutes).default(60).not_null())
                    .col(
                        string_len(TurmaLessons::Status, 20)
                            .default("SCHEDULED")
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_turma_lessons_turma_id")
                            .from(TurmaLessons::Table, TurmaLessons::TurmaId)
                            .to(Turmas::Table, Turmas::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Availability reads all of a day's lessons at once
        manager
            .create_index(
                Index::create()
                    .name("idx_turma_lessons_date")
                    .table(TurmaLessons::Table)
                    .col(TurmaLessons::LessonDate)
                    .col(TurmaLessons::TurmaId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TurmaAttendances::Table)
                    .if_not_exists()
                    .col(pk_uuid(TurmaAttendances::Id))
                    .col(uuid(TurmaAttendances::TurmaId).not_null())
                    .col(uuid(TurmaAttendances::LessonId).not_null())
                    .col(uuid(TurmaAttendances::StudentId).not_null())
                    .col(string_len(TurmaAttendances::Status, 20).not_null())
                    .col(timestamp_with_time_zone(TurmaAttendances::CheckedInAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_turma_attendances_lesson_id")
                            .from(TurmaAttendances::Table, TurmaAttendances::LessonId)
                            .to(TurmaLessons::Table, TurmaLessons::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_turma_attendances_student_id")
                            .from(TurmaAttendances::Table, TurmaAttendances::StudentId)
                            .to(Students::Table, Students::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // A student checks in at most once per lesson
        manager
            .create_index(
                Index::create()
                    .name("idx_turma_attendances_lesson_student")
                    .table(TurmaAttendances::Table)
                    .col(TurmaAttendances::LessonId)
                    .col(TurmaAttendances::StudentId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TurmaAttendances::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TurmaLessons::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TurmaStudents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Turmas::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Turmas {
    Table,
    Id,
    OrganizationId,
    Name,
    CourseName,
    InstructorName,
    Room,
    MaxStudents,
    Status,
    CreatedAt,
}

#[derive(DeriveIden)]
enum TurmaStudents {
    Table,
    Id,
    TurmaId,
    StudentId,
    Status,
    EnrolledAt,
}

#[derive(DeriveIden)]
enum TurmaLessons {
    Table,
    Id,
    TurmaId,
    LessonNumber,
    Title,
    LessonDate,
    StartTime,
    DurationMinutes,
    Status,
}

#[derive(DeriveIden)]
enum TurmaAttendances {
    Table,
    Id,
    TurmaId,
    LessonId,
    StudentId,
    Status,
    CheckedInAt,
}
