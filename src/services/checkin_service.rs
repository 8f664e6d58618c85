use crate::{
    error::{ApiError, Result},
    models::{
        credits::DEFAULT_USAGE_DESCRIPTION, tenant::TenantContext, turmas::CheckInData,
    },
    services::{
        availability::{format_countdown, CheckInWindow, WindowState},
        credits_service::{find_student, CreditDebit, CreditsService},
    },
};
use entity::{
    sea_orm_active_enums::{AttendanceStatus, LessonStatus, TurmaStatus},
    turma_attendances, turma_lessons, turmas,
};
use sea_orm::{
    entity::*, query::*, DatabaseConnection, DatabaseTransaction, DbErr, PaginatorTrait, SqlErr,
    TransactionTrait,
};
use time::{OffsetDateTime, UtcOffset};
use tracing::{info, instrument};
use uuid::Uuid;

/// Records attendance and pays for it with credits in one transaction
pub struct CheckInService {
    db: DatabaseConnection,
    credits_service: CreditsService,
    window: CheckInWindow,
    credits_per_lesson: i32,
    utc_offset: UtcOffset,
}

impl CheckInService {
    pub fn new(
        db: DatabaseConnection,
        window: CheckInWindow,
        credits_per_lesson: i32,
        utc_offset: UtcOffset,
    ) -> Self {
        let credits_service = CreditsService::new(db.clone());
        Self {
            db,
            credits_service,
            window,
            credits_per_lesson,
            utc_offset,
        }
    }

    pub async fn check_in(
        &self,
        tenant: &TenantContext,
        lesson_id: Uuid,
        student_id: Uuid,
    ) -> Result<CheckInData> {
        self.check_in_at(tenant, lesson_id, student_id, OffsetDateTime::now_utc())
            .await
    }

    /// Check a student into a lesson as of `now`
    ///
    /// Either the attendance and its credit debit are both committed or
    /// neither is.
    #[instrument(skip(self, tenant), fields(org = %tenant.organization_id))]
    pub async fn check_in_at(
        &self,
        tenant: &TenantContext,
        lesson_id: Uuid,
        student_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<CheckInData> {
        let txn = self.db.begin().await?;

        match self
            .check_in_txn(tenant, lesson_id, student_id, now, &txn)
            .await
        {
            Ok(data) => {
                txn.commit().await?;
                info!(
                    lesson_id = %lesson_id,
                    student_id = %student_id,
                    attendance_id = %data.attendance_id,
                    status = ?data.status,
                    credits_remaining = data.credit.credits_remaining,
                    "Student checked in"
                );
                Ok(data)
            }
            Err(e) => {
                txn.rollback().await?;
                Err(e)
            }
        }
    }

    async fn check_in_txn(
        &self,
        tenant: &TenantContext,
        lesson_id: Uuid,
        student_id: Uuid,
        now: OffsetDateTime,
        txn: &DatabaseTransaction,
    ) -> Result<CheckInData> {
        let found = turma_lessons::Entity::find_by_id(lesson_id)
            .find_also_related(turmas::Entity)
            .filter(turmas::Column::OrganizationId.eq(tenant.organization_id))
            .one(txn)
            .await?;

        let (lesson, turma) = match found {
            Some((lesson, Some(turma))) => (lesson, turma),
            _ => return Err(ApiError::NotFound(format!("Lesson {} not found", lesson_id))),
        };

        if lesson.status != LessonStatus::Scheduled || turma.status != TurmaStatus::Active {
            return Err(ApiError::BusinessRule(
                "Lesson is not open for check-in".to_string(),
            ));
        }

        let student = find_student(txn, tenant, student_id).await?;
        if !student.is_active {
            return Err(ApiError::BusinessRule(format!(
                "Student {} is inactive",
                student_id
            )));
        }

        let local = now.to_offset(self.utc_offset);
        if lesson.lesson_date != local.date() {
            return Err(ApiError::BusinessRule(
                "Lesson is not scheduled for today".to_string(),
            ));
        }

        match self.window.classify(lesson.start_time, local.time()) {
            WindowState::Open => {}
            WindowState::TooEarly { minutes_until_open } => {
                return Err(ApiError::BusinessRule(format!(
                    "Check-in opens in {}",
                    format_countdown(minutes_until_open)
                )));
            }
            WindowState::Closed => {
                return Err(ApiError::BusinessRule(
                    "Check-in window has closed".to_string(),
                ));
            }
        }

        let existing = turma_attendances::Entity::find()
            .filter(turma_attendances::Column::LessonId.eq(lesson.id))
            .filter(turma_attendances::Column::StudentId.eq(student_id))
            .one(txn)
            .await?;
        if existing.is_some() {
            return Err(ApiError::Conflict(format!(
                "Student {} already checked in to lesson {}",
                student_id, lesson_id
            )));
        }

        // Serializes concurrent check-ins to the same class
        turmas::Entity::find_by_id(turma.id)
            .lock_exclusive()
            .one(txn)
            .await?;

        let attendance_count = turma_attendances::Entity::find()
            .filter(turma_attendances::Column::LessonId.eq(lesson.id))
            .count(txn)
            .await?;
        if attendance_count >= u64::try_from(turma.max_students).unwrap_or(0) {
            return Err(ApiError::BusinessRule(format!(
                "Class is full ({} students)",
                turma.max_students
            )));
        }

        let status = if local.time() <= lesson.start_time {
            AttendanceStatus::Present
        } else {
            AttendanceStatus::Late
        };

        let attendance = turma_attendances::ActiveModel {
            id: Set(Uuid::new_v4()),
            turma_id: Set(turma.id),
            lesson_id: Set(lesson.id),
            student_id: Set(student_id),
            status: Set(status),
            checked_in_at: Set(now),
        }
        .insert(txn)
        .await
        .map_err(|e| duplicate_as_conflict(e, student_id, lesson_id))?;

        let debit = CreditDebit {
            student_id,
            attendance_id: attendance.id,
            credits_to_use: self.credits_per_lesson,
            description: DEFAULT_USAGE_DESCRIPTION.to_string(),
        };
        let credit = self
            .credits_service
            .use_credits_in_txn(tenant, &debit, now, txn)
            .await?;

        Ok(CheckInData {
            attendance_id: attendance.id,
            lesson_id: lesson.id,
            student_id,
            status: attendance.status,
            checked_in_at: attendance.checked_in_at,
            credit,
        })
    }
}

/// Two racing check-ins both pass the lookup; the unique index catches the loser
fn duplicate_as_conflict(err: DbErr, student_id: Uuid, lesson_id: Uuid) -> ApiError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => ApiError::Conflict(format!(
            "Student {} already checked in to lesson {}",
            student_id, lesson_id
        )),
        _ => ApiError::Database(err),
    }
}
