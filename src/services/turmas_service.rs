use crate::{
    error::Result,
    models::{tenant::TenantContext, turmas::AvailabilityData},
    services::availability::{build_availability, CheckInWindow, LessonSlot},
};
use entity::{
    sea_orm_active_enums::{EnrollmentStatus, LessonStatus, TurmaStatus},
    turma_attendances, turma_lessons, turma_students, turmas,
};
use sea_orm::{entity::*, query::*, DatabaseConnection};
use std::collections::{HashMap, HashSet};
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};
use tracing::{debug, instrument};
use uuid::Uuid;

/// Read side of the class schedule: what can be checked into right now
pub struct TurmasService {
    db: DatabaseConnection,
    window: CheckInWindow,
    upcoming_limit: usize,
    utc_offset: UtcOffset,
}

impl TurmasService {
    pub fn new(
        db: DatabaseConnection,
        window: CheckInWindow,
        upcoming_limit: usize,
        utc_offset: UtcOffset,
    ) -> Self {
        Self {
            db,
            window,
            upcoming_limit,
            utc_offset,
        }
    }

    /// Academy wall clock for a UTC instant
    pub fn local_now(&self, now: OffsetDateTime) -> PrimitiveDateTime {
        let local = now.to_offset(self.utc_offset);
        PrimitiveDateTime::new(local.date(), local.time())
    }

    pub async fn available_now(
        &self,
        tenant: &TenantContext,
        student_id: Option<Uuid>,
    ) -> Result<AvailabilityData> {
        self.available_at(tenant, student_id, OffsetDateTime::now_utc())
            .await
    }

    /// Today's lessons split into open and upcoming check-in windows
    #[instrument(skip(self, tenant), fields(org = %tenant.organization_id))]
    pub async fn available_at(
        &self,
        tenant: &TenantContext,
        student_id: Option<Uuid>,
        now: OffsetDateTime,
    ) -> Result<AvailabilityData> {
        let local_now = self.local_now(now);

        let lessons = turma_lessons::Entity::find()
            .find_also_related(turmas::Entity)
            .filter(turma_lessons::Column::LessonDate.eq(local_now.date()))
            .filter(turma_lessons::Column::Status.eq(LessonStatus::Scheduled))
            .filter(turmas::Column::OrganizationId.eq(tenant.organization_id))
            .filter(turmas::Column::Status.eq(TurmaStatus::Active))
            .all(&self.db)
            .await?;

        let turma_ids: Vec<Uuid> = lessons.iter().map(|(lesson, _)| lesson.turma_id).collect();
        let lesson_ids: Vec<Uuid> = lessons.iter().map(|(lesson, _)| lesson.id).collect();

        let mut enrollments: HashMap<Uuid, i32> = HashMap::new();
        if !turma_ids.is_empty() {
            let roster = turma_students::Entity::find()
                .filter(turma_students::Column::TurmaId.is_in(turma_ids))
                .filter(turma_students::Column::Status.eq(EnrollmentStatus::Active))
                .all(&self.db)
                .await?;
            for entry in roster {
                *enrollments.entry(entry.turma_id).or_default() += 1;
            }
        }

        let checked_in: Option<HashSet<Uuid>> = match student_id {
            Some(student_id) if !lesson_ids.is_empty() => Some(
                turma_attendances::Entity::find()
                    .filter(turma_attendances::Column::StudentId.eq(student_id))
                    .filter(turma_attendances::Column::LessonId.is_in(lesson_ids))
                    .all(&self.db)
                    .await?
                    .into_iter()
                    .map(|a| a.lesson_id)
                    .collect(),
            ),
            Some(_) => Some(HashSet::new()),
            None => None,
        };

        let slots: Vec<LessonSlot> = lessons
            .into_iter()
            .filter_map(|(lesson, turma)| turma.map(|turma| (lesson, turma)))
            .map(|(lesson, turma)| LessonSlot {
                lesson_id: lesson.id,
                turma_id: turma.id,
                turma_name: turma.name,
                lesson_title: lesson.title,
                course: turma.course_name,
                instructor: turma.instructor_name,
                room: turma.room,
                start_time: lesson.start_time,
                duration_minutes: lesson.duration_minutes,
                max_students: turma.max_students,
                current_enrollments: enrollments.get(&turma.id).copied().unwrap_or(0),
                already_checked_in: checked_in
                    .as_ref()
                    .map(|lessons| lessons.contains(&lesson.id)),
            })
            .collect();

        debug!(lessons = slots.len(), local_time = %local_now, "Classifying lessons");

        Ok(build_availability(
            slots,
            local_now,
            &self.window,
            self.upcoming_limit,
        ))
    }
}
