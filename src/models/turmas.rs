use entity::sea_orm_active_enums::AttendanceStatus;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use super::credits::UseCreditsData;

/// GET /api/turmas/available-now
///
/// `organizationId` is consumed by the tenant middleware; it is accepted here so
/// the query string deserializes cleanly.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableNowQuery {
    pub organization_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
}

/// One lesson in the availability listing
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AvailableLesson {
    pub lesson_id: Uuid,
    pub turma_id: Uuid,
    pub name: String,
    pub lesson_title: String,
    pub course: String,
    pub instructor: String,
    pub room: String,
    pub start_time: String,
    pub end_time: String,
    pub check_in_opens: String,
    pub check_in_closes: String,
    pub max_students: i32,
    pub current_enrollments: i32,
    pub available_slots: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub already_checked_in: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minutes_until_open: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opens_in: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityData {
    pub open_now: Vec<AvailableLesson>,
    pub upcoming: Vec<AvailableLesson>,
    pub total: usize,
    pub current_time: String,
    pub current_day: String,
}

/// POST /api/turmas/check-in
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CheckInRequest {
    pub lesson_id: Uuid,
    pub student_id: Uuid,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CheckInData {
    pub attendance_id: Uuid,
    pub lesson_id: Uuid,
    pub student_id: Uuid,
    pub status: AttendanceStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub checked_in_at: OffsetDateTime,
    pub credit: UseCreditsData,
}
