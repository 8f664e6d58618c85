//! Check-in window classification for a day's lessons.
//!
//! Each lesson is classified against the academy wall clock every time it is
//! asked for; nothing here is persisted.

use time::{Duration, PrimitiveDateTime, Time};
use uuid::Uuid;

use crate::models::turmas::{AvailabilityData, AvailableLesson};

const SECONDS_PER_MINUTE: i64 = 60;

/// Where a lesson sits relative to its check-in window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    /// Window has not opened yet
    TooEarly { minutes_until_open: i64 },
    Open,
    Closed,
}

/// `[start - before, start + after]`, both ends inclusive
#[derive(Debug, Clone, Copy)]
pub struct CheckInWindow {
    pub before: Duration,
    pub after: Duration,
}

impl CheckInWindow {
    pub fn new(before_minutes: i64, after_minutes: i64) -> Self {
        Self {
            before: Duration::minutes(before_minutes),
            after: Duration::minutes(after_minutes),
        }
    }

    pub fn classify(&self, lesson_start: Time, now: Time) -> WindowState {
        let start = seconds_of_day(lesson_start);
        let now = seconds_of_day(now);
        let opens = start - self.before.whole_seconds();
        let closes = start + self.after.whole_seconds();

        if now < opens {
            // Round up so a window opening in 30s still reads "1min"
            let minutes_until_open = (opens - now + SECONDS_PER_MINUTE - 1) / SECONDS_PER_MINUTE;
            WindowState::TooEarly { minutes_until_open }
        } else if now <= closes {
            WindowState::Open
        } else {
            WindowState::Closed
        }
    }

    pub fn opens_at(&self, lesson_start: Time) -> Time {
        lesson_start - self.before
    }

    pub fn closes_at(&self, lesson_start: Time) -> Time {
        lesson_start + self.after
    }
}

fn seconds_of_day(t: Time) -> i64 {
    i64::from(t.hour()) * 3600 + i64::from(t.minute()) * 60 + i64::from(t.second())
}

/// Everything needed to list one lesson, already scoped to the tenant
#[derive(Debug, Clone)]
pub struct LessonSlot {
    pub lesson_id: Uuid,
    pub turma_id: Uuid,
    pub turma_name: String,
    pub lesson_title: String,
    pub course: String,
    pub instructor: String,
    pub room: String,
    pub start_time: Time,
    pub duration_minutes: i32,
    pub max_students: i32,
    pub current_enrollments: i32,
    pub already_checked_in: Option<bool>,
}

impl LessonSlot {
    fn into_available(self, window: &CheckInWindow, state: WindowState) -> AvailableLesson {
        let end = self.start_time + Duration::minutes(i64::from(self.duration_minutes));
        let minutes_until_open = match state {
            WindowState::TooEarly { minutes_until_open } => Some(minutes_until_open),
            _ => None,
        };

        AvailableLesson {
            lesson_id: self.lesson_id,
            turma_id: self.turma_id,
            name: self.turma_name,
            lesson_title: self.lesson_title,
            course: self.course,
            instructor: self.instructor,
            room: self.room,
            start_time: format_hhmm(self.start_time),
            end_time: format_hhmm(end),
            check_in_opens: format_hhmm(window.opens_at(self.start_time)),
            check_in_closes: format_hhmm(window.closes_at(self.start_time)),
            max_students: self.max_students,
            current_enrollments: self.current_enrollments,
            available_slots: (self.max_students - self.current_enrollments).max(0),
            already_checked_in: self.already_checked_in,
            minutes_until_open,
            opens_in: minutes_until_open.map(format_countdown),
        }
    }
}

/// Split a day's lessons into "open now" and "upcoming".
///
/// Open lessons are ordered by start time; upcoming ones by how soon their
/// window opens and capped at `upcoming_limit`. Closed lessons are dropped.
pub fn build_availability(
    slots: Vec<LessonSlot>,
    now: PrimitiveDateTime,
    window: &CheckInWindow,
    upcoming_limit: usize,
) -> AvailabilityData {
    let mut open_now: Vec<(Time, AvailableLesson)> = Vec::new();
    let mut upcoming: Vec<(i64, Time, AvailableLesson)> = Vec::new();

    for slot in slots {
        let start = slot.start_time;
        match window.classify(start, now.time()) {
            WindowState::Open => {
                open_now.push((start, slot.into_available(window, WindowState::Open)));
            }
            state @ WindowState::TooEarly { minutes_until_open } => {
                upcoming.push((
                    minutes_until_open,
                    start,
                    slot.into_available(window, state),
                ));
            }
            WindowState::Closed => {}
        }
    }

    open_now.sort_by_key(|(start, _)| *start);
    upcoming.sort_by_key(|(minutes, start, _)| (*minutes, *start));
    upcoming.truncate(upcoming_limit);

    let open_now: Vec<AvailableLesson> = open_now.into_iter().map(|(_, l)| l).collect();
    let upcoming: Vec<AvailableLesson> = upcoming.into_iter().map(|(_, _, l)| l).collect();

    AvailabilityData {
        total: open_now.len() + upcoming.len(),
        open_now,
        upcoming,
        current_time: format_hhmm(now.time()),
        current_day: now.weekday().to_string(),
    }
}

pub fn format_hhmm(t: Time) -> String {
    format!("{:02}:{:02}", t.hour(), t.minute())
}

/// "4h 55min", "4h", or "55min"
pub fn format_countdown(minutes: i64) -> String {
    let hours = minutes / 60;
    let rest = minutes % 60;
    match (hours, rest) {
        (0, m) => format!("{m}min"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}min"),
    }
}
