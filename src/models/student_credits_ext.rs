/// Extension methods for student_credits entity
///
/// Business rules over a credit lot that complement the generated entity in
/// entity/src/student_credits.rs
use entity::{sea_orm_active_enums::CreditStatus, student_credits};
use time::OffsetDateTime;

const SECONDS_PER_DAY: f64 = 86_400.0;

pub trait StudentCreditExt {
    /// Credits still available (total - used), never negative
    fn remaining(&self) -> i32;

    /// Past its expiry timestamp. Lots without expiry never expire.
    fn is_expired_at(&self, now: OffsetDateTime) -> bool;

    /// Active, not expired and with at least `amount` remaining
    fn can_cover(&self, amount: i32, now: OffsetDateTime) -> bool;

    /// Whole days until expiry, rounded up
    fn days_until_expiry(&self, now: OffsetDateTime) -> Option<i64>;
}

impl StudentCreditExt for student_credits::Model {
    fn remaining(&self) -> i32 {
        (self.total_credits - self.credits_used).max(0)
    }

    fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at < now)
    }

    fn can_cover(&self, amount: i32, now: OffsetDateTime) -> bool {
        self.status == CreditStatus::Active
            && !self.is_expired_at(now)
            && self.remaining() >= amount
    }

    fn days_until_expiry(&self, now: OffsetDateTime) -> Option<i64> {
        self.expires_at.map(|expires_at| {
            let seconds = (expires_at - now).as_seconds_f64();
            (seconds / SECONDS_PER_DAY).ceil() as i64
        })
    }
}
