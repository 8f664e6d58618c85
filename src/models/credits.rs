use entity::{credit_renewals, credit_usages, sea_orm_active_enums::CreditStatus, student_credits};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use super::student_credits_ext::StudentCreditExt;

pub const DEFAULT_USAGE_DESCRIPTION: &str = "Aula frequentada";
pub const DEFAULT_REFUND_REASON: &str = "Reembolso solicitado";

/// POST /api/credits/use
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UseCreditsRequest {
    pub student_id: Uuid,
    pub attendance_id: Uuid,
    #[validate(range(min = 1, max = 100))]
    pub credits_to_use: i32,
    #[validate(length(min = 1, max = 500))]
    pub description: Option<String>,
}

/// POST /api/credits/refund
///
/// `usage_id` names the exact debit being reversed, so a repeated call is
/// rejected instead of refunding twice.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RefundCreditsRequest {
    pub credit_id: Uuid,
    pub usage_id: Uuid,
    #[validate(length(min = 1, max = 500))]
    pub refund_reason: Option<String>,
}

/// POST /api/credits/renew-manual
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RenewCreditsRequest {
    pub student_id: Uuid,
    pub credit_id: Uuid,
    pub plan_id: Uuid,
}

/// GET /api/credits/expiring-soon
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiringCreditsQuery {
    pub days: Option<i64>,
}

/// Single debit against a credit lot
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreditUsageRecord {
    pub id: Uuid,
    pub attendance_id: Uuid,
    pub credits_used: i32,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub used_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub refunded_at: Option<OffsetDateTime>,
    pub refund_reason: Option<String>,
}

impl From<credit_usages::Model> for CreditUsageRecord {
    fn from(usage: credit_usages::Model) -> Self {
        Self {
            id: usage.id,
            attendance_id: usage.attendance_id,
            credits_used: usage.credits_used,
            description: usage.description,
            used_at: usage.used_at,
            refunded_at: usage.refunded_at,
            refund_reason: usage.refund_reason,
        }
    }
}

/// Credit lot as exposed over the API
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StudentCreditRecord {
    pub id: Uuid,
    pub student_id: Uuid,
    pub plan_id: Option<Uuid>,
    pub plan_name: Option<String>,
    pub total_credits: i32,
    pub credits_used: i32,
    pub credits_available: i32,
    pub status: CreditStatus,
    pub auto_renew: bool,
    pub renewal_count: i32,
    #[serde(with = "time::serde::rfc3339::option")]
    pub next_renewal_date: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub purchased_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
    pub days_until_expiry: Option<i64>,
    pub previous_credit_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recent_usages: Vec<CreditUsageRecord>,
}

impl StudentCreditRecord {
    pub fn from_model(
        credit: &student_credits::Model,
        plan_name: Option<String>,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            id: credit.id,
            student_id: credit.student_id,
            plan_id: credit.plan_id,
            plan_name,
            total_credits: credit.total_credits,
            credits_used: credit.credits_used,
            credits_available: credit.remaining(),
            status: credit.status,
            auto_renew: credit.auto_renew,
            renewal_count: credit.renewal_count,
            next_renewal_date: credit.next_renewal_date,
            purchased_at: credit.purchased_at,
            expires_at: credit.expires_at,
            days_until_expiry: credit.days_until_expiry(now),
            previous_credit_id: credit.previous_credit_id,
            recent_usages: Vec::new(),
        }
    }

    pub fn with_usages(mut self, usages: Vec<CreditUsageRecord>) -> Self {
        self.recent_usages = usages;
        self
    }
}

/// Credit expiring first in a summary
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ExpiringFirst {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
    pub days_until_expiry: Option<i64>,
    pub available_credits: i32,
}

/// Consolidated balance for one student
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreditsSummary {
    pub total_credits: i32,
    pub total_used: i32,
    pub total_available: i32,
    pub utilization_percentage: i32,
    pub credits_count: usize,
    pub expiring_first: Option<ExpiringFirst>,
    pub auto_renewal_active: bool,
    pub auto_renewal_count: usize,
}

/// Result of a successful debit
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UseCreditsData {
    pub credit_usage_id: Uuid,
    pub credit_id: Uuid,
    pub credits_remaining: i32,
    pub total_credits: i32,
}

/// Result of reversing one usage
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RefundCreditsData {
    pub credit_id: Uuid,
    pub usage_id: Uuid,
    pub credits_refunded: i32,
    pub credits_used: i32,
    pub credits_available: i32,
    pub status: CreditStatus,
    pub refund_reason: String,
}

/// Result of a manual renewal
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RenewCreditsData {
    pub renewal_id: Uuid,
    pub original_credit_id: Uuid,
    pub credit: StudentCreditRecord,
}

/// Credit about to expire, with who owns it
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ExpiringCreditRecord {
    #[serde(flatten)]
    pub credit: StudentCreditRecord,
    pub student_name: Option<String>,
    pub student_email: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ExpiringCreditsFilters {
    pub days_until_expiry: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiringCreditsResponse {
    pub success: bool,
    pub data: Vec<ExpiringCreditRecord>,
    pub total: usize,
    pub filters: ExpiringCreditsFilters,
}

/// Short view of a credit inside renewal history
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreditBrief {
    pub id: Uuid,
    pub total_credits: i32,
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
}

impl From<&student_credits::Model> for CreditBrief {
    fn from(credit: &student_credits::Model) -> Self {
        Self {
            id: credit.id,
            total_credits: credit.total_credits,
            expires_at: credit.expires_at,
        }
    }
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RenewalHistoryRecord {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub renewal_date: OffsetDateTime,
    pub renewal_reason: String,
    pub original_credit: Option<CreditBrief>,
    pub renewed_credit: Option<CreditBrief>,
}

impl RenewalHistoryRecord {
    pub fn new(
        renewal: credit_renewals::Model,
        original: Option<CreditBrief>,
        renewed: Option<CreditBrief>,
    ) -> Self {
        Self {
            id: renewal.id,
            renewal_date: renewal.renewal_date,
            renewal_reason: renewal.renewal_reason,
            original_credit: original,
            renewed_credit: renewed,
        }
    }
}
