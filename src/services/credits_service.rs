use crate::{
    error::{ApiError, Result},
    models::{
        credits::{
            CreditBrief, CreditUsageRecord, CreditsSummary, ExpiringCreditRecord, ExpiringFirst,
            RefundCreditsData, RenewCreditsData, RenewalHistoryRecord, StudentCreditRecord,
            UseCreditsData,
        },
        student_credits_ext::StudentCreditExt,
        tenant::TenantContext,
    },
};
use entity::{
    billing_plans, credit_renewals, credit_usages, sea_orm_active_enums::CreditStatus,
    student_credits, students,
};
use sea_orm::{
    entity::*, query::*, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    TransactionTrait,
};
use std::collections::HashMap;
use time::{Duration, OffsetDateTime};
use tracing::{info, instrument};
use uuid::Uuid;

const RECENT_USAGES_PER_CREDIT: usize = 5;
const MANUAL_RENEWAL_REASON: &str = "MANUAL_RENEWAL";
const DEFAULT_REFUND_DAYS_BEFORE_EXPIRY: i64 = 7;

/// A debit request against a student's prepaid credits
#[derive(Debug, Clone)]
pub struct CreditDebit {
    pub student_id: Uuid,
    pub attendance_id: Uuid,
    pub credits_to_use: i32,
    pub description: String,
}

/// Prepaid credit ledger: balances, debits, refunds and renewals.
pub struct CreditsService {
    db: DatabaseConnection,
}

impl CreditsService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Spendable credit lots of a student, soonest expiry first, with recent usages
    #[instrument(skip(self, tenant), fields(org = %tenant.organization_id))]
    pub async fn get_student_credits(
        &self,
        tenant: &TenantContext,
        student_id: Uuid,
    ) -> Result<Vec<StudentCreditRecord>> {
        find_student(&self.db, tenant, student_id).await?;

        let now = OffsetDateTime::now_utc();
        let mut credits = self.active_credits(tenant, student_id).await?;
        // Still ACTIVE until the next debit retires them
        credits.retain(|c| !c.is_expired_at(now));
        sort_by_expiry(&mut credits);

        let plan_names = plan_names(&self.db, tenant, &credits).await?;

        let credit_ids: Vec<Uuid> = credits.iter().map(|c| c.id).collect();
        let usages = credit_usages::Entity::find()
            .filter(credit_usages::Column::OrganizationId.eq(tenant.organization_id))
            .filter(credit_usages::Column::CreditId.is_in(credit_ids))
            .order_by_desc(credit_usages::Column::UsedAt)
            .all(&self.db)
            .await?;

        let mut usages_by_credit: HashMap<Uuid, Vec<CreditUsageRecord>> = HashMap::new();
        for usage in usages {
            let entry = usages_by_credit.entry(usage.credit_id).or_default();
            if entry.len() < RECENT_USAGES_PER_CREDIT {
                entry.push(usage.into());
            }
        }

        Ok(credits
            .iter()
            .map(|credit| {
                let plan_name = credit.plan_id.and_then(|id| plan_names.get(&id).cloned());
                StudentCreditRecord::from_model(credit, plan_name, now)
                    .with_usages(usages_by_credit.remove(&credit.id).unwrap_or_default())
            })
            .collect())
    }

    /// Consolidated balance across all active lots of a student
    #[instrument(skip(self, tenant), fields(org = %tenant.organization_id))]
    pub async fn get_credits_summary(
        &self,
        tenant: &TenantContext,
        student_id: Uuid,
    ) -> Result<CreditsSummary> {
        find_student(&self.db, tenant, student_id).await?;

        let now = OffsetDateTime::now_utc();
        let mut credits = self.active_credits(tenant, student_id).await?;
        credits.retain(|c| !c.is_expired_at(now));
        sort_by_expiry(&mut credits);

        Ok(summarize(&credits, now))
    }

    /// Debit credits for an attendance in its own transaction
    #[instrument(skip(self, tenant), fields(org = %tenant.organization_id))]
    pub async fn use_credits(
        &self,
        tenant: &TenantContext,
        debit: CreditDebit,
    ) -> Result<UseCreditsData> {
        let txn = self.db.begin().await?;
        let now = OffsetDateTime::now_utc();

        match self.use_credits_in_txn(tenant, &debit, now, &txn).await {
            Ok(data) => {
                txn.commit().await?;
                Ok(data)
            }
            Err(e) => {
                txn.rollback().await?;
                Err(e)
            }
        }
    }

    /// Debit credits within an existing transaction
    ///
    /// Retires lots found past expiry, locks the remaining active lots and
    /// debits the soonest-expiring one that can cover the whole amount.
    #[instrument(skip(self, tenant, txn), fields(org = %tenant.organization_id))]
    pub async fn use_credits_in_txn(
        &self,
        tenant: &TenantContext,
        debit: &CreditDebit,
        now: OffsetDateTime,
        txn: &DatabaseTransaction,
    ) -> Result<UseCreditsData> {
        if debit.credits_to_use < 1 {
            return Err(ApiError::Validation(
                "creditsToUse must be at least 1".to_string(),
            ));
        }

        // Soft-retire anything that expired since it was last touched
        student_credits::Entity::update_many()
            .set(student_credits::ActiveModel {
                status: Set(CreditStatus::Expired),
                updated_at: Set(now),
                ..Default::default()
            })
            .filter(student_credits::Column::OrganizationId.eq(tenant.organization_id))
            .filter(student_credits::Column::StudentId.eq(debit.student_id))
            .filter(student_credits::Column::Status.eq(CreditStatus::Active))
            .filter(student_credits::Column::ExpiresAt.lt(now))
            .exec(txn)
            .await?;

        let mut candidates = student_credits::Entity::find()
            .filter(student_credits::Column::OrganizationId.eq(tenant.organization_id))
            .filter(student_credits::Column::StudentId.eq(debit.student_id))
            .filter(student_credits::Column::Status.eq(CreditStatus::Active))
            .lock_exclusive()
            .all(txn)
            .await?;

        if candidates.is_empty() {
            return Err(ApiError::NotFound(format!(
                "No active credits found for student {}",
                debit.student_id
            )));
        }

        sort_by_expiry(&mut candidates);

        let Some(credit) = candidates
            .iter()
            .find(|c| c.can_cover(debit.credits_to_use, now))
            .cloned()
        else {
            let available: i32 = candidates.iter().map(|c| c.remaining()).sum();
            return Err(ApiError::InsufficientCredits(format!(
                "Insufficient credits for this class: requested {}, available {}",
                debit.credits_to_use, available
            )));
        };

        let credits_used = credit.credits_used + debit.credits_to_use;
        let mut credit_active: student_credits::ActiveModel = credit.clone().into();
        credit_active.credits_used = Set(credits_used);
        if credits_used >= credit.total_credits {
            credit_active.status = Set(CreditStatus::Exhausted);
        }
        credit_active.updated_at = Set(now);
        let updated = credit_active.update(txn).await?;

        let usage = credit_usages::ActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(tenant.organization_id),
            student_id: Set(debit.student_id),
            credit_id: Set(credit.id),
            attendance_id: Set(debit.attendance_id),
            credits_used: Set(debit.credits_to_use),
            description: Set(debit.description.clone()),
            used_at: Set(now),
            refunded_at: Set(None),
            refund_reason: Set(None),
        }
        .insert(txn)
        .await?;

        info!(
            student_id = %debit.student_id,
            attendance_id = %debit.attendance_id,
            credit_id = %credit.id,
            credits = debit.credits_to_use,
            remaining = updated.remaining(),
            "Credits consumed"
        );

        Ok(UseCreditsData {
            credit_usage_id: usage.id,
            credit_id: updated.id,
            credits_remaining: updated.remaining(),
            total_credits: updated.total_credits,
        })
    }

    /// Reverse one recorded usage
    ///
    /// The usage is stamped as refunded, so replaying the same request fails
    /// with `AlreadyRefunded` instead of returning credits twice.
    #[instrument(skip(self, tenant), fields(org = %tenant.organization_id))]
    pub async fn refund_credits(
        &self,
        tenant: &TenantContext,
        credit_id: Uuid,
        usage_id: Uuid,
        refund_reason: &str,
    ) -> Result<RefundCreditsData> {
        let txn = self.db.begin().await?;
        let now = OffsetDateTime::now_utc();

        let result = self
            .refund_credits_txn(tenant, credit_id, usage_id, refund_reason, now, &txn)
            .await;

        match result {
            Ok(data) => {
                txn.commit().await?;
                info!(
                    credit_id = %credit_id,
                    usage_id = %usage_id,
                    credits = data.credits_refunded,
                    "Credits refunded"
                );
                Ok(data)
            }
            Err(e) => {
                txn.rollback().await?;
                Err(e)
            }
        }
    }

    async fn refund_credits_txn(
        &self,
        tenant: &TenantContext,
        credit_id: Uuid,
        usage_id: Uuid,
        refund_reason: &str,
        now: OffsetDateTime,
        txn: &DatabaseTransaction,
    ) -> Result<RefundCreditsData> {
        let credit = student_credits::Entity::find_by_id(credit_id)
            .filter(student_credits::Column::OrganizationId.eq(tenant.organization_id))
            .lock_exclusive()
            .one(txn)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Credit {} not found", credit_id)))?;

        let usage = credit_usages::Entity::find_by_id(usage_id)
            .filter(credit_usages::Column::OrganizationId.eq(tenant.organization_id))
            .filter(credit_usages::Column::CreditId.eq(credit.id))
            .lock_exclusive()
            .one(txn)
            .await?
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "Usage {} not found for credit {}",
                    usage_id, credit_id
                ))
            })?;

        if let Some(refunded_at) = usage.refunded_at {
            return Err(ApiError::AlreadyRefunded(format!(
                "Usage {} was already refunded at {}",
                usage_id, refunded_at
            )));
        }

        if let Some(plan_id) = credit.plan_id {
            let plan = billing_plans::Entity::find_by_id(plan_id)
                .filter(billing_plans::Column::OrganizationId.eq(tenant.organization_id))
                .one(txn)
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("Plan {} not found", plan_id)))?;
            check_refund_policy(&plan, &credit, now)?;
        }

        let credits_used = (credit.credits_used - usage.credits_used).max(0);
        let status = if credit.status == CreditStatus::Exhausted
            && credits_used < credit.total_credits
            && !credit.is_expired_at(now)
        {
            CreditStatus::Active
        } else {
            credit.status
        };

        let mut credit_active: student_credits::ActiveModel = credit.clone().into();
        credit_active.credits_used = Set(credits_used);
        credit_active.status = Set(status);
        credit_active.updated_at = Set(now);
        let updated = credit_active.update(txn).await?;

        let credits_refunded = usage.credits_used;
        let mut usage_active: credit_usages::ActiveModel = usage.into();
        usage_active.refunded_at = Set(Some(now));
        usage_active.refund_reason = Set(Some(refund_reason.to_string()));
        usage_active.update(txn).await?;

        Ok(RefundCreditsData {
            credit_id: updated.id,
            usage_id,
            credits_refunded,
            credits_used: updated.credits_used,
            credits_available: updated.remaining(),
            status: updated.status,
            refund_reason: refund_reason.to_string(),
        })
    }

    /// Active lots expiring within `[now, now + days]`
    #[instrument(skip(self, tenant), fields(org = %tenant.organization_id))]
    pub async fn get_expiring_credits(
        &self,
        tenant: &TenantContext,
        days_until_expiry: i64,
    ) -> Result<Vec<ExpiringCreditRecord>> {
        let now = OffsetDateTime::now_utc();
        let horizon = now + Duration::days(days_until_expiry);

        let mut credits = student_credits::Entity::find()
            .filter(student_credits::Column::OrganizationId.eq(tenant.organization_id))
            .filter(student_credits::Column::Status.eq(CreditStatus::Active))
            .filter(student_credits::Column::ExpiresAt.gte(now))
            .filter(student_credits::Column::ExpiresAt.lte(horizon))
            .all(&self.db)
            .await?;
        sort_by_expiry(&mut credits);

        let plan_names = plan_names(&self.db, tenant, &credits).await?;

        let student_ids: Vec<Uuid> = credits.iter().map(|c| c.student_id).collect();
        let students: HashMap<Uuid, students::Model> = students::Entity::find()
            .filter(students::Column::OrganizationId.eq(tenant.organization_id))
            .filter(students::Column::Id.is_in(student_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        Ok(credits
            .iter()
            .map(|credit| {
                let plan_name = credit.plan_id.and_then(|id| plan_names.get(&id).cloned());
                let student = students.get(&credit.student_id);
                ExpiringCreditRecord {
                    credit: StudentCreditRecord::from_model(credit, plan_name, now),
                    student_name: student.map(|s| s.full_name.clone()),
                    student_email: student.and_then(|s| s.email.clone()),
                }
            })
            .collect())
    }

    /// Issue a fresh lot from a plan and retire the original one
    #[instrument(skip(self, tenant), fields(org = %tenant.organization_id))]
    pub async fn renew_credits_manual(
        &self,
        tenant: &TenantContext,
        student_id: Uuid,
        credit_id: Uuid,
        plan_id: Uuid,
    ) -> Result<RenewCreditsData> {
        let txn = self.db.begin().await?;
        let now = OffsetDateTime::now_utc();

        let result = self
            .renew_credits_txn(tenant, student_id, credit_id, plan_id, now, &txn)
            .await;

        match result {
            Ok(data) => {
                txn.commit().await?;
                info!(
                    student_id = %student_id,
                    original_credit_id = %credit_id,
                    renewed_credit_id = %data.credit.id,
                    credits = data.credit.total_credits,
                    "Credits renewed manually"
                );
                Ok(data)
            }
            Err(e) => {
                txn.rollback().await?;
                Err(e)
            }
        }
    }

    async fn renew_credits_txn(
        &self,
        tenant: &TenantContext,
        student_id: Uuid,
        credit_id: Uuid,
        plan_id: Uuid,
        now: OffsetDateTime,
        txn: &DatabaseTransaction,
    ) -> Result<RenewCreditsData> {
        let plan = billing_plans::Entity::find_by_id(plan_id)
            .filter(billing_plans::Column::OrganizationId.eq(tenant.organization_id))
            .one(txn)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Plan {} not found", plan_id)))?;

        find_student(txn, tenant, student_id).await?;

        let original = student_credits::Entity::find_by_id(credit_id)
            .filter(student_credits::Column::OrganizationId.eq(tenant.organization_id))
            .filter(student_credits::Column::StudentId.eq(student_id))
            .lock_exclusive()
            .one(txn)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Credit {} not found", credit_id)))?;

        if let Some(max_renewals) = plan.max_auto_renewals {
            if original.renewal_count >= max_renewals {
                return Err(ApiError::BusinessRule(format!(
                    "Renewal limit reached ({})",
                    max_renewals
                )));
            }
        }

        let total_credits = plan.credit_quantity.unwrap_or(1);
        let renewed = student_credits::ActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(tenant.organization_id),
            student_id: Set(student_id),
            plan_id: Set(Some(plan.id)),
            total_credits: Set(total_credits),
            credits_used: Set(0),
            status: Set(CreditStatus::Active),
            auto_renew: Set(plan.auto_renew_credits),
            renewal_count: Set(0),
            next_renewal_date: Set(None),
            purchased_at: Set(now),
            expires_at: Set(plan
                .credit_validity_days
                .map(|days| now + Duration::days(i64::from(days)))),
            previous_credit_id: Set(Some(original.id)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(txn)
        .await?;

        let renewal = credit_renewals::ActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(tenant.organization_id),
            student_id: Set(student_id),
            original_credit_id: Set(original.id),
            renewed_credit_id: Set(renewed.id),
            renewal_date: Set(now),
            renewal_reason: Set(MANUAL_RENEWAL_REASON.to_string()),
        }
        .insert(txn)
        .await?;

        let renewal_count = original.renewal_count + 1;
        let mut original_active: student_credits::ActiveModel = original.clone().into();
        original_active.renewal_count = Set(renewal_count);
        original_active.status = Set(CreditStatus::Renewed);
        original_active.next_renewal_date = Set(plan
            .renewal_interval_days
            .map(|days| now + Duration::days(i64::from(days))));
        original_active.updated_at = Set(now);
        original_active.update(txn).await?;

        Ok(RenewCreditsData {
            renewal_id: renewal.id,
            original_credit_id: original.id,
            credit: StudentCreditRecord::from_model(&renewed, Some(plan.name), now),
        })
    }

    /// Turn off automatic renewal for one lot
    #[instrument(skip(self, tenant), fields(org = %tenant.organization_id))]
    pub async fn cancel_auto_renewal(
        &self,
        tenant: &TenantContext,
        credit_id: Uuid,
    ) -> Result<StudentCreditRecord> {
        let credit = student_credits::Entity::find_by_id(credit_id)
            .filter(student_credits::Column::OrganizationId.eq(tenant.organization_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Credit {} not found", credit_id)))?;

        let now = OffsetDateTime::now_utc();
        let mut credit_active: student_credits::ActiveModel = credit.into();
        credit_active.auto_renew = Set(false);
        credit_active.next_renewal_date = Set(None);
        credit_active.updated_at = Set(now);
        let updated = credit_active.update(&self.db).await?;

        info!(credit_id = %credit_id, "Auto-renewal cancelled");

        Ok(StudentCreditRecord::from_model(&updated, None, now))
    }

    /// Renewals of a student, newest first
    #[instrument(skip(self, tenant), fields(org = %tenant.organization_id))]
    pub async fn get_renewal_history(
        &self,
        tenant: &TenantContext,
        student_id: Uuid,
    ) -> Result<Vec<RenewalHistoryRecord>> {
        find_student(&self.db, tenant, student_id).await?;

        let renewals = credit_renewals::Entity::find()
            .filter(credit_renewals::Column::OrganizationId.eq(tenant.organization_id))
            .filter(credit_renewals::Column::StudentId.eq(student_id))
            .order_by_desc(credit_renewals::Column::RenewalDate)
            .all(&self.db)
            .await?;

        let credit_ids: Vec<Uuid> = renewals
            .iter()
            .flat_map(|r| [r.original_credit_id, r.renewed_credit_id])
            .collect();
        let credits: HashMap<Uuid, CreditBrief> = student_credits::Entity::find()
            .filter(student_credits::Column::OrganizationId.eq(tenant.organization_id))
            .filter(student_credits::Column::Id.is_in(credit_ids))
            .all(&self.db)
            .await?
            .iter()
            .map(|c| (c.id, CreditBrief::from(c)))
            .collect();

        Ok(renewals
            .into_iter()
            .map(|renewal| {
                let original = credits.get(&renewal.original_credit_id).cloned();
                let renewed = credits.get(&renewal.renewed_credit_id).cloned();
                RenewalHistoryRecord::new(renewal, original, renewed)
            })
            .collect())
    }

    async fn active_credits(
        &self,
        tenant: &TenantContext,
        student_id: Uuid,
    ) -> Result<Vec<student_credits::Model>> {
        let credits = student_credits::Entity::find()
            .filter(student_credits::Column::OrganizationId.eq(tenant.organization_id))
            .filter(student_credits::Column::StudentId.eq(student_id))
            .filter(student_credits::Column::Status.eq(CreditStatus::Active))
            .all(&self.db)
            .await?;

        Ok(credits)
    }
}

/// Student lookup scoped to the tenant
pub(crate) async fn find_student<C: ConnectionTrait>(
    conn: &C,
    tenant: &TenantContext,
    student_id: Uuid,
) -> Result<students::Model> {
    students::Entity::find_by_id(student_id)
        .filter(students::Column::OrganizationId.eq(tenant.organization_id))
        .one(conn)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Student {} not found", student_id)))
}

async fn plan_names<C: ConnectionTrait>(
    conn: &C,
    tenant: &TenantContext,
    credits: &[student_credits::Model],
) -> Result<HashMap<Uuid, String>> {
    let plan_ids: Vec<Uuid> = credits.iter().filter_map(|c| c.plan_id).collect();
    if plan_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let plans = billing_plans::Entity::find()
        .filter(billing_plans::Column::OrganizationId.eq(tenant.organization_id))
        .filter(billing_plans::Column::Id.is_in(plan_ids))
        .all(conn)
        .await?;

    Ok(plans.into_iter().map(|p| (p.id, p.name)).collect())
}

/// Refunds must be allowed by the plan and requested before
/// `expires_at - refund_days_before_exp`
fn check_refund_policy(
    plan: &billing_plans::Model,
    credit: &student_credits::Model,
    now: OffsetDateTime,
) -> Result<()> {
    if !plan.allow_refund {
        return Err(ApiError::BusinessRule(format!(
            "Plan {} does not allow refunds",
            plan.name
        )));
    }

    let days_before = plan
        .refund_days_before_exp
        .map_or(DEFAULT_REFUND_DAYS_BEFORE_EXPIRY, i64::from);
    if let Some(expires_at) = credit.expires_at {
        let deadline = expires_at - Duration::days(days_before);
        if now > deadline {
            return Err(ApiError::BusinessRule(format!(
                "Refunds for this credit were only available until {}",
                deadline.date()
            )));
        }
    }

    Ok(())
}

/// Soonest expiry first, lots without expiry last, oldest purchase breaks ties
fn sort_by_expiry(credits: &mut [student_credits::Model]) {
    credits.sort_by_key(|c| (c.expires_at.is_none(), c.expires_at, c.purchased_at));
}

fn summarize(credits: &[student_credits::Model], now: OffsetDateTime) -> CreditsSummary {
    let total_credits: i32 = credits.iter().map(|c| c.total_credits).sum();
    let total_used: i32 = credits.iter().map(|c| c.credits_used).sum();
    let total_available = total_credits - total_used;

    let utilization_percentage = if total_credits > 0 {
        (f64::from(total_used) / f64::from(total_credits) * 100.0).round() as i32
    } else {
        0
    };

    let auto_renewal_count = credits.iter().filter(|c| c.auto_renew).count();

    CreditsSummary {
        total_credits,
        total_used,
        total_available,
        utilization_percentage,
        credits_count: credits.len(),
        expiring_first: credits.first().map(|c| ExpiringFirst {
            id: c.id,
            expires_at: c.expires_at,
            days_until_expiry: c.days_until_expiry(now),
            available_credits: c.remaining(),
        }),
        auto_renewal_active: auto_renewal_count > 0,
        auto_renewal_count,
    }
}
