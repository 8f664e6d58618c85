use crate::common::*;
use entity::{billing_plans, sea_orm_active_enums::CreditStatus, student_credits};
use sea_orm::{entity::*, DatabaseConnection};
use tatame::{
    error::ApiError,
    models::tenant::TenantContext,
    services::{CreditDebit, CreditsService},
};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

fn debit(student_id: Uuid, credits: i32) -> CreditDebit {
    CreditDebit {
        student_id,
        attendance_id: Uuid::new_v4(),
        credits_to_use: credits,
        description: "Aula frequentada".to_string(),
    }
}

async fn setup() -> (DatabaseConnection, CreditsService, TenantContext, Uuid) {
    let db = setup_test_db().await;
    let tenant = create_organization(&db, "gracie-centro").await;
    let student_id = create_student(&db, &tenant, "Helena").await;
    let service = CreditsService::new(db.clone());
    (db, service, tenant, student_id)
}

fn in_days(days: i64) -> Option<OffsetDateTime> {
    Some(OffsetDateTime::now_utc() + Duration::days(days))
}

async fn bought_with(
    db: &DatabaseConnection,
    credit: student_credits::Model,
    plan_id: Uuid,
) -> student_credits::Model {
    let mut credit: student_credits::ActiveModel = credit.into();
    credit.plan_id = Set(Some(plan_id));
    credit.update(db).await.unwrap()
}

#[tokio::test]
async fn test_use_credits_debits_and_rejects_overdraft() {
    let (db, service, tenant, student_id) = setup().await;
    let credit = create_credit(&db, &tenant, student_id, 10, 3, in_days(1)).await;

    let used = service
        .use_credits(&tenant, debit(student_id, 5))
        .await
        .expect("debit within balance should succeed");
    assert_eq!(used.credit_id, credit.id);
    assert_eq!(used.credits_remaining, 2);
    assert_eq!(used.total_credits, 10);
    assert_eq!(find_credit(&db, credit.id).await.credits_used, 8);

    let overdraft = service.use_credits(&tenant, debit(student_id, 10)).await;
    assert!(matches!(overdraft, Err(ApiError::InsufficientCredits(_))));
    assert_eq!(find_credit(&db, credit.id).await.credits_used, 8);
}

#[tokio::test]
async fn test_use_credits_without_active_lot_is_not_found() {
    let (_db, service, tenant, student_id) = setup().await;

    let result = service.use_credits(&tenant, debit(student_id, 1)).await;
    assert!(matches!(result, Err(ApiError::NotFound(_))));
}

#[tokio::test]
async fn test_use_credits_prefers_soonest_expiring_lot_that_covers() {
    let (db, service, tenant, student_id) = setup().await;
    let short = create_credit(&db, &tenant, student_id, 4, 3, in_days(2)).await;
    let medium = create_credit(&db, &tenant, student_id, 5, 0, in_days(10)).await;
    let forever = create_credit(&db, &tenant, student_id, 50, 0, None).await;

    // The short lot only has 1 left, so 2 credits come from the next one
    let first = service
        .use_credits(&tenant, debit(student_id, 2))
        .await
        .unwrap();
    assert_eq!(first.credit_id, medium.id);

    let second = service
        .use_credits(&tenant, debit(student_id, 1))
        .await
        .unwrap();
    assert_eq!(second.credit_id, short.id);
    assert_eq!(second.credits_remaining, 0);

    let short = find_credit(&db, short.id).await;
    assert_eq!(short.status, CreditStatus::Exhausted);
    assert_eq!(find_credit(&db, forever.id).await.credits_used, 0);
}

#[tokio::test]
async fn test_expired_lot_is_retired_and_never_spent() {
    let (db, service, tenant, student_id) = setup().await;
    let expired = create_credit(&db, &tenant, student_id, 10, 0, in_days(-1)).await;
    let valid = create_credit(&db, &tenant, student_id, 3, 0, in_days(30)).await;

    let used = service
        .use_credits(&tenant, debit(student_id, 1))
        .await
        .unwrap();
    assert_eq!(used.credit_id, valid.id);

    let expired = find_credit(&db, expired.id).await;
    assert_eq!(expired.status, CreditStatus::Expired);
    assert_eq!(expired.credits_used, 0);
}

#[tokio::test]
async fn test_credits_are_isolated_per_organization() {
    let (db, service, tenant, _student_id) = setup().await;
    let other_tenant = create_organization(&db, "alliance-sul").await;
    let outsider = create_student(&db, &other_tenant, "Rafael").await;
    let credit = create_credit(&db, &other_tenant, outsider, 10, 0, in_days(5)).await;

    let result = service.use_credits(&tenant, debit(outsider, 1)).await;
    assert!(matches!(result, Err(ApiError::NotFound(_))));

    let listing = service.get_student_credits(&tenant, outsider).await;
    assert!(matches!(listing, Err(ApiError::NotFound(_))));

    let cancel = service.cancel_auto_renewal(&tenant, credit.id).await;
    assert!(matches!(cancel, Err(ApiError::NotFound(_))));

    assert_eq!(find_credit(&db, credit.id).await.credits_used, 0);
}

#[tokio::test]
async fn test_refund_reverses_one_usage_exactly_once() {
    let (db, service, tenant, student_id) = setup().await;
    let credit = create_credit(&db, &tenant, student_id, 2, 0, in_days(3)).await;

    let used = service
        .use_credits(&tenant, debit(student_id, 2))
        .await
        .unwrap();
    assert_eq!(find_credit(&db, credit.id).await.status, CreditStatus::Exhausted);

    let refund = service
        .refund_credits(&tenant, credit.id, used.credit_usage_id, "Aula cancelada")
        .await
        .expect("first refund should succeed");
    assert_eq!(refund.credits_refunded, 2);
    assert_eq!(refund.credits_used, 0);
    assert_eq!(refund.credits_available, 2);
    assert_eq!(refund.status, CreditStatus::Active);

    let again = service
        .refund_credits(&tenant, credit.id, used.credit_usage_id, "Aula cancelada")
        .await;
    assert!(matches!(again, Err(ApiError::AlreadyRefunded(_))));
    assert_eq!(find_credit(&db, credit.id).await.credits_used, 0);
}

#[tokio::test]
async fn test_refund_requires_usage_of_that_credit() {
    let (db, service, tenant, student_id) = setup().await;
    let first = create_credit(&db, &tenant, student_id, 5, 0, in_days(3)).await;
    let second = create_credit(&db, &tenant, student_id, 5, 0, in_days(9)).await;

    let used = service
        .use_credits(&tenant, debit(student_id, 1))
        .await
        .unwrap();
    assert_eq!(used.credit_id, first.id);

    let wrong_credit = service
        .refund_credits(&tenant, second.id, used.credit_usage_id, "Erro")
        .await;
    assert!(matches!(wrong_credit, Err(ApiError::NotFound(_))));

    let unknown_usage = service
        .refund_credits(&tenant, first.id, Uuid::new_v4(), "Erro")
        .await;
    assert!(matches!(unknown_usage, Err(ApiError::NotFound(_))));
}

#[tokio::test]
async fn test_refund_follows_plan_policy() {
    let (db, service, tenant, student_id) = setup().await;
    let plan = create_plan(&db, &tenant, Some(8), None).await;

    // Inside the last week before expiry
    let closing = create_credit(&db, &tenant, student_id, 5, 0, in_days(3)).await;
    let closing = bought_with(&db, closing, plan.id).await;
    let used = service.use_credits(&tenant, debit(student_id, 1)).await.unwrap();
    assert_eq!(used.credit_id, closing.id);

    let too_late = service
        .refund_credits(&tenant, closing.id, used.credit_usage_id, "Aula cancelada")
        .await;
    assert!(matches!(too_late, Err(ApiError::BusinessRule(_))));
    assert_eq!(find_credit(&db, closing.id).await.credits_used, 1);

    let open = create_credit(&db, &tenant, student_id, 5, 0, in_days(30)).await;
    let open = bought_with(&db, open, plan.id).await;
    let used = service.use_credits(&tenant, debit(student_id, 5)).await.unwrap();
    assert_eq!(used.credit_id, open.id);

    let mut no_refunds: billing_plans::ActiveModel = plan.into();
    no_refunds.allow_refund = Set(false);
    no_refunds.update(&db).await.unwrap();

    let blocked = service
        .refund_credits(&tenant, open.id, used.credit_usage_id, "Desistência")
        .await;
    assert!(matches!(blocked, Err(ApiError::BusinessRule(_))));
    assert_eq!(find_credit(&db, open.id).await.credits_used, 5);
}

#[tokio::test]
async fn test_listing_hides_lots_past_expiry() {
    let (db, service, tenant, student_id) = setup().await;
    let stale = create_credit(&db, &tenant, student_id, 10, 5, in_days(-1)).await;
    let live = create_credit(&db, &tenant, student_id, 4, 1, in_days(10)).await;

    let listing = service.get_student_credits(&tenant, student_id).await.unwrap();
    let ids: Vec<Uuid> = listing.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![live.id]);
    assert_eq!(listing[0].credits_available, 3);

    let summary = service.get_credits_summary(&tenant, student_id).await.unwrap();
    assert_eq!(summary.credits_count, listing.len());
    assert_eq!(summary.total_available, 3);

    assert_eq!(find_credit(&db, stale.id).await.status, CreditStatus::Active);
}

#[tokio::test]
async fn test_expiring_credits_window_and_tenant_scope() {
    let (db, service, tenant, student_id) = setup().await;
    let other_tenant = create_organization(&db, "checkmat-norte").await;
    let outsider = create_student(&db, &other_tenant, "Bruno").await;

    let soon = create_credit(&db, &tenant, student_id, 10, 2, in_days(3)).await;
    let sooner = create_credit(&db, &tenant, student_id, 4, 0, in_days(1)).await;
    create_credit(&db, &tenant, student_id, 10, 0, in_days(10)).await;
    create_credit(&db, &tenant, student_id, 10, 0, None).await;
    create_credit(&db, &tenant, student_id, 10, 0, in_days(-1)).await;
    create_credit(&db, &other_tenant, outsider, 10, 0, in_days(2)).await;

    let expiring = service.get_expiring_credits(&tenant, 7).await.unwrap();

    let ids: Vec<Uuid> = expiring.iter().map(|c| c.credit.id).collect();
    assert_eq!(ids, vec![sooner.id, soon.id]);
    assert_eq!(expiring[0].student_name.as_deref(), Some("Helena"));
    assert_eq!(expiring[1].credit.credits_available, 8);
}

#[tokio::test]
async fn test_manual_renewal_issues_new_lot_and_retires_original() {
    let (db, service, tenant, student_id) = setup().await;
    let plan = create_plan(&db, &tenant, Some(8), Some(1)).await;
    let original = create_credit(&db, &tenant, student_id, 4, 4, in_days(2)).await;

    let renewed = service
        .renew_credits_manual(&tenant, student_id, original.id, plan.id)
        .await
        .expect("renewal should succeed");
    assert_eq!(renewed.original_credit_id, original.id);
    assert_eq!(renewed.credit.total_credits, 8);
    assert_eq!(renewed.credit.credits_available, 8);
    assert_eq!(renewed.credit.previous_credit_id, Some(original.id));
    assert_eq!(renewed.credit.plan_name.as_deref(), Some("Plano Mensal"));
    assert!(renewed.credit.expires_at.is_some());

    let original = find_credit(&db, original.id).await;
    assert_eq!(original.status, CreditStatus::Renewed);
    assert_eq!(original.renewal_count, 1);
    assert!(original.next_renewal_date.is_some());

    // Plan allows a single renewal
    let again = service
        .renew_credits_manual(&tenant, student_id, original.id, plan.id)
        .await;
    assert!(matches!(again, Err(ApiError::BusinessRule(_))));

    let history = service
        .get_renewal_history(&tenant, student_id)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].renewal_reason, "MANUAL_RENEWAL");
    assert_eq!(
        history[0].original_credit.as_ref().map(|c| c.id),
        Some(original.id)
    );
    assert_eq!(
        history[0].renewed_credit.as_ref().map(|c| c.total_credits),
        Some(8)
    );
}

#[tokio::test]
async fn test_renewal_defaults_to_one_credit_and_checks_scope() {
    let (db, service, tenant, student_id) = setup().await;
    let plan = create_plan(&db, &tenant, None, None).await;
    let original = create_credit(&db, &tenant, student_id, 4, 1, in_days(2)).await;

    let renewed = service
        .renew_credits_manual(&tenant, student_id, original.id, plan.id)
        .await
        .unwrap();
    assert_eq!(renewed.credit.total_credits, 1);

    let other_tenant = create_organization(&db, "nova-uniao").await;
    let foreign_plan = create_plan(&db, &other_tenant, Some(10), None).await;
    let result = service
        .renew_credits_manual(&tenant, student_id, original.id, foreign_plan.id)
        .await;
    assert!(matches!(result, Err(ApiError::NotFound(_))));
}

#[tokio::test]
async fn test_cancel_auto_renewal_clears_schedule() {
    let (db, service, tenant, student_id) = setup().await;
    let credit = create_credit(&db, &tenant, student_id, 10, 0, in_days(20)).await;

    let mut active: student_credits::ActiveModel = credit.clone().into();
    active.auto_renew = Set(true);
    active.next_renewal_date = Set(in_days(20));
    active.update(&db).await.unwrap();

    let cancelled = service
        .cancel_auto_renewal(&tenant, credit.id)
        .await
        .unwrap();
    assert!(!cancelled.auto_renew);
    assert!(cancelled.next_renewal_date.is_none());

    let stored = find_credit(&db, credit.id).await;
    assert!(!stored.auto_renew);
    assert!(stored.next_renewal_date.is_none());
}

#[tokio::test]
async fn test_summary_and_listing() {
    let (db, service, tenant, student_id) = setup().await;
    let first = create_credit(&db, &tenant, student_id, 10, 3, in_days(1)).await;
    create_credit(&db, &tenant, student_id, 20, 7, None).await;

    let summary = service
        .get_credits_summary(&tenant, student_id)
        .await
        .unwrap();
    assert_eq!(summary.total_credits, 30);
    assert_eq!(summary.total_used, 10);
    assert_eq!(summary.total_available, 20);
    assert_eq!(summary.utilization_percentage, 33);
    assert_eq!(summary.credits_count, 2);
    assert_eq!(summary.expiring_first.as_ref().map(|c| c.id), Some(first.id));

    for _ in 0..6 {
        service
            .use_credits(&tenant, debit(student_id, 1))
            .await
            .unwrap();
    }

    let credits = service
        .get_student_credits(&tenant, student_id)
        .await
        .unwrap();
    assert_eq!(credits.len(), 2);
    assert_eq!(credits[0].id, first.id);
    assert_eq!(credits[0].credits_available, 1);
    assert_eq!(credits[0].recent_usages.len(), 5);
    assert!(credits[1].recent_usages.is_empty());
}
