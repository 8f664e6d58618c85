/// Concurrent debits against the same credit lot
///
/// Five parallel requests compete for three remaining credits. Exactly three
/// succeed, the rest fail with InsufficientCredits, and the balance never goes
/// negative. The in-memory SQLite pool has a single connection, so there the
/// transactions run one after another and only the bookkeeping is checked.
/// The Postgres variant runs them on separate connections and depends on the
/// row lock taken on the candidate lots.
use crate::common::*;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tatame::{
    error::ApiError,
    services::{CreditDebit, CreditsService},
};
use time::{Duration, OffsetDateTime};
use tokio::task::JoinSet;
use uuid::Uuid;

async fn race_debits(db: DatabaseConnection, slug: &str, contenders: usize) {
    let tenant = create_organization(&db, slug).await;
    let student_id = create_student(&db, &tenant, "Lucas").await;
    let credit = create_credit(
        &db,
        &tenant,
        student_id,
        10,
        7,
        Some(OffsetDateTime::now_utc() + Duration::days(5)),
    )
    .await;

    let service = Arc::new(CreditsService::new(db.clone()));
    let mut tasks = JoinSet::new();

    for i in 0..contenders {
        let service = service.clone();
        let tenant = tenant.clone();

        tasks.spawn(async move {
            let result = service
                .use_credits(
                    &tenant,
                    CreditDebit {
                        student_id,
                        attendance_id: Uuid::new_v4(),
                        credits_to_use: 1,
                        description: format!("Aula {}", i),
                    },
                )
                .await;
            (i, result)
        });
    }

    let mut success_count = 0;
    let mut insufficient_count = 0;
    let mut other_error_count = 0;

    while let Some(joined) = tasks.join_next().await {
        let (task_id, result) = joined.expect("task panicked");
        match result {
            Ok(_) => success_count += 1,
            Err(ApiError::InsufficientCredits(_)) | Err(ApiError::NotFound(_)) => {
                insufficient_count += 1
            }
            Err(e) => {
                println!("Task {} failed unexpectedly: {:?}", task_id, e);
                other_error_count += 1;
            }
        }
    }

    assert_eq!(success_count, 3, "exactly the remaining credits are spent");
    assert_eq!(insufficient_count, contenders - 3);
    assert_eq!(other_error_count, 0, "no infrastructure errors");

    let credit = find_credit(&db, credit.id).await;
    assert_eq!(credit.credits_used, 10);
}

#[tokio::test]
async fn test_concurrent_debits_never_overdraw() {
    race_debits(setup_test_db().await, "race-academy", 5).await;
}

#[tokio::test]
#[ignore] // Run only when DATABASE_URL points at a Postgres database
async fn test_concurrent_debits_never_overdraw_on_postgres() {
    let slug = format!("race-academy-{}", Uuid::new_v4());
    race_debits(setup_postgres_db().await, &slug, 10).await;
}
