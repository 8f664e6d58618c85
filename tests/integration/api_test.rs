use crate::common::*;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use entity::organizations;
use sea_orm::{entity::*, DatabaseConnection};
use serde_json::{json, Value};
use tatame::{create_router, models::tenant::TenantContext, AppState};
use time::{Duration, OffsetDateTime};
use tower::ServiceExt;
use uuid::Uuid;

async fn app() -> (Router, DatabaseConnection, TenantContext) {
    let db = setup_test_db().await;
    let tenant = create_organization(&db, "api-academy").await;
    let router = create_router(AppState::from_parts(db.clone(), test_config(-3)).unwrap());
    (router, db, tenant)
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str, tenant: Option<&TenantContext>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(tenant) = tenant {
        builder = builder.header("x-organization-id", tenant.organization_id.to_string());
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, tenant: &TenantContext, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("x-organization-id", tenant.organization_id.to_string())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_needs_no_tenant() {
    let (router, _db, _tenant) = app().await;

    let (status, body) = send(&router, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "data": {"status": "ok"}}));
}

#[tokio::test]
async fn test_tenant_resolution_errors() {
    let (router, db, _tenant) = app().await;
    let student = Uuid::new_v4();

    let (status, body) = send(&router, get(&format!("/api/credits/student/{}", student), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let unknown = TenantContext {
        organization_id: Uuid::new_v4(),
        name: "Ghost".to_string(),
        slug: "ghost".to_string(),
    };
    let (status, body) = send(
        &router,
        get(&format!("/api/credits/student/{}", student), Some(&unknown)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let inactive = create_organization(&db, "closed-academy").await;
    let mut model: organizations::ActiveModel = organizations::Entity::find_by_id(inactive.organization_id)
        .one(&db)
        .await
        .unwrap()
        .unwrap()
        .into();
    model.is_active = Set(false);
    model.update(&db).await.unwrap();

    let (status, _) = send(
        &router,
        get(&format!("/api/credits/student/{}", student), Some(&inactive)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_use_credits_over_http() {
    let (router, db, tenant) = app().await;
    let student_id = create_student(&db, &tenant, "Marina").await;
    create_credit(
        &db,
        &tenant,
        student_id,
        10,
        3,
        Some(OffsetDateTime::now_utc() + Duration::days(1)),
    )
    .await;

    let (status, body) = send(
        &router,
        post_json(
            "/api/credits/use",
            &tenant,
            json!({
                "studentId": student_id,
                "attendanceId": Uuid::new_v4(),
                "creditsToUse": 5
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["creditsRemaining"], 2);

    let (status, body) = send(
        &router,
        post_json(
            "/api/credits/use",
            &tenant,
            json!({
                "studentId": student_id,
                "attendanceId": Uuid::new_v4(),
                "creditsToUse": 10
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INSUFFICIENT_CREDITS");

    let (status, body) = send(
        &router,
        get(&format!("/api/credits/summary/{}", student_id), Some(&tenant)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalUsed"], 8);
}

#[tokio::test]
async fn test_malformed_bodies_are_rejected_before_business_logic() {
    let (router, _db, tenant) = app().await;

    let (status, body) = send(
        &router,
        post_json(
            "/api/credits/use",
            &tenant,
            json!({
                "studentId": Uuid::new_v4(),
                "attendanceId": Uuid::new_v4(),
                "creditsToUse": 1,
                "extra": "field"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = send(
        &router,
        post_json(
            "/api/credits/use",
            &tenant,
            json!({
                "studentId": Uuid::new_v4(),
                "attendanceId": Uuid::new_v4(),
                "creditsToUse": 0
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = send(
        &router,
        post_json("/api/credits/refund", &tenant, json!({"creditId": Uuid::new_v4()})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_expiring_soon_lists_with_filters() {
    let (router, db, tenant) = app().await;
    let student_id = create_student(&db, &tenant, "Igor").await;
    create_credit(
        &db,
        &tenant,
        student_id,
        10,
        0,
        Some(OffsetDateTime::now_utc() + Duration::days(2)),
    )
    .await;

    let (status, body) = send(&router, get("/api/credits/expiring-soon", Some(&tenant))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["filters"]["daysUntilExpiry"], 7);
    assert_eq!(body["data"][0]["studentName"], "Igor");

    let (status, body) = send(
        &router,
        get("/api/credits/expiring-soon?days=1", Some(&tenant)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);

    let (status, _) = send(
        &router,
        get("/api/credits/expiring-soon?days=-1", Some(&tenant)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_available_now_accepts_query_tenant() {
    let (router, _db, tenant) = app().await;

    let (status, body) = send(
        &router,
        get(
            &format!(
                "/api/turmas/available-now?organizationId={}",
                tenant.organization_id
            ),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["data"]["openNow"].is_array());
    assert!(body["data"]["upcoming"].is_array());
    assert_eq!(body["data"]["total"], 0);
    assert!(body["data"]["currentDay"].is_string());

    let (status, body) = send(&router, get("/api/turmas/available-now", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_check_in_outside_any_lesson_is_not_found() {
    let (router, db, tenant) = app().await;
    let student_id = create_student(&db, &tenant, "Nina").await;

    let (status, body) = send(
        &router,
        post_json(
            "/api/turmas/check-in",
            &tenant,
            json!({"lessonId": Uuid::new_v4(), "studentId": student_id}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_cancel_renewal_route() {
    let (router, db, tenant) = app().await;
    let student_id = create_student(&db, &tenant, "Otto").await;
    let credit = create_credit(&db, &tenant, student_id, 5, 0, None).await;

    let request = Request::builder()
        .method(Method::PATCH)
        .uri(format!("/api/credits/{}/cancel-renewal", credit.id))
        .header("x-organization-id", tenant.organization_id.to_string())
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["autoRenew"], false);
    assert_eq!(body["message"], "Auto-renewal cancelled");
}

#[tokio::test]
async fn test_state_rejects_out_of_range_academy_offset() {
    let db = setup_test_db().await;
    assert!(AppState::from_parts(db, test_config(30)).is_err());
}
