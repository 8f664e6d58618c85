use axum::{extract::State, Json};
use tracing::instrument;
use validator::Validate;

use crate::{
    app_state::AppState,
    error::Result,
    extract::{ApiJson, ApiQuery},
    models::{
        common::SuccessResponse,
        tenant::TenantContext,
        turmas::{AvailabilityData, AvailableNowQuery, CheckInData, CheckInRequest},
    },
};

/// GET /api/turmas/available-now?organizationId=&studentId=
#[instrument(skip(state, tenant))]
pub async fn available_now(
    State(state): State<AppState>,
    tenant: TenantContext,
    ApiQuery(query): ApiQuery<AvailableNowQuery>,
) -> Result<Json<SuccessResponse<AvailabilityData>>> {
    let availability = state
        .turmas_service
        .available_now(&tenant, query.student_id)
        .await?;

    Ok(Json(SuccessResponse::new(availability)))
}

/// POST /api/turmas/check-in
#[instrument(skip(state, tenant, request))]
pub async fn check_in(
    State(state): State<AppState>,
    tenant: TenantContext,
    ApiJson(request): ApiJson<CheckInRequest>,
) -> Result<Json<SuccessResponse<CheckInData>>> {
    request.validate()?;

    state
        .checkin_rate_limiter
        .check(tenant.organization_id, request.student_id)
        .await?;

    let data = state
        .checkin_service
        .check_in(&tenant, request.lesson_id, request.student_id)
        .await?;

    Ok(Json(
        SuccessResponse::new(data).with_message("Check-in successful"),
    ))
}
