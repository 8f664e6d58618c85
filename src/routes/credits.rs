use axum::{extract::State, Json};
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app_state::AppState,
    error::{ApiError, Result},
    extract::{ApiJson, ApiPath, ApiQuery},
    models::{
        common::SuccessResponse,
        credits::{
            CreditsSummary, ExpiringCreditsFilters, ExpiringCreditsQuery,
            ExpiringCreditsResponse, RefundCreditsData, RefundCreditsRequest, RenewCreditsData,
            RenewCreditsRequest, RenewalHistoryRecord, StudentCreditRecord, UseCreditsData,
            UseCreditsRequest, DEFAULT_REFUND_REASON, DEFAULT_USAGE_DESCRIPTION,
        },
        tenant::TenantContext,
    },
    services::CreditDebit,
};

/// GET /api/credits/student/:studentId
#[instrument(skip(state, tenant))]
pub async fn get_student_credits(
    State(state): State<AppState>,
    tenant: TenantContext,
    ApiPath(student_id): ApiPath<Uuid>,
) -> Result<Json<SuccessResponse<Vec<StudentCreditRecord>>>> {
    let credits = state
        .credits_service
        .get_student_credits(&tenant, student_id)
        .await?;

    Ok(Json(SuccessResponse::list(credits)))
}

/// GET /api/credits/summary/:studentId
#[instrument(skip(state, tenant))]
pub async fn get_credits_summary(
    State(state): State<AppState>,
    tenant: TenantContext,
    ApiPath(student_id): ApiPath<Uuid>,
) -> Result<Json<SuccessResponse<CreditsSummary>>> {
    let summary = state
        .credits_service
        .get_credits_summary(&tenant, student_id)
        .await?;

    Ok(Json(SuccessResponse::new(summary)))
}

/// POST /api/credits/use
#[instrument(skip(state, tenant, request))]
pub async fn use_credits(
    State(state): State<AppState>,
    tenant: TenantContext,
    ApiJson(request): ApiJson<UseCreditsRequest>,
) -> Result<Json<SuccessResponse<UseCreditsData>>> {
    request.validate()?;

    let debit = CreditDebit {
        student_id: request.student_id,
        attendance_id: request.attendance_id,
        credits_to_use: request.credits_to_use,
        description: request
            .description
            .unwrap_or_else(|| DEFAULT_USAGE_DESCRIPTION.to_string()),
    };

    let data = state.credits_service.use_credits(&tenant, debit).await?;

    Ok(Json(
        SuccessResponse::new(data).with_message("Credits used successfully"),
    ))
}

/// POST /api/credits/refund
#[instrument(skip(state, tenant, request))]
pub async fn refund_credits(
    State(state): State<AppState>,
    tenant: TenantContext,
    ApiJson(request): ApiJson<RefundCreditsRequest>,
) -> Result<Json<SuccessResponse<RefundCreditsData>>> {
    request.validate()?;

    let reason = request
        .refund_reason
        .as_deref()
        .unwrap_or(DEFAULT_REFUND_REASON);

    let data = state
        .credits_service
        .refund_credits(&tenant, request.credit_id, request.usage_id, reason)
        .await?;

    Ok(Json(
        SuccessResponse::new(data).with_message("Credits refunded successfully"),
    ))
}

/// GET /api/credits/expiring-soon?days=N
#[instrument(skip(state, tenant))]
pub async fn get_expiring_credits(
    State(state): State<AppState>,
    tenant: TenantContext,
    ApiQuery(query): ApiQuery<ExpiringCreditsQuery>,
) -> Result<Json<ExpiringCreditsResponse>> {
    let credits_config = &state.config.credits;
    let days = query.days.unwrap_or(credits_config.default_expiring_days);
    if !(0..=credits_config.max_expiring_days).contains(&days) {
        return Err(ApiError::Validation(format!(
            "days must be between 0 and {}",
            credits_config.max_expiring_days
        )));
    }

    let credits = state
        .credits_service
        .get_expiring_credits(&tenant, days)
        .await?;

    Ok(Json(ExpiringCreditsResponse {
        success: true,
        total: credits.len(),
        data: credits,
        filters: ExpiringCreditsFilters {
            days_until_expiry: days,
        },
    }))
}

/// POST /api/credits/renew-manual
#[instrument(skip(state, tenant, request))]
pub async fn renew_credits_manual(
    State(state): State<AppState>,
    tenant: TenantContext,
    ApiJson(request): ApiJson<RenewCreditsRequest>,
) -> Result<Json<SuccessResponse<RenewCreditsData>>> {
    request.validate()?;

    let data = state
        .credits_service
        .renew_credits_manual(
            &tenant,
            request.student_id,
            request.credit_id,
            request.plan_id,
        )
        .await?;

    Ok(Json(
        SuccessResponse::new(data).with_message("Credits renewed successfully"),
    ))
}

/// PATCH /api/credits/:creditId/cancel-renewal
#[instrument(skip(state, tenant))]
pub async fn cancel_auto_renewal(
    State(state): State<AppState>,
    tenant: TenantContext,
    ApiPath(credit_id): ApiPath<Uuid>,
) -> Result<Json<SuccessResponse<StudentCreditRecord>>> {
    let credit = state
        .credits_service
        .cancel_auto_renewal(&tenant, credit_id)
        .await?;

    Ok(Json(
        SuccessResponse::new(credit).with_message("Auto-renewal cancelled"),
    ))
}

/// GET /api/credits/renewal-history/:studentId
#[instrument(skip(state, tenant))]
pub async fn get_renewal_history(
    State(state): State<AppState>,
    tenant: TenantContext,
    ApiPath(student_id): ApiPath<Uuid>,
) -> Result<Json<SuccessResponse<Vec<RenewalHistoryRecord>>>> {
    let history = state
        .credits_service
        .get_renewal_history(&tenant, student_id)
        .await?;

    Ok(Json(SuccessResponse::list(history)))
}
