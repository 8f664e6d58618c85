//! Resolves the organization a request acts for
//!
//! The id comes from the `x-organization-id` header, falling back to the
//! `organizationId` query parameter. Handlers read the result through the
//! `TenantContext` extractor.

use crate::{
    app_state::AppState,
    error::{ApiError, Result},
    models::tenant::TenantContext,
};
use axum::{
    extract::{Query, Request, State},
    middleware::Next,
    response::Response,
};
use entity::organizations;
use sea_orm::{entity::*, query::*};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

pub const TENANT_HEADER: &str = "x-organization-id";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TenantQuery {
    organization_id: Option<String>,
}

pub async fn tenant_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let organization_id = organization_id_from(&request)?;

    let organization = organizations::Entity::find_by_id(organization_id)
        .filter(organizations::Column::IsActive.eq(true))
        .one(&state.db)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("Organization {} not found", organization_id))
        })?;

    let tenant = TenantContext::from(organization);
    debug!(
        organization_id = %tenant.organization_id,
        slug = %tenant.slug,
        name = %tenant.name,
        "Tenant resolved"
    );

    request.extensions_mut().insert(tenant);

    Ok(next.run(request).await)
}

fn organization_id_from(request: &Request) -> Result<Uuid> {
    let raw = match request.headers().get(TENANT_HEADER) {
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| {
                    ApiError::Validation(format!("{} header is not valid text", TENANT_HEADER))
                })?
                .to_string(),
        ),
        None => Query::<TenantQuery>::try_from_uri(request.uri())
            .ok()
            .and_then(|Query(query)| query.organization_id),
    };

    let raw = raw.ok_or_else(|| {
        ApiError::Validation(format!(
            "Organization is required ({} header or organizationId query parameter)",
            TENANT_HEADER
        ))
    })?;

    Uuid::parse_str(raw.trim())
        .map_err(|_| ApiError::Validation(format!("Invalid organization id: {}", raw)))
}
