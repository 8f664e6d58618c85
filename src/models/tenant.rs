use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::ApiError;

/// Organization the current request acts on behalf of.
///
/// Resolved once by `tenant_middleware`; every data access takes it explicitly
/// and filters on `organization_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    pub organization_id: Uuid,
    pub name: String,
    pub slug: String,
}

impl From<entity::organizations::Model> for TenantContext {
    fn from(org: entity::organizations::Model) -> Self {
        Self {
            organization_id: org.id,
            name: org.name,
            slug: org.slug,
        }
    }
}

/// Axum extractor for the tenant context
///
/// Only works on routes wrapped by tenant_middleware.
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .cloned()
            .ok_or_else(|| {
                ApiError::Internal(anyhow::anyhow!(
                    "TenantContext not found - tenant middleware not applied"
                ))
            })
    }
}
