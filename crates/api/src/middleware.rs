use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use dockyard_core::TenantId;

use crate::app::errors::json_error;
use crate::context::TenantContext;

pub const TENANT_HEADER: &str = "x-tenant-id";

/// Resolve the tenant from `X-Tenant-Id`. Authentication happens upstream.
pub async fn tenant_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let tenant_id = extract_tenant(req.headers())?;
    req.extensions_mut().insert(TenantContext::new(tenant_id));
    Ok(next.run(req).await)
}

fn extract_tenant(headers: &HeaderMap) -> Result<TenantId, Response> {
    let raw = headers
        .get(TENANT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| json_error(StatusCode::BAD_REQUEST, "TENANT_REQUIRED", "X-Tenant-Id header is required"))?;

    raw.parse()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "INVALID_TENANT", "X-Tenant-Id must be a UUID"))
}
