use dockyard_core::TenantId;

/// Tenant resolved from `X-Tenant-Id`, inserted by
/// [`tenant_middleware`](crate::middleware::tenant_middleware).
///
/// Every purchasing route reads it; orders outside this tenant answer 404.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TenantContext(TenantId);

impl TenantContext {
    pub fn new(tenant_id: TenantId) -> Self {
        Self(tenant_id)
    }

    pub fn tenant_id(&self) -> TenantId {
        self.0
    }
}
