//! Tenant-scoped execution context.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Execution context carried explicitly through every public operation.
///
/// Holds the tenant the call acts for, the request id used to correlate log
/// lines, and the access contract the caller presented, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    tenant_id: u32,
    request_id: Uuid,
    contract_id: Option<String>,
}

impl TenantContext {
    /// Create a context for a tenant with a fresh request id.
    #[must_use]
    pub fn new(tenant_id: u32) -> Self {
        Self {
            tenant_id,
            request_id: Uuid::new_v4(),
            contract_id: None,
        }
    }

    /// Attach an access contract.
    #[must_use]
    pub fn with_contract(mut self, contract_id: impl Into<String>) -> Self {
        self.contract_id = Some(contract_id.into());
        self
    }

    /// Reuse an existing request id (e.g. one received from an upstream caller).
    #[must_use]
    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = request_id;
        self
    }

    /// Derive a context for another tenant, keeping request and contract.
    #[must_use]
    pub fn for_tenant(&self, tenant_id: u32) -> Self {
        Self {
            tenant_id,
            request_id: self.request_id,
            contract_id: self.contract_id.clone(),
        }
    }

    /// The tenant id.
    #[must_use]
    pub fn tenant_id(&self) -> u32 {
        self.tenant_id
    }

    /// The request id.
    #[must_use]
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// The access contract, if any.
    #[must_use]
    pub fn contract_id(&self) -> Option<&str> {
        self.contract_id.as_deref()
    }

    /// Create a tracing span carrying the context fields.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "tenant",
            tenant = self.tenant_id,
            request_id = %self.request_id,
            contract = self.contract_id.as_deref().unwrap_or("-"),
        )
    }
}
