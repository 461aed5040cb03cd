use serde::{Deserialize, Serialize};

use dockyard_core::{DomainError, Entity, TenantId};

dockyard_core::typed_id!(
    /// Party identifier (tenant-scoped).
    PartyId
);

/// Role tag carried by a party. A party may hold several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyRole {
    Vendor,
    Customer,
    Carrier,
}

/// Party status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyStatus {
    Active,
    Suspended,
}

/// A trading party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub id: PartyId,
    pub tenant_id: TenantId,
    pub name: String,
    pub roles: Vec<PartyRole>,
    pub status: PartyStatus,
}

impl Party {
    pub fn new(
        tenant_id: TenantId,
        id: PartyId,
        name: impl Into<String>,
        roles: Vec<PartyRole>,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("party name cannot be empty"));
        }

        let mut roles = roles;
        roles.sort_by_key(|r| *r as u8);
        roles.dedup();

        Ok(Self {
            id,
            tenant_id,
            name,
            roles,
            status: PartyStatus::Active,
        })
    }

    pub fn has_role(&self, role: PartyRole) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_vendor(&self) -> bool {
        self.has_role(PartyRole::Vendor)
    }

    /// Suspended parties cannot transact.
    pub fn can_transact(&self) -> bool {
        self.status == PartyStatus::Active
    }

    pub fn suspend(&mut self) {
        self.status = PartyStatus::Suspended;
    }
}

impl Entity for Party {
    type Id = PartyId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
