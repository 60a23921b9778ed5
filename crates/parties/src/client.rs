use serde::{Deserialize, Serialize};

use tally_core::{ClientId, DomainError};

/// Client status.
///
/// Inactive clients keep their history; whether they may receive new invoices
/// is a business decision outside the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientStatus {
    #[default]
    Active,
    Inactive,
}

/// Contact information for a client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Fiscal identification printed on invoices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiscalInfo {
    /// Taxpayer identification number (IFU).
    pub ifu: Option<String>,
    /// Trade and personal property credit register number (RCCM).
    pub rccm: Option<String>,
    pub tax_regime: Option<String>,
}

/// Catalog record: Client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    #[serde(default)]
    pub contact: ContactInfo,
    #[serde(default)]
    pub fiscal: FiscalInfo,
    #[serde(default)]
    pub status: ClientStatus,
}

impl Client {
    pub fn new(id: ClientId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            contact: ContactInfo::default(),
            fiscal: FiscalInfo::default(),
            status: ClientStatus::Active,
        }
    }

    /// Check the record before it enters the catalog.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("client name cannot be empty"));
        }
        Ok(())
    }
}
