//! Hand-off to the presentation layer.
//!
//! The engine never formats amounts or localizes labels. It resolves a finished
//! invoice together with its client and the issuer settings, and passes that
//! triple to whatever renders it (PDF, HTML, print view).

use serde::{Deserialize, Serialize};

use tally_parties::Client;

use crate::invoice::Invoice;

/// Currencies the issuer can invoice in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Eur,
    Usd,
    Gbp,
    /// West African CFA franc (no fractional unit).
    #[default]
    Xof,
}

/// Issuer settings printed on every invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub company_name: String,
    pub legal_name: String,
    pub manager_name: String,
    pub company_address: String,
    pub company_phone: String,
    pub company_ifu: String,
    pub company_rccm: String,
    pub logo_url: Option<String>,
    pub currency: Currency,
}

/// Fully resolved input for a renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDocument {
    pub invoice: Invoice,
    pub client: Client,
    pub settings: Settings,
}

/// Presentation collaborator.
pub trait InvoiceRenderer {
    type Output;
    type Error: std::error::Error;

    fn render(&self, document: &InvoiceDocument) -> Result<Self::Output, Self::Error>;
}
