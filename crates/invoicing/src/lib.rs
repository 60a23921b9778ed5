//! Invoicing domain module.
//!
//! This crate contains the business rules for invoices: the ledger calculator,
//! stock reconciliation planning, payment application and status derivation.
//! Everything here is deterministic domain logic (no IO, no storage); the
//! infrastructure layer loads records, calls in here, and commits the results.

pub mod document;
pub mod invoice;
pub mod payment;
pub mod pricing;
pub mod stock;

pub use document::{Currency, InvoiceDocument, InvoiceRenderer, Settings};
pub use invoice::{Invoice, InvoiceDraft, InvoiceItem, InvoiceStatus};
pub use payment::{OverpaymentPolicy, Payment, PaymentMethod};
pub use pricing::{LedgerTotals, PricedLine};
pub use stock::{ProductIndex, StockAdjustment, StockPlan};
