//! Application services and persistence for the invoice ledger.
//!
//! - [`store`]: the catalog store boundary and its in-memory implementation
//! - [`lifecycle`]: invoice create/update/delete with stock reconciliation
//! - [`payments`]: payment recording
//! - [`config`]: engine knobs loaded from the environment

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod payments;
mod retry;
pub mod store;

pub use config::EngineConfig;
pub use error::ServiceError;
pub use lifecycle::{
    CreateInvoice, InvoiceFilter, InvoiceService, LineRequest, RevisedLine, UpdateInvoice,
};
pub use payments::{PaymentLedger, RecordPayment};
pub use store::{CatalogStore, InMemoryCatalogStore, InvoiceWrite, StoreError, WriteBatch};
