//! Operation boundary for the invoice ledger.
//!
//! Callers hand in untyped JSON payloads; [`actions::InvoiceActions`] validates
//! them ([`forms`]), runs the services and answers with either the resulting
//! invoice or an [`errors::ActionError`] carrying a user-facing message.

pub mod actions;
pub mod errors;
pub mod forms;
pub mod script;

pub use actions::InvoiceActions;
pub use errors::{ActionError, ActionResult};
