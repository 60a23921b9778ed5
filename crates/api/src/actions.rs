//! Operation boundary: untyped payload in, invoice or `{message}` out.
//!
//! Each action validates its payload, runs the matching service and converts
//! any failure into an [`ActionError`]. Nothing here panics on bad input.

use serde_json::Value as JsonValue;

use tally_infra::{CatalogStore, EngineConfig, InvoiceService, PaymentLedger};
use tally_invoicing::Invoice;

use crate::errors::{Action, ActionResult, form_error_to_action, service_error_to_action};
use crate::forms;

pub struct InvoiceActions<S> {
    invoices: InvoiceService<S>,
    payments: PaymentLedger<S>,
}

impl<S: CatalogStore + Clone> InvoiceActions<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self {
            invoices: InvoiceService::new(store.clone(), config.clone()),
            payments: PaymentLedger::new(store, config),
        }
    }

    pub fn invoices(&self) -> &InvoiceService<S> {
        &self.invoices
    }

    pub fn create_invoice(&self, payload: &JsonValue) -> ActionResult<Invoice> {
        let action = Action::CreateInvoice;
        let request = forms::parse_create(payload).map_err(|e| form_error_to_action(action, e))?;
        self.invoices
            .create(&request)
            .map_err(|e| service_error_to_action(action, e))
    }

    pub fn update_invoice(&self, invoice_id: &str, payload: &JsonValue) -> ActionResult<Invoice> {
        let action = Action::UpdateInvoice;
        let id = forms::parse_invoice_id(invoice_id).map_err(|e| form_error_to_action(action, e))?;
        let request = forms::parse_update(payload).map_err(|e| form_error_to_action(action, e))?;
        self.invoices
            .update(id, &request)
            .map_err(|e| service_error_to_action(action, e))
    }

    /// Returns the removed invoice.
    pub fn delete_invoice(&self, invoice_id: &str) -> ActionResult<Invoice> {
        let action = Action::DeleteInvoice;
        let id = forms::parse_invoice_id(invoice_id).map_err(|e| form_error_to_action(action, e))?;
        self.invoices
            .delete(id)
            .map_err(|e| service_error_to_action(action, e))
    }

    pub fn record_payment(&self, invoice_id: &str, payload: &JsonValue) -> ActionResult<Invoice> {
        let action = Action::RecordPayment;
        let id = forms::parse_invoice_id(invoice_id).map_err(|e| form_error_to_action(action, e))?;
        let request = forms::parse_payment(payload).map_err(|e| form_error_to_action(action, e))?;
        self.payments
            .record_payment(id, &request)
            .map_err(|e| service_error_to_action(action, e))
    }
}
