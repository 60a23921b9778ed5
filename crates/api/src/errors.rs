//! Conversion of every failure into a user-facing `{ "message": ... }`.

use serde::Serialize;
use thiserror::Error;

use tally_core::RecordKind;
use tally_infra::ServiceError;

use crate::forms::FormError;

/// Failure result of an action, shown to the end user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{message}")]
pub struct ActionError {
    pub message: String,
}

impl ActionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type ActionResult<T> = Result<T, ActionError>;

/// The operation an error happened in; used to phrase generic messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateInvoice,
    UpdateInvoice,
    DeleteInvoice,
    RecordPayment,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::CreateInvoice => "invoice.create",
            Action::UpdateInvoice => "invoice.update",
            Action::DeleteInvoice => "invoice.delete",
            Action::RecordPayment => "payment.record",
        }
    }

    fn goal(self) -> &'static str {
        match self {
            Action::CreateInvoice => "create the invoice",
            Action::UpdateInvoice => "update the invoice",
            Action::DeleteInvoice => "delete the invoice",
            Action::RecordPayment => "record the payment",
        }
    }
}

pub fn form_error_to_action(action: Action, err: FormError) -> ActionError {
    tracing::debug!(action = action.as_str(), error = %err, "payload rejected");
    ActionError::new(format!(
        "Some fields are invalid ({err}). Unable to {}.",
        action.goal()
    ))
}

pub fn service_error_to_action(action: Action, err: ServiceError) -> ActionError {
    match err {
        ServiceError::Validation(msg) => ActionError::new(format!(
            "Some fields are invalid ({msg}). Unable to {}.",
            action.goal()
        )),
        ServiceError::NotFound { kind, id } => ActionError::new(match kind {
            RecordKind::Client => "Client not found.".to_string(),
            RecordKind::Invoice => "Invoice not found.".to_string(),
            RecordKind::Product => format!("Product not found: {id}."),
        }),
        ServiceError::InsufficientStock {
            product,
            available,
            requested,
        } => ActionError::new(format!(
            "Insufficient stock for {product}. Available: {available}, requested: {requested}."
        )),
        ServiceError::InvariantViolation(msg) => {
            ActionError::new(format!("Unable to {}: {msg}.", action.goal()))
        }
        ServiceError::Conflict(msg) => {
            tracing::warn!(action = action.as_str(), error = %msg, "conflict retries exhausted");
            ActionError::new(format!(
                "The data changed while trying to {}. Please try again.",
                action.goal()
            ))
        }
        ServiceError::Storage(msg) => {
            tracing::error!(action = action.as_str(), error = %msg, "storage failed");
            ActionError::new(format!("Database error: unable to {}.", action.goal()))
        }
        ServiceError::Render(msg) => {
            tracing::error!(action = action.as_str(), error = %msg, "rendering failed");
            ActionError::new(format!(
                "The invoice could not be rendered. Unable to {}.",
                action.goal()
            ))
        }
    }
}
