//! Payment ledger rules: append-only payments and status derivation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tally_core::{DomainError, Money, PaymentId};

use crate::invoice::Invoice;

/// How a payment was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Cheque,
    Other,
}

/// A recorded payment. Never mutated or removed once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: PaymentId,
    pub date: DateTime<Utc>,
    pub amount: Money,
    pub method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// What to do with a payment that pushes `amount_paid` above the total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverpaymentPolicy {
    /// Accept it; the invoice is simply `Paid`.
    #[default]
    Allow,
    /// Refuse it with an invariant violation.
    Reject,
}

impl Invoice {
    /// Next version of this invoice with `payment` appended.
    ///
    /// `amount_paid` is recomputed from the full payment history and the status
    /// re-derived from it, replacing any manually set status.
    pub fn record_payment(
        &self,
        payment: Payment,
        policy: OverpaymentPolicy,
    ) -> Result<Invoice, DomainError> {
        if !payment.amount.is_positive() {
            return Err(DomainError::validation("payment amount must be positive"));
        }

        let amount_paid = Money::checked_sum(
            self.payments()
                .iter()
                .map(|p| p.amount)
                .chain(core::iter::once(payment.amount)),
        )?;

        if policy == OverpaymentPolicy::Reject && amount_paid > self.total_amount() {
            return Err(DomainError::invariant(format!(
                "payment of {} exceeds the balance due of {}",
                payment.amount,
                self.balance_due()
            )));
        }

        Ok(self.with_payment(payment, amount_paid))
    }
}
