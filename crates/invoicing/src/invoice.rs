use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tally_core::{AggregateRoot, ClientId, DomainError, InvoiceId, Money, Percent, ProductId};

use crate::payment::Payment;
use crate::pricing::{self, LedgerTotals, PricedLine};

/// Invoice payment status.
///
/// Normally derived from `amount_paid` vs `total_amount` (see
/// [`InvoiceStatus::derive`]); an invoice revision may also set it manually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvoiceStatus {
    Unpaid,
    #[serde(rename = "Partially Paid")]
    PartiallyPaid,
    Paid,
}

impl InvoiceStatus {
    /// `Paid` once the total is covered, `Unpaid` while nothing (or less) has
    /// been paid, `PartiallyPaid` in between.
    pub fn derive(amount_paid: Money, total_amount: Money) -> Self {
        if amount_paid >= total_amount {
            InvoiceStatus::Paid
        } else if amount_paid <= Money::ZERO {
            InvoiceStatus::Unpaid
        } else {
            InvoiceStatus::PartiallyPaid
        }
    }
}

/// Invoice line with its product snapshot.
///
/// `product_name` and `reference` are copied when the line is priced; later
/// catalog edits never reach back into an issued invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub reference: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub total: Money,
}

/// Everything needed to issue or revise an invoice, already resolved against
/// the catalog (client name and product snapshots filled in).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceDraft {
    pub client_id: ClientId,
    pub client_name: String,
    pub date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub lines: Vec<PricedLine>,
    pub discount: Percent,
    pub vat: Percent,
}

/// Aggregate root: Invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    id: InvoiceId,
    sequence: u64,
    invoice_number: String,
    client_id: ClientId,
    client_name: String,
    date: DateTime<Utc>,
    due_date: DateTime<Utc>,
    items: Vec<InvoiceItem>,
    sub_total: Money,
    discount: Percent,
    discount_amount: Money,
    vat: Percent,
    vat_amount: Money,
    total_amount: Money,
    status: InvoiceStatus,
    amount_paid: Money,
    payments: Vec<Payment>,
    version: u64,
}

impl Invoice {
    /// Issue a new invoice: prices the draft, starts `Unpaid` with no payments.
    ///
    /// `sequence` is the numeric position `invoice_number` was formatted from;
    /// listings order by it.
    pub fn issue(
        id: InvoiceId,
        sequence: u64,
        invoice_number: impl Into<String>,
        draft: InvoiceDraft,
    ) -> Result<Self, DomainError> {
        let invoice_number = invoice_number.into();
        if invoice_number.trim().is_empty() {
            return Err(DomainError::validation("invoice number cannot be empty"));
        }
        let (items, totals) = pricing::price(&draft.lines, draft.discount, draft.vat)?;

        Ok(Self {
            id,
            sequence,
            invoice_number,
            client_id: draft.client_id,
            client_name: draft.client_name,
            date: draft.date,
            due_date: draft.due_date,
            items,
            sub_total: totals.sub_total,
            discount: draft.discount,
            discount_amount: totals.discount_amount,
            vat: draft.vat,
            vat_amount: totals.vat_amount,
            total_amount: totals.total_amount,
            status: InvoiceStatus::Unpaid,
            amount_paid: Money::ZERO,
            payments: Vec::new(),
            version: 1,
        })
    }

    /// Produce the next version of this invoice with new lines, dates, rates
    /// and a caller-chosen status.
    ///
    /// Number, payments and `amount_paid` carry over unchanged. The status is
    /// taken as given even if it disagrees with the payments; the next recorded
    /// payment re-derives it.
    pub fn revise(&self, draft: InvoiceDraft, status: InvoiceStatus) -> Result<Self, DomainError> {
        let (items, totals) = pricing::price(&draft.lines, draft.discount, draft.vat)?;

        Ok(Self {
            id: self.id,
            sequence: self.sequence,
            invoice_number: self.invoice_number.clone(),
            client_id: draft.client_id,
            client_name: draft.client_name,
            date: draft.date,
            due_date: draft.due_date,
            items,
            sub_total: totals.sub_total,
            discount: draft.discount,
            discount_amount: totals.discount_amount,
            vat: draft.vat,
            vat_amount: totals.vat_amount,
            total_amount: totals.total_amount,
            status,
            amount_paid: self.amount_paid,
            payments: self.payments.clone(),
            version: self.version + 1,
        })
    }

    /// Next version with the status replaced by the payment-derived one, or
    /// `None` if it already matches.
    pub fn resync_status(&self) -> Option<Self> {
        let derived = self.derived_status();
        if derived == self.status {
            return None;
        }
        let mut next = self.clone();
        next.status = derived;
        next.version += 1;
        Some(next)
    }

    pub(crate) fn with_payment(&self, payment: Payment, amount_paid: Money) -> Self {
        let mut next = self.clone();
        next.payments.push(payment);
        next.amount_paid = amount_paid;
        next.status = InvoiceStatus::derive(amount_paid, self.total_amount);
        next.version += 1;
        next
    }

    pub fn id_typed(&self) -> InvoiceId {
        self.id
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn invoice_number(&self) -> &str {
        &self.invoice_number
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn due_date(&self) -> DateTime<Utc> {
        self.due_date
    }

    pub fn items(&self) -> &[InvoiceItem] {
        &self.items
    }

    pub fn sub_total(&self) -> Money {
        self.sub_total
    }

    pub fn discount(&self) -> Percent {
        self.discount
    }

    pub fn discount_amount(&self) -> Money {
        self.discount_amount
    }

    pub fn vat(&self) -> Percent {
        self.vat
    }

    pub fn vat_amount(&self) -> Money {
        self.vat_amount
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn amount_paid(&self) -> Money {
        self.amount_paid
    }

    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    /// Stored totals as one value.
    pub fn totals(&self) -> LedgerTotals {
        LedgerTotals {
            sub_total: self.sub_total,
            discount_amount: self.discount_amount,
            vat_amount: self.vat_amount,
            total_amount: self.total_amount,
        }
    }

    /// Status implied by the recorded payments alone.
    pub fn derived_status(&self) -> InvoiceStatus {
        InvoiceStatus::derive(self.amount_paid, self.total_amount)
    }

    /// Remaining amount to collect; zero once paid or overpaid.
    pub fn balance_due(&self) -> Money {
        self.total_amount
            .checked_sub(self.amount_paid)
            .ok()
            .filter(|due| !due.is_negative())
            .unwrap_or(Money::ZERO)
    }

    /// Past its due date and not yet paid.
    pub fn is_overdue(&self, at: DateTime<Utc>) -> bool {
        self.status != InvoiceStatus::Paid && at > self.due_date
    }

    /// Re-derive totals from the stored items and rates and compare with the
    /// stored values.
    pub fn verify_totals(&self) -> Result<(), DomainError> {
        let recomputed = LedgerTotals::compute(&self.items, self.discount, self.vat)?;
        if recomputed != self.totals() {
            return Err(DomainError::invariant(format!(
                "invoice {} totals drifted (stored {:?}, recomputed {:?})",
                self.invoice_number,
                self.totals(),
                recomputed
            )));
        }
        for item in &self.items {
            if item.unit_price.checked_times(item.quantity)? != item.total {
                return Err(DomainError::invariant(format!(
                    "invoice {} line total drifted for product {}",
                    self.invoice_number, item.product_id
                )));
            }
        }
        Ok(())
    }
}

impl AggregateRoot for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
