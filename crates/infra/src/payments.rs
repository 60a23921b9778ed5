//! Payment recording with optimistic retry.

use chrono::{DateTime, Utc};

use tally_core::{AggregateRoot, ExpectedVersion, InvoiceId, Money, PaymentId, RecordKind};
use tally_invoicing::{Invoice, Payment, PaymentMethod};

use crate::config::EngineConfig;
use crate::error::ServiceError;
use crate::retry::retry_on_conflict;
use crate::store::{CatalogStore, InvoiceWrite, WriteBatch};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPayment {
    pub amount: Money,
    pub date: DateTime<Utc>,
    pub method: PaymentMethod,
    pub notes: Option<String>,
}

/// Appends payments to invoices and re-derives their status.
#[derive(Debug)]
pub struct PaymentLedger<S> {
    store: S,
    config: EngineConfig,
}

impl<S> PaymentLedger<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: CatalogStore> PaymentLedger<S> {
    /// Append a payment and return the updated invoice.
    ///
    /// The payment id is fixed before the first attempt, so a retried commit
    /// never records two different ids for one payment.
    pub fn record_payment(
        &self,
        invoice_id: InvoiceId,
        request: &RecordPayment,
    ) -> Result<Invoice, ServiceError> {
        if !request.amount.is_positive() {
            return Err(ServiceError::Validation(
                "payment amount must be positive".to_string(),
            ));
        }

        let payment = Payment {
            id: PaymentId::new(),
            date: request.date,
            amount: request.amount,
            method: request.method,
            notes: request.notes.clone(),
        };

        let invoice = retry_on_conflict("payment.record", self.config.max_conflict_retries, || {
            self.try_record(invoice_id, payment.clone())
        })?;

        tracing::info!(
            invoice_id = %invoice_id,
            payment_id = %payment.id,
            amount = %payment.amount,
            amount_paid = %invoice.amount_paid(),
            status = ?invoice.status(),
            "payment recorded"
        );
        Ok(invoice)
    }

    fn try_record(&self, invoice_id: InvoiceId, payment: Payment) -> Result<Invoice, ServiceError> {
        let invoice = self
            .store
            .invoice(invoice_id)?
            .ok_or_else(|| ServiceError::not_found(RecordKind::Invoice, invoice_id))?;

        if invoice.status() != invoice.derived_status() {
            tracing::warn!(
                invoice_id = %invoice_id,
                manual = ?invoice.status(),
                derived = ?invoice.derived_status(),
                "payment overrides a manually set status"
            );
        }

        let paid = invoice.record_payment(payment, self.config.overpayment)?;
        self.store.commit(WriteBatch {
            stock: Vec::new(),
            invoice: InvoiceWrite::Replace {
                invoice: paid.clone(),
                expected: ExpectedVersion::Exact(invoice.version()),
            },
        })?;
        Ok(paid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tally_core::{ClientId, Percent, ProductId};
    use tally_invoicing::{InvoiceStatus, OverpaymentPolicy};
    use tally_parties::Client;
    use tally_products::Product;

    use crate::lifecycle::{CreateInvoice, InvoiceService, LineRequest};
    use crate::store::InMemoryCatalogStore;

    type Shared = Arc<InMemoryCatalogStore>;

    fn setup(config: EngineConfig) -> (InvoiceService<Shared>, PaymentLedger<Shared>, Invoice) {
        let store = Arc::new(InMemoryCatalogStore::new());
        let client = ClientId::new();
        store.insert_client(Client::new(client, "Boutique Akpovi")).unwrap();
        let product = ProductId::new();
        store
            .insert_product(Product::new(product, "Carreaux", "CAR-30", Money::whole(100), 10).unwrap())
            .unwrap();

        let invoices = InvoiceService::new(Arc::clone(&store), config.clone());
        let now = Utc::now();
        let invoice = invoices
            .create(&CreateInvoice {
                client_id: client,
                date: now,
                due_date: now,
                items: vec![LineRequest {
                    product_id: product,
                    quantity: 1,
                }],
                discount: Percent::ZERO,
                vat: Percent::ZERO,
            })
            .unwrap();
        (invoices, PaymentLedger::new(store, config), invoice)
    }

    fn pay(amount: i64) -> RecordPayment {
        RecordPayment {
            amount: Money::whole(amount),
            date: Utc::now(),
            method: PaymentMethod::BankTransfer,
            notes: Some("virement".to_string()),
        }
    }

    #[test]
    fn forty_then_sixty_is_paid() {
        let (_, ledger, invoice) = setup(EngineConfig::default());

        let partial = ledger.record_payment(invoice.id_typed(), &pay(40)).unwrap();
        assert_eq!(partial.status(), InvoiceStatus::PartiallyPaid);
        assert_eq!(partial.amount_paid(), Money::whole(40));

        let paid = ledger.record_payment(invoice.id_typed(), &pay(60)).unwrap();
        assert_eq!(paid.status(), InvoiceStatus::Paid);
        assert_eq!(paid.amount_paid(), Money::whole(100));
        assert_eq!(paid.payments().len(), 2);
        assert_eq!(paid.payments()[0].notes.as_deref(), Some("virement"));

        let stored = ledger.store().invoice(invoice.id_typed()).unwrap().unwrap();
        assert_eq!(stored, paid);
    }

    #[test]
    fn unknown_invoice_and_bad_amounts_are_rejected() {
        let (_, ledger, invoice) = setup(EngineConfig::default());

        let err = ledger.record_payment(InvoiceId::new(), &pay(10)).unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { kind: RecordKind::Invoice, .. }));

        let err = ledger.record_payment(invoice.id_typed(), &pay(0)).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(ledger
            .store()
            .invoice(invoice.id_typed())
            .unwrap()
            .unwrap()
            .payments()
            .is_empty());
    }

    #[test]
    fn overpayment_follows_the_configured_policy() {
        let (_, ledger, invoice) = setup(EngineConfig::default());
        let paid = ledger.record_payment(invoice.id_typed(), &pay(150)).unwrap();
        assert_eq!(paid.status(), InvoiceStatus::Paid);

        let strict = EngineConfig {
            overpayment: OverpaymentPolicy::Reject,
            ..EngineConfig::default()
        };
        let (_, ledger, invoice) = setup(strict);
        let err = ledger.record_payment(invoice.id_typed(), &pay(150)).unwrap_err();
        assert!(matches!(err, ServiceError::InvariantViolation(_)));
    }

    #[test]
    fn concurrent_payments_all_land() {
        let (_, ledger, invoice) = setup(EngineConfig {
            max_conflict_retries: 32,
            ..EngineConfig::default()
        });
        let ledger = Arc::new(ledger);
        let id = invoice.id_typed();

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || ledger.record_payment(id, &pay(10)).map(|_| ()))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let stored = ledger.store().invoice(id).unwrap().unwrap();
        assert_eq!(stored.payments().len(), 10);
        assert_eq!(stored.amount_paid(), Money::whole(100));
        assert_eq!(stored.status(), InvoiceStatus::Paid);
    }
}
