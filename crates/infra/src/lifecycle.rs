//! Invoice lifecycle: create, update and delete with stock reconciliation.
//!
//! Every mutating operation runs the same pipeline:
//!
//! ```text
//! Request
//!   ↓
//! 1. Load client, products (and the original invoice) from the store
//!   ↓
//! 2. Price lines and compute totals (pure)
//!   ↓
//! 3. Plan stock adjustments against the loaded product versions (pure)
//!   ↓
//! 4. Commit stock plan + invoice write as one batch
//!   ↓   (stale version → re-run from 1, bounded by `max_conflict_retries`)
//! Invoice
//! ```
//!
//! Nothing is written before step 4, so a rejected request leaves stock and
//! invoices exactly as they were.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use tally_core::{
    AggregateRoot, ClientId, ExpectedVersion, InvoiceId, Money, Percent, ProductId, RecordKind,
};
use tally_invoicing::stock::{self, ProductIndex};
use tally_invoicing::{
    Invoice, InvoiceDocument, InvoiceDraft, InvoiceRenderer, InvoiceStatus, PricedLine,
};
use tally_parties::Client;
use tally_products::Product;

use crate::config::EngineConfig;
use crate::error::ServiceError;
use crate::retry::retry_on_conflict;
use crate::store::{CatalogStore, InvoiceWrite, WriteBatch};

/// One requested line on a new invoice. The unit price comes from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateInvoice {
    pub client_id: ClientId,
    pub date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub items: Vec<LineRequest>,
    pub discount: Percent,
    pub vat: Percent,
}

/// One line on a revised invoice. The caller's unit price is kept as given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevisedLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateInvoice {
    pub client_id: ClientId,
    pub date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub items: Vec<RevisedLine>,
    pub discount: Percent,
    pub vat: Percent,
    pub status: InvoiceStatus,
}

/// Optional narrowing for [`InvoiceService::list`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvoiceFilter {
    pub client_id: Option<ClientId>,
    pub status: Option<InvoiceStatus>,
}

impl InvoiceFilter {
    fn accepts(&self, invoice: &Invoice) -> bool {
        self.client_id.is_none_or(|id| invoice.client_id() == id)
            && self.status.is_none_or(|status| invoice.status() == status)
    }
}

/// Coordinates invoice mutations with stock.
///
/// Generic over the store so tests run against [`crate::store::InMemoryCatalogStore`]
/// and a shared `Arc<S>` can back several services at once.
#[derive(Debug)]
pub struct InvoiceService<S> {
    store: S,
    config: EngineConfig,
}

impl<S> InvoiceService<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: CatalogStore> InvoiceService<S> {
    /// Issue a new invoice and take its quantities out of stock.
    pub fn create(&self, request: &CreateInvoice) -> Result<Invoice, ServiceError> {
        let invoice = retry_on_conflict("invoice.create", self.config.max_conflict_retries, || {
            self.try_create(request)
        })?;

        tracing::info!(
            invoice_id = %invoice.id_typed(),
            invoice_number = invoice.invoice_number(),
            total = %invoice.total_amount(),
            "invoice created"
        );
        Ok(invoice)
    }

    fn try_create(&self, request: &CreateInvoice) -> Result<Invoice, ServiceError> {
        let client = self.load_client(request.client_id)?;
        let catalog = self.load_products(request.items.iter().map(|l| l.product_id))?;

        let lines = request
            .items
            .iter()
            .map(|line| {
                let product = require_product(&catalog, line.product_id)?;
                Ok(PricedLine {
                    product_id: line.product_id,
                    product_name: product.name().to_string(),
                    reference: product.reference().to_string(),
                    quantity: line.quantity,
                    unit_price: product.unit_price(),
                })
            })
            .collect::<Result<Vec<_>, ServiceError>>()?;

        let draft = InvoiceDraft {
            client_id: client.id,
            client_name: client.name,
            date: request.date,
            due_date: request.due_date,
            lines,
            discount: request.discount,
            vat: request.vat,
        };

        let sequence = self.store.next_invoice_sequence()?;
        let invoice = Invoice::issue(
            InvoiceId::new(),
            sequence,
            self.config.format_invoice_number(sequence),
            draft,
        )?;
        let plan = stock::plan_create(&catalog, invoice_quantities(&invoice))?;
        tracing::debug!(sequence, adjustments = plan.len(), "create planned");

        self.store.commit(WriteBatch {
            stock: plan.into_adjustments(),
            invoice: InvoiceWrite::Insert {
                invoice: invoice.clone(),
            },
        })?;
        Ok(invoice)
    }

    /// Replace an invoice's lines, dates, rates and status, netting stock
    /// against what the original already consumed.
    pub fn update(&self, id: InvoiceId, request: &UpdateInvoice) -> Result<Invoice, ServiceError> {
        let invoice = retry_on_conflict("invoice.update", self.config.max_conflict_retries, || {
            self.try_update(id, request)
        })?;

        tracing::info!(
            invoice_id = %id,
            version = invoice.version(),
            total = %invoice.total_amount(),
            status = ?invoice.status(),
            "invoice updated"
        );
        Ok(invoice)
    }

    fn try_update(&self, id: InvoiceId, request: &UpdateInvoice) -> Result<Invoice, ServiceError> {
        let original = self.load_invoice(id)?;
        let client = self.load_client(request.client_id)?;
        let catalog = self.load_products(
            original
                .items()
                .iter()
                .map(|i| i.product_id)
                .chain(request.items.iter().map(|l| l.product_id)),
        )?;

        let lines = request
            .items
            .iter()
            .map(|line| {
                let product = require_product(&catalog, line.product_id)?;
                Ok(PricedLine {
                    product_id: line.product_id,
                    product_name: product.name().to_string(),
                    reference: product.reference().to_string(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                })
            })
            .collect::<Result<Vec<_>, ServiceError>>()?;

        let draft = InvoiceDraft {
            client_id: client.id,
            client_name: client.name,
            date: request.date,
            due_date: request.due_date,
            lines,
            discount: request.discount,
            vat: request.vat,
        };

        let revised = original.revise(draft, request.status)?;
        let plan = stock::plan_update(&catalog, original.items(), invoice_quantities(&revised))?;
        tracing::debug!(invoice_id = %id, adjustments = plan.len(), "update planned");

        self.store.commit(WriteBatch {
            stock: plan.into_adjustments(),
            invoice: InvoiceWrite::Replace {
                invoice: revised.clone(),
                expected: ExpectedVersion::Exact(original.version()),
            },
        })?;
        Ok(revised)
    }

    /// Remove an invoice and put its quantities back in stock.
    ///
    /// Returns the invoice as it was just before removal.
    pub fn delete(&self, id: InvoiceId) -> Result<Invoice, ServiceError> {
        let removed = retry_on_conflict("invoice.delete", self.config.max_conflict_retries, || {
            self.try_delete(id)
        })?;

        tracing::info!(
            invoice_id = %id,
            invoice_number = removed.invoice_number(),
            "invoice deleted"
        );
        Ok(removed)
    }

    fn try_delete(&self, id: InvoiceId) -> Result<Invoice, ServiceError> {
        let invoice = self.load_invoice(id)?;
        let catalog = self.load_products(invoice.items().iter().map(|i| i.product_id))?;

        for product_id in stock::missing_products(&catalog, invoice.items()) {
            tracing::warn!(
                invoice_id = %id,
                product_id = %product_id,
                "product no longer exists; its stock is not restored"
            );
        }

        let plan = stock::plan_delete(&catalog, invoice.items())?;
        self.store.commit(WriteBatch {
            stock: plan.into_adjustments(),
            invoice: InvoiceWrite::Delete {
                id,
                expected: ExpectedVersion::Exact(invoice.version()),
            },
        })?;
        Ok(invoice)
    }

    pub fn get(&self, id: InvoiceId) -> Result<Invoice, ServiceError> {
        self.load_invoice(id)
    }

    /// Invoices matching `filter`, ordered by invoice number.
    pub fn list(&self, filter: &InvoiceFilter) -> Result<Vec<Invoice>, ServiceError> {
        let mut invoices = self.store.invoices()?;
        invoices.retain(|invoice| filter.accepts(invoice));
        invoices.sort_by_key(Invoice::sequence);
        Ok(invoices)
    }

    /// Resolve everything a renderer needs for one invoice.
    pub fn document(&self, id: InvoiceId) -> Result<InvoiceDocument, ServiceError> {
        let invoice = self.load_invoice(id)?;
        let client = self.load_client(invoice.client_id())?;
        let settings = self.store.settings()?;
        Ok(InvoiceDocument {
            invoice,
            client,
            settings,
        })
    }

    pub fn render<R: InvoiceRenderer>(
        &self,
        id: InvoiceId,
        renderer: &R,
    ) -> Result<R::Output, ServiceError> {
        let document = self.document(id)?;
        renderer.render(&document).map_err(|err| {
            tracing::warn!(invoice_id = %id, error = %err, "renderer failed");
            ServiceError::Render(err.to_string())
        })
    }

    /// Replace a manually set status with the one derived from payments.
    ///
    /// A no-op (no new version) when they already agree.
    pub fn resync_status(&self, id: InvoiceId) -> Result<Invoice, ServiceError> {
        retry_on_conflict("invoice.resync_status", self.config.max_conflict_retries, || {
            let invoice = self.load_invoice(id)?;
            let Some(resynced) = invoice.resync_status() else {
                return Ok(invoice);
            };

            tracing::info!(
                invoice_id = %id,
                from = ?invoice.status(),
                to = ?resynced.status(),
                "status re-derived from payments"
            );
            self.store.commit(WriteBatch {
                stock: Vec::new(),
                invoice: InvoiceWrite::Replace {
                    invoice: resynced.clone(),
                    expected: ExpectedVersion::Exact(invoice.version()),
                },
            })?;
            Ok(resynced)
        })
    }

    fn load_invoice(&self, id: InvoiceId) -> Result<Invoice, ServiceError> {
        self.store
            .invoice(id)?
            .ok_or_else(|| ServiceError::not_found(RecordKind::Invoice, id))
    }

    fn load_client(&self, id: ClientId) -> Result<Client, ServiceError> {
        self.store
            .client(id)?
            .ok_or_else(|| ServiceError::not_found(RecordKind::Client, id))
    }

    /// Snapshot of the referenced products that currently exist.
    fn load_products(
        &self,
        ids: impl IntoIterator<Item = ProductId>,
    ) -> Result<ProductIndex, ServiceError> {
        let ids: BTreeSet<ProductId> = ids.into_iter().collect();
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            found.extend(self.store.product(id)?);
        }
        Ok(stock::index_products(found))
    }
}

fn require_product(
    catalog: &ProductIndex,
    id: ProductId,
) -> Result<&Product, ServiceError> {
    catalog
        .get(&id)
        .ok_or_else(|| ServiceError::not_found(RecordKind::Product, id))
}

fn invoice_quantities(invoice: &Invoice) -> impl Iterator<Item = (ProductId, u32)> + '_ {
    invoice.items().iter().map(|i| (i.product_id, i.quantity))
}
