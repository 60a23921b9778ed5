//! Catalog store boundary.
//!
//! The engine reads clients, products, invoices and settings through
//! [`CatalogStore`] and writes invoices and stock counters through a single
//! atomic [`CatalogStore::commit`]. Implementations decide how records are
//! persisted; the shipped one is [`InMemoryCatalogStore`].

pub mod in_memory;

use std::sync::Arc;

use thiserror::Error;

use tally_core::{ClientId, DomainError, ExpectedVersion, InvoiceId, ProductId};
use tally_invoicing::{Invoice, Settings, StockAdjustment};
use tally_parties::Client;
use tally_products::{Product, ProductPatch};

pub use in_memory::InMemoryCatalogStore;

/// Store operation error.
///
/// These are **infrastructure errors** (concurrency, storage) plus domain
/// rejections raised while applying a catalog edit.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A recorded version was stale when the write was applied.
    #[error("optimistic concurrency check failed: {0}")]
    Conflict(String),

    /// The write was refused by a domain rule (missing record, invalid patch).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The backing storage failed.
    #[error("storage failure: {0}")]
    Storage(String),
}

/// Invoice write carried by a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvoiceWrite {
    /// Add a new invoice.
    ///
    /// The invoice's `sequence()` must be exactly one past the last committed
    /// sequence, which keeps invoice numbers gapless under concurrent creates.
    Insert { invoice: Invoice },
    /// Replace an existing invoice with its next version.
    Replace {
        invoice: Invoice,
        expected: ExpectedVersion,
    },
    /// Remove an invoice.
    Delete {
        id: InvoiceId,
        expected: ExpectedVersion,
    },
}

impl InvoiceWrite {
    pub fn invoice_id(&self) -> InvoiceId {
        match self {
            InvoiceWrite::Insert { invoice } | InvoiceWrite::Replace { invoice, .. } => {
                invoice.id_typed()
            }
            InvoiceWrite::Delete { id, .. } => *id,
        }
    }
}

/// Everything one invoice operation writes: stock counters and the invoice.
///
/// Applied all-or-nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteBatch {
    pub stock: Vec<StockAdjustment>,
    pub invoice: InvoiceWrite,
}

/// Persistence collaborator for clients, products, invoices and settings.
///
/// ## Commit semantics
///
/// `commit()` must:
/// - check every stock adjustment's `expected_version` against the stored product
/// - check the invoice write's expectation (sequence or version)
/// - fail with `StoreError::Conflict` without writing anything if any check fails
/// - otherwise apply all stock adjustments and the invoice write together
///
/// Reads may run concurrently with each other and with commits.
pub trait CatalogStore: Send + Sync {
    fn clients(&self) -> Result<Vec<Client>, StoreError>;
    fn client(&self, id: ClientId) -> Result<Option<Client>, StoreError>;
    fn insert_client(&self, client: Client) -> Result<(), StoreError>;

    fn products(&self) -> Result<Vec<Product>, StoreError>;
    fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;
    fn insert_product(&self, product: Product) -> Result<(), StoreError>;
    /// Catalog maintenance: partial update outside of invoicing.
    fn update_product(&self, id: ProductId, patch: &ProductPatch) -> Result<Product, StoreError>;

    fn invoice(&self, id: InvoiceId) -> Result<Option<Invoice>, StoreError>;
    /// Every invoice, ordered by sequence.
    fn invoices(&self) -> Result<Vec<Invoice>, StoreError>;

    fn settings(&self) -> Result<Settings, StoreError>;
    fn put_settings(&self, settings: Settings) -> Result<(), StoreError>;

    /// Sequence the next inserted invoice must carry (last committed + 1).
    fn next_invoice_sequence(&self) -> Result<u64, StoreError>;

    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;
}

impl<S> CatalogStore for Arc<S>
where
    S: CatalogStore + ?Sized,
{
    fn clients(&self) -> Result<Vec<Client>, StoreError> {
        (**self).clients()
    }

    fn client(&self, id: ClientId) -> Result<Option<Client>, StoreError> {
        (**self).client(id)
    }

    fn insert_client(&self, client: Client) -> Result<(), StoreError> {
        (**self).insert_client(client)
    }

    fn products(&self) -> Result<Vec<Product>, StoreError> {
        (**self).products()
    }

    fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        (**self).product(id)
    }

    fn insert_product(&self, product: Product) -> Result<(), StoreError> {
        (**self).insert_product(product)
    }

    fn update_product(&self, id: ProductId, patch: &ProductPatch) -> Result<Product, StoreError> {
        (**self).update_product(id, patch)
    }

    fn invoice(&self, id: InvoiceId) -> Result<Option<Invoice>, StoreError> {
        (**self).invoice(id)
    }

    fn invoices(&self) -> Result<Vec<Invoice>, StoreError> {
        (**self).invoices()
    }

    fn settings(&self) -> Result<Settings, StoreError> {
        (**self).settings()
    }

    fn put_settings(&self, settings: Settings) -> Result<(), StoreError> {
        (**self).put_settings(settings)
    }

    fn next_invoice_sequence(&self) -> Result<u64, StoreError> {
        (**self).next_invoice_sequence()
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        (**self).commit(batch)
    }
}
