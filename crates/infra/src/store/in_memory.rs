use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tally_core::{AggregateRoot, ClientId, DomainError, InvoiceId, ProductId, RecordKind};
use tally_invoicing::{Invoice, Settings};
use tally_parties::Client;
use tally_products::{Product, ProductPatch};

use super::{CatalogStore, InvoiceWrite, StoreError, WriteBatch};

#[derive(Debug, Default)]
struct Tables {
    clients: HashMap<ClientId, Client>,
    products: HashMap<ProductId, Product>,
    invoices: HashMap<InvoiceId, Invoice>,
    settings: Settings,
    last_sequence: u64,
}

/// In-memory catalog store for tests/dev.
///
/// One `RwLock` guards every table, so a commit's checks and writes happen
/// under a single write guard and readers never observe half a batch.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    inner: RwLock<Tables>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Storage("catalog lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Storage("catalog lock poisoned".to_string()))
    }
}

/// Verify every expectation in `batch` against current state. Writes nothing.
fn check_batch(tables: &Tables, batch: &WriteBatch) -> Result<(), StoreError> {
    for adjustment in &batch.stock {
        let product = tables.products.get(&adjustment.product_id).ok_or_else(|| {
            StoreError::Conflict(format!("product {} was removed", adjustment.product_id))
        })?;
        if product.version() != adjustment.expected_version {
            return Err(StoreError::Conflict(format!(
                "product {} is at version {}, expected {}",
                adjustment.product_id,
                product.version(),
                adjustment.expected_version
            )));
        }
        if product.quantity_in_stock() != adjustment.before {
            return Err(StoreError::Conflict(format!(
                "product {} stock changed underneath",
                adjustment.product_id
            )));
        }
    }

    match &batch.invoice {
        InvoiceWrite::Insert { invoice } => {
            if tables.invoices.contains_key(&invoice.id_typed()) {
                return Err(StoreError::Conflict(format!(
                    "invoice {} already exists",
                    invoice.id_typed()
                )));
            }
            if invoice.sequence() != tables.last_sequence + 1 {
                return Err(StoreError::Conflict(format!(
                    "invoice sequence {} already taken",
                    invoice.sequence()
                )));
            }
        }
        InvoiceWrite::Replace { invoice, expected } => {
            let current = tables.invoices.get(&invoice.id_typed()).ok_or_else(|| {
                StoreError::Conflict(format!("invoice {} was removed", invoice.id_typed()))
            })?;
            expected
                .check(current.version())
                .map_err(|err| StoreError::Conflict(format!("invoice {}: {err}", invoice.id_typed())))?;
        }
        InvoiceWrite::Delete { id, expected } => {
            let current = tables
                .invoices
                .get(id)
                .ok_or_else(|| StoreError::Conflict(format!("invoice {id} was removed")))?;
            expected
                .check(current.version())
                .map_err(|err| StoreError::Conflict(format!("invoice {id}: {err}")))?;
        }
    }

    Ok(())
}

impl CatalogStore for InMemoryCatalogStore {
    fn clients(&self) -> Result<Vec<Client>, StoreError> {
        let tables = self.read()?;
        let mut clients: Vec<Client> = tables.clients.values().cloned().collect();
        clients.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(clients)
    }

    fn client(&self, id: ClientId) -> Result<Option<Client>, StoreError> {
        Ok(self.read()?.clients.get(&id).cloned())
    }

    fn insert_client(&self, client: Client) -> Result<(), StoreError> {
        client.validate()?;
        let mut tables = self.write()?;
        if tables.clients.contains_key(&client.id) {
            return Err(StoreError::Conflict(format!("client {} already exists", client.id)));
        }
        tables.clients.insert(client.id, client);
        Ok(())
    }

    fn products(&self) -> Result<Vec<Product>, StoreError> {
        let tables = self.read()?;
        let mut products: Vec<Product> = tables.products.values().cloned().collect();
        products.sort_by(|a, b| a.name().cmp(b.name()).then(a.id_typed().cmp(&b.id_typed())));
        Ok(products)
    }

    fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.read()?.products.get(&id).cloned())
    }

    fn insert_product(&self, product: Product) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        let id = product.id_typed();
        if tables.products.contains_key(&id) {
            return Err(StoreError::Conflict(format!("product {id} already exists")));
        }
        tables.products.insert(id, product);
        Ok(())
    }

    fn update_product(&self, id: ProductId, patch: &ProductPatch) -> Result<Product, StoreError> {
        let mut tables = self.write()?;
        let product = tables
            .products
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found(RecordKind::Product, id))?;
        product.apply_patch(patch)?;
        Ok(product.clone())
    }

    fn invoice(&self, id: InvoiceId) -> Result<Option<Invoice>, StoreError> {
        Ok(self.read()?.invoices.get(&id).cloned())
    }

    fn invoices(&self) -> Result<Vec<Invoice>, StoreError> {
        let tables = self.read()?;
        let mut invoices: Vec<Invoice> = tables.invoices.values().cloned().collect();
        invoices.sort_by_key(Invoice::sequence);
        Ok(invoices)
    }

    fn settings(&self) -> Result<Settings, StoreError> {
        Ok(self.read()?.settings.clone())
    }

    fn put_settings(&self, settings: Settings) -> Result<(), StoreError> {
        self.write()?.settings = settings;
        Ok(())
    }

    fn next_invoice_sequence(&self) -> Result<u64, StoreError> {
        Ok(self.read()?.last_sequence + 1)
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        check_batch(&tables, &batch)?;
        tracing::debug!(
            invoice_id = %batch.invoice.invoice_id(),
            adjustments = batch.stock.len(),
            "committing batch"
        );

        for adjustment in &batch.stock {
            if let Some(product) = tables.products.get_mut(&adjustment.product_id) {
                product.set_stock(adjustment.after);
                tracing::debug!(
                    product_id = %adjustment.product_id,
                    delta = adjustment.delta(),
                    stock = adjustment.after,
                    "stock adjusted"
                );
            }
        }

        match batch.invoice {
            InvoiceWrite::Insert { invoice } => {
                tables.last_sequence = invoice.sequence();
                tables.invoices.insert(invoice.id_typed(), invoice);
            }
            InvoiceWrite::Replace { invoice, .. } => {
                tables.invoices.insert(invoice.id_typed(), invoice);
            }
            InvoiceWrite::Delete { id, .. } => {
                tables.invoices.remove(&id);
            }
        }

        Ok(())
    }
}
