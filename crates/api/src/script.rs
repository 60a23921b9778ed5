//! Line-oriented driver used by the `tally` binary: seed a store, then run
//! one JSON action per line.

use serde::Deserialize;
use serde_json::{Value as JsonValue, json};

use tally_core::{Money, ProductId};
use tally_infra::{CatalogStore, StoreError};
use tally_invoicing::Settings;
use tally_parties::Client;
use tally_products::Product;

use crate::actions::InvoiceActions;
use crate::errors::ActionResult;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSeed {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub reference: String,
    pub unit_price: Money,
    pub quantity_in_stock: u32,
}

/// Initial catalog contents.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Seed {
    pub clients: Vec<Client>,
    pub products: Vec<ProductSeed>,
    pub settings: Option<Settings>,
}

impl Seed {
    pub fn load_into<S: CatalogStore>(self, store: &S) -> Result<(), StoreError> {
        let (clients, products) = (self.clients.len(), self.products.len());
        for client in self.clients {
            store.insert_client(client)?;
        }
        for seed in self.products {
            let product = Product::new(
                seed.id,
                seed.name,
                seed.reference,
                seed.unit_price,
                seed.quantity_in_stock,
            )?;
            store.insert_product(product)?;
        }
        if let Some(settings) = self.settings {
            store.put_settings(settings)?;
        }
        tracing::info!(clients, products, "catalog seeded");
        Ok(())
    }
}

/// One scripted action.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ScriptRequest {
    CreateInvoice {
        payload: JsonValue,
    },
    UpdateInvoice {
        #[serde(rename = "invoiceId")]
        invoice_id: String,
        payload: JsonValue,
    },
    DeleteInvoice {
        #[serde(rename = "invoiceId")]
        invoice_id: String,
    },
    RecordPayment {
        #[serde(rename = "invoiceId")]
        invoice_id: String,
        payload: JsonValue,
    },
}

fn reply<T: serde::Serialize>(result: ActionResult<T>) -> JsonValue {
    match result {
        Ok(invoice) => json!({ "invoice": invoice }),
        Err(err) => json!({ "message": err.message }),
    }
}

impl<S: CatalogStore + Clone> InvoiceActions<S> {
    /// Run one action and shape its outcome as `{ "invoice": .. }` or `{ "message": .. }`.
    pub fn run(&self, request: ScriptRequest) -> JsonValue {
        match request {
            ScriptRequest::CreateInvoice { payload } => reply(self.create_invoice(&payload)),
            ScriptRequest::UpdateInvoice {
                invoice_id,
                payload,
            } => reply(self.update_invoice(&invoice_id, &payload)),
            ScriptRequest::DeleteInvoice { invoice_id } => reply(self.delete_invoice(&invoice_id)),
            ScriptRequest::RecordPayment {
                invoice_id,
                payload,
            } => reply(self.record_payment(&invoice_id, &payload)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tally_core::ClientId;
    use tally_infra::{EngineConfig, InMemoryCatalogStore};

    #[test]
    fn seed_then_run_a_create() {
        let client = ClientId::new();
        let product = ProductId::new();
        let seed: Seed = serde_json::from_value(json!({
            "clients": [{ "id": client, "name": "Ets Zinsou" }],
            "products": [{ "id": product, "name": "Ciment", "unitPrice": "5000", "quantityInStock": 10 }],
            "settings": { "companyName": "Tally BTP" },
        }))
        .unwrap();

        let store = Arc::new(InMemoryCatalogStore::new());
        seed.load_into(&store).unwrap();
        let actions = InvoiceActions::new(store, EngineConfig::default());

        let request: ScriptRequest = serde_json::from_value(json!({
            "action": "createInvoice",
            "payload": {
                "clientId": client,
                "date": "2026-04-01",
                "dueDate": "2026-04-30",
                "items": [{ "productId": product, "quantity": 2 }],
                "vat": 0,
                "discount": 0,
            },
        }))
        .unwrap();

        let out = actions.run(request);
        assert_eq!(out["invoice"]["invoiceNumber"], "INV-00001");
        let total: Money = serde_json::from_value(out["invoice"]["totalAmount"].clone()).unwrap();
        assert_eq!(total, Money::whole(10_000));
    }

    #[test]
    fn failures_reply_with_a_message() {
        let actions = InvoiceActions::new(
            Arc::new(InMemoryCatalogStore::new()),
            EngineConfig::default(),
        );
        let out = actions.run(ScriptRequest::DeleteInvoice {
            invoice_id: "nope".to_string(),
        });
        assert!(out["message"].as_str().unwrap().contains("Unable to delete the invoice"));
    }
}
