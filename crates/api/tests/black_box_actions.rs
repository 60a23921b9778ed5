use std::sync::Arc;

use serde_json::{Value, json};

use tally_api::InvoiceActions;
use tally_core::{AggregateRoot, ClientId, Money, ProductId};
use tally_infra::{CatalogStore, EngineConfig, InMemoryCatalogStore};
use tally_invoicing::InvoiceStatus;
use tally_parties::Client;
use tally_products::Product;

struct Shop {
    store: Arc<InMemoryCatalogStore>,
    actions: InvoiceActions<Arc<InMemoryCatalogStore>>,
    client: ClientId,
}

impl Shop {
    fn open() -> Self {
        let store = Arc::new(InMemoryCatalogStore::new());
        let client = ClientId::new();
        store
            .insert_client(Client::new(client, "Societe Agbodjan"))
            .unwrap();
        let actions = InvoiceActions::new(Arc::clone(&store), EngineConfig::default());
        Self {
            store,
            actions,
            client,
        }
    }

    fn stock(&self, name: &str, price: i64, quantity: u32) -> ProductId {
        let id = ProductId::new();
        self.store
            .insert_product(Product::new(id, name, name.to_uppercase(), Money::whole(price), quantity).unwrap())
            .unwrap();
        id
    }

    fn on_hand(&self, id: ProductId) -> u32 {
        self.store.product(id).unwrap().unwrap().quantity_in_stock()
    }

    fn invoice_payload(&self, items: Value) -> Value {
        json!({
            "clientId": self.client.to_string(),
            "date": "2026-05-02",
            "dueDate": "2026-06-01",
            "items": items,
            "vat": "0",
            "discount": "0",
        })
    }
}

#[test]
fn create_sell_out_then_reject_further_sales() {
    let shop = Shop::open();
    let p = shop.stock("Tole", 1_000, 5);

    let invoice = shop
        .actions
        .create_invoice(&shop.invoice_payload(json!([
            { "productId": p.to_string(), "productName": "Tole", "quantity": "5", "unitPrice": "1" }
        ])))
        .unwrap();
    assert_eq!(invoice.items()[0].total, Money::whole(5_000));
    assert_eq!(shop.on_hand(p), 0);

    let err = shop
        .actions
        .create_invoice(&shop.invoice_payload(json!([{ "productId": p.to_string(), "quantity": 1 }])))
        .unwrap_err();
    assert_eq!(err.message, "Insufficient stock for Tole. Available: 0, requested: 1.");
    assert_eq!(shop.on_hand(p), 0);
}

#[test]
fn invalid_payload_returns_message_and_touches_nothing() {
    let shop = Shop::open();
    let p = shop.stock("Ciment", 5_000, 10);

    let err = shop
        .actions
        .create_invoice(&json!({ "clientId": shop.client.to_string(), "items": "lots" }))
        .unwrap_err();
    assert!(err.message.starts_with("Some fields are invalid"));
    assert!(err.message.ends_with("Unable to create the invoice."));
    assert_eq!(shop.on_hand(p), 10);
    assert_eq!(shop.store.next_invoice_sequence().unwrap(), 1);
}

#[test]
fn unknown_client_is_reported() {
    let shop = Shop::open();
    let p = shop.stock("Ciment", 5_000, 10);
    let mut payload = shop.invoice_payload(json!([{ "productId": p.to_string(), "quantity": 1 }]));
    payload["clientId"] = json!(ClientId::new().to_string());

    let err = shop.actions.create_invoice(&payload).unwrap_err();
    assert_eq!(err.message, "Client not found.");
    assert_eq!(shop.on_hand(p), 10);
}

#[test]
fn update_nets_stock_and_keeps_number() {
    let shop = Shop::open();
    let p = shop.stock("Peinture", 2_500, 13);
    let invoice = shop
        .actions
        .create_invoice(&shop.invoice_payload(json!([{ "productId": p.to_string(), "quantity": 3 }])))
        .unwrap();
    assert_eq!(shop.on_hand(p), 10);

    let updated = shop
        .actions
        .update_invoice(
            &invoice.id_typed().to_string(),
            &json!({
                "clientId": shop.client.to_string(),
                "date": "2026-05-02",
                "dueDate": "2026-06-01",
                "items": [{ "productId": p.to_string(), "quantity": "5", "unitPrice": "2500" }],
                "vat": 18,
                "discount": 10,
                "status": "Unpaid",
            }),
        )
        .unwrap();

    assert_eq!(shop.on_hand(p), 8);
    assert_eq!(updated.invoice_number(), invoice.invoice_number());
    // 12500 - 10% = 11250, + 18% VAT = 13275
    assert_eq!(updated.total_amount(), Money::whole(13_275));
}

#[test]
fn update_of_unknown_invoice_is_reported() {
    let shop = Shop::open();
    let err = shop
        .actions
        .update_invoice(
            &tally_core::InvoiceId::new().to_string(),
            &json!({
                "clientId": shop.client.to_string(),
                "date": "2026-05-02",
                "dueDate": "2026-06-01",
                "items": [],
                "vat": 0,
                "discount": 0,
                "status": "Paid",
            }),
        )
        .unwrap_err();
    assert_eq!(err.message, "Invoice not found.");
}

#[test]
fn rejected_updates_leave_invoice_and_stock_as_they_were() {
    let shop = Shop::open();
    let p = shop.stock("Peinture", 2_500, 13);
    let invoice = shop
        .actions
        .create_invoice(&shop.invoice_payload(json!([{ "productId": p.to_string(), "quantity": 3 }])))
        .unwrap();
    let id = invoice.id_typed().to_string();
    let revision = |client: String, product: String, quantity: u32| {
        json!({
            "clientId": client,
            "date": "2026-05-02",
            "dueDate": "2026-06-01",
            "items": [{ "productId": product, "quantity": quantity, "unitPrice": 2500 }],
            "vat": 0,
            "discount": 0,
            "status": "Paid",
        })
    };

    let err = shop
        .actions
        .update_invoice(&id, &revision(ClientId::new().to_string(), p.to_string(), 5))
        .unwrap_err();
    assert_eq!(err.message, "Client not found.");

    let ghost = ProductId::new();
    let err = shop
        .actions
        .update_invoice(&id, &revision(shop.client.to_string(), ghost.to_string(), 1))
        .unwrap_err();
    assert_eq!(err.message, format!("Product not found: {ghost}."));

    let err = shop
        .actions
        .update_invoice(&id, &revision(shop.client.to_string(), p.to_string(), 14))
        .unwrap_err();
    assert_eq!(err.message, "Insufficient stock for Peinture. Available: 13, requested: 14.");

    let stored = shop.actions.invoices().get(invoice.id_typed()).unwrap();
    assert_eq!(stored, invoice);
    assert_eq!(stored.status(), InvoiceStatus::Unpaid);
    assert_eq!(shop.on_hand(p), 10);
}

#[test]
fn delete_restores_stock() {
    let shop = Shop::open();
    let a = shop.stock("Brique", 150, 40);
    let b = shop.stock("Parpaing", 400, 12);
    let invoice = shop
        .actions
        .create_invoice(&shop.invoice_payload(json!([
            { "productId": a.to_string(), "quantity": 25 },
            { "productId": b.to_string(), "quantity": 12 },
        ])))
        .unwrap();
    assert_eq!((shop.on_hand(a), shop.on_hand(b)), (15, 0));

    let removed = shop
        .actions
        .delete_invoice(&invoice.id_typed().to_string())
        .unwrap();
    assert_eq!(removed.id_typed(), invoice.id_typed());
    assert_eq!((shop.on_hand(a), shop.on_hand(b)), (40, 12));

    let err = shop
        .actions
        .delete_invoice(&invoice.id_typed().to_string())
        .unwrap_err();
    assert_eq!(err.message, "Invoice not found.");
}

#[test]
fn payments_walk_the_status_to_paid() {
    let shop = Shop::open();
    let p = shop.stock("Carreaux", 100, 10);
    let invoice = shop
        .actions
        .create_invoice(&shop.invoice_payload(json!([{ "productId": p.to_string(), "quantity": 1 }])))
        .unwrap();
    assert_eq!(invoice.status(), InvoiceStatus::Unpaid);
    let id = invoice.id_typed().to_string();

    let partial = shop
        .actions
        .record_payment(&id, &json!({ "amount": "40", "date": "2026-05-10", "method": "Espèces" }))
        .unwrap();
    assert_eq!(partial.status(), InvoiceStatus::PartiallyPaid);

    let paid = shop
        .actions
        .record_payment(
            &id,
            &json!({ "amount": 60, "date": "2026-05-20", "method": "Chèque", "notes": "solde" }),
        )
        .unwrap();
    assert_eq!(paid.status(), InvoiceStatus::Paid);
    assert_eq!(paid.amount_paid(), Money::whole(100));
    assert_eq!(paid.payments().len(), 2);
    assert_eq!(paid.version(), invoice.version() + 2);
}

#[test]
fn payment_validation_messages() {
    let shop = Shop::open();
    let err = shop
        .actions
        .record_payment(
            &tally_core::InvoiceId::new().to_string(),
            &json!({ "amount": "10", "date": "2026-05-10", "method": "cash" }),
        )
        .unwrap_err();
    assert_eq!(err.message, "Invoice not found.");

    let err = shop
        .actions
        .record_payment(
            "not-an-id",
            &json!({ "amount": "10", "date": "2026-05-10", "method": "cash" }),
        )
        .unwrap_err();
    assert!(err.message.ends_with("Unable to record the payment."));

    let err = shop
        .actions
        .record_payment(
            &tally_core::InvoiceId::new().to_string(),
            &json!({ "amount": "-3", "date": "2026-05-10", "method": "cash" }),
        )
        .unwrap_err();
    assert!(err.message.contains("amount"));
}
