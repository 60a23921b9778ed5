//! Untyped request payloads and their validation.
//!
//! Payloads arrive as `serde_json::Value` with camelCase keys. Numeric fields
//! accept either JSON numbers or numeric strings (form inputs post strings).
//! Dates accept RFC 3339 timestamps or plain `YYYY-MM-DD` (midnight UTC).
//! Unknown keys are ignored.

use core::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

use tally_core::{ClientId, InvoiceId, Money, Percent, ProductId};
use tally_infra::{CreateInvoice, LineRequest, RecordPayment, RevisedLine, UpdateInvoice};
use tally_invoicing::{InvoiceStatus, PaymentMethod};

/// A payload that does not fit its schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    /// Missing keys, wrong JSON types, unparseable numbers or dates.
    #[error("{0}")]
    Malformed(String),

    /// A field parsed but its value is out of range.
    #[error("{field}: {reason}")]
    Field { field: &'static str, reason: String },
}

impl FormError {
    fn field(field: &'static str, reason: impl Into<String>) -> Self {
        FormError::Field {
            field,
            reason: reason.into(),
        }
    }
}

// -------------------------
// Field coercion
// -------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(serde_json::Number),
    Text(String),
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    Decimal::from_str(raw)
        .ok()
        .or_else(|| Decimal::from_scientific(raw).ok())
}

fn coerce_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => n.to_string(),
        NumberOrText::Text(s) => s,
    };
    parse_decimal(&raw).ok_or_else(|| de::Error::custom(format!("{raw:?} is not a number")))
}

fn coerce_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Number(n)) => {
            let raw = n.to_string();
            parse_decimal(&raw)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("{raw:?} is not a number")))
        }
        // An empty form field means "not provided".
        Some(NumberOrText::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberOrText::Text(s)) => parse_decimal(&s)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("{s:?} is not a number"))),
    }
}

fn coerce_date<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| de::Error::custom(format!("{raw:?} is not a date")))
}

fn quantity(field: &'static str, value: Decimal) -> Result<u32, FormError> {
    if !value.fract().is_zero() {
        return Err(FormError::field(field, "must be a whole number"));
    }
    if value <= Decimal::ZERO {
        return Err(FormError::field(field, "must be positive"));
    }
    value
        .to_u32()
        .ok_or_else(|| FormError::field(field, "is too large"))
}

fn percent(field: &'static str, value: Decimal) -> Result<Percent, FormError> {
    Percent::new(value).map_err(|_| FormError::field(field, "must be between 0 and 100"))
}

fn id<T: FromStr>(field: &'static str, raw: &str) -> Result<T, FormError> {
    raw.trim()
        .parse()
        .map_err(|_| FormError::field(field, format!("{raw:?} is not a valid id")))
}

fn from_payload<T: for<'de> Deserialize<'de>>(payload: &JsonValue) -> Result<T, FormError> {
    T::deserialize(payload).map_err(|err| FormError::Malformed(err.to_string()))
}

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItemForm {
    pub product_id: String,
    /// Display name posted by the form; the catalog name is used instead.
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(deserialize_with = "coerce_decimal")]
    pub quantity: Decimal,
    /// Posted by the form but ignored on create: the catalog price is authoritative.
    #[serde(default, deserialize_with = "coerce_optional_decimal")]
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceForm {
    pub client_id: String,
    #[serde(deserialize_with = "coerce_date")]
    pub date: DateTime<Utc>,
    #[serde(deserialize_with = "coerce_date")]
    pub due_date: DateTime<Utc>,
    pub items: Vec<InvoiceItemForm>,
    #[serde(deserialize_with = "coerce_decimal")]
    pub vat: Decimal,
    #[serde(deserialize_with = "coerce_decimal")]
    pub discount: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInvoiceItemForm {
    pub product_id: String,
    #[serde(deserialize_with = "coerce_decimal")]
    pub quantity: Decimal,
    #[serde(deserialize_with = "coerce_decimal")]
    pub unit_price: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInvoiceForm {
    pub client_id: String,
    #[serde(deserialize_with = "coerce_date")]
    pub date: DateTime<Utc>,
    #[serde(deserialize_with = "coerce_date")]
    pub due_date: DateTime<Utc>,
    pub items: Vec<UpdateInvoiceItemForm>,
    #[serde(deserialize_with = "coerce_decimal")]
    pub vat: Decimal,
    #[serde(deserialize_with = "coerce_decimal")]
    pub discount: Decimal,
    pub status: InvoiceStatus,
}

/// Payment method as posted: API names or the labels shown in the payment form.
#[derive(Debug, Clone, Copy, Deserialize)]
pub enum PaymentMethodField {
    #[serde(alias = "cash", alias = "Espèces")]
    Cash,
    #[serde(alias = "bank_transfer", alias = "Virement bancaire")]
    BankTransfer,
    #[serde(alias = "cheque", alias = "Chèque")]
    Cheque,
    #[serde(alias = "other", alias = "Autre")]
    Other,
}

impl From<PaymentMethodField> for PaymentMethod {
    fn from(value: PaymentMethodField) -> Self {
        match value {
            PaymentMethodField::Cash => PaymentMethod::Cash,
            PaymentMethodField::BankTransfer => PaymentMethod::BankTransfer,
            PaymentMethodField::Cheque => PaymentMethod::Cheque,
            PaymentMethodField::Other => PaymentMethod::Other,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentForm {
    #[serde(deserialize_with = "coerce_decimal")]
    pub amount: Decimal,
    #[serde(deserialize_with = "coerce_date")]
    pub date: DateTime<Utc>,
    pub method: PaymentMethodField,
    #[serde(default)]
    pub notes: Option<String>,
}

// -------------------------
// Payload → service request
// -------------------------

pub fn parse_invoice_id(raw: &str) -> Result<InvoiceId, FormError> {
    id("invoiceId", raw)
}

pub fn parse_create(payload: &JsonValue) -> Result<CreateInvoice, FormError> {
    let form: InvoiceForm = from_payload(payload)?;

    let items = form
        .items
        .iter()
        .map(|item| {
            Ok(LineRequest {
                product_id: id::<ProductId>("items.productId", &item.product_id)?,
                quantity: quantity("items.quantity", item.quantity)?,
            })
        })
        .collect::<Result<Vec<_>, FormError>>()?;

    Ok(CreateInvoice {
        client_id: id::<ClientId>("clientId", &form.client_id)?,
        date: form.date,
        due_date: form.due_date,
        items,
        discount: percent("discount", form.discount)?,
        vat: percent("vat", form.vat)?,
    })
}

pub fn parse_update(payload: &JsonValue) -> Result<UpdateInvoice, FormError> {
    let form: UpdateInvoiceForm = from_payload(payload)?;

    let items = form
        .items
        .iter()
        .map(|item| {
            if item.unit_price < Decimal::ZERO {
                return Err(FormError::field("items.unitPrice", "cannot be negative"));
            }
            Ok(RevisedLine {
                product_id: id::<ProductId>("items.productId", &item.product_id)?,
                quantity: quantity("items.quantity", item.quantity)?,
                unit_price: Money::new(item.unit_price),
            })
        })
        .collect::<Result<Vec<_>, FormError>>()?;

    Ok(UpdateInvoice {
        client_id: id::<ClientId>("clientId", &form.client_id)?,
        date: form.date,
        due_date: form.due_date,
        items,
        discount: percent("discount", form.discount)?,
        vat: percent("vat", form.vat)?,
        status: form.status,
    })
}

pub fn parse_payment(payload: &JsonValue) -> Result<RecordPayment, FormError> {
    let form: PaymentForm = from_payload(payload)?;
    if form.amount <= Decimal::ZERO {
        return Err(FormError::field("amount", "must be positive"));
    }

    Ok(RecordPayment {
        amount: Money::new(form.amount),
        date: form.date,
        method: form.method.into(),
        notes: form.notes.filter(|n| !n.trim().is_empty()),
    })
}
