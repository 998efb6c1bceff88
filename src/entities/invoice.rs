//! Invoices, their line items and the invoice draft
//!
//! An invoice is an independent document: the client and the product
//! names/prices are snapshots taken when the invoice is finalized.

use crate::core::error::{AppResult, ValidationError};
use crate::entities::client::Client;
use crate::entities::lenient;
use crate::entities::product::Product;
use crate::entities::user::iso_timestamp;
use crate::impl_document;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// One product entry of an invoice
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default, deserialize_with = "lenient::i64")]
    pub quantity: i64,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub price: f64,
}

impl LineItem {
    pub fn subtotal(&self) -> f64 {
        self.quantity as f64 * self.price
    }
}

/// A stored invoice
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub invoice_number: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client: Client,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub total: f64,
}

impl_document!(
    Invoice,
    "invoices",
    "invoice",
    ["invoiceNumber", "client.name"],
    validate: {
        update: {
            invoice_number: [optional, string_length(1, 64)],
            client_id: [optional, string_length(1, 128)],
            total: [optional, non_negative],
        },
    },
    filters: {
        update: {
            invoice_number: [trim],
        },
    }
);

/// Round a money amount to cents
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Σ quantity × price, rounded to cents
pub fn compute_total(items: &[LineItem]) -> f64 {
    round_cents(items.iter().map(LineItem::subtotal).sum())
}

impl Invoice {
    /// Recompute the total from the line items
    pub fn recompute_total(&mut self) {
        self.total = compute_total(&self.items);
    }

    /// The invoice date as UTC
    ///
    /// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates (midnight UTC).
    pub fn date_utc(&self) -> Option<DateTime<Utc>> {
        parse_date(&self.date)
    }
}

/// Parse a stored date (RFC 3339 or `YYYY-MM-DD`) as UTC
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Rejection message for an invoice without line items
pub const NO_ITEMS_MESSAGE: &str = "Please add at least one product";

/// Invoice under construction
///
/// Mirrors the invoice form: products are added one at a time, quantities
/// edited, and the draft is finalized once a client and at least one
/// product are selected.
#[derive(Debug, Clone, Default)]
pub struct InvoiceDraft {
    client: Option<Client>,
    items: Vec<LineItem>,
}

impl InvoiceDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_client(&mut self, client: Client) {
        self.client = Some(client);
    }

    pub fn client(&self) -> Option<&Client> {
        self.client.as_ref()
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Add one unit of `product`
    ///
    /// A product already on the draft has its quantity incremented;
    /// otherwise a line is added at the product's price.
    pub fn add_product(&mut self, product: &Product) -> AppResult<()> {
        self.add_line(product, 1, None)
    }

    /// Add `quantity` units of `product`, optionally at an explicit price
    ///
    /// Fails when the line's combined quantity no longer fits an `i64`.
    pub fn add_line(&mut self, product: &Product, quantity: i64, price: Option<f64>) -> AppResult<()> {
        match self.items.iter_mut().find(|i| i.product_id == product.id) {
            Some(item) => {
                item.quantity = item.quantity.checked_add(quantity).ok_or_else(|| {
                    ValidationError::FieldError {
                        field: "quantity".to_string(),
                        message: format!("quantity of '{}' is too large", product.name),
                    }
                })?;
                if let Some(price) = price {
                    item.price = price;
                }
            }
            None => self.items.push(LineItem {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                quantity,
                price: price.unwrap_or(product.price),
            }),
        }
        Ok(())
    }

    /// Set a line's quantity; below 1 the line is removed
    pub fn set_quantity(&mut self, product_id: &str, quantity: i64) {
        if quantity < 1 {
            self.items.retain(|i| i.product_id != product_id);
        } else if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product_id) {
            item.quantity = quantity;
        }
    }

    pub fn total(&self) -> f64 {
        compute_total(&self.items)
    }

    /// What is still missing before the draft can be submitted
    pub fn missing_details(&self) -> Option<&'static str> {
        if self.client.is_none() {
            Some("Please select a client")
        } else if self.items.is_empty() {
            Some(NO_ITEMS_MESSAGE)
        } else {
            None
        }
    }

    /// Turn the draft into an invoice numbered `INV-{unix millis}`
    pub fn finalize(self, now: DateTime<Utc>) -> AppResult<Invoice> {
        if let Some(message) = self.missing_details() {
            return Err(ValidationError::MissingDetails {
                message: message.to_string(),
            }
            .into());
        }
        let total = self.total();
        let client = self.client.unwrap_or_default();
        Ok(Invoice {
            id: String::new(),
            invoice_number: format!("INV-{}", now.timestamp_millis()),
            client_id: client.id.clone(),
            client,
            date: iso_timestamp(now),
            items: self.items,
            total,
        })
    }
}

/// Body of `POST /invoices`
///
/// The server resolves the client snapshot, product names and prices.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRequest {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    #[validate(nested)]
    pub items: Vec<LineItemRequest>,
}

/// One requested line; `price` overrides the catalogue price
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LineItemRequest {
    #[validate(length(min = 1, message = "productId is required"))]
    pub product_id: String,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: i64,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "price must not be negative"))]
    pub price: Option<f64>,
}
