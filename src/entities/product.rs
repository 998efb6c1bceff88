//! Products (inventory)

use crate::entities::lenient;
use crate::impl_document;
use serde::{Deserialize, Serialize};

/// A stocked product
///
/// `price`, `stock` and `reorderPoint` read as 0 when missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub price: f64,
    #[serde(default, deserialize_with = "lenient::i64")]
    pub stock: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(default, deserialize_with = "lenient::i64")]
    pub reorder_point: i64,
}

impl_document!(
    Product,
    "products",
    "product",
    ["name", "description", "barcode"],
    validate: {
        create: {
            name: [required, string_length(1, 200)],
            price: [optional, non_negative],
            stock: [optional, non_negative],
            reorder_point: [optional, non_negative],
            barcode: [optional, string_length(0, 64)],
        },
        update: {
            name: [optional, string_length(1, 200)],
            price: [optional, non_negative],
            stock: [optional, non_negative],
            reorder_point: [optional, non_negative],
            barcode: [optional, string_length(0, 64)],
        },
    },
    filters: {
        create: {
            name: [trim],
            description: [trim],
            barcode: [trim],
            price: [round_decimals(2)],
        },
        update: {
            name: [trim],
            description: [trim],
            barcode: [trim],
            price: [round_decimals(2)],
        },
    }
);

impl Product {
    pub fn new(name: impl Into<String>, price: f64, stock: i64) -> Self {
        Self {
            name: name.into(),
            price,
            stock,
            ..Default::default()
        }
    }

    pub fn with_barcode(mut self, barcode: impl Into<String>) -> Self {
        self.barcode = Some(barcode.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_reorder_point(mut self, reorder_point: i64) -> Self {
        self.reorder_point = reorder_point;
        self
    }

    /// Whether stock is at or under the low-stock threshold
    pub fn is_low_stock(&self, threshold: i64) -> bool {
        self.stock <= threshold
    }
}
