//! Clients (customers invoices are issued to)

use crate::impl_document;
use serde::{Deserialize, Serialize};

/// A customer record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

impl_document!(
    Client,
    "clients",
    "client",
    ["name", "email", "phone"],
    validate: {
        create: {
            name: [required, string_length(1, 200)],
            email: [optional, email],
            phone: [optional, string_length(0, 40)],
            address: [optional, string_length(0, 500)],
        },
        update: {
            name: [optional, string_length(1, 200)],
            email: [optional, email],
            phone: [optional, string_length(0, 40)],
            address: [optional, string_length(0, 500)],
        },
    },
    filters: {
        create: {
            name: [trim],
            email: [trim, lowercase],
            phone: [trim],
            address: [trim],
        },
        update: {
            name: [trim],
            email: [trim, lowercase],
            phone: [trim],
            address: [trim],
        },
    }
);

impl Client {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
            address: address.into(),
        }
    }
}
