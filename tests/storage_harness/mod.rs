//! Shared test harness for collection backends
//!
//! Provides `TestRecord`, a document covering every kind of stored value
//! (strings, integers, floats, booleans, arrays, nested maps), helpers
//! to build records, and the `collection_service_tests!` contract suite.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//! use storage_harness::*;
//!
//! collection_service_tests!(InMemoryStore::new().collection::<TestRecord>());
//! ```

#![allow(dead_code)]

#[macro_use]
pub mod collection_service_tests;

use serde::{Deserialize, Serialize};
use shopdesk::impl_document;

/// Nested map, addressed with dotted paths (`address.city`)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub city: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TestRecord {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub address: Address,
}

impl_document!(TestRecord, "test_records", "test_record", ["name", "email"]);

pub fn record(name: &str, stock: i64, price: f64) -> TestRecord {
    TestRecord {
        name: name.to_string(),
        email: format!("{}@shop.test", name.to_lowercase()),
        stock,
        price,
        active: true,
        ..Default::default()
    }
}

pub fn in_city(mut record: TestRecord, city: &str) -> TestRecord {
    record.address.city = city.to_string();
    record
}

pub fn tagged(mut record: TestRecord, tags: &[&str]) -> TestRecord {
    record.tags = tags.iter().map(|t| t.to_string()).collect();
    record
}
