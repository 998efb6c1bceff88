//! Customer totals, statements and client search

use super::DateRange;
use crate::entities::invoice::round_cents;
use crate::entities::{Client, Invoice};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Sales total of one client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerTotal {
    pub name: String,
    pub value: f64,
}

/// Clients ranked by invoiced total
pub fn top_customers(invoices: &[Invoice], clients: &[Client], limit: usize) -> Vec<CustomerTotal> {
    let mut totals: IndexMap<&str, f64> = IndexMap::new();
    for invoice in invoices {
        *totals.entry(invoice.client_id.as_str()).or_default() += invoice.total;
    }

    let mut rows: Vec<CustomerTotal> = totals
        .into_iter()
        .map(|(client_id, value)| CustomerTotal {
            name: clients
                .iter()
                .find(|c| c.id == client_id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| "Unknown client".to_string()),
            value: round_cents(value),
        })
        .collect();
    rows.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal));
    rows.truncate(limit);
    rows
}

/// A client's invoice history
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientStatement {
    pub client_id: String,
    /// Invoices after the search and date filters
    pub invoices: Vec<Invoice>,
    /// Sum over every invoice of the client, filters aside
    pub total_spent: f64,
    pub invoice_count: usize,
}

pub fn client_statement(
    client_id: &str,
    invoices: &[Invoice],
    search: Option<&str>,
    range: Option<&DateRange>,
) -> ClientStatement {
    let own: Vec<&Invoice> = invoices.iter().filter(|i| i.client_id == client_id).collect();
    let total_spent = round_cents(own.iter().map(|i| i.total).sum());
    let invoice_count = own.len();

    let search = search
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());
    let filtered = own
        .into_iter()
        .filter(|i| {
            search
                .as_deref()
                .is_none_or(|s| i.invoice_number.to_lowercase().contains(s))
        })
        .filter(|i| range.is_none_or(|r| i.date_utc().is_some_and(|at| r.contains(at))))
        .cloned()
        .collect();

    ClientStatement {
        client_id: client_id.to_string(),
        invoices: filtered,
        total_spent,
        invoice_count,
    }
}

/// Clients whose name, e-mail or phone contains `term` (case-insensitive)
pub fn search_clients(clients: &[Client], term: &str) -> Vec<Client> {
    let term = term.trim().to_lowercase();
    clients
        .iter()
        .filter(|c| {
            term.is_empty()
                || [&c.name, &c.email, &c.phone]
                    .iter()
                    .any(|s| s.to_lowercase().contains(&term))
        })
        .cloned()
        .collect()
}
