//! Reporting aggregator
//!
//! Pure functions over in-memory record lists: the handlers fetch whole
//! collections and hand the slices to these functions. Nothing here
//! touches the store.

pub mod customers;
pub mod dashboard;
pub mod products;
pub mod sales;

pub use customers::{ClientStatement, CustomerTotal, client_statement, search_clients, top_customers};
pub use dashboard::{DashboardStats, DashboardView, dashboard};
pub use products::{
    CategoryCount, InventoryRow, ProductCategory, ProductSales, category_counts, default_categories,
    inventory_status, low_stock, search_products, top_products,
};
pub use sales::{DailySales, SalesTrend, TrendRange, filter_by_range, sales_by_day, sales_trend};

use crate::core::error::{AppResult, RequestError};
use crate::entities::invoice::parse_date;
use crate::entities::{Client, Invoice, Product};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Inclusive date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.from && at <= self.to
    }

    /// Parse query-string bounds
    ///
    /// Each bound is RFC 3339 or `YYYY-MM-DD`. A bare `to` date covers the
    /// whole day. A missing `from` is open-ended, a missing `to` is `now`.
    pub fn parse(from: Option<&str>, to: Option<&str>, now: DateTime<Utc>) -> AppResult<Self> {
        let from = match from.filter(|s| !s.trim().is_empty()) {
            Some(raw) => parse_bound("from", raw)?,
            None => DateTime::<Utc>::MIN_UTC,
        };
        let to = match to.filter(|s| !s.trim().is_empty()) {
            Some(raw) => match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
                Ok(day) => day.and_time(end_of_day()).and_utc(),
                Err(_) => parse_bound("to", raw)?,
            },
            None => now,
        };
        if from > to {
            return Err(RequestError::InvalidParameter {
                name: "from".to_string(),
                message: "must not be after 'to'".to_string(),
            }
            .into());
        }
        Ok(Self { from, to })
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN)
}

fn parse_bound(name: &str, raw: &str) -> AppResult<DateTime<Utc>> {
    parse_date(raw).ok_or_else(|| {
        RequestError::InvalidParameter {
            name: name.to_string(),
            message: format!("'{raw}' is not a date (expected YYYY-MM-DD or RFC 3339)"),
        }
        .into()
    })
}

/// How many rows each report section keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportLimits {
    pub top_products: usize,
    pub top_customers: usize,
    pub inventory_rows: usize,
    pub recent_items: usize,
}

impl Default for ReportLimits {
    fn default() -> Self {
        Self {
            top_products: 10,
            top_customers: 5,
            inventory_rows: 20,
            recent_items: 5,
        }
    }
}

/// The report page: four sections over one date range
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    pub sales_data: Vec<DailySales>,
    pub top_products: Vec<ProductSales>,
    pub customer_data: Vec<CustomerTotal>,
    pub inventory_data: Vec<InventoryRow>,
}

/// Build every report section
///
/// Sales, products and customers only see invoices inside `range`; the
/// inventory section covers the whole catalogue.
pub fn generate_report(
    range: &DateRange,
    invoices: &[Invoice],
    products: &[Product],
    clients: &[Client],
    limits: &ReportLimits,
) -> ReportData {
    let in_range = filter_by_range(invoices, range);
    ReportData {
        sales_data: sales_by_day(&in_range),
        top_products: top_products(&in_range, products, limits.top_products),
        customer_data: top_customers(&in_range, clients, limits.top_customers),
        inventory_data: inventory_status(products, limits.inventory_rows),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::entities::{Client, Invoice, LineItem};

    pub fn line(product_id: &str, quantity: i64, price: f64) -> LineItem {
        LineItem {
            product_id: product_id.to_string(),
            product_name: String::new(),
            quantity,
            price,
        }
    }

    pub fn invoice(number: &str, client_id: &str, date: &str, items: Vec<LineItem>) -> Invoice {
        let mut invoice = Invoice {
            id: number.to_lowercase(),
            invoice_number: number.to_string(),
            client_id: client_id.to_string(),
            client: Client {
                id: client_id.to_string(),
                ..Default::default()
            },
            date: date.to_string(),
            items,
            total: 0.0,
        };
        invoice.recompute_total();
        invoice
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{invoice, line};
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_bare_dates_cover_whole_days() {
        let range = DateRange::parse(Some("2024-06-01"), Some("2024-06-02"), now()).unwrap();
        assert_eq!(range.from, Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        assert!(range.contains(Utc.with_ymd_and_hms(2024, 6, 2, 23, 59, 0).unwrap()));
        assert!(!range.contains(Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_parse_defaults() {
        let range = DateRange::parse(None, None, now()).unwrap();
        assert_eq!(range.to, now());
        assert!(range.contains(Utc.with_ymd_and_hms(1999, 1, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        let err = DateRange::parse(Some("yesterday"), None, now()).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
        assert!(DateRange::parse(Some("2024-06-10"), Some("2024-06-01"), now()).is_err());
    }

    #[test]
    fn test_generate_report_sections() {
        let invoices = vec![
            invoice("INV-1", "c1", "2024-06-01T10:00:00.000Z", vec![line("p1", 2, 10.0)]),
            invoice("INV-2", "c2", "2024-06-02T10:00:00.000Z", vec![line("p2", 1, 50.0)]),
            invoice("INV-3", "c1", "2024-05-01T10:00:00.000Z", vec![line("p1", 9, 10.0)]),
        ];
        let products = vec![
            Product {
                id: "p1".to_string(),
                ..Product::new("Oil", 10.0, 3)
            },
            Product {
                id: "p2".to_string(),
                ..Product::new("Battery", 50.0, 1)
            },
        ];
        let clients = vec![Client {
            id: "c1".to_string(),
            name: "Acme".to_string(),
            ..Default::default()
        }];
        let range = DateRange::parse(Some("2024-06-01"), Some("2024-06-30"), now()).unwrap();

        let report = generate_report(&range, &invoices, &products, &clients, &ReportLimits::default());
        assert_eq!(report.sales_data.len(), 2);
        assert_eq!(report.top_products[0].name, "Battery");
        assert_eq!(report.top_products[1].quantity, 2);
        assert_eq!(report.customer_data[0].name, "Unknown client");
        assert_eq!(report.customer_data[1].value, 20.0);
        assert_eq!(report.inventory_data[0].name, "Battery");

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("salesData").is_some());
        assert!(json["inventoryData"][0].get("reorderPoint").is_some());
    }
}
