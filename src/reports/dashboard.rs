//! Dashboard statistics

use super::products::low_stock;
use super::sales::{SalesTrend, TrendRange, sales_trend};
use crate::entities::invoice::round_cents;
use crate::entities::{Client, Invoice, Product};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Collection totals and the most recent records
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_products: usize,
    pub total_clients: usize,
    pub total_invoices: usize,
    pub total_sales: f64,
    pub recent_products: Vec<Product>,
    pub recent_clients: Vec<Client>,
    pub recent_invoices: Vec<Invoice>,
}

/// "Recent" means the last `recent` records in store order.
pub fn dashboard(products: &[Product], clients: &[Client], invoices: &[Invoice], recent: usize) -> DashboardStats {
    DashboardStats {
        total_products: products.len(),
        total_clients: clients.len(),
        total_invoices: invoices.len(),
        total_sales: round_cents(invoices.iter().map(|i| i.total).sum()),
        recent_products: last(products, recent),
        recent_clients: last(clients, recent),
        recent_invoices: last(invoices, recent),
    }
}

fn last<T: Clone>(items: &[T], n: usize) -> Vec<T> {
    items[items.len().saturating_sub(n)..].to_vec()
}

/// Everything the dashboard page shows
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    #[serde(flatten)]
    pub stats: DashboardStats,
    pub sales_trend: SalesTrend,
    pub low_stock: Vec<Product>,
    pub low_stock_threshold: i64,
}

impl DashboardView {
    pub fn build(
        products: &[Product],
        clients: &[Client],
        invoices: &[Invoice],
        range: TrendRange,
        low_stock_threshold: i64,
        recent: usize,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            stats: dashboard(products, clients, invoices, recent),
            sales_trend: sales_trend(invoices, range, now),
            low_stock: low_stock(products, low_stock_threshold),
            low_stock_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::fixtures::{invoice, line};
    use chrono::TimeZone;

    #[test]
    fn test_dashboard_totals_and_recent() {
        let products: Vec<Product> = (0..7).map(|i| Product::new(format!("P{i}"), 1.0, i)).collect();
        let clients = vec![Client::new("Acme", "", "", "")];
        let invoices = vec![
            invoice("A", "c1", "2024-06-01", vec![line("p", 1, 10.25)]),
            invoice("B", "c1", "2024-06-02", vec![line("p", 2, 5.0)]),
        ];

        let stats = dashboard(&products, &clients, &invoices, 5);
        assert_eq!(stats.total_products, 7);
        assert_eq!(stats.total_clients, 1);
        assert_eq!(stats.total_invoices, 2);
        assert_eq!(stats.total_sales, 20.25);
        assert_eq!(stats.recent_products.len(), 5);
        assert_eq!(stats.recent_products[0].name, "P2");
        assert_eq!(stats.recent_clients.len(), 1);
        assert_eq!(stats.recent_invoices.len(), 2);
    }

    #[test]
    fn test_dashboard_empty() {
        let stats = dashboard(&[], &[], &[], 5);
        assert_eq!(stats.total_sales, 0.0);
        assert!(stats.recent_invoices.is_empty());
    }

    #[test]
    fn test_dashboard_view_serializes_flat() {
        let products = vec![Product::new("Oil", 30.0, 2), Product::new("Rims", 90.0, 12)];
        let now = Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap();
        let view = DashboardView::build(&products, &[], &[], TrendRange::Week, 5, 5, now);
        assert_eq!(view.low_stock.len(), 1);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["totalProducts"], 2);
        assert_eq!(json["lowStockThreshold"], 5);
        assert_eq!(json["salesTrend"]["range"], "7days");
    }
}
