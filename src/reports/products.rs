//! Product sales, inventory and catalogue search

use crate::entities::invoice::round_cents;
use crate::entities::{Invoice, Product};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Units sold and revenue of one product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSales {
    pub name: String,
    pub quantity: i64,
    pub revenue: f64,
}

/// Best-selling products by revenue
///
/// Names come from the catalogue; a product that no longer exists is
/// reported as "Unknown product".
pub fn top_products(invoices: &[Invoice], products: &[Product], limit: usize) -> Vec<ProductSales> {
    let mut totals: IndexMap<&str, (i64, f64)> = IndexMap::new();
    for item in invoices.iter().flat_map(|i| &i.items) {
        let entry = totals.entry(item.product_id.as_str()).or_default();
        entry.0 += item.quantity;
        entry.1 += item.subtotal();
    }

    let mut rows: Vec<ProductSales> = totals
        .into_iter()
        .map(|(product_id, (quantity, revenue))| ProductSales {
            name: products
                .iter()
                .find(|p| p.id == product_id)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| "Unknown product".to_string()),
            quantity,
            revenue: round_cents(revenue),
        })
        .collect();
    rows.sort_by(|a, b| b.revenue.partial_cmp(&a.revenue).unwrap_or(Ordering::Equal));
    rows.truncate(limit);
    rows
}

/// One row of the inventory chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRow {
    pub name: String,
    pub stock: i64,
    pub reorder_point: i64,
}

/// Products with the least stock first
pub fn inventory_status(products: &[Product], limit: usize) -> Vec<InventoryRow> {
    let mut rows: Vec<InventoryRow> = products
        .iter()
        .map(|p| InventoryRow {
            name: p.name.clone(),
            stock: p.stock,
            reorder_point: p.reorder_point,
        })
        .collect();
    rows.sort_by_key(|r| r.stock);
    rows.truncate(limit);
    rows
}

/// Products at or under the stock threshold, in catalogue order
pub fn low_stock(products: &[Product], threshold: i64) -> Vec<Product> {
    products
        .iter()
        .filter(|p| p.is_low_stock(threshold))
        .cloned()
        .collect()
}

/// A named product filter matched against product names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCategory {
    pub name: String,
    pub query: String,
}

impl ProductCategory {
    pub fn new(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query: query.into().to_lowercase(),
        }
    }

    pub fn matches(&self, product: &Product) -> bool {
        product.name.to_lowercase().contains(&self.query.to_lowercase())
    }
}

/// The stock categories of a tire and auto-parts shop
pub fn default_categories() -> Vec<ProductCategory> {
    [
        ("New Tires", "new tires"),
        ("Used Tires", "used tires"),
        ("Rims", "rims"),
        ("Batteries", "batteries"),
        ("Oil", "oil"),
        ("Filters", "filters"),
        ("Brakes", "brakes"),
        ("Suspension", "suspension"),
        ("Lights", "lights"),
        ("Accessories", "accessories"),
    ]
    .into_iter()
    .map(|(name, query)| ProductCategory::new(name, query))
    .collect()
}

/// Number of products per category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCount {
    #[serde(flatten)]
    pub category: ProductCategory,
    pub count: usize,
}

pub fn category_counts(products: &[Product], categories: &[ProductCategory]) -> Vec<CategoryCount> {
    categories
        .iter()
        .map(|category| CategoryCount {
            category: category.clone(),
            count: products.iter().filter(|p| category.matches(p)).count(),
        })
        .collect()
}

/// Catalogue search
///
/// `term` matches name, description or barcode (case-insensitive
/// substring); `category` additionally restricts to names containing it.
pub fn search_products(products: &[Product], term: Option<&str>, category: Option<&str>) -> Vec<Product> {
    let term = term.map(|t| t.trim().to_lowercase()).unwrap_or_default();
    let category = category
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty());

    products
        .iter()
        .filter(|p| {
            category
                .as_deref()
                .is_none_or(|c| p.name.to_lowercase().contains(c))
        })
        .filter(|p| {
            term.is_empty()
                || p.name.to_lowercase().contains(&term)
                || [&p.description, &p.barcode]
                    .into_iter()
                    .flatten()
                    .any(|s| s.to_lowercase().contains(&term))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::fixtures::{invoice, line};

    fn product(id: &str, name: &str, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            ..Product::new(name, 10.0, stock)
        }
    }

    #[test]
    fn test_top_products_aggregates_by_product() {
        let invoices = vec![
            invoice("A", "c", "2024-06-01", vec![line("p1", 2, 10.0), line("p2", 1, 100.0)]),
            invoice("B", "c", "2024-06-02", vec![line("p1", 3, 12.0), line("gone", 1, 1.0)]),
        ];
        let products = vec![product("p1", "Oil", 5), product("p2", "Rims", 2)];

        let top = top_products(&invoices, &products, 10);
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].name, "Rims");
        assert_eq!(top[1].name, "Oil");
        assert_eq!(top[1].quantity, 5);
        assert_eq!(top[1].revenue, 56.0);
        assert_eq!(top[2].name, "Unknown product");

        assert_eq!(top_products(&invoices, &products, 1).len(), 1);
    }

    #[test]
    fn test_inventory_status_sorted_by_stock() {
        let products = vec![
            product("a", "A", 9),
            product("b", "B", 0).with_reorder_point(4),
            product("c", "C", 3),
        ];
        let rows = inventory_status(&products, 2);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "B");
        assert_eq!(rows[0].reorder_point, 4);
        assert_eq!(rows[1].name, "C");
    }

    #[test]
    fn test_low_stock_threshold_is_inclusive() {
        let products = vec![product("a", "A", 5), product("b", "B", 6), product("c", "C", 0)];
        let names: Vec<String> = low_stock(&products, 5).into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["A", "C"]);
    }

    #[test]
    fn test_search_products_matches_any_text_field() {
        let products = vec![
            product("1", "Battery 60Ah", 3).with_barcode("7701234"),
            product("2", "Oil filter", 8).with_description("Fits most sedans"),
            product("3", "New Tires 15\"", 4),
        ];
        let hits = |term: Option<&str>, cat: Option<&str>| -> Vec<String> {
            search_products(&products, term, cat)
                .into_iter()
                .map(|p| p.id)
                .collect()
        };
        assert_eq!(hits(Some("770"), None), vec!["1"]);
        assert_eq!(hits(Some("SEDAN"), None), vec!["2"]);
        assert_eq!(hits(None, Some("new tires")), vec!["3"]);
        assert_eq!(hits(Some("oil"), Some("battery")), Vec::<String>::new());
        assert_eq!(hits(Some(""), None).len(), 3);
    }

    #[test]
    fn test_category_counts() {
        let products = vec![
            product("1", "Used Tires 14\"", 1),
            product("2", "used tires 16\"", 1),
            product("3", "Brake pads", 1),
        ];
        let counts = category_counts(&products, &default_categories());
        let count_of = |name: &str| counts.iter().find(|c| c.category.name == name).map(|c| c.count);
        assert_eq!(count_of("Used Tires"), Some(2));
        assert_eq!(count_of("Brakes"), Some(0));
        assert_eq!(counts.len(), 10);
    }
}
