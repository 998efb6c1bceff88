//! Sales over time

use super::DateRange;
use crate::core::error::{AppResult, RequestError};
use crate::entities::Invoice;
use crate::entities::invoice::round_cents;
use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Invoices whose date falls inside `range` (both ends inclusive)
///
/// Invoices with an unreadable date are left out.
pub fn filter_by_range(invoices: &[Invoice], range: &DateRange) -> Vec<Invoice> {
    invoices
        .iter()
        .filter(|invoice| invoice.date_utc().is_some_and(|at| range.contains(at)))
        .cloned()
        .collect()
}

/// Sales total of one UTC calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySales {
    pub date: String,
    pub total: f64,
}

/// Group invoice totals by UTC day (`YYYY-MM-DD`), oldest first
pub fn sales_by_day(invoices: &[Invoice]) -> Vec<DailySales> {
    let mut days: IndexMap<String, f64> = IndexMap::new();
    for invoice in invoices {
        let Some(at) = invoice.date_utc() else {
            continue;
        };
        *days.entry(at.format("%Y-%m-%d").to_string()).or_default() += invoice.total;
    }
    days.sort_keys();
    days.into_iter()
        .map(|(date, total)| DailySales {
            date,
            total: round_cents(total),
        })
        .collect()
}

/// Window of the dashboard sales chart
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendRange {
    #[serde(rename = "7days")]
    Week,
    #[default]
    #[serde(rename = "30days")]
    Month,
    #[serde(rename = "90days")]
    Quarter,
    #[serde(rename = "all")]
    All,
}

impl TrendRange {
    pub fn parse(raw: &str) -> AppResult<Self> {
        match raw {
            "7days" => Ok(TrendRange::Week),
            "30days" => Ok(TrendRange::Month),
            "90days" => Ok(TrendRange::Quarter),
            "all" => Ok(TrendRange::All),
            other => Err(RequestError::InvalidParameter {
                name: "range".to_string(),
                message: format!("'{other}' is not one of 7days, 30days, 90days, all"),
            }
            .into()),
        }
    }

    /// Length of the window in days, `None` for all time
    pub fn days(&self) -> Option<i64> {
        match self {
            TrendRange::Week => Some(7),
            TrendRange::Month => Some(30),
            TrendRange::Quarter => Some(90),
            TrendRange::All => None,
        }
    }
}

/// Sales chart figures for one window
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesTrend {
    pub range: TrendRange,
    pub daily: Vec<DailySales>,
    pub total_sales: f64,
    pub average_sale: f64,
    pub invoice_count: usize,
    pub previous_period_sales: f64,
    /// Percentage change against the previous window, 0 without one
    pub growth: f64,
}

/// Sales of the last `range` days compared with the window before it
pub fn sales_trend(invoices: &[Invoice], range: TrendRange, now: DateTime<Utc>) -> SalesTrend {
    let (current, previous_total) = match range.days() {
        Some(days) => {
            let cutoff = now - Duration::days(days);
            let previous = DateRange::new(now - Duration::days(days * 2), cutoff);
            let current: Vec<Invoice> = invoices
                .iter()
                .filter(|i| i.date_utc().is_some_and(|at| at >= cutoff))
                .cloned()
                .collect();
            let previous_total: f64 = filter_by_range(invoices, &previous)
                .iter()
                .map(|i| i.total)
                .sum();
            (current, previous_total)
        }
        None => (invoices.to_vec(), 0.0),
    };

    let total: f64 = current.iter().map(|i| i.total).sum();
    let average = if current.is_empty() {
        0.0
    } else {
        total / current.len() as f64
    };
    let growth = if previous_total == 0.0 {
        0.0
    } else {
        (total - previous_total) / previous_total * 100.0
    };

    SalesTrend {
        range,
        daily: sales_by_day(&current),
        total_sales: round_cents(total),
        average_sale: round_cents(average),
        invoice_count: current.len(),
        previous_period_sales: round_cents(previous_total),
        growth: round_cents(growth),
    }
}
