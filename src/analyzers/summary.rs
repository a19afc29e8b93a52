//! Dataset-wide and per-product summaries.
//!
//! Rows are folded per HS4 code across partners in first-seen order. The
//! product tariff here is the unweighted mean of its partner rows.

use std::collections::HashMap;
use tracing::debug;

use crate::analyzers::types::{
    DatasetSummary, ProductSummary, RankedProduct, TariffRange, TariffRanking,
};
use crate::analyzers::utility::{mean, pct};
use crate::categories::CategoryTable;
use crate::error::LookupError;
use crate::record::{TradeRecord, is_world};

/// Number of existing codes suggested when a lookup misses.
pub const AVAILABLE_SAMPLE: usize = 10;

pub const DEFAULT_RANKING_LIMIT: usize = 50;

#[derive(Default)]
struct ProductAccumulator {
    trade_value: f64,
    tariff_revenue: f64,
    tariffs: Vec<f64>,
}

impl ProductAccumulator {
    fn finish(self, hs4: &str, categories: &CategoryTable) -> ProductSummary {
        let hs2 = hs4.get(..2).unwrap_or(hs4);
        ProductSummary {
            hs4: hs4.to_string(),
            category: categories.name_for(hs2),
            category_code: hs2.to_string(),
            trade_value: self.trade_value,
            tariff: mean(&self.tariffs),
            tariff_revenue: self.tariff_revenue,
            partner_count: self.tariffs.len(),
        }
    }
}

fn group_products(records: &[TradeRecord]) -> (Vec<&str>, HashMap<&str, ProductAccumulator>) {
    let mut order: Vec<&str> = Vec::new();
    let mut products: HashMap<&str, ProductAccumulator> = HashMap::new();

    for record in records.iter().filter(|r| !is_world(&r.partner_iso)) {
        let acc = products.entry(record.hs4.as_str()).or_insert_with(|| {
            order.push(record.hs4.as_str());
            ProductAccumulator::default()
        });
        acc.trade_value += record.trade_value;
        acc.tariff_revenue += record.revenue_estimate();
        acc.tariffs.push(record.tariff);
    }

    (order, products)
}

fn tariff_range(tariffs: impl IntoIterator<Item = f64>) -> Option<TariffRange> {
    tariffs.into_iter().fold(None, |range, t| match range {
        None => Some(TariffRange { min: t, max: t }),
        Some(r) => Some(TariffRange {
            min: r.min.min(t),
            max: r.max.max(t),
        }),
    })
}

/// Headline totals over every non-world row.
pub fn summarize_dataset(records: &[TradeRecord]) -> DatasetSummary {
    let rows: Vec<&TradeRecord> = records
        .iter()
        .filter(|r| !is_world(&r.partner_iso))
        .collect();
    let tariffs: Vec<f64> = rows.iter().map(|r| r.tariff).collect();

    DatasetSummary {
        total_records: rows.len(),
        total_trade_value: rows.iter().map(|r| r.trade_value).sum(),
        average_tariff: mean(&tariffs),
        tariff_range: tariff_range(tariffs.iter().copied()),
        total_tariff_revenue: rows.iter().map(|r| r.revenue_estimate()).sum(),
    }
}

/// Checks that a requested code is exactly four ASCII digits.
///
/// Unlike ingestion, no padding or truncation is applied: `101` and `847130`
/// are rejected.
pub fn validate_hs4(hs4: &str) -> Result<String, LookupError> {
    let hs4 = hs4.trim();
    if hs4.len() == 4 && hs4.bytes().all(|b| b.is_ascii_digit()) {
        Ok(hs4.to_string())
    } else {
        Err(LookupError::InvalidHs4(hs4.to_string()))
    }
}

/// Summarizes one HS4 code across all partners.
///
/// # Errors
///
/// [`LookupError::InvalidHs4`] for a malformed code and
/// [`LookupError::NotFound`] when no row carries it. The latter lists up to
/// [`AVAILABLE_SAMPLE`] codes that do exist.
pub fn lookup_product(
    records: &[TradeRecord],
    categories: &CategoryTable,
    hs4: &str,
) -> Result<ProductSummary, LookupError> {
    let hs4 = validate_hs4(hs4)?;
    let (order, mut products) = group_products(records);

    match products.remove(hs4.as_str()) {
        Some(acc) => Ok(acc.finish(&hs4, categories)),
        None => Err(LookupError::NotFound {
            available: order
                .iter()
                .take(AVAILABLE_SAMPLE)
                .map(|c| c.to_string())
                .collect(),
            hs4,
        }),
    }
}

/// Ranks HS4 products by tariff, highest first, keeping at most `limit`.
///
/// Totals, the tariff range and each `trade_share` cover every product, not
/// just the ones kept. Equal tariffs keep first-seen order.
pub fn rank_by_tariff(
    records: &[TradeRecord],
    categories: &CategoryTable,
    limit: usize,
) -> TariffRanking {
    let (order, mut products) = group_products(records);
    let mut summaries: Vec<ProductSummary> = order
        .into_iter()
        .filter_map(|hs4| Some(products.remove(hs4)?.finish(hs4, categories)))
        .collect();

    let total_trade_value: f64 = summaries.iter().map(|p| p.trade_value).sum();
    let total_tariff_revenue: f64 = summaries.iter().map(|p| p.tariff_revenue).sum();
    let tariffs: Vec<f64> = summaries.iter().map(|p| p.tariff).collect();
    let total_products = summaries.len();

    summaries.sort_by(|a, b| b.tariff.total_cmp(&a.tariff));
    summaries.truncate(limit);

    debug!(total_products, kept = summaries.len(), "Tariff ranking built");

    TariffRanking {
        total_products,
        total_trade_value,
        total_tariff_revenue,
        average_tariff: mean(&tariffs),
        tariff_range: tariff_range(tariffs.iter().copied()),
        top_product: summaries.first().map(|p| p.hs4.clone()),
        products: summaries
            .into_iter()
            .map(|product| RankedProduct {
                trade_share: pct(product.trade_value, total_trade_value),
                product,
            })
            .collect(),
    }
}
