use std::collections::HashMap;

use crate::analyzers::types::CountrySummary;
use crate::analyzers::utility::{mean, round_to};
use crate::record::{TradeRecord, is_world};

#[derive(Default)]
struct CountryAccumulator {
    trade_value: f64,
    tariff_revenue: f64,
    tariffs: Vec<f64>,
}

/// Summarizes trade per partner country, largest partners first.
///
/// Rows without a partner code and world control rows are ignored.
pub fn summarize_countries(records: &[TradeRecord]) -> Vec<CountrySummary> {
    let mut order: Vec<&str> = Vec::new();
    let mut countries: HashMap<&str, CountryAccumulator> = HashMap::new();

    for record in records {
        let iso = record.partner_iso.as_str();
        if iso.is_empty() || is_world(iso) {
            continue;
        }

        let acc = countries.entry(iso).or_insert_with(|| {
            order.push(iso);
            CountryAccumulator::default()
        });
        acc.trade_value += record.trade_value;
        acc.tariff_revenue += record.revenue_estimate();
        acc.tariffs.push(record.tariff);
    }

    let mut summaries: Vec<CountrySummary> = order
        .into_iter()
        .filter_map(|iso| {
            let acc = countries.remove(iso)?;
            Some(CountrySummary {
                country: iso.to_string(),
                iso_a3: iso.to_string(),
                avg_tariff: round_to(mean(&acc.tariffs), 2),
                total_trade_value: acc.trade_value.round(),
                tariff_revenue: acc.tariff_revenue.round(),
                product_count: acc.tariffs.len(),
            })
        })
        .collect();

    summaries.sort_by(|a, b| b.total_trade_value.total_cmp(&a.total_trade_value));
    summaries
}
