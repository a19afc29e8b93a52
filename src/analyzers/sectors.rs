//! HS2 → HS4 sector breakdown.
//!
//! Rows are grouped by their two-digit sector and, inside each sector, by HS4
//! product. The largest sectors by trade value are kept and the remainder is
//! folded into a single `Other` bucket.
//!
//! Three different tariff rules are in play and are kept as the dashboard has
//! always shown them:
//! - a sector's tariff is the unweighted mean of its row tariffs,
//! - the `Other` bucket's tariff is weighted by sector trade value,
//! - a product's tariff is the last one seen for that HS4 code.

use std::collections::HashMap;
use tracing::debug;

use crate::analyzers::types::{OTHER_LABEL, ProductNode, SectorNode, SectorTree};
use crate::analyzers::utility::{pct, weighted_mean};
use crate::categories::CategoryTable;
use crate::record::{REPORTER, TradeRecord, is_world};

pub const DEFAULT_TOP_N: usize = 10;
pub const BILATERAL_DESTINATION: &str = "World (Bilateral)";

#[derive(Debug, Clone)]
pub struct SectorOptions {
    /// Number of sectors kept before folding the rest into `Other`.
    pub top_n: usize,
    pub origin: String,
    pub destination: String,
    /// Restrict the breakdown to one partner (ISO3). The destination label
    /// becomes the partner code.
    pub partner: Option<String>,
}

impl Default for SectorOptions {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            origin: REPORTER.to_string(),
            destination: BILATERAL_DESTINATION.to_string(),
            partner: None,
        }
    }
}

impl SectorOptions {
    pub fn for_partner(mut self, partner: &str) -> Self {
        let partner = partner.trim().to_ascii_uppercase();
        self.destination = partner.clone();
        self.partner = Some(partner);
        self
    }
}

struct SectorAccumulator {
    hs2: String,
    name: String,
    value: f64,
    tariff_sum: f64,
    tariff_count: usize,
    products: Vec<ProductNode>,
    product_index: HashMap<String, usize>,
}

impl SectorAccumulator {
    fn new(hs2: &str, name: String) -> Self {
        Self {
            hs2: hs2.to_string(),
            name,
            value: 0.0,
            tariff_sum: 0.0,
            tariff_count: 0,
            products: Vec::new(),
            product_index: HashMap::new(),
        }
    }

    fn add(&mut self, record: &TradeRecord) {
        self.value += record.trade_value;
        self.tariff_sum += record.tariff;
        self.tariff_count += 1;

        let idx = match self.product_index.get(&record.hs4) {
            Some(&idx) => idx,
            None => {
                self.products.push(ProductNode {
                    hs4: record.hs4.clone(),
                    name: format!("HS4 {}", record.hs4),
                    value: 0.0,
                    tariff: 0.0,
                });
                self.product_index
                    .insert(record.hs4.clone(), self.products.len() - 1);
                self.products.len() - 1
            }
        };

        let product = &mut self.products[idx];
        product.value += record.trade_value;
        product.tariff = record.tariff;
    }

    fn finish(self) -> SectorNode {
        let tariff = if self.tariff_count == 0 {
            0.0
        } else {
            self.tariff_sum / self.tariff_count as f64
        };

        SectorNode {
            hs2: self.hs2,
            name: self.name,
            value: self.value,
            tariff,
            share_of_total: 0.0,
            children: self.products,
        }
    }
}

/// Builds the sector tree for a set of trade records.
///
/// World control rows are ignored. Never fails: an empty input produces a
/// tree with a zero total and no children.
pub fn aggregate_sectors(
    records: &[TradeRecord],
    categories: &CategoryTable,
    options: &SectorOptions,
) -> SectorTree {
    let mut sectors: Vec<SectorAccumulator> = Vec::new();
    let mut sector_index: HashMap<String, usize> = HashMap::new();
    let mut total_value = 0.0;

    let selected = records.iter().filter(|r| !is_world(&r.partner_iso)).filter(|r| {
        options
            .partner
            .as_deref()
            .is_none_or(|p| r.partner_iso.eq_ignore_ascii_case(p))
    });

    for record in selected {
        total_value += record.trade_value;

        let hs2 = record.hs2();
        let idx = match sector_index.get(hs2) {
            Some(&idx) => idx,
            None => {
                sectors.push(SectorAccumulator::new(hs2, categories.name_for(hs2)));
                sector_index.insert(hs2.to_string(), sectors.len() - 1);
                sectors.len() - 1
            }
        };
        sectors[idx].add(record);
    }

    let mut nodes: Vec<SectorNode> = sectors.into_iter().map(SectorAccumulator::finish).collect();
    // stable: equal values keep first-seen order
    nodes.sort_by(|a, b| b.value.total_cmp(&a.value));

    let overflow = if nodes.len() > options.top_n {
        nodes.split_off(options.top_n)
    } else {
        Vec::new()
    };

    debug!(
        kept = nodes.len(),
        folded = overflow.len(),
        total_value,
        "Sectors aggregated"
    );

    if !overflow.is_empty() {
        nodes.push(fold_other(&overflow));
    }

    for node in &mut nodes {
        node.share_of_total = pct(node.value, total_value);
    }

    SectorTree {
        from: options.origin.clone(),
        to: options.destination.clone(),
        total_value,
        children: nodes,
    }
}

fn fold_other(overflow: &[SectorNode]) -> SectorNode {
    SectorNode {
        hs2: OTHER_LABEL.to_string(),
        name: OTHER_LABEL.to_string(),
        value: overflow.iter().map(|n| n.value).sum(),
        tariff: weighted_mean(overflow.iter().map(|n| (n.tariff, n.value))),
        share_of_total: 0.0,
        children: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(partner: &str, hs4: &str, value: f64, tariff: f64) -> TradeRecord {
        TradeRecord::new(partner, hs4, value, tariff)
    }

    fn aggregate(records: &[TradeRecord]) -> SectorTree {
        aggregate_sectors(records, &CategoryTable::default(), &SectorOptions::default())
    }

    /// One record per sector `10..10+n`, values descending from `n`.
    fn spread(n: usize) -> Vec<TradeRecord> {
        (0..n)
            .map(|i| {
                let hs4 = format!("{}01", 10 + i);
                record("CHN", &hs4, (n - i) as f64 * 100.0, 5.0)
            })
            .collect()
    }

    #[test]
    fn test_sector_tariff_is_unweighted_mean() {
        let tree = aggregate(&[
            record("CHN", "8471", 100.0, 10.0),
            record("CHN", "8473", 200.0, 20.0),
        ]);

        assert_eq!(tree.children.len(), 1);
        let sector = &tree.children[0];
        assert_eq!(sector.hs2, "84");
        assert_eq!(sector.name, "Category 84");
        assert_eq!(sector.value, 300.0);
        assert_eq!(sector.tariff, 15.0);
        assert_eq!(
            sector.children,
            vec![
                ProductNode {
                    hs4: "8471".into(),
                    name: "HS4 8471".into(),
                    value: 100.0,
                    tariff: 10.0,
                },
                ProductNode {
                    hs4: "8473".into(),
                    name: "HS4 8473".into(),
                    value: 200.0,
                    tariff: 20.0,
                },
            ]
        );
    }

    #[test]
    fn test_duplicate_hs4_keeps_last_tariff() {
        let tree = aggregate(&[
            record("CHN", "0101", 10.0, 5.0),
            record("MEX", "0101", 30.0, 9.0),
        ]);

        let product = &tree.children[0].children[0];
        assert_eq!(product.value, 40.0);
        assert_eq!(product.tariff, 9.0);
        // sector mean still sees both observations
        assert_eq!(tree.children[0].tariff, 7.0);
    }

    #[test]
    fn test_single_row_sector_keeps_its_tariff() {
        let tree = aggregate(&[record("CHN", "2710", 50.0, 3.25)]);
        assert_eq!(tree.children[0].tariff, 3.25);
        assert_eq!(tree.children[0].share_of_total, 100.0);
    }

    #[test]
    fn test_world_rows_do_not_count() {
        let tree = aggregate(&[
            record("WLD", "8471", 1_000.0, 10.0),
            record("CHN", "8471", 100.0, 10.0),
        ]);
        assert_eq!(tree.total_value, 100.0);
        assert_eq!(tree.children[0].value, 100.0);
    }

    #[test]
    fn test_empty_input() {
        let tree = aggregate(&[]);
        assert_eq!(tree.from, "USA");
        assert_eq!(tree.to, "World (Bilateral)");
        assert_eq!(tree.total_value, 0.0);
        assert!(tree.children.is_empty());
    }

    #[test]
    fn test_zero_total_value_shares_are_zero() {
        let tree = aggregate(&[record("CHN", "8471", 0.0, 10.0)]);
        assert_eq!(tree.children[0].share_of_total, 0.0);
    }

    #[test]
    fn test_ten_sectors_have_no_other() {
        let tree = aggregate(&spread(10));
        assert_eq!(tree.children.len(), 10);
        assert!(tree.children.iter().all(|n| !n.is_other()));
    }

    #[test]
    fn test_eleventh_sector_alone_becomes_other() {
        let tree = aggregate(&spread(11));

        assert_eq!(tree.children.len(), 11);
        assert!(tree.children[..10].iter().all(|n| !n.is_other()));
        let other = tree.children.last().unwrap();
        assert!(other.is_other());
        // the smallest sector, 2001, carries value 100
        assert_eq!(other.value, 100.0);
        assert_eq!(other.tariff, 5.0);
        assert_eq!(other.share_of_total, pct(100.0, tree.total_value));
    }

    #[test]
    fn test_overflow_is_folded_into_other() {
        let mut records = spread(12);
        // give the two smallest sectors different tariffs
        records[10].tariff = 10.0; // value 200
        records[11].tariff = 40.0; // value 100

        let tree = aggregate(&records);

        assert_eq!(tree.children.len(), 11);
        let other = tree.children.last().unwrap();
        assert!(other.is_other());
        assert_eq!(other.name, "Other");
        assert_eq!(other.value, 300.0);
        assert_eq!(other.tariff, 20.0);
        assert!(other.children.is_empty());
    }

    #[test]
    fn test_sorted_by_value_descending() {
        let tree = aggregate(&[
            record("CHN", "0101", 10.0, 0.0),
            record("CHN", "8471", 30.0, 0.0),
            record("CHN", "2710", 20.0, 0.0),
        ]);
        let order: Vec<_> = tree.children.iter().map(|n| n.hs2.as_str()).collect();
        assert_eq!(order, vec!["84", "27", "01"]);
    }

    #[test]
    fn test_shares_sum_to_hundred() {
        let tree = aggregate(&spread(15));
        let shares: f64 = tree.children.iter().map(|n| n.share_of_total).sum();
        let values: f64 = tree.children.iter().map(|n| n.value).sum();

        assert!((shares - 100.0).abs() < 1e-9);
        assert!((values - tree.total_value).abs() < 1e-9);
        assert!(
            tree.children
                .iter()
                .all(|n| (0.0..=100.0).contains(&n.share_of_total))
        );
    }

    #[test]
    fn test_category_names_resolved() {
        let categories = CategoryTable::from_dictionary_json(
            r#"{"hs4_categories": {"84-85": "Machinery / Electrical"}}"#,
        )
        .unwrap();
        let tree = aggregate_sectors(
            &[record("CHN", "8471", 1.0, 0.0), record("CHN", "0101", 1.0, 0.0)],
            &categories,
            &SectorOptions::default(),
        );

        assert_eq!(tree.children[0].name, "Machinery / Electrical");
        assert_eq!(tree.children[1].name, "Category 01");
    }

    #[test]
    fn test_partner_filter() {
        let records = [
            record("CHN", "8471", 100.0, 10.0),
            record("DEU", "8703", 500.0, 2.5),
        ];
        let options = SectorOptions::default().for_partner("chn");
        let tree = aggregate_sectors(&records, &CategoryTable::default(), &options);

        assert_eq!(tree.to, "CHN");
        assert_eq!(tree.total_value, 100.0);
        assert_eq!(tree.children.len(), 1);
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let records = spread(13);
        assert_eq!(aggregate(&records), aggregate(&records));
    }
}
