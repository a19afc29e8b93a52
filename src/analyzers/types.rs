//! Output shapes produced by the analyzers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// HS4 product inside a sector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductNode {
    pub hs4: String,
    pub name: String,
    pub value: f64,
    /// Last tariff observed for this code, not an average.
    pub tariff: f64,
}

/// HS2 sector, or the synthetic `Other` bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorNode {
    pub hs2: String,
    pub name: String,
    pub value: f64,
    pub tariff: f64,
    pub share_of_total: f64,
    pub children: Vec<ProductNode>,
}

impl SectorNode {
    pub fn is_other(&self) -> bool {
        self.hs2 == OTHER_LABEL
    }
}

pub const OTHER_LABEL: &str = "Other";

/// Sector breakdown served to the sunburst/treemap views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorTree {
    pub from: String,
    pub to: String,
    pub total_value: f64,
    pub children: Vec<SectorNode>,
}

/// Per-partner totals for the heatmap and country list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountrySummary {
    pub country: String,
    pub iso_a3: String,
    pub avg_tariff: f64,
    pub total_trade_value: f64,
    pub tariff_revenue: f64,
    pub product_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TariffRange {
    pub min: f64,
    pub max: f64,
}

/// Headline figures for the whole dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub total_records: usize,
    pub total_trade_value: f64,
    pub average_tariff: f64,
    /// `None` when there are no records.
    pub tariff_range: Option<TariffRange>,
    pub total_tariff_revenue: f64,
}

/// One HS4 code across all partners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub hs4: String,
    pub category: String,
    pub category_code: String,
    pub trade_value: f64,
    /// Unweighted mean over the partner rows for this code.
    pub tariff: f64,
    pub tariff_revenue: f64,
    pub partner_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedProduct {
    #[serde(flatten)]
    pub product: ProductSummary,
    /// Percent of the ranked set's trade value.
    pub trade_share: f64,
}

/// Products ordered by tariff, highest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffRanking {
    pub total_products: usize,
    pub total_trade_value: f64,
    pub total_tariff_revenue: f64,
    pub average_tariff: f64,
    pub tariff_range: Option<TariffRange>,
    pub top_product: Option<String>,
    pub products: Vec<RankedProduct>,
}

/// `[longitude, latitude]` in degrees, GeoJSON order.
pub type LonLat = [f64; 2];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    LineString(Vec<LonLat>),
    Point(LonLat),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature<P> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub properties: P,
    pub geometry: Geometry,
}

impl<P> Feature<P> {
    pub fn new(properties: P, geometry: Geometry) -> Self {
        Self {
            kind: "Feature",
            properties,
            geometry,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureCollection<P> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub features: Vec<Feature<P>>,
}

impl<P> FeatureCollection<P> {
    pub fn new(features: Vec<Feature<P>>) -> Self {
        Self {
            kind: "FeatureCollection",
            features,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowLineProperties {
    pub tariff_rate: f64,
    pub trade_value: f64,
    pub partner: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowArrowProperties {
    pub bearing: f64,
}

/// Arc and arrow layers for the globe view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowCollections {
    pub lines: FeatureCollection<FlowLineProperties>,
    pub arrows: FeatureCollection<FlowArrowProperties>,
}

/// Listing of the objects written by one publish run, served as `index.json`.
#[derive(Debug, Serialize)]
pub struct PublishIndex {
    pub generated_at: DateTime<Utc>,
    pub total_value: f64,
    pub record_count: usize,
    pub objects: Vec<String>,
}
