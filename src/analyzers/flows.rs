//! Trade arcs from the U.S. to its largest partners, as GeoJSON layers.

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::analyzers::types::{
    Feature, FeatureCollection, FlowArrowProperties, FlowCollections, FlowLineProperties,
    Geometry, LonLat,
};
use crate::analyzers::utility::mean;
use crate::geo::{USA_CENTROID, bearing};
use crate::record::{TradeRecord, is_world};

pub const DEFAULT_FLOW_LIMIT: usize = 25;

/// Land neighbours; their arcs would collapse onto the origin.
pub const EXCLUDED_PARTNERS: [&str; 2] = ["CAN", "MEX"];

/// Resolves an ISO3 country code to its `[lon, lat]` position.
#[async_trait]
pub trait CoordinateLookup: Send + Sync {
    async fn coordinates(&self, iso: &str) -> anyhow::Result<Option<LonLat>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartnerFlow {
    pub iso: String,
    pub name: String,
    pub trade_value: f64,
    pub avg_tariff: f64,
}

/// Ranks partners by total trade value and keeps the largest `limit`.
pub fn rank_partners(records: &[TradeRecord], limit: usize) -> Vec<PartnerFlow> {
    let mut order: Vec<&str> = Vec::new();
    let mut partners: HashMap<&str, (Option<&str>, f64, Vec<f64>)> = HashMap::new();

    for record in records {
        let iso = record.partner_iso.as_str();
        if iso.is_empty() || is_world(iso) || EXCLUDED_PARTNERS.contains(&iso) {
            continue;
        }

        let entry = partners.entry(iso).or_insert_with(|| {
            order.push(iso);
            (None, 0.0, Vec::new())
        });
        if entry.0.is_none() {
            entry.0 = record.partner_name.as_deref();
        }
        entry.1 += record.trade_value;
        entry.2.push(record.tariff);
    }

    let mut ranked: Vec<PartnerFlow> = order
        .into_iter()
        .filter_map(|iso| {
            let (name, trade_value, tariffs) = partners.remove(iso)?;
            Some(PartnerFlow {
                iso: iso.to_string(),
                name: name.unwrap_or(iso).to_string(),
                trade_value,
                avg_tariff: mean(&tariffs),
            })
        })
        .collect();

    ranked.sort_by(|a, b| b.trade_value.total_cmp(&a.trade_value));
    ranked.truncate(limit);
    ranked
}

/// Looks up coordinates for every partner. Partners whose lookup fails or
/// comes back empty are left out of the map.
pub async fn resolve_coordinates<L: CoordinateLookup + ?Sized>(
    lookup: &L,
    partners: &[PartnerFlow],
) -> HashMap<String, LonLat> {
    let mut coords = HashMap::new();

    for partner in partners {
        match lookup.coordinates(&partner.iso).await {
            Ok(Some(position)) => {
                coords.insert(partner.iso.clone(), position);
            }
            Ok(None) => debug!(iso = %partner.iso, "No coordinates for partner"),
            Err(e) => warn!(iso = %partner.iso, error = %e, "Coordinate lookup failed"),
        }
    }

    coords
}

/// Builds the arc and arrow layers. Partners without coordinates are dropped.
pub fn build_flows(partners: &[PartnerFlow], coords: &HashMap<String, LonLat>) -> FlowCollections {
    let mut lines = Vec::new();
    let mut arrows = Vec::new();

    for partner in partners {
        let Some(&position) = coords.get(&partner.iso) else {
            continue;
        };

        lines.push(Feature::new(
            FlowLineProperties {
                tariff_rate: partner.avg_tariff,
                trade_value: partner.trade_value,
                partner: partner.name.clone(),
            },
            Geometry::LineString(vec![USA_CENTROID, position]),
        ));
        arrows.push(Feature::new(
            FlowArrowProperties {
                bearing: bearing(USA_CENTROID, position),
            },
            Geometry::Point(position),
        ));
    }

    FlowCollections {
        lines: FeatureCollection::new(lines),
        arrows: FeatureCollection::new(arrows),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedLookup(HashMap<&'static str, LonLat>);

    #[async_trait]
    impl CoordinateLookup for FixedLookup {
        async fn coordinates(&self, iso: &str) -> anyhow::Result<Option<LonLat>> {
            if iso == "ERR" {
                anyhow::bail!("lookup unavailable");
            }
            Ok(self.0.get(iso).copied())
        }
    }

    fn records() -> Vec<TradeRecord> {
        vec![
            TradeRecord::new("CHN", "8471", 500.0, 10.0).with_partner_name("China"),
            TradeRecord::new("CHN", "8517", 300.0, 20.0),
            TradeRecord::new("DEU", "8703", 400.0, 2.5),
            TradeRecord::new("CAN", "2710", 9_000.0, 0.0),
            TradeRecord::new("MEX", "8703", 8_000.0, 0.0),
            TradeRecord::new("WLD", "8703", 99_000.0, 0.0),
            TradeRecord::new("ERR", "8703", 100.0, 1.0),
        ]
    }

    #[test]
    fn test_rank_excludes_neighbours_and_world() {
        let ranked = rank_partners(&records(), DEFAULT_FLOW_LIMIT);
        let isos: Vec<_> = ranked.iter().map(|p| p.iso.as_str()).collect();

        assert_eq!(isos, vec!["CHN", "DEU", "ERR"]);
        assert_eq!(ranked[0].name, "China");
        assert_eq!(ranked[0].trade_value, 800.0);
        assert_eq!(ranked[0].avg_tariff, 15.0);
        assert_eq!(ranked[1].name, "DEU");
    }

    #[test]
    fn test_rank_limit() {
        assert_eq!(rank_partners(&records(), 1).len(), 1);
    }

    #[tokio::test]
    async fn test_build_flows_skips_unresolved_partners() {
        let lookup = FixedLookup(HashMap::from([("CHN", [104.0, 35.0])]));
        let ranked = rank_partners(&records(), DEFAULT_FLOW_LIMIT);

        let coords = resolve_coordinates(&lookup, &ranked).await;
        assert_eq!(coords.len(), 1);

        let flows = build_flows(&ranked, &coords);
        assert_eq!(flows.lines.features.len(), 1);
        assert_eq!(flows.arrows.features.len(), 1);

        let line = &flows.lines.features[0];
        assert_eq!(line.properties.partner, "China");
        assert_eq!(
            line.geometry,
            Geometry::LineString(vec![USA_CENTROID, [104.0, 35.0]])
        );
    }

    #[test]
    fn test_geojson_shape() {
        let ranked = rank_partners(&records(), 1);
        let coords = HashMap::from([("CHN".to_string(), [104.0, 35.0])]);
        let value = serde_json::to_value(build_flows(&ranked, &coords)).unwrap();

        assert_eq!(value["lines"]["type"], "FeatureCollection");
        assert_eq!(value["lines"]["features"][0]["type"], "Feature");
        assert_eq!(value["lines"]["features"][0]["geometry"]["type"], "LineString");
        assert_eq!(value["lines"]["features"][0]["properties"]["tradeValue"], 800.0);
        assert_eq!(value["lines"]["features"][0]["properties"]["tariffRate"], 15.0);
        assert_eq!(value["arrows"]["features"][0]["geometry"]["type"], "Point");
        assert!(value["arrows"]["features"][0]["properties"]["bearing"].is_number());
    }
}
