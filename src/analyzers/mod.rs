//! Trade data aggregation.
//!
//! This module turns ingested [`TradeRecord`](crate::record::TradeRecord)s
//! into the JSON documents behind the dashboard views: the HS2/HS4 sector
//! tree, the per-country summary, dataset and product summaries, the
//! high-tariff ranking and the globe's trade arcs. Results can be
//! published to S3 for the front end to fetch.

pub mod countries;
pub mod flows;
pub mod sectors;
pub mod summary;
pub mod types;
pub mod utility;
pub mod writetos3;
