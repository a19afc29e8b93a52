//! CSV ingestion for the expanded trade/tariff summary.
//!
//! Turns raw CSV bytes into validated [`TradeRecord`]s. World control totals are
//! dropped and malformed rows are skipped so that one bad line never keeps the
//! rest of the table from being aggregated.

use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Result, RowError, TradeDataError};
use crate::record::{REPORTER, TradeRecord, is_world, normalize_hs4};

const REQUIRED_COLUMNS: [&str; 4] = ["partner_iso", "hs4", "trade_value_total", "simple_average"];

/// One CSV row as it appears on disk, before any validation.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTradeRow {
    partner_iso: Option<String>,
    partner_name: Option<String>,
    hs4: Option<String>,
    trade_value_total: Option<String>,
    simple_average: Option<String>,
    tariff_revenue_estimate: Option<String>,
}

/// Result of ingesting one CSV resource.
#[derive(Debug, Default)]
pub struct Ingested {
    pub records: Vec<TradeRecord>,
    pub rows_read: usize,
    pub world_rows: usize,
    pub skipped_rows: usize,
}

/// Parses the expanded summary CSV from raw bytes.
///
/// Rows are decoded individually, so a row that is not valid UTF-8 is
/// skipped like any other malformed row.
///
/// # Errors
///
/// Fails only when the header lacks one of the required columns or cannot be
/// read at all. Bad individual rows are counted in
/// [`Ingested::skipped_rows`] instead.
pub fn parse_trade_csv(data: &[u8]) -> Result<Ingested> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(data);

    let headers = rdr.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(TradeDataError::MissingColumn(column));
        }
    }

    let mut ingested = Ingested::default();

    for (index, result) in rdr.deserialize::<RawTradeRow>().enumerate() {
        ingested.rows_read += 1;
        // header occupies line 1
        let line = index + 2;

        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                skip_row(&mut ingested, line, &RowError::Malformed(e.to_string()));
                continue;
            }
        };

        if raw.partner_iso.as_deref().is_some_and(is_world) {
            ingested.world_rows += 1;
            continue;
        }

        match normalize_row(raw) {
            Ok(record) => ingested.records.push(record),
            Err(e) => skip_row(&mut ingested, line, &e),
        }
    }

    if ingested.skipped_rows > 0 {
        warn!(
            skipped = ingested.skipped_rows,
            rows = ingested.rows_read,
            "Skipped malformed trade rows"
        );
    }
    debug!(
        records = ingested.records.len(),
        world_rows = ingested.world_rows,
        "Trade CSV ingested"
    );

    Ok(ingested)
}

fn skip_row(ingested: &mut Ingested, line: usize, reason: &RowError) {
    debug!(line, reason = %reason, "Skipping trade row");
    ingested.skipped_rows += 1;
}

fn normalize_row(raw: RawTradeRow) -> std::result::Result<TradeRecord, RowError> {
    let partner_iso = raw.partner_iso.unwrap_or_default().trim().to_string();
    let hs4 = normalize_hs4(raw.hs4.as_deref().unwrap_or(""))?;

    let trade_value = parse_number("trade_value_total", raw.trade_value_total.as_deref())?;
    if trade_value < 0.0 {
        return Err(RowError::NegativeTradeValue(trade_value));
    }

    let tariff = parse_number("simple_average", raw.simple_average.as_deref())?;

    let tariff_revenue = match raw.tariff_revenue_estimate.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(value) => Some(parse_number("tariff_revenue_estimate", Some(value))?),
    };

    let partner_name = raw
        .partner_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    Ok(TradeRecord {
        reporter: REPORTER,
        partner_iso,
        partner_name,
        hs4,
        trade_value,
        tariff,
        tariff_revenue,
    })
}

/// Parses a numeric cell. Blank cells count as zero.
fn parse_number(column: &'static str, value: Option<&str>) -> std::result::Result<f64, RowError> {
    let value = value.unwrap_or("").trim();
    if value.is_empty() {
        return Ok(0.0);
    }

    match value.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        _ => Err(RowError::InvalidNumber {
            column,
            value: value.to_string(),
        }),
    }
}
