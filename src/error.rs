//! Error types for the trade-data pipeline.
//!
//! [`TradeDataError`] is the only error that leaves the library. Problems with
//! individual CSV rows are described by [`RowError`] and never abort ingestion.

use thiserror::Error;

/// Failures that terminate an operation as a whole.
#[derive(Error, Debug)]
pub enum TradeDataError {
    #[error("resource unavailable: {source_name}: {reason}")]
    Unavailable { source_name: String, reason: String },

    #[error("trade CSV is missing required column `{0}`")]
    MissingColumn(&'static str),

    #[error("invalid category dictionary: {0}")]
    InvalidDictionary(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TradeDataError {
    pub fn unavailable(source_name: impl Into<String>, reason: impl ToString) -> Self {
        TradeDataError::Unavailable {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}

/// Why a single CSV row was dropped during ingestion.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowError {
    #[error("missing HS4 code")]
    MissingHs4,

    #[error("invalid HS4 code `{0}`")]
    InvalidHs4(String),

    #[error("unparseable {column} value `{value}`")]
    InvalidNumber { column: &'static str, value: String },

    #[error("negative trade value {0}")]
    NegativeTradeValue(f64),

    #[error("malformed record: {0}")]
    Malformed(String),
}

/// Why a single-product lookup produced no result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LookupError {
    #[error("invalid HS4 code `{0}`: expected exactly four digits")]
    InvalidHs4(String),

    #[error("HS4 code {hs4} not found")]
    NotFound {
        hs4: String,
        /// A sample of codes that do exist, in input order.
        available: Vec<String>,
    },
}

pub type Result<T> = std::result::Result<T, TradeDataError>;
