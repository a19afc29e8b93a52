use serde::Serialize;

use crate::error::RowError;

/// Reporting country for every record in the expanded summary.
pub const REPORTER: &str = "USA";

/// Partner code used by the source data for world control totals.
pub const WORLD_PARTNER: &str = "WLD";

/// A validated bilateral trade/tariff row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRecord {
    pub reporter: &'static str,
    pub partner_iso: String,
    pub partner_name: Option<String>,
    /// Always exactly four ASCII digits.
    pub hs4: String,
    pub trade_value: f64,
    /// Simple-average tariff in percent. Zero when the source left it blank.
    pub tariff: f64,
    pub tariff_revenue: Option<f64>,
}

impl TradeRecord {
    pub fn new(partner_iso: &str, hs4: &str, trade_value: f64, tariff: f64) -> Self {
        TradeRecord {
            reporter: REPORTER,
            partner_iso: partner_iso.to_string(),
            partner_name: None,
            hs4: hs4.to_string(),
            trade_value,
            tariff,
            tariff_revenue: None,
        }
    }

    pub fn with_partner_name(mut self, name: &str) -> Self {
        self.partner_name = Some(name.to_string());
        self
    }

    /// The two-digit sector prefix of the HS4 code.
    pub fn hs2(&self) -> &str {
        self.hs4.get(..2).unwrap_or(&self.hs4)
    }

    /// Estimated duty collected on this flow, from the source column when it
    /// was present and otherwise [`tariff_revenue`] of the row.
    pub fn revenue_estimate(&self) -> f64 {
        self.tariff_revenue
            .unwrap_or_else(|| tariff_revenue(self.tariff, self.trade_value))
    }
}

/// `rate% * value`, or zero when either side is zero or negative.
pub fn tariff_revenue(rate: f64, value: f64) -> f64 {
    if rate <= 0.0 || value <= 0.0 {
        return 0.0;
    }
    rate / 100.0 * value
}

/// Returns `true` for the world control-total partner, ignoring case.
pub fn is_world(partner_iso: &str) -> bool {
    partner_iso.trim().eq_ignore_ascii_case(WORLD_PARTNER)
}

/// Normalizes a raw product code into a four-character HS4 code.
///
/// Numeric sources lose leading zeros (`101`) or gain a fraction (`101.0`);
/// both come back as `"0101"`. Longer codes (HS6) are truncated to HS4.
pub fn normalize_hs4(raw: &str) -> Result<String, RowError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(RowError::MissingHs4);
    }

    let integral = match trimmed.split_once('.') {
        Some((whole, fraction)) if fraction.chars().all(|c| c == '0') => whole,
        Some(_) => return Err(RowError::InvalidHs4(trimmed.to_string())),
        None => trimmed,
    };

    if integral.is_empty() || !integral.chars().all(|c| c.is_ascii_digit()) {
        return Err(RowError::InvalidHs4(trimmed.to_string()));
    }

    let code = if integral.len() >= 4 {
        integral[..4].to_string()
    } else {
        format!("{:0>4}", integral)
    };

    Ok(code)
}
