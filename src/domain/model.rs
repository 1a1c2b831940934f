use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::utils::error::{ErrorKind, QuoteError, Result};

/// Point location the rainfall provider samples around. The provider applies
/// its own buffer; this core only carries the coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub latitude: f64,
    pub longitude: f64,
}

impl Geometry {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Stable cache-key form, fixed to 6 decimal places so that float noise
    /// does not split cache entries.
    pub fn key(&self) -> String {
        format!("{:.6},{:.6}", self.latitude, self.longitude)
    }
}

/// A crop-growth sub-window with its own drought sensitivity and weight.
/// `start_day`/`end_day` are days since planting, half-open `[start, end)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,
    pub start_day: u32,
    pub end_day: u32,
    /// Share of the sum insured this phase carries; weights across a crop
    /// sum to 1.0.
    pub weight: f64,
    /// Rainfall level above which the phase pays nothing.
    pub trigger_mm: f64,
    /// Rainfall level at/below which the phase pays its maximum.
    pub exit_mm: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crop {
    pub name: String,
    pub season_days: u32,
    /// Cumulative rainfall over the detection window that marks germination.
    pub germination_mm: f64,
    pub phases: Vec<Phase>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyRain {
    pub date: NaiveDate,
    pub rainfall_mm: f64,
    /// True when the provider had no observation for this date and the value
    /// was filled with 0 mm by policy.
    pub filled: bool,
}

/// Contiguous daily rainfall for one season window. Immutable once built;
/// construction rejects gaps because a dropped day shifts phase boundaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RainfallSeries {
    days: Vec<DailyRain>,
}

impl RainfallSeries {
    pub fn from_days(days: Vec<DailyRain>) -> Result<Self> {
        if days.is_empty() {
            return Err(QuoteError::data_unavailable("empty rainfall series"));
        }
        for pair in days.windows(2) {
            let expected = pair[0].date.succ_opt();
            if expected != Some(pair[1].date) {
                return Err(QuoteError::data_unavailable(format!(
                    "rainfall series not contiguous: {} followed by {}",
                    pair[0].date, pair[1].date
                )));
            }
        }
        Ok(Self { days })
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn start_date(&self) -> NaiveDate {
        self.days[0].date
    }

    pub fn date_at(&self, index: usize) -> Option<NaiveDate> {
        self.days.get(index).map(|d| d.date)
    }

    pub fn days(&self) -> &[DailyRain] {
        &self.days
    }

    /// Cumulative rainfall over `[from, to)` day indices, clamped to the
    /// series bounds.
    pub fn total_between(&self, from: usize, to: usize) -> f64 {
        let to = to.min(self.days.len());
        if from >= to {
            return 0.0;
        }
        self.days[from..to].iter().map(|d| d.rainfall_mm).sum()
    }

    /// Share of days with a real (non-filled) observation.
    pub fn observed_fraction(&self) -> f64 {
        let observed = self.days.iter().filter(|d| !d.filled).count();
        observed as f64 / self.days.len() as f64
    }
}

/// Location-based risk multiplier applied to the computed burn cost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneAdjustment {
    pub zone: String,
    pub name: String,
    pub multiplier: f64,
}

impl ZoneAdjustment {
    pub fn standard() -> Self {
        Self {
            zone: "standard".to_string(),
            name: "Standard (no adjustment)".to_string(),
            multiplier: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseResult {
    pub phase: String,
    pub start_day: u32,
    pub end_day: u32,
    pub weight: f64,
    pub trigger_mm: f64,
    pub exit_mm: f64,
    pub rainfall_mm: f64,
    /// Payout fraction in [0, 1].
    pub fraction: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonResult {
    /// Season year: the 2020 season plants in Nov 2020 and harvests in 2021.
    pub season_year: i32,
    pub planting_date: NaiveDate,
    /// False when an explicit planting date from the request was used.
    pub planting_detected: bool,
    pub phases: Vec<PhaseResult>,
    /// Weighted sum of phase fractions, capped at 1.0.
    pub total_fraction: f64,
}

/// Per-phase rainfall statistics backing a prospective quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseExpectation {
    pub phase: String,
    pub weight: f64,
    pub trigger_mm: f64,
    pub exit_mm: f64,
    pub mean_rainfall_mm: f64,
    pub min_rainfall_mm: f64,
    pub max_rainfall_mm: f64,
    /// The value actually fed through the payout formula (mean, or the
    /// requested percentile).
    pub statistic_mm: f64,
    pub fraction: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum QuoteMode {
    /// Burn cost over realized past seasons ending at `year`.
    Historical { year: i32 },
    /// Expected-value estimate for a future season from the historical
    /// rainfall distribution; `percentile` in (0, 1) selects a quantile
    /// instead of the mean.
    Prospective {
        target_year: i32,
        percentile: Option<f64>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub crop: String,
    #[serde(default)]
    pub field_id: Option<u64>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    pub expected_yield: f64,
    pub price_per_ton: f64,
    #[serde(default)]
    pub area_ha: Option<f64>,
    #[serde(flatten)]
    pub mode: QuoteMode,
    /// Fallback planting date for seasons where detection finds no signal.
    /// For multi-year aggregation the month/day is reused in each season
    /// year.
    #[serde(default)]
    pub planting_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteResult {
    #[serde(flatten)]
    pub mode: QuoteMode,
    pub crop: String,
    pub field_id: Option<u64>,
    pub expected_yield: f64,
    pub price_per_ton: f64,
    pub area_ha: f64,
    /// expected_yield * price_per_ton * area_ha.
    pub sum_insured: f64,
    /// Mean season payout fraction before zone adjustment and loading.
    pub burn_cost: f64,
    pub zone: ZoneAdjustment,
    pub loading_factor: f64,
    /// burn_cost * zone.multiplier * (1 + loading_factor).
    pub premium_rate: f64,
    /// premium_rate * sum_insured.
    pub premium: f64,
    /// burn_cost * sum_insured.
    pub expected_payout: f64,
    /// expected_payout / premium; 0 when premium is 0.
    pub loss_ratio: f64,
    /// True for prospective quotes: an expected-value estimate, not a
    /// realized burn cost.
    pub expected_estimate: bool,
    pub years_used: Vec<i32>,
    /// Per-season audit breakdown (historical mode, and the per-year inputs
    /// behind a prospective quote).
    pub seasons: Vec<SeasonResult>,
    pub phase_expectations: Option<Vec<PhaseExpectation>>,
    pub narrative: Option<String>,
}

/// Field master data supplied by the external field store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldRecord {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub crop: Option<String>,
    #[serde(default)]
    pub area_ha: Option<f64>,
    #[serde(default)]
    pub planting_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    pub index: usize,
    pub request: QuoteRequest,
    pub error_kind: ErrorKind,
    pub message: String,
}

/// One positional slot in a bulk response: either a quote or the failure
/// that replaced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QuoteOutcome {
    Quote { quote: Box<QuoteResult> },
    Failure { failure: FailureRecord },
}

impl QuoteOutcome {
    pub fn as_quote(&self) -> Option<&QuoteResult> {
        match self {
            QuoteOutcome::Quote { quote } => Some(quote),
            QuoteOutcome::Failure { .. } => None,
        }
    }

    pub fn as_failure(&self) -> Option<&FailureRecord> {
        match self {
            QuoteOutcome::Quote { .. } => None,
            QuoteOutcome::Failure { failure } => Some(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn series_of(start: NaiveDate, values: &[f64]) -> Vec<DailyRain> {
        values
            .iter()
            .enumerate()
            .map(|(i, &mm)| DailyRain {
                date: start + chrono::Duration::days(i as i64),
                rainfall_mm: mm,
                filled: false,
            })
            .collect()
    }

    #[test]
    fn series_rejects_gaps() {
        let mut days = series_of(date(2020, 11, 1), &[1.0, 2.0, 3.0]);
        days[2].date = date(2020, 11, 5);
        assert!(RainfallSeries::from_days(days).is_err());
    }

    #[test]
    fn series_rejects_empty() {
        assert!(RainfallSeries::from_days(vec![]).is_err());
    }

    #[test]
    fn series_total_between_clamps() {
        let days = series_of(date(2020, 11, 1), &[1.0, 2.0, 3.0, 4.0]);
        let series = RainfallSeries::from_days(days).unwrap();
        assert_eq!(series.total_between(1, 3), 5.0);
        assert_eq!(series.total_between(2, 100), 7.0);
        assert_eq!(series.total_between(3, 3), 0.0);
    }

    #[test]
    fn observed_fraction_counts_filled_days() {
        let mut days = series_of(date(2020, 11, 1), &[1.0, 0.0, 3.0, 0.0]);
        days[1].filled = true;
        days[3].filled = true;
        let series = RainfallSeries::from_days(days).unwrap();
        assert!((series.observed_fraction() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn geometry_key_is_stable() {
        let a = Geometry::new(-18.123456789, 31.0);
        let b = Geometry::new(-18.1234569, 31.0);
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn quote_mode_round_trips_through_json() {
        let mode = QuoteMode::Prospective {
            target_year: 2026,
            percentile: Some(0.25),
        };
        let json = serde_json::to_string(&mode).unwrap();
        let back: QuoteMode = serde_json::from_str(&json).unwrap();
        assert_eq!(mode, back);
    }
}
