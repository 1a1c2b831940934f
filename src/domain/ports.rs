use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::model::{DailyRain, FieldRecord, Geometry, QuoteResult, ZoneAdjustment};
use crate::utils::error::Result;

/// External satellite rainfall provider. May be slow (seconds) and may fail
/// transiently; adapters own retry and timeout policy. Rows may be sparse —
/// the series adapter fills gaps, never this port.
#[async_trait]
pub trait RainfallProvider: Send + Sync {
    async fn fetch_rainfall(
        &self,
        geometry: Geometry,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyRain>>;
}

/// Read-only field master data keyed by field identifier.
#[async_trait]
pub trait FieldStore: Send + Sync {
    async fn field(&self, id: u64) -> Result<Option<FieldRecord>>;
}

/// Pure lookup of the agro-ecological zone multiplier for a location.
pub trait ZoneLookup: Send + Sync {
    fn zone_for(&self, latitude: f64, longitude: f64) -> ZoneAdjustment;
}

/// Free-text summary of a finished quote. Absence or failure is non-fatal:
/// a quote is valid without a narrative.
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    async fn summarize(&self, quote: &QuoteResult) -> Result<String>;
}
