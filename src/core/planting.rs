use chrono::NaiveDate;

use crate::domain::model::{Crop, RainfallSeries};
use crate::utils::error::{QuoteError, Result};

/// Locates the season start from rainfall when no explicit planting date is
/// supplied. Scanning is strictly left-to-right and the first qualifying
/// window wins, so identical input always yields the identical date.
#[derive(Debug, Clone, Copy)]
pub struct PlantingDetector {
    window_days: u32,
}

impl PlantingDetector {
    pub fn new(window_days: u32) -> Self {
        Self { window_days }
    }

    /// First day whose following `window_days` of cumulative rainfall exceed
    /// the crop's germination threshold, such that a full season still fits
    /// in the series. `NoPlantingSignal` otherwise; the caller may fall back
    /// to an explicit planting date.
    pub fn detect(
        &self,
        series: &RainfallSeries,
        crop: &Crop,
        season_year: i32,
    ) -> Result<NaiveDate> {
        let season_days = crop.season_days as usize;
        let window = self.window_days as usize;
        if series.len() < season_days {
            return Err(QuoteError::NoPlantingSignal { year: season_year });
        }

        let last_candidate = series.len() - season_days;
        for i in 0..=last_candidate {
            let window_total = series.total_between(i, i + window);
            if window_total > crop.germination_mm {
                let date = series
                    .date_at(i)
                    .ok_or(QuoteError::NoPlantingSignal { year: season_year })?;
                tracing::debug!(
                    season_year,
                    crop = %crop.name,
                    %date,
                    window_total,
                    "planting signal detected"
                );
                return Ok(date);
            }
        }

        Err(QuoteError::NoPlantingSignal { year: season_year })
    }
}
