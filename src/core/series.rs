use std::collections::HashMap;

use chrono::{Duration, NaiveDate};

use crate::domain::model::{DailyRain, Geometry, RainfallSeries};
use crate::domain::ports::RainfallProvider;
use crate::utils::error::{QuoteError, Result};

/// The window of dates one season's computation needs: from the earliest
/// plausible planting date (Nov 1 of the season year, southern-hemisphere
/// summer season) through the end of a season planted on the latest
/// plausible date (Jan 31 of the following year). Half-open `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SeasonWindow {
    pub fn for_season(season_year: i32, season_days: u32) -> Result<Self> {
        let start = ymd(season_year, 11, 1)?;
        let latest_planting = ymd(season_year + 1, 1, 31)?;
        let end = latest_planting + Duration::days(1 + i64::from(season_days));
        Ok(Self { start, end })
    }

    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

fn ymd(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        QuoteError::invalid_request(format!("invalid date {year}-{month:02}-{day:02}"))
    })
}

/// Normalizes a raw provider time series into exactly one entry per day of
/// the requested window. Missing days are filled with 0 mm and flagged —
/// never dropped, since dropping shifts phase boundaries.
#[derive(Debug, Clone, Copy)]
pub struct SeriesBuilder {
    /// Minimum share of days that must carry a real observation.
    min_coverage: f64,
}

impl SeriesBuilder {
    pub fn new(min_coverage: f64) -> Self {
        Self { min_coverage }
    }

    pub async fn build<P>(
        &self,
        provider: &P,
        geometry: Geometry,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RainfallSeries>
    where
        P: RainfallProvider + ?Sized,
    {
        if start >= end {
            return Err(QuoteError::invalid_request(format!(
                "series window start {start} not before end {end}"
            )));
        }

        let rows = provider.fetch_rainfall(geometry, start, end).await?;

        // First observation wins on duplicate dates; rows outside the window
        // are ignored.
        let mut by_date: HashMap<NaiveDate, f64> = HashMap::with_capacity(rows.len());
        for row in rows {
            if row.date < start || row.date >= end {
                continue;
            }
            by_date.entry(row.date).or_insert(row.rainfall_mm.max(0.0));
        }

        let num_days = (end - start).num_days() as usize;
        let mut days = Vec::with_capacity(num_days);
        let mut filled = 0usize;
        for offset in 0..num_days {
            let date = start + Duration::days(offset as i64);
            match by_date.get(&date) {
                Some(&mm) => days.push(DailyRain {
                    date,
                    rainfall_mm: mm,
                    filled: false,
                }),
                None => {
                    filled += 1;
                    days.push(DailyRain {
                        date,
                        rainfall_mm: 0.0,
                        filled: true,
                    });
                }
            }
        }

        let observed = num_days - filled;
        let coverage = observed as f64 / num_days as f64;
        if coverage < self.min_coverage {
            return Err(QuoteError::DataUnavailable {
                message: format!(
                    "only {observed}/{num_days} days observed for {start}..{end} \
                     ({:.0}% coverage, {:.0}% required)",
                    coverage * 100.0,
                    self.min_coverage * 100.0
                ),
            });
        }
        if filled > 0 {
            tracing::debug!(
                %start, %end, filled,
                "filled {filled} missing provider days with 0 mm"
            );
        }

        RainfallSeries::from_days(days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StubProvider {
        rows: Vec<DailyRain>,
    }

    #[async_trait]
    impl RainfallProvider for StubProvider {
        async fn fetch_rainfall(
            &self,
            _geometry: Geometry,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<DailyRain>> {
            Ok(self.rows.clone())
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(d: NaiveDate, mm: f64) -> DailyRain {
        DailyRain {
            date: d,
            rainfall_mm: mm,
            filled: false,
        }
    }

    fn geometry() -> Geometry {
        Geometry::new(-18.0, 31.0)
    }

    #[tokio::test]
    async fn builds_exactly_one_entry_per_day() {
        let start = date(2020, 11, 1);
        let rows: Vec<DailyRain> = (0..10)
            .map(|i| row(start + Duration::days(i), 2.0))
            .collect();
        let builder = SeriesBuilder::new(0.9);
        let series = builder
            .build(&StubProvider { rows }, geometry(), start, date(2020, 11, 11))
            .await
            .unwrap();
        assert_eq!(series.len(), 10);
        assert_eq!(series.start_date(), start);
    }

    #[tokio::test]
    async fn missing_days_are_filled_and_flagged() {
        let start = date(2020, 11, 1);
        // 9 of 10 days present: day 5 missing.
        let rows: Vec<DailyRain> = (0..10)
            .filter(|&i| i != 5)
            .map(|i| row(start + Duration::days(i), 3.0))
            .collect();
        let builder = SeriesBuilder::new(0.9);
        let series = builder
            .build(&StubProvider { rows }, geometry(), start, date(2020, 11, 11))
            .await
            .unwrap();
        assert_eq!(series.len(), 10);
        let day5 = &series.days()[5];
        assert!(day5.filled);
        assert_eq!(day5.rainfall_mm, 0.0);
        assert!(!series.days()[4].filled);
    }

    #[tokio::test]
    async fn sparse_series_is_rejected() {
        let start = date(2020, 11, 1);
        // Only 5 of 10 days present: below the 90% floor.
        let rows: Vec<DailyRain> = (0..5)
            .map(|i| row(start + Duration::days(i), 3.0))
            .collect();
        let builder = SeriesBuilder::new(0.9);
        let err = builder
            .build(&StubProvider { rows }, geometry(), start, date(2020, 11, 11))
            .await
            .unwrap_err();
        assert!(matches!(err, QuoteError::DataUnavailable { .. }));
    }

    #[tokio::test]
    async fn rows_outside_window_are_ignored_and_duplicates_keep_first() {
        let start = date(2020, 11, 1);
        let mut rows: Vec<DailyRain> = (0..10)
            .map(|i| row(start + Duration::days(i), 1.0))
            .collect();
        rows.push(row(date(2020, 10, 31), 99.0));
        rows.push(row(date(2020, 11, 11), 99.0));
        rows.push(row(start, 42.0)); // duplicate of day 0, must lose
        let builder = SeriesBuilder::new(0.9);
        let series = builder
            .build(&StubProvider { rows }, geometry(), start, date(2020, 11, 11))
            .await
            .unwrap();
        assert_eq!(series.len(), 10);
        assert_eq!(series.days()[0].rainfall_mm, 1.0);
        assert_eq!(series.total_between(0, 10), 10.0);
    }

    #[test]
    fn season_window_spans_planting_range_plus_season() {
        let window = SeasonWindow::for_season(2020, 120).unwrap();
        assert_eq!(window.start, date(2020, 11, 1));
        // Nov(30) + Dec(31) + Jan(31) = 92 days of planting range, then a
        // full season after the latest planting date.
        assert_eq!(window.num_days(), 92 + 120);
    }
}
