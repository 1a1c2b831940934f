use std::sync::Arc;

use chrono::{Datelike, NaiveDate};

use crate::config::engine::EngineConfig;
use crate::core::cache::{SeriesCache, SeriesKey};
use crate::core::crops::CropRegistry;
use crate::core::payout::{compute_season, phase_fraction};
use crate::core::planting::PlantingDetector;
use crate::core::series::{SeasonWindow, SeriesBuilder};
use crate::domain::model::{
    Crop, Geometry, PhaseExpectation, QuoteMode, QuoteRequest, QuoteResult, SeasonResult,
};
use crate::domain::ports::{NarrativeGenerator, RainfallProvider, ZoneLookup};
use crate::utils::error::{QuoteError, Result};
use crate::utils::validation::validate_positive;

/// Earliest season year the satellite rainfall archive covers.
const EARLIEST_SEASON_YEAR: i32 = 1982;
const LATEST_SEASON_YEAR: i32 = 2100;

/// Computes drought index insurance quotes for a single field. All state is
/// shared immutable (registry, config) or internally synchronized (series
/// cache), so one engine serves concurrent computations.
pub struct QuoteEngine<P> {
    provider: Arc<P>,
    registry: Arc<CropRegistry>,
    zones: Arc<dyn ZoneLookup>,
    narrative: Option<Arc<dyn NarrativeGenerator>>,
    config: EngineConfig,
    cache: Arc<SeriesCache>,
}

impl<P> Clone for QuoteEngine<P> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            registry: self.registry.clone(),
            zones: self.zones.clone(),
            narrative: self.narrative.clone(),
            config: self.config.clone(),
            cache: self.cache.clone(),
        }
    }
}

struct ValidatedRequest {
    geometry: Geometry,
    crop: Crop,
    expected_yield: f64,
    price_per_ton: f64,
    area_ha: f64,
}

impl<P: RainfallProvider> QuoteEngine<P> {
    pub fn new(
        provider: Arc<P>,
        registry: Arc<CropRegistry>,
        zones: Arc<dyn ZoneLookup>,
        config: EngineConfig,
    ) -> Self {
        Self {
            provider,
            registry,
            zones,
            narrative: None,
            config,
            cache: Arc::new(SeriesCache::new()),
        }
    }

    pub fn with_narrative(mut self, narrative: Arc<dyn NarrativeGenerator>) -> Self {
        self.narrative = Some(narrative);
        self
    }

    pub fn registry(&self) -> &CropRegistry {
        &self.registry
    }

    #[cfg(test)]
    pub(crate) fn provider_handle(&self) -> Arc<P> {
        self.provider.clone()
    }

    /// Dispatch on the request's mode; both arms produce the same
    /// `QuoteResult` shape so consumers never branch on mode.
    pub async fn quote(&self, request: &QuoteRequest) -> Result<QuoteResult> {
        match request.mode {
            QuoteMode::Historical { .. } => self.historical_quote(request).await,
            QuoteMode::Prospective { .. } => self.prospective_quote(request).await,
        }
    }

    /// Burn-cost quote: one realized `SeasonResult` per past year, premium
    /// rate from the mean payout fraction.
    pub async fn historical_quote(&self, request: &QuoteRequest) -> Result<QuoteResult> {
        let QuoteMode::Historical { year } = request.mode else {
            return Err(QuoteError::invalid_request(
                "historical_quote called with a prospective request",
            ));
        };
        let ctx = self.validate(request, year)?;

        let lookback = self.config.historical_years as i32;
        let first_year = year - (lookback - 1);
        let seasons = self
            .gather_seasons(ctx.geometry, &ctx.crop, first_year..=year, request.planting_date)
            .await?;
        self.require_history(&seasons)?;

        let burn_cost =
            seasons.iter().map(|s| s.total_fraction).sum::<f64>() / seasons.len() as f64;
        let mut result = self.finalize(request, &ctx, burn_cost, seasons, None, false);
        self.attach_narrative(&mut result).await;
        Ok(result)
    }

    /// Expected-value quote for a future season: the per-phase empirical
    /// rainfall statistic (mean, or a requested percentile) is fed through
    /// the same payout formula instead of a single realized year.
    pub async fn prospective_quote(&self, request: &QuoteRequest) -> Result<QuoteResult> {
        let QuoteMode::Prospective {
            target_year,
            percentile,
        } = request.mode
        else {
            return Err(QuoteError::invalid_request(
                "prospective_quote called with a historical request",
            ));
        };
        let ctx = self.validate(request, target_year)?;
        if let Some(p) = percentile {
            if !(p > 0.0 && p < 1.0) {
                return Err(QuoteError::invalid_request(format!(
                    "percentile must lie strictly between 0 and 1, got {p}"
                )));
            }
        }

        let lookback = self.config.historical_years as i32;
        let last_year = target_year - 1;
        let first_year = target_year - lookback;
        let seasons = self
            .gather_seasons(
                ctx.geometry,
                &ctx.crop,
                first_year..=last_year,
                request.planting_date,
            )
            .await?;
        self.require_history(&seasons)?;

        let mut expectations = Vec::with_capacity(ctx.crop.phases.len());
        let mut burn_cost = 0.0;
        for (idx, phase) in ctx.crop.phases.iter().enumerate() {
            let mut observed: Vec<f64> = seasons
                .iter()
                .map(|s| s.phases[idx].rainfall_mm)
                .collect();
            observed.sort_by(|a, b| a.total_cmp(b));
            let mean = observed.iter().sum::<f64>() / observed.len() as f64;
            let statistic = match percentile {
                Some(p) => empirical_percentile(&observed, p),
                None => mean,
            };
            let fraction = phase_fraction(statistic, phase.trigger_mm, phase.exit_mm);
            burn_cost += phase.weight * fraction;
            expectations.push(PhaseExpectation {
                phase: phase.name.clone(),
                weight: phase.weight,
                trigger_mm: phase.trigger_mm,
                exit_mm: phase.exit_mm,
                mean_rainfall_mm: mean,
                min_rainfall_mm: observed[0],
                max_rainfall_mm: observed[observed.len() - 1],
                statistic_mm: statistic,
                fraction,
            });
        }
        let burn_cost = burn_cost.min(1.0);

        let mut result = self.finalize(request, &ctx, burn_cost, seasons, Some(expectations), true);
        self.attach_narrative(&mut result).await;
        Ok(result)
    }

    /// Validation is purely local: it must reject bad requests before any
    /// external call is made.
    fn validate(&self, request: &QuoteRequest, year: i32) -> Result<ValidatedRequest> {
        let crop = self.registry.get(&request.crop)?.clone();

        let latitude = request.latitude.ok_or_else(|| {
            QuoteError::invalid_request("latitude is required (or a resolvable field_id)")
        })?;
        let longitude = request.longitude.ok_or_else(|| {
            QuoteError::invalid_request("longitude is required (or a resolvable field_id)")
        })?;
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(QuoteError::invalid_request(format!(
                "latitude {latitude} out of range [-90, 90]"
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(QuoteError::invalid_request(format!(
                "longitude {longitude} out of range [-180, 180]"
            )));
        }

        validate_positive("expected_yield", request.expected_yield)?;
        validate_positive("price_per_ton", request.price_per_ton)?;
        let area_ha = request
            .area_ha
            .ok_or_else(|| QuoteError::invalid_request("area_ha is required"))?;
        validate_positive("area_ha", area_ha)?;

        if !(EARLIEST_SEASON_YEAR..=LATEST_SEASON_YEAR).contains(&year) {
            return Err(QuoteError::invalid_request(format!(
                "season year {year} outside supported range \
                 [{EARLIEST_SEASON_YEAR}, {LATEST_SEASON_YEAR}]"
            )));
        }

        Ok(ValidatedRequest {
            geometry: Geometry::new(latitude, longitude),
            crop,
            expected_yield: request.expected_yield,
            price_per_ton: request.price_per_ton,
            area_ha,
        })
    }

    /// One `SeasonResult` per year; seasons lost to data problems are
    /// skipped with a warning, never aborting the whole quote. Validation
    /// errors still propagate.
    async fn gather_seasons(
        &self,
        geometry: Geometry,
        crop: &Crop,
        years: std::ops::RangeInclusive<i32>,
        explicit_planting: Option<NaiveDate>,
    ) -> Result<Vec<SeasonResult>> {
        let mut seasons = Vec::new();
        for year in years {
            match self
                .season_result(geometry, crop, year, explicit_planting)
                .await
            {
                Ok(season) => seasons.push(season),
                Err(e) if e.is_validation() => return Err(e),
                Err(e) => {
                    tracing::warn!(season_year = year, error = %e, "skipping season");
                }
            }
        }
        Ok(seasons)
    }

    async fn season_result(
        &self,
        geometry: Geometry,
        crop: &Crop,
        season_year: i32,
        explicit_planting: Option<NaiveDate>,
    ) -> Result<SeasonResult> {
        let window = SeasonWindow::for_season(season_year, crop.season_days)?;
        let key = SeriesKey {
            geometry: geometry.key(),
            start: window.start,
            end: window.end,
        };
        let builder = SeriesBuilder::new(self.config.min_coverage);
        let provider = self.provider.clone();
        let series = self
            .cache
            .get_or_fetch(key, || async move {
                builder
                    .build(provider.as_ref(), geometry, window.start, window.end)
                    .await
            })
            .await?;

        let detector = PlantingDetector::new(self.config.detection_window_days);
        let (planting_date, detected) = match detector.detect(&series, crop, season_year) {
            Ok(date) => (date, true),
            // No rainfall signal: fall back to the request's explicit date
            // when one was supplied.
            Err(QuoteError::NoPlantingSignal { .. }) if explicit_planting.is_some() => {
                let explicit = explicit_planting.ok_or(QuoteError::NoPlantingSignal {
                    year: season_year,
                })?;
                (planting_for_season(explicit, season_year)?, false)
            }
            Err(e) => return Err(e),
        };

        compute_season(&series, crop, planting_date, season_year, detected)
    }

    fn require_history(&self, seasons: &[SeasonResult]) -> Result<()> {
        if seasons.len() < self.config.min_valid_years {
            return Err(QuoteError::InsufficientHistory {
                valid: seasons.len(),
                required: self.config.min_valid_years,
            });
        }
        Ok(())
    }

    fn finalize(
        &self,
        request: &QuoteRequest,
        ctx: &ValidatedRequest,
        burn_cost: f64,
        seasons: Vec<SeasonResult>,
        phase_expectations: Option<Vec<PhaseExpectation>>,
        expected_estimate: bool,
    ) -> QuoteResult {
        let zone = self
            .zones
            .zone_for(ctx.geometry.latitude, ctx.geometry.longitude);
        let sum_insured = ctx.expected_yield * ctx.price_per_ton * ctx.area_ha;
        let premium_rate = burn_cost * zone.multiplier * (1.0 + self.config.loading_factor);
        let premium = premium_rate * sum_insured;
        let expected_payout = burn_cost * sum_insured;
        let loss_ratio = if premium > 0.0 {
            expected_payout / premium
        } else {
            0.0
        };
        let years_used = seasons.iter().map(|s| s.season_year).collect();

        QuoteResult {
            mode: request.mode,
            crop: ctx.crop.name.clone(),
            field_id: request.field_id,
            expected_yield: ctx.expected_yield,
            price_per_ton: ctx.price_per_ton,
            area_ha: ctx.area_ha,
            sum_insured,
            burn_cost,
            zone,
            loading_factor: self.config.loading_factor,
            premium_rate,
            premium,
            expected_payout,
            loss_ratio,
            expected_estimate,
            years_used,
            seasons,
            phase_expectations,
            narrative: None,
        }
    }

    /// Narrative generation is best-effort: its failure never invalidates
    /// the quote.
    async fn attach_narrative(&self, result: &mut QuoteResult) {
        if let Some(generator) = &self.narrative {
            match generator.summarize(result).await {
                Ok(text) => result.narrative = Some(text),
                Err(e) => {
                    tracing::warn!(error = %e, "narrative generation failed, continuing without")
                }
            }
        }
    }
}

/// Reuse an explicit planting date's month/day in the given season year.
/// Months before August belong to the second calendar year of the season.
/// Feb 29 clamps to Feb 28 in non-leap season years.
fn planting_for_season(explicit: NaiveDate, season_year: i32) -> Result<NaiveDate> {
    let year = if explicit.month() >= 8 {
        season_year
    } else {
        season_year + 1
    };
    NaiveDate::from_ymd_opt(year, explicit.month(), explicit.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, 2, 28))
        .ok_or_else(|| {
            QuoteError::invalid_request(format!(
                "planting date {}-{:02} does not exist in season {season_year}",
                explicit.month(),
                explicit.day()
            ))
        })
}

/// Linear-interpolated empirical percentile over a sorted sample.
fn empirical_percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
