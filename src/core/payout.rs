use chrono::NaiveDate;

use crate::domain::model::{Crop, PhaseResult, RainfallSeries, SeasonResult};
use crate::utils::error::{QuoteError, Result};

/// Payout fraction for one phase given its cumulative rainfall.
///
/// - rainfall >= trigger: 0 (no deficit)
/// - rainfall <= exit: 1 (maximal payout)
/// - otherwise: linear interpolation between the two, clamped to [0, 1]
pub fn phase_fraction(rainfall_mm: f64, trigger_mm: f64, exit_mm: f64) -> f64 {
    if rainfall_mm >= trigger_mm {
        0.0
    } else if rainfall_mm <= exit_mm {
        1.0
    } else {
        ((trigger_mm - rainfall_mm) / (trigger_mm - exit_mm)).clamp(0.0, 1.0)
    }
}

/// Maps one season's rainfall to per-phase payout fractions and the weighted
/// season total. Phases are insurance layers on the same sum insured, not
/// additive separate policies, so the total is capped at 1.0.
pub fn compute_season(
    series: &RainfallSeries,
    crop: &Crop,
    planting_date: NaiveDate,
    season_year: i32,
    planting_detected: bool,
) -> Result<SeasonResult> {
    let offset = (planting_date - series.start_date()).num_days();
    if offset < 0 {
        return Err(QuoteError::data_unavailable(format!(
            "planting date {planting_date} precedes series start {}",
            series.start_date()
        )));
    }
    let offset = offset as usize;
    if offset + crop.season_days as usize > series.len() {
        return Err(QuoteError::data_unavailable(format!(
            "series ends before the {} season planted on {planting_date} completes",
            crop.name
        )));
    }

    let mut phases = Vec::with_capacity(crop.phases.len());
    let mut total = 0.0;
    for phase in &crop.phases {
        let from = offset + phase.start_day as usize;
        let to = offset + phase.end_day as usize;
        let rainfall_mm = series.total_between(from, to);
        let fraction = phase_fraction(rainfall_mm, phase.trigger_mm, phase.exit_mm);
        total += phase.weight * fraction;
        phases.push(PhaseResult {
            phase: phase.name.clone(),
            start_day: phase.start_day,
            end_day: phase.end_day,
            weight: phase.weight,
            trigger_mm: phase.trigger_mm,
            exit_mm: phase.exit_mm,
            rainfall_mm,
            fraction,
        });
    }

    Ok(SeasonResult {
        season_year,
        planting_date,
        planting_detected,
        phases,
        total_fraction: total.min(1.0),
    })
}
