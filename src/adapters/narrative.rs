use async_trait::async_trait;

use crate::domain::model::{QuoteMode, QuoteResult};
use crate::domain::ports::NarrativeGenerator;
use crate::utils::error::Result;

/// Deterministic plain-text summary of a quote. Stands in for an external
/// text-generation service; same quote, same sentence.
pub struct TemplateNarrative;

#[async_trait]
impl NarrativeGenerator for TemplateNarrative {
    async fn summarize(&self, quote: &QuoteResult) -> Result<String> {
        let basis = match quote.mode {
            QuoteMode::Historical { year } => {
                format!("realized rainfall through the {year} season")
            }
            QuoteMode::Prospective {
                target_year,
                percentile: Some(p),
            } => format!(
                "the {}-percentile rainfall scenario for the {target_year} season",
                ordinal((p * 100.0).round() as u32)
            ),
            QuoteMode::Prospective { target_year, .. } => {
                format!("expected rainfall for the {target_year} season")
            }
        };
        let driest = quote
            .seasons
            .iter()
            .max_by(|a, b| a.total_fraction.total_cmp(&b.total_fraction));
        let mut text = format!(
            "{} cover priced from {} over {} seasons in zone {}: \
             burn cost {:.2}% of sum insured, premium rate {:.2}%.",
            quote.crop,
            basis,
            quote.years_used.len(),
            quote.zone.zone,
            quote.burn_cost * 100.0,
            quote.premium_rate * 100.0,
        );
        if let Some(season) = driest.filter(|s| s.total_fraction > 0.0) {
            text.push_str(&format!(
                " Worst season on record: {} at a {:.0}% payout.",
                season.season_year,
                season.total_fraction * 100.0
            ));
        }
        Ok(text)
    }
}

fn ordinal(n: u32) -> String {
    let suffix = match n % 100 {
        11..=13 => "th",
        _ => match n % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        },
    };
    format!("{n}{suffix}")
}
