use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;

use crate::domain::model::{QuoteMode, QuoteRequest};
use crate::utils::error::{QuoteError, Result};

/// Drought index insurance quotes from satellite rainfall history.
#[derive(Parser, Debug, Clone)]
#[command(name = "agri-quote", version, about)]
pub struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Rainfall provider endpoint, overrides the config file.
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// JSON file with an array of quote requests (bulk mode).
    #[arg(long, value_name = "FILE", conflicts_with_all = ["crop", "lat", "lon"])]
    pub requests: Option<PathBuf>,

    /// JSON file with field master data for field_id resolution.
    #[arg(long, value_name = "FILE")]
    pub fields: Option<PathBuf>,

    /// Crop to quote (single-request mode).
    #[arg(long)]
    pub crop: Option<String>,

    /// Field latitude in decimal degrees.
    #[arg(long, allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Field longitude in decimal degrees.
    #[arg(long, allow_hyphen_values = true)]
    pub lon: Option<f64>,

    /// Expected yield in tons per hectare.
    #[arg(long, value_name = "T_PER_HA")]
    pub expected_yield: Option<f64>,

    /// Commodity price in currency per ton.
    #[arg(long, value_name = "PRICE")]
    pub price_per_ton: Option<f64>,

    /// Field area in hectares.
    #[arg(long, value_name = "HA")]
    pub area_ha: Option<f64>,

    /// Season year (historical mode) or target year (with --prospective).
    #[arg(long)]
    pub year: Option<i32>,

    /// Quote a future season from the historical rainfall distribution.
    #[arg(long)]
    pub prospective: bool,

    /// Price a rainfall quantile instead of the mean (prospective only).
    #[arg(long, value_name = "P", requires = "prospective")]
    pub percentile: Option<f64>,

    /// Fallback planting date (YYYY-MM-DD) for seasons without a signal.
    #[arg(long, value_name = "DATE")]
    pub planting_date: Option<NaiveDate>,

    /// Verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Assemble a single quote request from the flags. Bulk mode
    /// (`--requests`) is handled by the caller instead.
    pub fn single_request(&self) -> Result<QuoteRequest> {
        let crop = self
            .crop
            .clone()
            .ok_or_else(|| QuoteError::invalid_request("--crop is required"))?;
        let year = self
            .year
            .ok_or_else(|| QuoteError::invalid_request("--year is required"))?;
        let expected_yield = self
            .expected_yield
            .ok_or_else(|| QuoteError::invalid_request("--expected-yield is required"))?;
        let price_per_ton = self
            .price_per_ton
            .ok_or_else(|| QuoteError::invalid_request("--price-per-ton is required"))?;

        let mode = if self.prospective {
            QuoteMode::Prospective {
                target_year: year,
                percentile: self.percentile,
            }
        } else {
            QuoteMode::Historical { year }
        };

        Ok(QuoteRequest {
            crop,
            field_id: None,
            latitude: self.lat,
            longitude: self.lon,
            expected_yield,
            price_per_ton,
            area_ha: self.area_ha,
            mode,
            planting_date: self.planting_date,
        })
    }
}
