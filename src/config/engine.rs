use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::utils::error::{QuoteError, Result};
use crate::utils::validation::{validate_range, validate_url, Validate};

/// Tunables of the quote computation itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum valid seasons a burn cost may be computed from.
    pub min_valid_years: usize,
    /// Lookback length for historical and prospective aggregation.
    pub historical_years: u32,
    /// Minimum share of really-observed days per rainfall series.
    pub min_coverage: f64,
    /// Planting-detection window length W in days.
    pub detection_window_days: u32,
    /// Premium loading on top of the zone-adjusted burn cost.
    pub loading_factor: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_valid_years: 5,
            historical_years: 10,
            min_coverage: 0.9,
            detection_window_days: 10,
            loading_factor: 0.15,
        }
    }
}

impl Validate for EngineConfig {
    fn validate(&self) -> Result<()> {
        if self.min_valid_years == 0 {
            return Err(QuoteError::Config {
                field: "engine.min_valid_years".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if u32::try_from(self.min_valid_years).map_or(true, |n| n > self.historical_years) {
            return Err(QuoteError::Config {
                field: "engine.min_valid_years".to_string(),
                message: format!(
                    "cannot exceed historical_years ({})",
                    self.historical_years
                ),
            });
        }
        validate_range("engine.min_coverage", self.min_coverage, 0.0, 1.0)?;
        validate_range("engine.detection_window_days", self.detection_window_days, 1, 60)?;
        validate_range("engine.loading_factor", self.loading_factor, 0.0, 5.0)?;
        Ok(())
    }
}

/// External rainfall provider transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub endpoint: String,
    /// Per-request timeout on the external fetch.
    pub timeout_seconds: u64,
    /// Bounded retries for transient errors only.
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080/rainfall".to_string(),
            timeout_seconds: 30,
            retry_attempts: 2,
            retry_delay_ms: 500,
        }
    }
}

impl Validate for ProviderConfig {
    fn validate(&self) -> Result<()> {
        validate_url("provider.endpoint", &self.endpoint)?;
        validate_range("provider.timeout_seconds", self.timeout_seconds, 1, 600)?;
        validate_range("provider.retry_attempts", self.retry_attempts, 0, 10)?;
        Ok(())
    }
}

/// Bulk orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkConfig {
    pub max_concurrent: usize,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self { max_concurrent: 4 }
    }
}

impl Validate for BulkConfig {
    fn validate(&self) -> Result<()> {
        validate_range("bulk.max_concurrent", self.max_concurrent, 1, 256)?;
        Ok(())
    }
}

/// Full application configuration, loadable from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub provider: ProviderConfig,
    pub bulk: BulkConfig,
}

impl AppConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| QuoteError::Config {
            field: "toml".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        self.provider.validate()?;
        self.bulk.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.engine.min_valid_years, 5);
        assert_eq!(config.engine.historical_years, 10);
        assert_eq!(config.bulk.max_concurrent, 4);
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let toml_content = r#"
[engine]
loading_factor = 0.25

[provider]
endpoint = "https://rain.example.com/v1/daily"
retry_attempts = 1
"#;
        let config = AppConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.engine.loading_factor, 0.25);
        assert_eq!(config.engine.min_valid_years, 5);
        assert_eq!(config.provider.endpoint, "https://rain.example.com/v1/daily");
        assert_eq!(config.provider.retry_attempts, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_endpoint() {
        let mut config = AppConfig::default();
        config.provider.endpoint = "not-a-url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_min_years_above_lookback() {
        let mut config = AppConfig::default();
        config.engine.min_valid_years = 12;
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[bulk]\nmax_concurrent = 8\n")
            .unwrap();
        let config = AppConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.bulk.max_concurrent, 8);
    }
}
