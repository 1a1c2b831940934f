use crate::utils::error::{QuoteError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(QuoteError::Config {
            field: field_name.to_string(),
            message: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(QuoteError::Config {
                field: field_name.to_string(),
                message: format!("unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(QuoteError::Config {
            field: field_name.to_string(),
            message: format!("invalid URL format: {}", e),
        }),
    }
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(QuoteError::Config {
            field: field_name.to_string(),
            message: format!("value {} must be between {} and {}", value, min, max),
        });
    }
    Ok(())
}

pub fn validate_positive(field_name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(QuoteError::invalid_request(format!(
            "field '{}' must be a positive number, got {}",
            field_name, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("provider.endpoint", "https://example.com").is_ok());
        assert!(validate_url("provider.endpoint", "http://example.com").is_ok());
        assert!(validate_url("provider.endpoint", "").is_err());
        assert!(validate_url("provider.endpoint", "invalid-url").is_err());
        assert!(validate_url("provider.endpoint", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("latitude", -18.5, -90.0, 90.0).is_ok());
        assert!(validate_range("latitude", 95.0, -90.0, 90.0).is_err());
    }

    #[test]
    fn test_validate_positive() {
        assert!(validate_positive("area_ha", 2.5).is_ok());
        assert!(validate_positive("area_ha", 0.0).is_err());
        assert!(validate_positive("area_ha", -1.0).is_err());
        assert!(validate_positive("area_ha", f64::NAN).is_err());
    }
}
