use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::config::engine::ProviderConfig;
use crate::domain::model::{DailyRain, Geometry};
use crate::domain::ports::RainfallProvider;
use crate::utils::error::{QuoteError, Result};

/// One daily observation as the rainfall service returns it. Days without an
/// observation are simply absent from the response.
#[derive(Debug, Deserialize)]
struct RainRow {
    date: NaiveDate,
    rainfall_mm: f64,
}

/// HTTP client for the CHIRPS-backed daily rainfall service. Retries
/// transient failures (connect, timeout, 5xx) with a linear backoff; client
/// errors are final.
pub struct ChirpsClient {
    client: Client,
    endpoint: String,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl ChirpsClient {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            retry_attempts: config.retry_attempts,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    async fn fetch_once(
        &self,
        geometry: Geometry,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyRain>> {
        tracing::debug!(endpoint = %self.endpoint, %start, %end, "requesting rainfall");
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("lat", geometry.latitude.to_string()),
                ("lng", geometry.longitude.to_string()),
                ("start", start.to_string()),
                ("end", end.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        tracing::debug!(%status, "rainfall response");
        if status.is_client_error() {
            return Err(QuoteError::data_unavailable(format!(
                "rainfall service rejected the request: {status}"
            )));
        }
        let response = response.error_for_status()?;
        let rows: Vec<RainRow> = response.json().await?;
        Ok(rows
            .into_iter()
            .map(|row| DailyRain {
                date: row.date,
                rainfall_mm: row.rainfall_mm,
                filled: false,
            })
            .collect())
    }
}

fn is_transient(error: &QuoteError) -> bool {
    match error {
        QuoteError::Provider(e) => {
            e.is_connect()
                || e.is_timeout()
                || e.status().is_some_and(|s: StatusCode| s.is_server_error())
        }
        _ => false,
    }
}

#[async_trait]
impl RainfallProvider for ChirpsClient {
    async fn fetch_rainfall(
        &self,
        geometry: Geometry,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyRain>> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(geometry, start, end).await {
                Ok(rows) => return Ok(rows),
                Err(e) if is_transient(&e) => {
                    if attempt >= self.retry_attempts {
                        // A transient failure that survives every retry is a
                        // data outage for this window, not a caller problem.
                        return Err(QuoteError::data_unavailable(format!(
                            "rainfall provider failed after {} attempts: {e}",
                            attempt + 1
                        )));
                    }
                    attempt += 1;
                    let delay = self.retry_delay * attempt;
                    tracing::warn!(
                        attempt,
                        max = self.retry_attempts,
                        error = %e,
                        "transient rainfall fetch failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
