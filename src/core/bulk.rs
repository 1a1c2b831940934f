use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::core::quote::QuoteEngine;
use crate::domain::model::{FailureRecord, QuoteOutcome, QuoteRequest};
use crate::domain::ports::{FieldStore, RainfallProvider};
use crate::utils::error::{ErrorKind, QuoteError, Result};

/// Fans a batch of quote requests out over a bounded number of concurrent
/// workers. Results come back in request order; a failed request yields a
/// `FailureRecord` in its slot and never aborts the batch.
pub struct BulkOrchestrator<P> {
    engine: QuoteEngine<P>,
    fields: Option<Arc<dyn FieldStore>>,
    max_concurrent: usize,
}

impl<P: RainfallProvider + 'static> BulkOrchestrator<P> {
    pub fn new(engine: QuoteEngine<P>, max_concurrent: usize) -> Self {
        Self {
            engine,
            fields: None,
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn with_field_store(mut self, fields: Arc<dyn FieldStore>) -> Self {
        self.fields = Some(fields);
        self
    }

    pub async fn run(&self, requests: Vec<QuoteRequest>) -> Vec<QuoteOutcome> {
        let total = requests.len();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut join_set = JoinSet::new();
        let mut in_flight: HashMap<tokio::task::Id, (usize, QuoteRequest)> = HashMap::new();

        for (index, request) in requests.into_iter().enumerate() {
            let engine = self.engine.clone();
            let fields = self.fields.clone();
            let semaphore = semaphore.clone();
            let task_request = request.clone();
            let handle = join_set.spawn(async move {
                // The semaphore is never closed while tasks run, so a
                // failed acquire only means running unbounded.
                let _permit = semaphore.acquire_owned().await.ok();
                let outcome = process(&engine, fields.as_deref(), index, task_request).await;
                (index, outcome)
            });
            in_flight.insert(handle.id(), (index, request));
        }

        let mut slots: Vec<Option<QuoteOutcome>> = (0..total).map(|_| None).collect();
        while let Some(joined) = join_set.join_next_with_id().await {
            match joined {
                Ok((id, (index, outcome))) => {
                    in_flight.remove(&id);
                    slots[index] = Some(outcome);
                }
                Err(e) => {
                    // A panicked worker still has to fill its slot, or every
                    // later outcome would shift position.
                    tracing::error!(error = %e, "bulk quote task failed");
                    if let Some((index, request)) = in_flight.remove(&e.id()) {
                        slots[index] = Some(QuoteOutcome::Failure {
                            failure: FailureRecord {
                                index,
                                request,
                                error_kind: ErrorKind::Internal,
                                message: e.to_string(),
                            },
                        });
                    }
                }
            }
        }

        slots.into_iter().flatten().collect()
    }
}

async fn process<P: RainfallProvider>(
    engine: &QuoteEngine<P>,
    fields: Option<&dyn FieldStore>,
    index: usize,
    request: QuoteRequest,
) -> QuoteOutcome {
    let original = request.clone();
    let result = resolve_and_quote(engine, fields, request).await;
    match result {
        Ok(quote) => QuoteOutcome::Quote {
            quote: Box::new(quote),
        },
        Err(e) => {
            tracing::warn!(index, error = %e, "quote request failed");
            QuoteOutcome::Failure {
                failure: FailureRecord {
                    index,
                    request: original,
                    error_kind: e.kind(),
                    message: e.to_string(),
                },
            }
        }
    }
}

async fn resolve_and_quote<P: RainfallProvider>(
    engine: &QuoteEngine<P>,
    fields: Option<&dyn FieldStore>,
    mut request: QuoteRequest,
) -> Result<crate::domain::model::QuoteResult> {
    if let Some(field_id) = request.field_id {
        let store = fields.ok_or_else(|| {
            QuoteError::invalid_request(format!(
                "request references field {field_id} but no field store is configured"
            ))
        })?;
        let record = store
            .field(field_id)
            .await?
            .ok_or_else(|| QuoteError::invalid_request(format!("unknown field {field_id}")))?;
        // Explicit request values always win over field master data.
        if request.latitude.is_none() {
            request.latitude = Some(record.latitude);
        }
        if request.longitude.is_none() {
            request.longitude = Some(record.longitude);
        }
        if request.crop.trim().is_empty() {
            if let Some(crop) = record.crop {
                request.crop = crop;
            }
        }
        if request.area_ha.is_none() {
            request.area_ha = record.area_ha;
        }
        if request.planting_date.is_none() {
            request.planting_date = record.planting_date;
        }
    }
    engine.quote(&request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::engine::EngineConfig;
    use crate::core::crops::CropRegistry;
    use crate::domain::model::{
        DailyRain, FieldRecord, Geometry, QuoteMode, ZoneAdjustment,
    };
    use crate::domain::ports::ZoneLookup;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct WetProvider {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl WetProvider {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl crate::domain::ports::RainfallProvider for WetProvider {
        async fn fetch_rainfall(
            &self,
            _geometry: Geometry,
            start: NaiveDate,
            end: NaiveDate,
        ) -> crate::utils::error::Result<Vec<DailyRain>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            let num_days = (end - start).num_days();
            Ok((0..num_days)
                .map(|i| DailyRain {
                    date: start + chrono::Duration::days(i),
                    rainfall_mm: 5.0,
                    filled: false,
                })
                .collect())
        }
    }

    struct FlatZone;

    impl ZoneLookup for FlatZone {
        fn zone_for(&self, _latitude: f64, _longitude: f64) -> ZoneAdjustment {
            ZoneAdjustment::standard()
        }
    }

    struct OneFieldStore {
        record: FieldRecord,
    }

    #[async_trait]
    impl FieldStore for OneFieldStore {
        async fn field(&self, id: u64) -> crate::utils::error::Result<Option<FieldRecord>> {
            Ok((id == self.record.id).then(|| self.record.clone()))
        }
    }

    fn engine() -> QuoteEngine<WetProvider> {
        QuoteEngine::new(
            Arc::new(WetProvider::new()),
            Arc::new(CropRegistry::new().unwrap()),
            Arc::new(FlatZone),
            EngineConfig::default(),
        )
    }

    fn request(crop: &str, lat: f64) -> QuoteRequest {
        QuoteRequest {
            crop: crop.to_string(),
            field_id: None,
            latitude: Some(lat),
            longitude: Some(31.5),
            expected_yield: 5.0,
            price_per_ton: 280.0,
            area_ha: Some(10.0),
            mode: QuoteMode::Historical { year: 2020 },
            planting_date: None,
        }
    }

    #[tokio::test]
    async fn preserves_request_order_and_isolates_failures() {
        let orchestrator = BulkOrchestrator::new(engine(), 4);
        let requests = vec![
            request("maize", -18.1),
            request("quinoa", -18.2),
            request("sorghum", -18.3),
        ];
        let outcomes = orchestrator.run(requests).await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].as_quote().is_some());
        assert!(outcomes[2].as_quote().is_some());
        let failure = outcomes[1].as_failure().unwrap();
        assert_eq!(failure.index, 1);
        assert_eq!(failure.error_kind, ErrorKind::UnknownCrop);
        assert_eq!(failure.request.crop, "quinoa");
    }

    #[tokio::test]
    async fn concurrency_stays_within_the_bound() {
        let engine = engine();
        let provider = engine.provider_handle();
        let orchestrator = BulkOrchestrator::new(engine, 2);
        let requests: Vec<_> = (0..6)
            .map(|i| request("maize", -18.0 - i as f64 * 0.1))
            .collect();
        let outcomes = orchestrator.run(requests).await;
        assert!(outcomes.iter().all(|o| o.as_quote().is_some()));
        assert!(provider.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn resolves_field_master_data() {
        let store = OneFieldStore {
            record: FieldRecord {
                id: 42,
                name: Some("Mhangura block A".to_string()),
                latitude: -17.4,
                longitude: 30.1,
                crop: Some("maize".to_string()),
                area_ha: Some(25.0),
                planting_date: None,
            },
        };
        let orchestrator =
            BulkOrchestrator::new(engine(), 4).with_field_store(Arc::new(store));

        let mut by_field = request("", 0.0);
        by_field.field_id = Some(42);
        by_field.latitude = None;
        by_field.longitude = None;
        by_field.area_ha = None;

        let mut unknown = by_field.clone();
        unknown.field_id = Some(7);

        let outcomes = orchestrator.run(vec![by_field, unknown]).await;
        let quote = outcomes[0].as_quote().unwrap();
        assert_eq!(quote.crop, "maize");
        assert_eq!(quote.area_ha, 25.0);
        assert_eq!(quote.field_id, Some(42));

        let failure = outcomes[1].as_failure().unwrap();
        assert_eq!(failure.error_kind, ErrorKind::InvalidRequest);
        assert!(failure.message.contains("unknown field 7"));
    }

    #[tokio::test]
    async fn field_id_without_a_store_fails_that_slot_only() {
        let orchestrator = BulkOrchestrator::new(engine(), 4);
        let mut by_field = request("maize", -18.0);
        by_field.field_id = Some(1);
        let outcomes = orchestrator.run(vec![by_field, request("maize", -18.5)]).await;
        assert_eq!(
            outcomes[0].as_failure().unwrap().error_kind,
            ErrorKind::InvalidRequest
        );
        assert!(outcomes[1].as_quote().is_some());
    }

    #[tokio::test]
    async fn empty_batch_yields_empty_results() {
        let orchestrator = BulkOrchestrator::new(engine(), 4);
        assert!(orchestrator.run(Vec::new()).await.is_empty());
    }
}
