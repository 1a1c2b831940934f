use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::{Mutex, OnceCell};

use crate::domain::model::RainfallSeries;
use crate::utils::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    pub geometry: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Memoizes rainfall series within a batch, keyed by geometry and window.
/// At most one fetch is in flight per key: a second concurrent requester
/// waits on the same cell instead of issuing a duplicate external call.
/// Failed fetches are not cached, so a later requester retries.
#[derive(Default)]
pub struct SeriesCache {
    entries: Mutex<HashMap<SeriesKey, Arc<OnceCell<Arc<RainfallSeries>>>>>,
}

impl SeriesCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_fetch<F, Fut>(&self, key: SeriesKey, fetch: F) -> Result<Arc<RainfallSeries>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<RainfallSeries>>,
    {
        let cell = {
            let mut entries = self.entries.lock().await;
            entries.entry(key).or_default().clone()
        };
        let series = cell
            .get_or_try_init(|| async { fetch().await.map(Arc::new) })
            .await?;
        Ok(series.clone())
    }
}
