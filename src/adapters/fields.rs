use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;

use crate::domain::model::FieldRecord;
use crate::domain::ports::FieldStore;
use crate::utils::error::Result;

/// Field master data loaded once from a JSON array. Lookups after load are
/// pure map reads, so the store is trivially shareable across workers.
pub struct JsonFieldStore {
    records: HashMap<u64, FieldRecord>,
}

impl JsonFieldStore {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let records: Vec<FieldRecord> = serde_json::from_str(content)?;
        Ok(Self::from_records(records))
    }

    pub fn from_records(records: Vec<FieldRecord>) -> Self {
        let records = records.into_iter().map(|r| (r.id, r)).collect();
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl FieldStore for JsonFieldStore {
    async fn field(&self, id: u64) -> Result<Option<FieldRecord>> {
        Ok(self.records.get(&id).cloned())
    }
}
