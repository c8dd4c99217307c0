use std::fs;

use serde_json::Value;
use tracing::debug;

use crate::domain::{MetricKind, PdbId};
use crate::error::KiraError;
use crate::record::MetricRecord;
use crate::store::Store;

/// One JSON file per (identifier, kind). A derivation that produced nothing is
/// stored as `null`, so it is not attempted again. Nothing here invalidates
/// entries; deleting the file is the only way to recompute.
#[derive(Debug, Clone)]
pub struct MetricCache {
    store: Store,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheEntry {
    Record(MetricRecord),
    NoMetric,
}

impl MetricCache {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn has(&self, id: &PdbId, kind: MetricKind) -> bool {
        self.store.metric_path(id, kind).as_std_path().is_file()
    }

    pub fn load(&self, id: &PdbId, kind: MetricKind) -> Result<Option<CacheEntry>, KiraError> {
        let path = self.store.metric_path(id, kind);
        if !path.as_std_path().is_file() {
            return Ok(None);
        }
        let bytes = fs::read(path.as_std_path())
            .map_err(|err| KiraError::Filesystem(format!("read {path}: {err}")))?;
        let corrupt = |err: serde_json::Error| KiraError::CorruptCache {
            path: path.to_string(),
            message: err.to_string(),
        };
        let value: Value = serde_json::from_slice(&bytes).map_err(corrupt)?;
        debug!(%id, %kind, "metric cache hit");
        if value.is_null() {
            return Ok(Some(CacheEntry::NoMetric));
        }
        let record = MetricRecord::from_value(kind, value).map_err(corrupt)?;
        Ok(Some(CacheEntry::Record(record)))
    }

    pub fn save(&self, id: &PdbId, record: &MetricRecord) -> Result<(), KiraError> {
        let path = self.store.metric_path(id, record.kind());
        let bytes = record
            .to_json()
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        Store::write_bytes_atomic(&path, &bytes)
    }

    pub fn save_no_metric(&self, id: &PdbId, kind: MetricKind) -> Result<(), KiraError> {
        Store::write_bytes_atomic(&self.store.metric_path(id, kind), b"null")
    }
}
