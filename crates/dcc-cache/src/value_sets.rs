//! # Value Set Cache
//!
//! Value-set identifier to member codes, for the rule engine's external
//! parameters. Backed by ordered maps so two reads of the same snapshot
//! produce identical parameters.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use dcc_validation::ValueSetProvider;
use serde::Deserialize;

use crate::config::DownloadSchedule;
use crate::error::CacheError;
use crate::refresh::{RefreshGate, RefreshOutcome};
use crate::snapshot::Snapshot;

type ValueSets = BTreeMap<String, Vec<String>>;

/// A value-set document as published by the gateway. Only the codes are
/// kept; display names and versions are not needed for rule evaluation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueSetDocument {
    value_set_id: String,
    value_set_values: BTreeMap<String, serde_json::Value>,
}

/// Snapshot cache of value sets.
#[derive(Debug)]
pub struct ValueSetCache {
    snapshot: Snapshot<ValueSets>,
    gate: RefreshGate,
}

impl ValueSetCache {
    /// An empty cache refreshed on `schedule`.
    pub fn new(schedule: DownloadSchedule) -> Self {
        Self {
            snapshot: Snapshot::default(),
            gate: RefreshGate::new("value_sets", schedule),
        }
    }

    /// Replace the whole snapshot.
    pub fn replace(&self, value_sets: ValueSets) {
        tracing::debug!(value_sets = value_sets.len(), "value-set snapshot replaced");
        self.snapshot.store(value_sets);
    }

    /// Parse a JSON array of value-set documents
    /// (`{"valueSetId", "valueSetValues": {code: {...}}}`) and replace the
    /// snapshot with their codes.
    pub fn load_json(&self, json: &str) -> Result<usize, CacheError> {
        let value_sets = parse_value_sets(json)?;
        let count = value_sets.len();
        self.replace(value_sets);
        Ok(count)
    }

    /// The current value sets.
    pub fn value_sets(&self) -> ValueSets {
        self.snapshot.load().as_ref().clone()
    }

    /// Refresh from `loader` if due.
    pub fn refresh_with(
        &self,
        now: DateTime<Utc>,
        loader: impl FnOnce() -> Result<ValueSets, CacheError>,
    ) -> Result<RefreshOutcome, CacheError> {
        self.gate.run(now, loader, |value_sets| self.replace(value_sets))
    }
}

impl ValueSetProvider for ValueSetCache {
    fn value_sets(&self) -> ValueSets {
        ValueSetCache::value_sets(self)
    }
}

/// Parse value-set documents into identifier to sorted codes.
pub fn parse_value_sets(json: &str) -> Result<ValueSets, CacheError> {
    let documents: Vec<ValueSetDocument> = serde_json::from_str(json)?;
    Ok(documents
        .into_iter()
        .map(|doc| (doc.value_set_id, doc.value_set_values.into_keys().collect()))
        .collect())
}
