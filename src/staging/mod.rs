//! Local staging mirror of ERP documents.
//!
//! The sync pipeline that refreshes this store runs outside this crate; the
//! reconciliation engine only reads it. Rows are kept in raw wire shape so
//! staged and live data flow through the same coercion path.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde_json::Value;

/// One staged record set: raw rows for a (form, MTO) pair plus the time the
/// sync pipeline last wrote it.
#[derive(Debug, Clone)]
pub struct StagedSet {
    pub rows: Vec<Vec<Value>>,
    pub synced_at: DateTime<Utc>,
}

impl StagedSet {
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        Utc::now() - self.synced_at <= ttl
    }
}

/// Read/write interface between the (external) sync pipeline and the
/// reconciliation engine.
#[async_trait]
pub trait StagingStore: Send + Sync {
    async fn read(&self, form_id: &str, mto: &str) -> Option<StagedSet>;
    async fn put(&self, form_id: &str, mto: &str, rows: Vec<Vec<Value>>);
}

/// In-memory staging store backed by a concurrent map.
#[derive(Debug, Default)]
pub struct InMemoryStaging {
    sets: DashMap<(String, String), StagedSet>,
}

impl InMemoryStaging {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert with an explicit sync timestamp. Used by tests to simulate
    /// stale snapshots.
    pub fn put_at(&self, form_id: &str, mto: &str, rows: Vec<Vec<Value>>, synced_at: DateTime<Utc>) {
        self.sets.insert(
            (form_id.to_string(), mto.to_string()),
            StagedSet { rows, synced_at },
        );
    }
}

#[async_trait]
impl StagingStore for InMemoryStaging {
    async fn read(&self, form_id: &str, mto: &str) -> Option<StagedSet> {
        self.sets
            .get(&(form_id.to_string(), mto.to_string()))
            .map(|entry| entry.clone())
    }

    async fn put(&self, form_id: &str, mto: &str, rows: Vec<Vec<Value>>) {
        self.put_at(form_id, mto, rows, Utc::now());
    }
}
