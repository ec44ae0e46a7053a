//! Auxiliary property (variant) resolution.
//!
//! Variant ids on source rows are bare integers; the descriptions live in a
//! side table. Resolution is best-effort: ids with no match are simply
//! absent from the returned map and callers fall back to whatever variant
//! text was already inline on the row.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::instrument;

use crate::erp::{ErpClient, ErpError, FilterExpr};
use crate::sources::forms::AuxPropertyRow;
use crate::sources::SourceReader;

pub struct AuxPropertyResolver {
    reader: SourceReader<AuxPropertyRow>,
}

impl AuxPropertyResolver {
    pub fn new(client: Arc<ErpClient>) -> Self {
        Self {
            reader: SourceReader::new(client),
        }
    }

    /// Resolve a set of variant ids to descriptions in one batched lookup.
    /// Zeros and duplicates are dropped first; an empty filtered set makes
    /// no call at all.
    #[instrument(skip(self, ids), fields(requested = ids.len()))]
    pub async fn resolve(&self, ids: &[i64]) -> Result<HashMap<i64, String>, ErpError> {
        let wanted = normalize_ids(ids);
        if wanted.is_empty() {
            return Ok(HashMap::new());
        }

        let filter = FilterExpr::in_list("FID", wanted.iter().map(|id| id.to_string()));
        let rows = self.reader.fetch_where(&filter).await?;

        let mut map = HashMap::with_capacity(rows.len());
        for row in rows {
            if let Some(desc) = describe(&row) {
                map.insert(row.id, desc);
            }
        }
        Ok(map)
    }
}

/// Drop zeros ("no variant") and duplicates; sorted output keeps the filter
/// string deterministic.
fn normalize_ids(ids: &[i64]) -> Vec<i64> {
    ids.iter()
        .copied()
        .filter(|id| *id != 0)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Prefer the primary description field over the name-based one; a row with
/// neither contributes nothing.
fn describe(row: &AuxPropertyRow) -> Option<String> {
    if !row.data_value.is_empty() {
        Some(row.data_value.clone())
    } else if !row.name.is_empty() {
        Some(row.name.clone())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::erp::ErpClientConfig;

    #[test]
    fn normalize_drops_zeros_and_duplicates() {
        assert_eq!(normalize_ids(&[0, 5, 3, 5, 0, 3]), vec![3, 5]);
        assert!(normalize_ids(&[0, 0]).is_empty());
        assert!(normalize_ids(&[]).is_empty());
    }

    #[test]
    fn describe_prefers_data_value_over_name() {
        let mut row = AuxPropertyRow {
            id: 1,
            data_value: "Red".into(),
            name: "Colour/Red".into(),
        };
        assert_eq!(describe(&row).as_deref(), Some("Red"));
        row.data_value.clear();
        assert_eq!(describe(&row).as_deref(), Some("Colour/Red"));
        row.name.clear();
        assert_eq!(describe(&row), None);
    }

    #[tokio::test]
    async fn empty_filtered_set_makes_no_call() {
        // Client pointing at a closed port: any network attempt would fail.
        let client = Arc::new(
            ErpClient::new(ErpClientConfig {
                base_url: "http://127.0.0.1:1".into(),
                max_retries: 0,
                ..ErpClientConfig::default()
            })
            .expect("client"),
        );
        let resolver = AuxPropertyResolver::new(client);
        let map = resolver.resolve(&[0, 0, 0]).await.expect("no lookup");
        assert!(map.is_empty());
    }
}
