//! Generic source reader over one ERP document type.

use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::erp::{ErpClient, ErpError, FilterExpr};

use super::{BillKeyed, ErpForm, MtoKeyed, RowValues};

/// Keys per batched IN-clause call.
pub const MTO_BATCH: usize = 50;

/// Convert raw wire rows through the form's declared field mapping. Shared
/// between live reads and the staging store so both paths coerce values
/// identically.
pub fn convert_rows<F: ErpForm>(raw: &[Vec<Value>]) -> Vec<F> {
    raw.iter()
        .map(|cells| F::from_row(&RowValues::from_raw(F::FIELDS, cells)))
        .collect()
}

fn field_keys<F: ErpForm>() -> String {
    F::FIELDS
        .iter()
        .map(|spec| spec.wire)
        .collect::<Vec<_>>()
        .join(",")
}

pub struct SourceReader<F: ErpForm> {
    client: Arc<ErpClient>,
    _form: PhantomData<fn() -> F>,
}

impl<F: ErpForm> Clone for SourceReader<F> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            _form: PhantomData,
        }
    }
}

impl<F: ErpForm> SourceReader<F> {
    pub fn new(client: Arc<ErpClient>) -> Self {
        Self {
            client,
            _form: PhantomData,
        }
    }

    /// Fetch all rows matching an arbitrary filter. A deployment that lacks
    /// this document type yields zero rows rather than an error; everything
    /// else propagates.
    pub async fn fetch_where(&self, filter: &FilterExpr) -> Result<Vec<F>, ErpError> {
        let raw = self.fetch_raw(filter).await?;
        Ok(convert_rows(&raw))
    }

    async fn fetch_raw(&self, filter: &FilterExpr) -> Result<Vec<Vec<Value>>, ErpError> {
        match self
            .client
            .query_all(F::FORM_ID, &field_keys::<F>(), &filter.render())
            .await
        {
            Ok(rows) => Ok(rows),
            Err(ErpError::FormNotFound(form)) => {
                warn!(form, "document type not present in this ERP deployment, treating as empty");
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }
}

impl<F: MtoKeyed> SourceReader<F> {
    fn mto_filter(mtos: &[String]) -> FilterExpr {
        let m = F::MTO_MATCH;
        if m.prefix || m.fields.len() > 1 {
            // Dual-field forms match either field by prefix; a flat OR keeps
            // the expression within the source system's filter syntax.
            let mut clauses = Vec::with_capacity(m.fields.len() * mtos.len());
            for field in m.fields {
                for mto in mtos {
                    clauses.push(if m.prefix {
                        FilterExpr::like_prefix(*field, mto.clone())
                    } else {
                        FilterExpr::eq(*field, mto.clone())
                    });
                }
            }
            FilterExpr::or(clauses)
        } else if mtos.len() == 1 {
            FilterExpr::eq(m.fields[0], mtos[0].clone())
        } else {
            FilterExpr::in_list(m.fields[0], mtos.to_vec())
        }
    }

    pub async fn fetch_by_mto(&self, mto: &str) -> Result<Vec<F>, ErpError> {
        let keys = [mto.to_string()];
        self.fetch_by_mtos(&keys).await
    }

    /// Batched variant: same rows as per-MTO calls, issued in chunks of
    /// [`MTO_BATCH`] keys per round trip.
    pub async fn fetch_by_mtos(&self, mtos: &[String]) -> Result<Vec<F>, ErpError> {
        if mtos.is_empty() {
            return Ok(Vec::new());
        }
        let mut raw = Vec::new();
        for chunk in mtos.chunks(MTO_BATCH) {
            raw.extend(self.fetch_raw(&Self::mto_filter(chunk)).await?);
        }
        if F::MTO_MATCH.fields.len() > 1 {
            dedupe_rows(&mut raw);
        }
        Ok(convert_rows(&raw))
    }
}

impl<F: BillKeyed> SourceReader<F> {
    pub async fn fetch_by_bill_no(&self, bill_no: &str) -> Result<Vec<F>, ErpError> {
        let keys = [bill_no.to_string()];
        self.fetch_by_bill_nos(&keys).await
    }

    /// Batched lookup keyed by the parent document's bill number.
    pub async fn fetch_by_bill_nos(&self, bill_nos: &[String]) -> Result<Vec<F>, ErpError> {
        if bill_nos.is_empty() {
            return Ok(Vec::new());
        }
        let mut raw = Vec::new();
        for chunk in bill_nos.chunks(MTO_BATCH) {
            let filter = FilterExpr::in_list(F::BILL_NO_FIELD, chunk.to_vec());
            raw.extend(self.fetch_raw(&filter).await?);
        }
        Ok(convert_rows(&raw))
    }
}

/// A row reachable through both MTO fields of a dual-field form must not be
/// counted twice. Identity is the full raw row; order is preserved.
fn dedupe_rows(rows: &mut Vec<Vec<Value>>) {
    let mut seen = HashSet::with_capacity(rows.len());
    rows.retain(|row| seen.insert(serde_json::to_string(row).unwrap_or_default()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let mut rows = vec![
            vec![json!("SO1"), json!(1)],
            vec![json!("SO2"), json!(2)],
            vec![json!("SO1"), json!(1)],
        ];
        dedupe_rows(&mut rows);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], json!("SO1"));
        assert_eq!(rows[1][0], json!("SO2"));
    }
}
