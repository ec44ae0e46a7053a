//! HTTP client for the ERP bill-query endpoint.
//!
//! One operation, `query`, posts a form id, a comma-joined field-key list
//! and a filter string, and receives a JSON array of positional row arrays.
//! `query_all` pages through the result by advancing `StartRow` until a
//! short page comes back. Transport-level failures are retried with a short
//! linear backoff; query rejections are not.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Error code the ERP returns when a document type is not registered in
/// this deployment. Distinct from an empty result: the form itself is
/// absent, which some deployments legitimately are (e.g. no subcontracting
/// module installed).
pub const FORM_NOT_FOUND_CODE: i64 = 40020;

#[derive(Debug, Error)]
pub enum ErpError {
    #[error("form {0} is not registered in this ERP deployment")]
    FormNotFound(String),

    #[error("query rejected by ERP: {0}")]
    Query(String),

    #[error("transport failure talking to ERP: {0}")]
    Transport(String),

    #[error("ERP request timed out")]
    Timeout,

    #[error("malformed ERP response: {0}")]
    Protocol(String),
}

#[derive(Debug, Clone)]
pub struct ErpClientConfig {
    pub base_url: String,
    pub app_id: String,
    pub app_secret: String,
    /// Per-request timeout. The source system can be slow or unresponsive.
    pub timeout: Duration,
    /// Rows per page for `query_all`.
    pub page_size: usize,
    /// Retries for transport failures and timeouts, per page.
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for ErpClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8089".to_string(),
            app_id: String::new(),
            app_secret: String::new(),
            timeout: Duration::from_secs(30),
            page_size: 2000,
            max_retries: 2,
            retry_backoff: Duration::from_millis(200),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct BillQueryRequest<'a> {
    form_id: &'a str,
    field_keys: &'a str,
    filter_string: &'a str,
    top_row_count: usize,
    start_row: usize,
}

/// Shared, connection-pooled ERP client. Safe to use from any number of
/// in-flight reconciliations.
#[derive(Debug, Clone)]
pub struct ErpClient {
    http: reqwest::Client,
    cfg: ErpClientConfig,
}

impl ErpClient {
    pub fn new(cfg: ErpClientConfig) -> Result<Self, ErpError> {
        let http = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| ErpError::Transport(e.to_string()))?;
        Ok(Self { http, cfg })
    }

    /// Issue a single bill-query page.
    pub async fn query(
        &self,
        form_id: &str,
        field_keys: &str,
        filter: &str,
        limit: usize,
        start_row: usize,
    ) -> Result<Vec<Vec<Value>>, ErpError> {
        let request = BillQueryRequest {
            form_id,
            field_keys,
            filter_string: filter,
            top_row_count: limit,
            start_row,
        };

        let mut attempt = 0u32;
        loop {
            match self.execute(&request).await {
                Ok(rows) => return Ok(rows),
                Err(err @ (ErpError::Transport(_) | ErpError::Timeout))
                    if attempt < self.cfg.max_retries =>
                {
                    attempt += 1;
                    warn!(
                        form_id,
                        attempt,
                        error = %err,
                        "retrying ERP query after transient failure"
                    );
                    tokio::time::sleep(self.cfg.retry_backoff * attempt).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Repeat `query` advancing the offset until a short page is returned.
    pub async fn query_all(
        &self,
        form_id: &str,
        field_keys: &str,
        filter: &str,
    ) -> Result<Vec<Vec<Value>>, ErpError> {
        let page_size = self.cfg.page_size.max(1);
        let mut rows = Vec::new();
        let mut start_row = 0usize;
        loop {
            let page = self
                .query(form_id, field_keys, filter, page_size, start_row)
                .await?;
            let fetched = page.len();
            rows.extend(page);
            if fetched < page_size {
                break;
            }
            start_row += fetched;
        }
        debug!(form_id, rows = rows.len(), "ERP query complete");
        Ok(rows)
    }

    async fn execute(&self, request: &BillQueryRequest<'_>) -> Result<Vec<Vec<Value>>, ErpError> {
        let url = format!(
            "{}/api/executeBillQuery",
            self.cfg.base_url.trim_end_matches('/')
        );
        let response = self
            .http
            .post(&url)
            .header("X-App-Id", &self.cfg.app_id)
            .header("X-App-Secret", &self.cfg.app_secret)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ErpError::Timeout
                } else {
                    ErpError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(ErpError::Transport(format!("HTTP {status}")));
        }
        if !status.is_success() {
            return Err(ErpError::Query(format!("HTTP {status}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ErpError::Protocol(e.to_string()))?;
        parse_body(request.form_id, body)
    }
}

fn parse_body(form_id: &str, body: Value) -> Result<Vec<Vec<Value>>, ErpError> {
    match body {
        Value::Array(rows) => rows
            .into_iter()
            .map(|row| match row {
                Value::Array(cells) => Ok(cells),
                other => Err(ErpError::Protocol(format!(
                    "expected row array, got {other}"
                ))),
            })
            .collect(),
        Value::Object(map) => {
            let err = map
                .get("error")
                .ok_or_else(|| ErpError::Protocol("object response without error".into()))?;
            let code = err.get("code").and_then(Value::as_i64).unwrap_or(0);
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            if code == FORM_NOT_FOUND_CODE {
                Err(ErpError::FormNotFound(form_id.to_string()))
            } else {
                Err(ErpError::Query(format!("code {code}: {message}")))
            }
        }
        other => Err(ErpError::Protocol(format!(
            "unexpected response shape: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_row_arrays() {
        let rows = parse_body("PRD_MO", json!([["MO0001", "AK1", 10], ["MO0002", "AK1", 5]]))
            .expect("rows");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], json!("MO0001"));
    }

    #[test]
    fn maps_form_not_found_code() {
        let err = parse_body(
            "SUB_SUBREQORDER",
            json!({"error": {"code": FORM_NOT_FOUND_CODE, "message": "form not registered"}}),
        )
        .unwrap_err();
        assert!(matches!(err, ErpError::FormNotFound(_)));
    }

    #[test]
    fn maps_other_error_codes_to_query() {
        let err = parse_body(
            "PRD_MO",
            json!({"error": {"code": 500, "message": "bad filter"}}),
        )
        .unwrap_err();
        assert!(matches!(err, ErpError::Query(_)));
    }
}
