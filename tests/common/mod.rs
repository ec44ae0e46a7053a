//! Shared fixtures for wiremock-backed integration tests.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mto_status_api::erp::{ErpClient, ErpClientConfig, FORM_NOT_FOUND_CODE};
use mto_status_api::services::{MtoStatusService, ReconcileConfig};
use mto_status_api::staging::InMemoryStaging;

pub const BILL_QUERY_PATH: &str = "/api/executeBillQuery";

pub fn erp_client(server: &MockServer) -> Arc<ErpClient> {
    erp_client_with(server, |_| {})
}

pub fn erp_client_with(
    server: &MockServer,
    tweak: impl FnOnce(&mut ErpClientConfig),
) -> Arc<ErpClient> {
    let mut cfg = ErpClientConfig {
        base_url: server.uri(),
        timeout: Duration::from_secs(5),
        max_retries: 0,
        ..ErpClientConfig::default()
    };
    tweak(&mut cfg);
    Arc::new(ErpClient::new(cfg).expect("client"))
}

pub fn service(server: &MockServer) -> MtoStatusService {
    service_with(server, ReconcileConfig::default(), InMemoryStaging::new())
}

pub fn service_with(
    server: &MockServer,
    cfg: ReconcileConfig,
    staging: InMemoryStaging,
) -> MtoStatusService {
    MtoStatusService::new(erp_client(server), Arc::new(staging), cfg)
}

/// Mount a success response for one form id.
pub async fn mount_form(server: &MockServer, form_id: &str, rows: Value) {
    Mock::given(method("POST"))
        .and(path(BILL_QUERY_PATH))
        .and(body_partial_json(json!({ "FormId": form_id })))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(server)
        .await;
}

/// Mount the distinguished "form not registered" error for one form id.
pub async fn mount_form_missing(server: &MockServer, form_id: &str) {
    Mock::given(method("POST"))
        .and(path(BILL_QUERY_PATH))
        .and(body_partial_json(json!({ "FormId": form_id })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": { "code": FORM_NOT_FOUND_CODE, "message": "form not registered" }
        })))
        .mount(server)
        .await;
}

/// Mount empty result sets for every listed form.
pub async fn mount_empty(server: &MockServer, form_ids: &[&str]) {
    for form_id in form_ids {
        mount_form(server, form_id, json!([])).await;
    }
}

/// All nine reconciliation source forms.
pub const ALL_FORMS: &[&str] = &[
    "SAL_SaleOrder",
    "PRD_MO",
    "PRD_PPBOM",
    "PRD_INSTOCK",
    "PUR_PurchaseOrder",
    "STK_InStock",
    "SUB_SUBREQORDER",
    "PRD_PickMtrl",
    "SAL_OUTSTOCK",
];
