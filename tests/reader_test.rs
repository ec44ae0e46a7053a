//! Source reader behavior against a mocked ERP endpoint: dual-field MTO
//! matching, de-duplication, coercion defaults, missing-form degradation
//! and pagination.

mod common;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use wiremock::matchers::{body_partial_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{erp_client, erp_client_with, mount_form, mount_form_missing, BILL_QUERY_PATH};
use mto_status_api::sources::forms::{
    BomLineRow, ProductionOrderRow, SalesOrderRow, SubcontractOrderRow,
};
use mto_status_api::sources::SourceReader;

#[tokio::test]
async fn sales_orders_match_either_mto_field_by_prefix() {
    let server = MockServer::start().await;
    // The row carries the MTO only in the legacy field.
    Mock::given(method("POST"))
        .and(path(BILL_QUERY_PATH))
        .and(body_partial_json(json!({ "FormId": "SAL_SaleOrder" })))
        .and(body_string_contains("FMtoNo LIKE 'AK2510034%'"))
        .and(body_string_contains("FOldMtoNo LIKE 'AK2510034%'"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            ["SO0001", "", "AK2510034", "ACME Industries", "2025-10-01", "01.10.001", 50]
        ])))
        .mount(&server)
        .await;

    let reader: SourceReader<SalesOrderRow> = SourceReader::new(erp_client(&server));
    let rows = reader.fetch_by_mto("AK2510034").await.expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].mto(), "AK2510034");
    assert_eq!(rows[0].customer, "ACME Industries");
}

#[tokio::test]
async fn duplicate_rows_from_dual_field_match_are_not_double_counted() {
    let server = MockServer::start().await;
    // Malformed dataset: the same logical row comes back twice because both
    // filter fields matched it.
    mount_form(
        &server,
        "SAL_SaleOrder",
        json!([
            ["SO0001", "AK2510034", "AK2510034", "ACME", null, "01.10.001", 50],
            ["SO0001", "AK2510034", "AK2510034", "ACME", null, "01.10.001", 50],
            ["SO0002", "AK2510034", "", "ACME", null, "01.10.002", 10]
        ]),
    )
    .await;

    let reader: SourceReader<SalesOrderRow> = SourceReader::new(erp_client(&server));
    let rows = reader.fetch_by_mto("AK2510034").await.expect("rows");
    assert_eq!(rows.len(), 2);
    let total: Decimal = rows.iter().map(|r| r.qty).sum();
    assert_eq!(total, dec!(60));
}

#[tokio::test]
async fn batched_fetch_applies_the_same_dual_field_logic() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(BILL_QUERY_PATH))
        .and(body_partial_json(json!({ "FormId": "SAL_SaleOrder" })))
        .and(body_string_contains("FOldMtoNo LIKE 'AK2%'"))
        .and(body_string_contains("FMtoNo LIKE 'AK1%'"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let reader: SourceReader<SalesOrderRow> = SourceReader::new(erp_client(&server));
    let rows = reader
        .fetch_by_mtos(&["AK1".to_string(), "AK2".to_string()])
        .await
        .expect("rows");
    assert!(rows.is_empty());
}

#[tokio::test]
async fn coercion_defaults_missing_and_malformed_values() {
    let server = MockServer::start().await;
    mount_form(
        &server,
        "PRD_MO",
        json!([
            // Nulls and a short row: every field takes its documented default.
            ["MO0001", "AK1", null, "widget", null, "not-a-number"],
            ["MO0002"]
        ]),
    )
    .await;

    let reader: SourceReader<ProductionOrderRow> = SourceReader::new(erp_client(&server));
    let rows = reader.fetch_by_mto("AK1").await.expect("rows");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].material_code, "");
    assert_eq!(rows[0].qty, Decimal::ZERO);
    assert_eq!(rows[1].bill_no, "MO0002");
    assert_eq!(rows[1].material_name, "");
}

#[tokio::test]
async fn missing_form_yields_zero_rows_not_an_error() {
    let server = MockServer::start().await;
    mount_form_missing(&server, "SUB_SUBREQORDER").await;

    let reader: SourceReader<SubcontractOrderRow> = SourceReader::new(erp_client(&server));
    let rows = reader.fetch_by_mto("AK1").await.expect("degraded fetch");
    assert!(rows.is_empty());
}

#[tokio::test]
async fn pagination_advances_start_row_until_a_short_page() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(BILL_QUERY_PATH))
        .and(body_partial_json(json!({ "FormId": "PRD_MO", "StartRow": 0 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            ["MO0001", "AK1", "01.10.001", "a", "", 1],
            ["MO0002", "AK1", "01.10.001", "b", "", 2]
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(BILL_QUERY_PATH))
        .and(body_partial_json(json!({ "FormId": "PRD_MO", "StartRow": 2 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            ["MO0003", "AK1", "01.10.001", "c", "", 3]
        ])))
        .mount(&server)
        .await;

    let client = erp_client_with(&server, |cfg| cfg.page_size = 2);
    let reader: SourceReader<ProductionOrderRow> = SourceReader::new(client);
    let rows = reader.fetch_by_mto("AK1").await.expect("rows");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2].bill_no, "MO0003");
}

#[tokio::test]
async fn bill_no_lookup_batches_with_in_clause() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(BILL_QUERY_PATH))
        .and(body_partial_json(json!({ "FormId": "PRD_PPBOM" })))
        .and(body_string_contains("FMOBillNO IN ('MO0001','MO0002')"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            ["PPBOM001", "MO0001", "AK1", "05.01.001", "bracket", "", 1, 0, "", 50, 30, 20]
        ])))
        .mount(&server)
        .await;

    let reader: SourceReader<BomLineRow> = SourceReader::new(erp_client(&server));
    let rows = reader
        .fetch_by_bill_nos(&["MO0001".to_string(), "MO0002".to_string()])
        .await
        .expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].need_qty, dec!(50));
}

#[tokio::test]
async fn transport_failures_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(BILL_QUERY_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(BILL_QUERY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            ["MO0001", "AK1", "01.10.001", "widget", "", 5]
        ])))
        .mount(&server)
        .await;

    let client = erp_client_with(&server, |cfg| {
        cfg.max_retries = 2;
        cfg.retry_backoff = std::time::Duration::from_millis(10);
    });
    let reader: SourceReader<ProductionOrderRow> = SourceReader::new(client);
    let rows = reader.fetch_by_mto("AK1").await.expect("retried fetch");
    assert_eq!(rows.len(), 1);
}
