use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::info;

use crate::{errors::ServiceError, services::StatusOptions, ApiResponse, AppState};

/// Creates the router for MTO status endpoints
pub fn mto_routes() -> Router<AppState> {
    Router::new().route("/:mto/status", get(get_mto_status))
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    /// Force a live ERP read, bypassing the staging mirror.
    #[serde(default)]
    pub refresh: bool,
}

/// Fulfillment status for one MTO number.
async fn get_mto_status(
    State(state): State<AppState>,
    Path(mto): Path<String>,
    Query(query): Query<StatusQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    info!(mto = %mto, refresh = query.refresh, "MTO status requested");
    let status = state
        .mto_status
        .get_status(
            &mto,
            StatusOptions {
                bypass_cache: query.refresh,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(status)))
}
