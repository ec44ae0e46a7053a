use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tokio::signal;
use tracing::info;

use mto_status_api as api;

use api::erp::ErpClient;
use api::services::MtoStatusService;
use api::staging::{InMemoryStaging, StagingStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config().context("loading configuration")?;
    api::config::init_tracing(&cfg.log_level, cfg.log_json);

    let client = Arc::new(ErpClient::new(cfg.erp_client_config()).context("building ERP client")?);
    let staging: Arc<dyn StagingStore> = Arc::new(InMemoryStaging::new());
    let mto_status = Arc::new(MtoStatusService::new(
        client,
        staging,
        cfg.reconcile_config(),
    ));

    let state = api::AppState {
        config: cfg.clone(),
        mto_status,
    };

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .context("parsing bind address")?;
    info!(%addr, erp = %cfg.erp.base_url, "starting MTO status API");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("binding listener")?;
    axum::serve(listener, api::app_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving")?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.ok();
    };
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("installing SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
