use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use crate::erp::ErpClientConfig;
use crate::services::{MaterialPrefixes, ReconcileConfig};

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";

/// Connection settings for the source ERP.
#[derive(Clone, Debug, Deserialize)]
pub struct ErpSettings {
    #[serde(default = "default_erp_url")]
    pub base_url: String,
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub app_secret: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_erp_timeout")]
    pub timeout_secs: u64,
    /// Rows per page when paginating bill queries.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Retries per page for transport failures.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff")]
    pub retry_backoff_ms: u64,
}

impl Default for ErpSettings {
    fn default() -> Self {
        Self {
            base_url: default_erp_url(),
            app_id: String::new(),
            app_secret: String::new(),
            timeout_secs: default_erp_timeout(),
            page_size: default_page_size(),
            max_retries: default_retries(),
            retry_backoff_ms: default_backoff(),
        }
    }
}

/// Staging-mirror settings.
#[derive(Clone, Debug, Deserialize)]
pub struct CacheSettings {
    /// Prefer staged records over live ERP reads when fresh.
    #[serde(default)]
    pub prefer: bool,
    /// Freshness window in seconds.
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: i64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            prefer: false,
            ttl_secs: default_cache_ttl(),
        }
    }
}

/// Reconciliation routing rules.
#[derive(Clone, Debug, Deserialize)]
pub struct ReconcileSettings {
    #[serde(default = "default_finished_prefixes")]
    pub finished_prefixes: Vec<String>,
    #[serde(default = "default_self_made_prefixes")]
    pub self_made_prefixes: Vec<String>,
    #[serde(default = "default_purchased_prefixes")]
    pub purchased_prefixes: Vec<String>,
    #[serde(default = "default_purchase_bill_type")]
    pub purchase_bill_type: String,
    #[serde(default = "default_subcontract_bill_type")]
    pub subcontract_bill_type: String,
    /// Treat per-document fetch timeouts as zero rows instead of failing
    /// the whole reconciliation.
    #[serde(default)]
    pub tolerate_timeouts: bool,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            finished_prefixes: default_finished_prefixes(),
            self_made_prefixes: default_self_made_prefixes(),
            purchased_prefixes: default_purchased_prefixes(),
            purchase_bill_type: default_purchase_bill_type(),
            subcontract_bill_type: default_subcontract_bill_type(),
            tolerate_timeouts: false,
        }
    }
}

/// Application configuration loaded from `config/default.toml` plus `MTO_`
/// environment overrides.
#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,
    #[serde(default)]
    pub erp: ErpSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub reconcile: ReconcileSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_json: false,
            erp: ErpSettings::default(),
            cache: CacheSettings::default(),
            reconcile: ReconcileSettings::default(),
        }
    }
}

impl AppConfig {
    pub fn erp_client_config(&self) -> ErpClientConfig {
        ErpClientConfig {
            base_url: self.erp.base_url.clone(),
            app_id: self.erp.app_id.clone(),
            app_secret: self.erp.app_secret.clone(),
            timeout: Duration::from_secs(self.erp.timeout_secs),
            page_size: self.erp.page_size,
            max_retries: self.erp.max_retries,
            retry_backoff: Duration::from_millis(self.erp.retry_backoff_ms),
        }
    }

    pub fn reconcile_config(&self) -> ReconcileConfig {
        ReconcileConfig {
            prefixes: MaterialPrefixes {
                finished: self.reconcile.finished_prefixes.clone(),
                self_made: self.reconcile.self_made_prefixes.clone(),
                purchased: self.reconcile.purchased_prefixes.clone(),
            },
            purchase_bill_type: self.reconcile.purchase_bill_type.clone(),
            subcontract_bill_type: self.reconcile.subcontract_bill_type.clone(),
            prefer_cache: self.cache.prefer,
            cache_ttl_secs: self.cache.ttl_secs,
            tolerate_timeouts: self.reconcile.tolerate_timeouts,
        }
    }
}

pub fn load_config() -> Result<AppConfig, ConfigError> {
    Config::builder()
        .add_source(File::with_name(&format!("{CONFIG_DIR}/default")).required(false))
        .add_source(Environment::with_prefix("MTO").separator("__"))
        .build()?
        .try_deserialize()
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the
/// configured level when set.
pub fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn default_erp_url() -> String {
    "http://localhost:8089".to_string()
}
fn default_erp_timeout() -> u64 {
    30
}
fn default_page_size() -> usize {
    2000
}
fn default_retries() -> u32 {
    2
}
fn default_backoff() -> u64 {
    200
}
fn default_cache_ttl() -> i64 {
    300
}
fn default_finished_prefixes() -> Vec<String> {
    vec!["01.".to_string()]
}
fn default_self_made_prefixes() -> Vec<String> {
    vec!["05.".to_string()]
}
fn default_purchased_prefixes() -> Vec<String> {
    vec!["08.".to_string()]
}
fn default_purchase_bill_type() -> String {
    "RKD01_SYS".to_string()
}
fn default_subcontract_bill_type() -> String {
    "RKD03_SYS".to_string()
}
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
