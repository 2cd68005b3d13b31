//! Wiring of the services from configuration

use std::sync::Arc;

use amfe_core::{AmfeService, AmfeTables, FailureModeService, FailureModeServiceConfig, OnlineDetector};
use amfe_domain::{AmfeRecord, Config, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::connectivity::ConnectivityMonitor;
use crate::http::HttpClient;
use crate::offline::SqliteFailureModeStore;
use crate::postgrest::table::{remote_http_client, rest_url};
use crate::postgrest::{PostgrestFailureModeTable, PostgrestRecordTable};

/// Build a service talking to the configured backend
///
/// The local store is attached when `offline.enabled` is set. It is opened
/// lazily, so this does no I/O.
pub fn build_failure_mode_service(
    config: &Config,
    detector: Arc<OnlineDetector>,
) -> Result<FailureModeService> {
    config.validate()?;

    let table = Arc::new(PostgrestFailureModeTable::new(&config.remote)?);
    let service =
        FailureModeService::new(table, detector, FailureModeServiceConfig::from_config(config))?;

    if !config.offline.enabled {
        info!("Offline storage disabled");
        return Ok(service);
    }

    let store = SqliteFailureModeStore::from_config(&config.offline);
    info!(path = %store.path().display(), "Offline storage configured");
    Ok(service.with_local_store(Arc::new(store)))
}

/// Build the AMFE record service over the configured backend
///
/// The four tables share one HTTP client. Reads retry with the configured
/// search profile.
pub fn build_amfe_service(config: &Config) -> Result<AmfeService> {
    config.validate()?;

    let http = remote_http_client(&config.remote)?;
    let tables = AmfeTables {
        amfes: Arc::new(record_table(&http, config)?),
        items: Arc::new(record_table(&http, config)?),
        actions: Arc::new(record_table(&http, config)?),
        evidence: Arc::new(record_table(&http, config)?),
    };

    let read_retry = FailureModeServiceConfig::from_config(config).search_retry;
    info!(url = %config.remote.url, "AMFE record service configured");
    Ok(AmfeService::with_read_retry(tables, read_retry))
}

fn record_table<R: AmfeRecord>(http: &HttpClient, config: &Config) -> Result<PostgrestRecordTable<R>> {
    Ok(PostgrestRecordTable::with_client(http.clone(), rest_url(&config.remote.url, R::TABLE)?))
}

/// Start polling the backend for connectivity if configured to
///
/// Returns `None` when the check is disabled.
pub fn start_connectivity_monitor(
    config: &Config,
    detector: Arc<OnlineDetector>,
    cancel: CancellationToken,
) -> Result<Option<JoinHandle<()>>> {
    if !config.connectivity.check_enabled {
        return Ok(None);
    }
    let monitor = ConnectivityMonitor::new(&config.remote, &config.connectivity)?;
    Ok(Some(monitor.spawn(detector, cancel)))
}
