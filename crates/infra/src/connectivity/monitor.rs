//! Backend reachability monitor feeding an [`OnlineDetector`]
//!
//! Sends `HEAD {url}/rest/v1/` on an interval. Any HTTP response counts as
//! online, since the question is whether the backend can be reached at all;
//! only transport failures count as offline.

use std::sync::Arc;
use std::time::Duration;

use amfe_core::OnlineDetector;
use amfe_domain::{AmfeError, ConnectivityConfig, RemoteConfig};
use reqwest::Method;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use crate::http::HttpClient;
use crate::postgrest::table::rest_url;

/// Periodic reachability check
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    http: HttpClient,
    target: Url,
    interval: Duration,
}

impl ConnectivityMonitor {
    pub fn new(remote: &RemoteConfig, connectivity: &ConnectivityConfig) -> Result<Self, AmfeError> {
        if connectivity.check_interval_secs == 0 {
            return Err(AmfeError::Config(
                "connectivity.check_interval_secs must be greater than 0".into(),
            ));
        }
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(connectivity.check_timeout_secs))
            .header("apikey", &remote.anon_key)?
            .build()?;
        Ok(Self {
            http,
            target: rest_url(&remote.url, "")?,
            interval: Duration::from_secs(connectivity.check_interval_secs),
        })
    }

    /// Check once; `true` if the backend answered
    pub async fn check(&self) -> bool {
        let request = self.http.request(Method::HEAD, self.target.clone());
        match self.http.send(request).await {
            Ok(response) => {
                debug!(status = %response.status(), "Connectivity check answered");
                true
            }
            Err(failure) => {
                debug!(error = %failure, "Connectivity check failed");
                false
            }
        }
    }

    /// Check now and then every interval, pushing results into `detector`
    ///
    /// Stops when `cancel` fires.
    pub fn spawn(self, detector: Arc<OnlineDetector>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(url = %self.target, interval = ?self.interval, "Connectivity check started");
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let online = tokio::select! {
                            _ = cancel.cancelled() => break,
                            online = self.check() => online,
                        };
                        detector.set_online(online);
                    }
                }
            }

            info!("Connectivity check stopped");
        })
    }
}
