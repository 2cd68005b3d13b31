//! `FailureModeTable` over the Supabase REST endpoint

use std::time::Duration;

use amfe_core::{FailureModeQuery, FailureModeTable, RemoteResult};
use amfe_domain::constants::FAILURE_MODES_TABLE;
use amfe_domain::{AmfeError, FailureMode, NewFailureMode, RemoteConfig, RemoteFailure};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use super::query::select_params;
use crate::http::HttpClient;

pub(crate) const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Error body PostgREST sends with non-2xx responses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CategoryRow {
    category: String,
}

/// Remote failure-mode table reached through PostgREST
#[derive(Debug, Clone)]
pub struct PostgrestFailureModeTable {
    http: HttpClient,
    endpoint: Url,
}

impl PostgrestFailureModeTable {
    /// Build a table client for `{url}/rest/v1/failure_modes`
    pub fn new(config: &RemoteConfig) -> Result<Self, AmfeError> {
        let endpoint = rest_url(&config.url, FAILURE_MODES_TABLE)?;
        Ok(Self { http: remote_http_client(config)?, endpoint })
    }

    /// Table endpoint
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// Client carrying the anon key as both `apikey` and bearer token
pub(crate) fn remote_http_client(config: &RemoteConfig) -> Result<HttpClient, AmfeError> {
    HttpClient::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .header("apikey", &config.anon_key)?
        .header("authorization", &format!("Bearer {}", config.anon_key))?
        .build()
}

/// `{base}/rest/v1/{path}`, tolerating a trailing slash on `base`
pub fn rest_url(base: &str, path: &str) -> Result<Url, AmfeError> {
    let joined = format!("{}/rest/v1/{}", base.trim().trim_end_matches('/'), path);
    Url::parse(&joined)
        .map_err(|err| AmfeError::Config(format!("invalid remote url '{base}': {err}")))
}

#[async_trait]
impl FailureModeTable for PostgrestFailureModeTable {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn select(&self, query: &FailureModeQuery) -> RemoteResult<Vec<FailureMode>> {
        let request = self.http.request(Method::GET, self.endpoint.clone()).query(&select_params(query));
        let rows: Vec<FailureMode> = read_json(self.http.send(request).await?).await?;
        debug!(rows = rows.len(), "Selected failure modes");
        Ok(rows)
    }

    #[instrument(skip(self))]
    async fn select_by_id(&self, id: &str) -> RemoteResult<FailureMode> {
        let request = self
            .http
            .request(Method::GET, self.endpoint.clone())
            .query(&[("select", "*".to_string()), ("id", format!("eq.{id}"))])
            .header(ACCEPT, SINGLE_OBJECT);
        read_json(self.http.send(request).await?).await
    }

    #[instrument(skip(self))]
    async fn select_categories(&self) -> RemoteResult<Vec<String>> {
        let request = self
            .http
            .request(Method::GET, self.endpoint.clone())
            .query(&[("select", "category"), ("order", "category.asc")]);
        let rows: Vec<CategoryRow> = read_json(self.http.send(request).await?).await?;
        Ok(rows.into_iter().map(|row| row.category).collect())
    }

    #[instrument(skip(self, record), fields(category = %record.category))]
    async fn insert(&self, record: &NewFailureMode) -> RemoteResult<FailureMode> {
        let request = self
            .http
            .request(Method::POST, self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header("Prefer", "return=representation")
            .json(&[record]);
        let rows: Vec<FailureMode> = read_json(self.http.send(request).await?).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| RemoteFailure::message("insert returned no representation"))
    }
}

/// Decode a success body, or turn an error response into a [`RemoteFailure`]
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> RemoteResult<T> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|err| RemoteFailure::message(format!("invalid response body: {err}")));
    }

    let body = response.text().await.unwrap_or_default();
    Err(failure_from_error_body(status.as_u16(), &body))
}

pub(crate) fn failure_from_error_body(status: u16, body: &str) -> RemoteFailure {
    let fallback = || {
        reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("request failed")
            .to_string()
    };

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => {
            RemoteFailure::status(status, parsed.code, parsed.message.unwrap_or_else(fallback))
        }
        Err(_) if body.trim().is_empty() => RemoteFailure::status(status, None, fallback()),
        Err(_) => RemoteFailure::status(status, None, body.trim().to_string()),
    }
}
