//! `RecordTable` over the Supabase REST endpoint, for any AMFE record type

use std::fmt;
use std::marker::PhantomData;

use amfe_core::{RecordTable, RemoteResult};
use amfe_domain::{AmfeError, AmfeRecord, RemoteConfig, RemoteFailure};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, Response};
use serde::Serialize;
use tracing::{debug, instrument};
use url::Url;

use super::table::{failure_from_error_body, read_json, remote_http_client, rest_url, SINGLE_OBJECT};
use crate::http::HttpClient;

/// Patch body with the modification time stamped on
#[derive(Serialize)]
struct Stamped<'a, P> {
    #[serde(flatten)]
    patch: &'a P,
    updated_at: DateTime<Utc>,
}

/// Remote `R::TABLE` reached through PostgREST
pub struct PostgrestRecordTable<R> {
    http: HttpClient,
    endpoint: Url,
    _record: PhantomData<fn() -> R>,
}

impl<R: AmfeRecord> PostgrestRecordTable<R> {
    /// Table client for `{url}/rest/v1/{R::TABLE}`
    pub fn new(config: &RemoteConfig) -> Result<Self, AmfeError> {
        let endpoint = rest_url(&config.url, R::TABLE)?;
        Ok(Self::with_client(remote_http_client(config)?, endpoint))
    }

    /// Share an already configured client across tables
    pub fn with_client(http: HttpClient, endpoint: Url) -> Self {
        Self { http, endpoint, _record: PhantomData }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn by_id(&self, method: Method, id: &str) -> reqwest::RequestBuilder {
        self.http.request(method, self.endpoint.clone()).query(&[("id", format!("eq.{id}"))])
    }
}

impl<R> Clone for PostgrestRecordTable<R> {
    fn clone(&self) -> Self {
        Self { http: self.http.clone(), endpoint: self.endpoint.clone(), _record: PhantomData }
    }
}

impl<R> fmt::Debug for PostgrestRecordTable<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgrestRecordTable").field("endpoint", &self.endpoint).finish()
    }
}

#[async_trait]
impl<R: AmfeRecord> RecordTable<R> for PostgrestRecordTable<R> {
    #[instrument(skip(self), fields(table = R::TABLE))]
    async fn list(&self, parent_id: Option<&str>) -> RemoteResult<Vec<R>> {
        let mut params = vec![("select", "*".to_string()), ("order", R::ORDER.to_string())];
        if let (Some(column), Some(parent_id)) = (R::PARENT_COLUMN, parent_id) {
            params.push((column, format!("eq.{parent_id}")));
        }

        let request = self.http.request(Method::GET, self.endpoint.clone()).query(&params);
        let rows: Vec<R> = read_json(self.http.send(request).await?).await?;
        debug!(rows = rows.len(), "Listed records");
        Ok(rows)
    }

    #[instrument(skip(self), fields(table = R::TABLE))]
    async fn get(&self, id: &str) -> RemoteResult<R> {
        let request = self
            .by_id(Method::GET, id)
            .query(&[("select", "*")])
            .header(ACCEPT, SINGLE_OBJECT);
        read_json(self.http.send(request).await?).await
    }

    #[instrument(skip(self, record), fields(table = R::TABLE))]
    async fn insert(&self, record: &R::New) -> RemoteResult<R> {
        let request = self
            .http
            .request(Method::POST, self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header("Prefer", "return=representation")
            .json(&[record]);
        let rows: Vec<R> = read_json(self.http.send(request).await?).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| RemoteFailure::message("insert returned no representation"))
    }

    #[instrument(skip(self, patch), fields(table = R::TABLE))]
    async fn update(&self, id: &str, patch: &R::Patch) -> RemoteResult<R> {
        let body = Stamped { patch, updated_at: Utc::now() };
        let request = self
            .by_id(Method::PATCH, id)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, SINGLE_OBJECT)
            .header("Prefer", "return=representation")
            .json(&body);
        read_json(self.http.send(request).await?).await
    }

    #[instrument(skip(self), fields(table = R::TABLE))]
    async fn delete(&self, id: &str) -> RemoteResult<()> {
        expect_success(self.http.send(self.by_id(Method::DELETE, id)).await?).await
    }
}

/// Accept any 2xx without reading a body
async fn expect_success(response: Response) -> RemoteResult<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(failure_from_error_body(status.as_u16(), &body))
}
