use std::time::Duration;

use amfe_core::RemoteResult;
use amfe_domain::AmfeError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use tracing::debug;

use crate::errors::{remote_failure_from_http, InfraError};

/// HTTP client with timeout and default headers.
///
/// Sends each request exactly once. Retry decisions belong to the caller,
/// which sees transport failures as [`amfe_domain::RemoteFailure`].
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: ReqwestClient,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self, AmfeError> {
        Self::builder().build()
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Execute the provided request builder.
    ///
    /// Any response, including error statuses, is returned as `Ok`.
    pub async fn send(&self, builder: RequestBuilder) -> RemoteResult<Response> {
        let request = builder.build().map_err(|err| remote_failure_from_http(&err))?;

        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, %url, "sending HTTP request");

        match self.client.execute(request).await {
            Ok(response) => {
                debug!(%method, %url, status = %response.status(), "received HTTP response");
                Ok(response)
            }
            Err(err) => {
                debug!(%method, %url, error = %err, "HTTP request failed");
                Err(remote_failure_from_http(&err))
            }
        }
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    user_agent: Option<String>,
    default_headers: HeaderMap,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: Some(concat!("amfe/", env!("CARGO_PKG_VERSION")).to_string()),
            default_headers: HeaderMap::new(),
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers.extend(headers);
        self
    }

    /// Add one header sent with every request.
    ///
    /// Values are marked sensitive so they stay out of debug output.
    pub fn header(mut self, name: &'static str, value: &str) -> Result<Self, AmfeError> {
        let mut value = HeaderValue::from_str(value)
            .map_err(|err| AmfeError::Config(format!("invalid value for header '{name}': {err}")))?;
        value.set_sensitive(true);
        self.default_headers.insert(HeaderName::from_static(name), value);
        Ok(self)
    }

    pub fn build(self) -> Result<HttpClient, AmfeError> {
        let mut builder = ReqwestClient::builder()
            .timeout(self.timeout)
            .default_headers(self.default_headers)
            .no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        let client = builder.build().map_err(|err| {
            let infra: InfraError = err.into();
            AmfeError::from(infra)
        })?;

        Ok(HttpClient { client })
    }
}
