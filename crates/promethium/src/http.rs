//! Shared HTTP connection.
//!
//! One `reqwest::Client` carries the base URL and the fixed `x-api-key`
//! header for every request. Cloning a [`Connection`] shares the underlying
//! pool, so resource clients and concurrent polls all reuse it.

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ConfigError, PromethiumError, PromethiumResult};

/// Authentication header attached to every request.
pub const API_KEY_HEADER: &str = "x-api-key";

/// User agent string sent with every request.
const USER_AGENT: &str = concat!("promethium-rs/", env!("CARGO_PKG_VERSION"));

/// Which resource a request addressed, for 404 mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resource {
    Workflow,
    File,
}

/// HTTP connection shared by the resource clients.
#[derive(Clone)]
pub struct Connection {
    client: Client,
    base_url: String,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl Connection {
    /// Build the pooled client from resolved configuration.
    pub fn new(config: &ClientConfig) -> PromethiumResult<Self> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(config.api_key())
            .map_err(|_| ConfigError::InvalidValue("api_key contains invalid characters".into()))?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for an API path such as `/v0/workflows`.
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn get(&self, path: &str) -> RequestBuilder {
        let url = self.url(path);
        debug!("GET {}", url);
        self.client.get(url)
    }

    pub(crate) fn post(&self, path: &str) -> RequestBuilder {
        let url = self.url(path);
        debug!("POST {}", url);
        self.client.post(url)
    }

    pub(crate) fn patch(&self, path: &str) -> RequestBuilder {
        let url = self.url(path);
        debug!("PATCH {}", url);
        self.client.patch(url)
    }

    pub(crate) fn delete(&self, path: &str) -> RequestBuilder {
        let url = self.url(path);
        debug!("DELETE {}", url);
        self.client.delete(url)
    }

    /// Send and decode a JSON response.
    pub(crate) async fn json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        resource: Resource,
        id: &str,
    ) -> PromethiumResult<T> {
        let response = check(request.send().await?, resource, id).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Send with a JSON body and decode a JSON response.
    pub(crate) async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        body: &B,
        resource: Resource,
        id: &str,
    ) -> PromethiumResult<T> {
        self.json(request.json(body), resource, id).await
    }

    /// Send and discard the response body.
    pub(crate) async fn empty(
        &self,
        request: RequestBuilder,
        resource: Resource,
        id: &str,
    ) -> PromethiumResult<()> {
        check(request.send().await?, resource, id).await?;
        Ok(())
    }

    /// Send and return the raw body. Redirects are followed.
    pub(crate) async fn bytes(
        &self,
        request: RequestBuilder,
        resource: Resource,
        id: &str,
    ) -> PromethiumResult<Vec<u8>> {
        let response = check(request.send().await?, resource, id).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Map non-2xx responses to errors.
async fn check(response: Response, resource: Resource, id: &str) -> PromethiumResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    debug!("Request for {} failed with {}: {}", id, status, body);

    match status {
        StatusCode::NOT_FOUND => Err(match resource {
            Resource::Workflow => PromethiumError::WorkflowNotFound(id.to_string()),
            Resource::File => PromethiumError::FileNotFound(id.to_string()),
        }),
        _ => Err(PromethiumError::Transport {
            status: status.as_u16(),
            body,
        }),
    }
}
