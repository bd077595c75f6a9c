use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use serde_json::Value;
use url::Url;

use crate::error::TransportError;
use crate::fetch::{Relayed, Transport};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Direct client for the bank API. Holds the credentials; nothing else in
/// the crate ever sees the key.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl UpstreamClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url: base_url.into(), api_key: api_key.into() })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Endpoints are appended verbatim to the base URL.
    pub fn url_for(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Forward a GET and decode the body as JSON whatever the status.
    /// Used by the proxy, which passes both through untouched.
    pub async fn relay(&self, endpoint: &str) -> Result<Relayed, TransportError> {
        let response = self.send(endpoint).await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        Ok(Relayed { status, body: serde_json::from_slice(&bytes)? })
    }

    async fn send(&self, endpoint: &str) -> Result<Response, TransportError> {
        Ok(self
            .http
            .get(self.url_for(endpoint))
            .header(API_KEY_HEADER, &self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?)
    }
}

#[async_trait]
impl Transport for UpstreamClient {
    async fn get(&self, endpoint: &str) -> Result<Relayed, TransportError> {
        let response = self.send(endpoint).await?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            // Error bodies aren't read; the status is all the caller acts on.
            return Ok(Relayed { status, body: Value::Null });
        }
        let bytes = response.bytes().await?;
        Ok(Relayed { status, body: serde_json::from_slice(&bytes)? })
    }
}

/// Reaches the bank through a running `/api/proxy` endpoint instead of
/// holding credentials itself.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    http: Client,
    proxy_url: Url,
}

impl ProxyClient {
    /// A path prefix on `proxy_url` is kept, so a proxy mounted under
    /// `http://host/bankwatch` is reached at `/bankwatch/api/proxy`.
    pub fn new(mut proxy_url: Url, timeout: Duration) -> Result<Self, TransportError> {
        if !proxy_url.path().ends_with('/') {
            let path = format!("{}/", proxy_url.path());
            proxy_url.set_path(&path);
        }
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, proxy_url })
    }

    pub fn url_for(&self, endpoint: &str) -> Result<Url, TransportError> {
        let base = self
            .proxy_url
            .join("api/proxy")
            .map_err(|e| TransportError::Other(e.to_string()))?;
        Url::parse_with_params(base.as_str(), &[("endpoint", endpoint)])
            .map_err(|e| TransportError::Other(e.to_string()))
    }
}

#[async_trait]
impl Transport for ProxyClient {
    async fn get(&self, endpoint: &str) -> Result<Relayed, TransportError> {
        let response = self.http.get(self.url_for(endpoint)?).send().await?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Ok(Relayed { status, body: Value::Null });
        }
        let bytes = response.bytes().await?;
        Ok(Relayed { status, body: serde_json::from_slice(&bytes)? })
    }
}
