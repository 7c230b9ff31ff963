// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HTTP engine seam
//!
//! An engine performs exactly one request/response exchange. Redirects,
//! cookies, decompression and decoding are the facade's job, so engines must
//! hand back the response as it came off the wire.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use reqwest::header::HeaderMap;
use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode, Version};
use url::Url;

use super::config::ClientConfig;
use super::request::HttpMethod;
use crate::error::{Error, Result};

/// A single hop handed to the engine
#[derive(Debug, Clone)]
pub struct EngineRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

/// Raw response of a single hop
#[derive(Debug, Clone)]
pub struct EngineResponse {
    pub status: StatusCode,
    pub version: Version,
    pub headers: HeaderMap,
    /// Body bytes exactly as received (possibly compressed)
    pub body: Bytes,
}

impl EngineResponse {
    /// Reason phrase for the status line
    pub fn reason_phrase(&self) -> String {
        self.status.canonical_reason().unwrap_or("").to_string()
    }
}

/// External HTTP stack the facade drives
#[async_trait]
pub trait HttpEngine: Send + Sync {
    /// Perform one exchange without following redirects
    async fn execute(&self, request: EngineRequest, config: &ClientConfig)
        -> Result<EngineResponse>;
}

/// Connection policy that requires a separate client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ConnectionKey {
    connect_timeout_ms: Option<u64>,
    idle_timeout_ms: u64,
}

impl From<&ClientConfig> for ConnectionKey {
    fn from(config: &ClientConfig) -> Self {
        Self {
            connect_timeout_ms: config.connection_timeout,
            idle_timeout_ms: config.idle_timeout,
        }
    }
}

/// reqwest-backed engine
///
/// Keeps one pooled client per connection policy so concurrent calls that
/// share a config also share keep-alive connections.
#[derive(Clone, Default)]
pub struct ReqwestEngine {
    clients: Arc<DashMap<ConnectionKey, Client>>,
}

impl ReqwestEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct pooled clients
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    fn client_for(&self, config: &ClientConfig) -> Result<Client> {
        let key = ConnectionKey::from(config);
        if let Some(client) = self.clients.get(&key) {
            return Ok(client.clone());
        }

        // Built without reqwest's cookie store and decompression, so
        // Set-Cookie headers and compressed bodies reach the facade untouched
        let mut builder = Client::builder()
            .redirect(Policy::none())
            .pool_idle_timeout(Duration::from_millis(key.idle_timeout_ms));

        if let Some(ms) = key.connect_timeout_ms {
            builder = builder.connect_timeout(Duration::from_millis(ms));
        }

        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        tracing::debug!(?key, "Created pooled HTTP client");
        self.clients.insert(key, client.clone());
        Ok(client)
    }
}

#[async_trait]
impl HttpEngine for ReqwestEngine {
    async fn execute(
        &self,
        request: EngineRequest,
        config: &ClientConfig,
    ) -> Result<EngineResponse> {
        let client = self.client_for(config)?;
        let url = request.url.to_string();

        let mut builder = client
            .request(request.method.into(), request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::from_transport(e, &url, config.connection_timeout))?;

        let status = response.status();
        let version = response.version();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::from_transport(e, &url, config.connection_timeout))?;

        Ok(EngineResponse {
            status,
            version,
            headers,
            body,
        })
    }
}
