// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Request description types

use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use url::Url;

use super::DEFAULT_MAX_REDIRECTS;
use crate::error::{Error, Result};

/// Methods a script may issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Head,
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Upper-case method name
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Head => "HEAD",
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Head => Method::HEAD,
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

/// Request body: raw text, or a structured value sent as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestBody {
    Text(String),
    Json(serde_json::Value),
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        RequestBody::Text(text.to_string())
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        RequestBody::Text(text)
    }
}

impl From<serde_json::Value> for RequestBody {
    fn from(value: serde_json::Value) -> Self {
        RequestBody::Json(value)
    }
}

/// One outbound request as described by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDescriptor {
    #[serde(default)]
    pub method: HttpMethod,
    pub url: String,
    #[serde(default = "default_true")]
    pub follow_redirects: bool,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: u32,
    #[serde(default = "default_true")]
    pub persistent_connection: bool,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<RequestBody>,
}

fn default_true() -> bool {
    true
}

fn default_max_redirects() -> u32 {
    DEFAULT_MAX_REDIRECTS
}

impl RequestDescriptor {
    /// Create a request with the given method and every other field defaulted
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            follow_redirects: true,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            persistent_connection: true,
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Create a GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    /// Create a POST request
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    /// Set a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the body
    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set follow redirects
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    /// Set max redirects
    pub fn max_redirects(mut self, max: u32) -> Self {
        self.max_redirects = max;
        self
    }

    /// Set the persistent connection preference
    pub fn persistent_connection(mut self, persistent: bool) -> Self {
        self.persistent_connection = persistent;
        self
    }
}

/// First argument of `send`: a bare URL or a full descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestInput {
    Url(String),
    Descriptor(RequestDescriptor),
}

impl RequestInput {
    /// Normalize to a descriptor; a bare URL is a GET
    pub fn into_descriptor(self) -> RequestDescriptor {
        match self {
            RequestInput::Url(url) => RequestDescriptor::get(url),
            RequestInput::Descriptor(descriptor) => descriptor,
        }
    }
}

impl From<&str> for RequestInput {
    fn from(url: &str) -> Self {
        RequestInput::Url(url.to_string())
    }
}

impl From<String> for RequestInput {
    fn from(url: String) -> Self {
        RequestInput::Url(url)
    }
}

impl From<RequestDescriptor> for RequestInput {
    fn from(descriptor: RequestDescriptor) -> Self {
        RequestInput::Descriptor(descriptor)
    }
}

/// Validated request ready to go on the wire
#[derive(Debug, Clone)]
pub(crate) struct PreparedRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub follow_redirects: bool,
    pub max_redirects: u32,
    pub persistent_connection: bool,
}

impl PreparedRequest {
    /// Validate a descriptor; every failure here is a caller error
    pub fn from_descriptor(descriptor: &RequestDescriptor) -> Result<Self> {
        if descriptor.url.trim().is_empty() {
            return Err(Error::invalid_request("url is required"));
        }
        let url = Url::parse(descriptor.url.trim())?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::invalid_request(format!(
                "unsupported URL scheme '{}'",
                url.scheme()
            )));
        }

        let mut headers = HeaderMap::with_capacity(descriptor.headers.len());
        for (name, value) in &descriptor.headers {
            let header_name = HeaderName::try_from(name.as_str())
                .map_err(|_| Error::invalid_request(format!("invalid header name '{}'", name)))?;
            let header_value = HeaderValue::try_from(value.as_str())
                .map_err(|_| Error::invalid_request(format!("invalid value for header '{}'", name)))?;
            // Names are case-insensitive; two spellings of one header are ambiguous
            if headers.contains_key(&header_name) {
                return Err(Error::invalid_request(format!(
                    "header '{}' is given more than once",
                    header_name
                )));
            }
            headers.insert(header_name, header_value);
        }

        let body = match &descriptor.body {
            None => None,
            Some(RequestBody::Text(text)) => {
                if !headers.contains_key(CONTENT_TYPE) {
                    headers.insert(
                        CONTENT_TYPE,
                        HeaderValue::from_static("text/plain; charset=utf-8"),
                    );
                }
                Some(Bytes::from(text.clone()))
            }
            Some(RequestBody::Json(value)) => {
                let json = serde_json::to_vec(value)?;
                if !headers.contains_key(CONTENT_TYPE) {
                    headers.insert(
                        CONTENT_TYPE,
                        HeaderValue::from_static("application/json; charset=utf-8"),
                    );
                }
                Some(Bytes::from(json))
            }
        };

        Ok(Self {
            method: descriptor.method,
            url,
            headers,
            body,
            follow_redirects: descriptor.follow_redirects,
            max_redirects: descriptor.max_redirects,
            persistent_connection: descriptor.persistent_connection,
        })
    }
}
