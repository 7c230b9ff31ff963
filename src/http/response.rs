// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Script-visible results of `send`

use std::collections::BTreeMap;

use reqwest::header::{HeaderMap, CONNECTION};
use reqwest::Version;
use serde::{Deserialize, Serialize};

use super::request::HttpMethod;
use crate::error::Error;

/// One redirect followed on the way to the final response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectInfo {
    pub status_code: u16,
    /// Method used for the request that followed this redirect
    pub method: HttpMethod,
    /// Absolute location that was requested next
    pub location: String,
}

/// Successful outcome of a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseResult {
    /// Response headers exactly as received, names lower-cased
    ///
    /// With automatic decompression `content-length` and `content-encoding`
    /// still describe the compressed payload, not `body`.
    pub headers: BTreeMap<String, String>,
    pub is_redirect: bool,
    pub persistent_connection: bool,
    pub reason_phrase: String,
    pub status_code: u16,
    pub body: String,
    pub redirects: Vec<RedirectInfo>,
}

impl ResponseResult {
    /// Get a header value by name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Check if status is success (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Failure outcome; `status_code` is always 0
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResult {
    pub status_code: u16,
    pub reason_phrase: String,
}

impl ErrorResult {
    /// Build an error result with the given reason
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            status_code: 0,
            reason_phrase: reason.into(),
        }
    }

    /// Error result for a cancelled request
    pub fn aborted() -> Self {
        Self::from_error(&Error::Aborted)
    }

    /// Normalize a runtime failure
    pub fn from_error(err: &Error) -> Self {
        Self::new(err.reason_phrase())
    }
}

/// What `send` resolves to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SendOutcome {
    Success(ResponseResult),
    Failure(ErrorResult),
}

impl SendOutcome {
    /// Status code; 0 for failures
    pub fn status_code(&self) -> u16 {
        match self {
            SendOutcome::Success(response) => response.status_code,
            SendOutcome::Failure(error) => error.status_code,
        }
    }

    /// Reason phrase of either shape
    pub fn reason_phrase(&self) -> &str {
        match self {
            SendOutcome::Success(response) => &response.reason_phrase,
            SendOutcome::Failure(error) => &error.reason_phrase,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SendOutcome::Success(_))
    }

    pub fn response(&self) -> Option<&ResponseResult> {
        match self {
            SendOutcome::Success(response) => Some(response),
            SendOutcome::Failure(_) => None,
        }
    }

    pub fn into_response(self) -> Option<ResponseResult> {
        match self {
            SendOutcome::Success(response) => Some(response),
            SendOutcome::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorResult> {
        match self {
            SendOutcome::Success(_) => None,
            SendOutcome::Failure(error) => Some(error),
        }
    }
}

/// Flatten a header map; repeated headers are joined with ", "
pub(crate) fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut flattened: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers.iter() {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        flattened
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    flattened
}

/// Whether the server left the connection open for reuse
pub(crate) fn is_persistent(version: Version, headers: &HeaderMap) -> bool {
    let tokens: Vec<String> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|t| t.trim().to_ascii_lowercase())
        .collect();

    if tokens.iter().any(|t| t == "close") {
        return false;
    }
    if version == Version::HTTP_10 || version == Version::HTTP_09 {
        return tokens.iter().any(|t| t == "keep-alive");
    }
    true
}
