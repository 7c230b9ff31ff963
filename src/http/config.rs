// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Client-level configuration shared across requests

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::DEFAULT_IDLE_TIMEOUT_MS;

/// Suffix on the preferred encoding that overrides response-declared charsets
pub const FORCE_ENCODING_MARKER: char = '!';

/// Connection-level policy for every request issued with it
///
/// Durations are milliseconds so the struct deserializes directly from the
/// options object a script passes in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    /// Connect timeout; `None` leaves it to the platform
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_timeout: Option<u64>,
    /// Idle timeout of pooled keep-alive connections
    pub idle_timeout: u64,
    /// Decompress gzip bodies
    pub auto_uncompress: bool,
    /// Send and store cookies
    pub follow_cookies: bool,
    /// Use the response cache
    pub cache: bool,
    /// Preferred charset label, optionally suffixed with `!`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    /// Skip the user-agent and accept-encoding defaults
    pub prevent_default_headers: bool,
    /// Prefer `<meta charset>` over the content-type charset for HTML
    pub html_prefer_meta_charset: bool,
    /// Engine-specific options, passed through untouched
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connection_timeout: None,
            idle_timeout: DEFAULT_IDLE_TIMEOUT_MS,
            auto_uncompress: true,
            follow_cookies: true,
            cache: true,
            encoding: None,
            prevent_default_headers: false,
            html_prefer_meta_charset: false,
            extra: HashMap::new(),
        }
    }
}

impl ClientConfig {
    /// Create a config with every default applied
    pub fn new() -> Self {
        Self::default()
    }

    /// Set connection timeout
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = Some(timeout.as_millis() as u64);
        self
    }

    /// Set idle timeout for pooled connections
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout.as_millis() as u64;
        self
    }

    /// Enable/disable gzip decompression
    pub fn auto_uncompress(mut self, enabled: bool) -> Self {
        self.auto_uncompress = enabled;
        self
    }

    /// Enable/disable cookie handling
    pub fn follow_cookies(mut self, enabled: bool) -> Self {
        self.follow_cookies = enabled;
        self
    }

    /// Enable/disable the response cache
    pub fn cache(mut self, enabled: bool) -> Self {
        self.cache = enabled;
        self
    }

    /// Set the preferred encoding (`"gbk"`, or `"gbk!"` to force it)
    pub fn encoding(mut self, label: impl Into<String>) -> Self {
        self.encoding = Some(label.into());
        self
    }

    /// Suppress default headers
    pub fn prevent_default_headers(mut self, prevent: bool) -> Self {
        self.prevent_default_headers = prevent;
        self
    }

    /// Prefer the HTML meta charset
    pub fn html_prefer_meta_charset(mut self, prefer: bool) -> Self {
        self.html_prefer_meta_charset = prefer;
        self
    }

    /// Add an engine-specific option
    pub fn option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Connect timeout as a duration
    pub fn connection_timeout_duration(&self) -> Option<Duration> {
        self.connection_timeout.map(Duration::from_millis)
    }

    /// Idle timeout as a duration
    pub fn idle_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.idle_timeout)
    }

    /// Parsed preferred encoding
    pub fn encoding_preference(&self) -> Option<EncodingPreference> {
        self.encoding.as_deref().and_then(EncodingPreference::parse)
    }
}

/// Preferred charset and whether it overrides the response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingPreference {
    pub label: String,
    pub forced: bool,
}

impl EncodingPreference {
    /// Parse `"label"` or `"label!"`; blank labels mean no preference
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let (label, forced) = match trimmed.strip_suffix(FORCE_ENCODING_MARKER) {
            Some(label) => (label.trim(), true),
            None => (trimmed, false),
        };
        if label.is_empty() {
            return None;
        }
        Some(Self {
            label: label.to_string(),
            forced,
        })
    }
}
