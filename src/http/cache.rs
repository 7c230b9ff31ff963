// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! In-memory freshness cache for single GET exchanges
//!
//! Entries hold the raw engine response of one hop. Redirect handling, cookie
//! policy and body decoding run again on every hit, so a cached exchange never
//! bypasses the per-request settings.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use reqwest::header::CACHE_CONTROL;
use reqwest::StatusCode;

use super::engine::{EngineRequest, EngineResponse};
use super::request::HttpMethod;

#[derive(Debug, Clone)]
struct CacheEntry {
    response: EngineResponse,
    expires_at: Instant,
}

/// Response cache keyed by method, URL and request headers
#[derive(Debug, Clone, Default)]
pub struct ResponseCache {
    entries: Arc<DashMap<String, CacheEntry>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache key of a hop, `None` when the hop may not be cached
    ///
    /// Only body-less GETs qualify. Headers are part of the key, so requests
    /// that differ in cookies, encodings or caller headers never share an entry.
    pub fn key(request: &EngineRequest) -> Option<String> {
        if request.method != HttpMethod::Get || request.body.is_some() {
            return None;
        }
        let mut headers: Vec<(&str, String)> = request
            .headers
            .iter()
            .map(|(name, value)| (name.as_str(), String::from_utf8_lossy(value.as_bytes()).into_owned()))
            .collect();
        headers.sort();

        let mut key = format!("GET {}", request.url);
        for (name, value) in headers {
            key.push('\n');
            key.push_str(name);
            key.push_str(": ");
            key.push_str(&value);
        }
        Some(key)
    }

    /// Fresh response for `key`, evicting it if stale
    pub fn get(&self, key: &str) -> Option<EngineResponse> {
        let now = Instant::now();
        let hit = self
            .entries
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.response.clone());
        if hit.is_none() {
            self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        }
        hit
    }

    /// Store a response if its cache-control allows it
    ///
    /// Returns whether the response was stored.
    pub fn store(&self, key: &str, response: &EngineResponse) -> bool {
        if response.status != StatusCode::OK {
            return false;
        }
        let Some(max_age) = freshness_lifetime(response) else {
            return false;
        };
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                response: response.clone(),
                expires_at: Instant::now() + max_age,
            },
        );
        true
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `max-age` of a cacheable response
fn freshness_lifetime(response: &EngineResponse) -> Option<Duration> {
    let mut max_age = None;
    for value in response.headers.get_all(CACHE_CONTROL) {
        let value = value.to_str().ok()?;
        for directive in value.split(',') {
            let directive = directive.trim().to_ascii_lowercase();
            match directive.as_str() {
                "no-store" | "no-cache" | "private" => return None,
                _ => {
                    if let Some(secs) = directive.strip_prefix("max-age=") {
                        max_age = secs.trim_matches('"').parse::<u64>().ok();
                    }
                }
            }
        }
    }
    max_age.filter(|secs| *secs > 0).map(Duration::from_secs)
}
