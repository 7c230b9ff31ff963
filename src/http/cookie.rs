// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Cookie jar shared by every request issued through one facade

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use dashmap::DashMap;
use reqwest::header::{HeaderMap, SET_COOKIE};
use serde::{Deserialize, Serialize};
use url::Url;

/// A single HTTP cookie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    /// Domain the cookie belongs to, without a leading dot
    pub domain: String,
    /// Only sent to `domain` itself, not its subdomains
    pub host_only: bool,
    pub path: String,
    /// Expiration time (None = session cookie)
    pub expires: Option<DateTime<Utc>>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
}

/// SameSite cookie attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SameSite {
    #[default]
    None,
    Lax,
    Strict,
}

impl Cookie {
    /// Create a new host-only session cookie
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: String::new(),
            host_only: true,
            path: "/".to_string(),
            expires: None,
            secure: false,
            http_only: false,
            same_site: SameSite::default(),
        }
    }

    /// Set the domain; the cookie then also matches subdomains
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into().trim_start_matches('.').to_ascii_lowercase();
        self.host_only = false;
        self
    }

    /// Set the path
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set secure flag
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Set expiration time
    pub fn expires(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }

    /// Check if the cookie is expired
    pub fn is_expired(&self) -> bool {
        self.expires.map_or(false, |exp| exp <= Utc::now())
    }

    /// Check if the cookie should be sent to the given URL
    pub fn matches(&self, url: &Url) -> bool {
        let host = url.host_str().unwrap_or("").to_ascii_lowercase();
        let domain_ok = if self.host_only {
            host == self.domain
        } else {
            domain_matches(&host, &self.domain)
        };

        domain_ok
            && path_matches(url.path(), &self.path)
            && (!self.secure || url.scheme() == "https")
            && !self.is_expired()
    }

    /// Parse a Set-Cookie header value received from `url`
    ///
    /// Returns `None` for malformed headers and for cookies whose Domain
    /// attribute does not cover the responding host.
    pub fn parse(header: &str, url: &Url) -> Option<Self> {
        let mut parts = header.split(';');
        let (name, value) = parts.next()?.trim().split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let host = url.host_str()?.to_ascii_lowercase();
        let mut cookie = Cookie::new(name, value.trim().trim_matches('"'));
        cookie.domain = host.clone();
        cookie.path = default_path(url);

        let mut max_age: Option<i64> = None;
        for part in parts {
            let part = part.trim();
            let (attr, val) = match part.split_once('=') {
                Some((attr, val)) => (attr.trim().to_ascii_lowercase(), val.trim()),
                None => (part.to_ascii_lowercase(), ""),
            };
            match attr.as_str() {
                "domain" if !val.is_empty() => {
                    let domain = val.trim_start_matches('.').to_ascii_lowercase();
                    if !domain_matches(&host, &domain) {
                        return None;
                    }
                    cookie.domain = domain;
                    cookie.host_only = false;
                }
                "path" if val.starts_with('/') => cookie.path = val.to_string(),
                "expires" => {
                    if let Some(expires) = parse_expires(val) {
                        cookie.expires = Some(expires);
                    }
                }
                "max-age" => max_age = parse_max_age(val),
                "samesite" => {
                    cookie.same_site = match val.to_ascii_lowercase().as_str() {
                        "strict" => SameSite::Strict,
                        "lax" => SameSite::Lax,
                        _ => SameSite::None,
                    };
                }
                "secure" => cookie.secure = true,
                "httponly" => cookie.http_only = true,
                _ => {}
            }
        }

        // Max-Age wins over Expires
        if let Some(secs) = max_age {
            cookie.expires = expiry_after(secs);
        }

        Some(cookie)
    }

    /// Convert to cookie header format
    pub fn to_header_value(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

/// Max-Age value; anything but an optionally signed run of digits is ignored
fn parse_max_age(val: &str) -> Option<i64> {
    let digits = val.strip_prefix('-').unwrap_or(val);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Saturate absurdly long values instead of dropping them
    Some(val.parse::<i64>().unwrap_or(if val.starts_with('-') {
        i64::MIN
    } else {
        i64::MAX
    }))
}

/// Expiry for a Max-Age of `secs`
///
/// Zero or negative expires immediately. A lifetime past what chrono can
/// represent is treated as never expiring.
fn expiry_after(secs: i64) -> Option<DateTime<Utc>> {
    let now = Utc::now();
    if secs <= 0 {
        return Some(now);
    }
    chrono::Duration::try_seconds(secs).and_then(|lifetime| now.checked_add_signed(lifetime))
}

/// Expires attribute in RFC 1123 form or the legacy Netscape dashed form
fn parse_expires(val: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(val) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%a, %d-%b-%Y %H:%M:%S GMT", "%A, %d-%b-%y %H:%M:%S GMT", "%a, %d-%b-%y %H:%M:%S GMT"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(val, format).ok())
        .map(|naive| naive.and_utc())
}

fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{}", domain))
}

fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/') || request_path[cookie_path.len()..].starts_with('/'))
}

/// Directory of the request path, per RFC 6265 section 5.1.4
fn default_path(url: &Url) -> String {
    let path = url.path();
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}

/// Thread-safe cookie storage
#[derive(Debug, Clone)]
pub struct CookieJar {
    /// Cookies stored by domain
    cookies: Arc<DashMap<String, Vec<Cookie>>>,
}

impl Default for CookieJar {
    fn default() -> Self {
        Self::new()
    }
}

impl CookieJar {
    /// Create a new empty cookie jar
    pub fn new() -> Self {
        Self {
            cookies: Arc::new(DashMap::new()),
        }
    }

    /// Add a cookie, replacing one with the same name and path;
    /// an already-expired cookie only removes its predecessor
    pub fn add(&self, cookie: Cookie) {
        let mut entry = self.cookies.entry(cookie.domain.clone()).or_default();
        entry.retain(|c| c.name != cookie.name || c.path != cookie.path);
        if !cookie.is_expired() {
            entry.push(cookie);
        }
    }

    /// Add a cookie from a Set-Cookie header
    pub fn add_from_header(&self, header: &str, url: &Url) {
        match Cookie::parse(header, url) {
            Some(cookie) => {
                tracing::debug!(name = %cookie.name, domain = %cookie.domain, "Storing cookie");
                self.add(cookie);
            }
            None => tracing::debug!(%url, "Ignoring unusable Set-Cookie header"),
        }
    }

    /// Store every Set-Cookie header of a response
    pub fn store_response_cookies(&self, headers: &HeaderMap, url: &Url) {
        for value in headers.get_all(SET_COOKIE) {
            if let Ok(header) = value.to_str() {
                self.add_from_header(header, url);
            }
        }
    }

    /// Get all cookies for a URL, longest path first
    pub fn get_cookies(&self, url: &Url) -> Vec<Cookie> {
        self.remove_expired();

        let mut result: Vec<Cookie> = self
            .cookies
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|c| c.matches(url))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        result.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        result
    }

    /// Get Cookie header value for a URL
    pub fn get_cookie_header(&self, url: &Url) -> Option<String> {
        let cookies = self.get_cookies(url);
        if cookies.is_empty() {
            return None;
        }

        Some(
            cookies
                .iter()
                .map(Cookie::to_header_value)
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Remove a specific cookie
    pub fn remove(&self, name: &str, domain: &str, path: &str) {
        if let Some(mut cookies) = self.cookies.get_mut(domain) {
            cookies.retain(|c| c.name != name || c.path != path);
        }
    }

    /// Clear all cookies
    pub fn clear(&self) {
        self.cookies.clear();
    }

    fn remove_expired(&self) {
        for mut entry in self.cookies.iter_mut() {
            entry.value_mut().retain(|c| !c.is_expired());
        }
    }

    /// Get total cookie count
    pub fn len(&self) -> usize {
        self.cookies.iter().map(|e| e.value().len()).sum()
    }

    /// Check if jar is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Export all cookies as JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        let all_cookies: Vec<Cookie> = self
            .cookies
            .iter()
            .flat_map(|e| e.value().clone())
            .collect();
        serde_json::to_string(&all_cookies)
    }

    /// Import cookies from JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let cookies: Vec<Cookie> = serde_json::from_str(json)?;
        let jar = CookieJar::new();
        for cookie in cookies {
            jar.add(cookie);
        }
        Ok(jar)
    }
}
