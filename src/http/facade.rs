// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! The `send` entry point exposed to scripts

use std::sync::Arc;
use std::time::Instant;

use futures::future::Abortable;
use reqwest::header::{
    HeaderValue, ACCEPT_ENCODING, CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, LOCATION,
    USER_AGENT,
};
use reqwest::StatusCode;

use super::abort::AbortController;
use super::body::decode_body;
use super::cache::ResponseCache;
use super::config::ClientConfig;
use super::cookie::CookieJar;
use super::engine::{EngineRequest, EngineResponse, HttpEngine, ReqwestEngine};
use super::request::{HttpMethod, PreparedRequest, RequestInput};
use super::response::{
    flatten_headers, is_persistent, ErrorResult, RedirectInfo, ResponseResult, SendOutcome,
};
use super::DEFAULT_USER_AGENT;
use crate::error::{Error, Result};

/// HTTP facade shared by every script call
///
/// Cloning is cheap; clones share the engine, cookie jar and cache.
#[derive(Clone)]
pub struct HttpFacade {
    engine: Arc<dyn HttpEngine>,
    cookie_jar: CookieJar,
    cache: ResponseCache,
}

impl Default for HttpFacade {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFacade {
    /// Create a facade backed by reqwest
    pub fn new() -> Self {
        Self::with_engine(Arc::new(ReqwestEngine::new()))
    }

    /// Create a facade over a custom engine
    pub fn with_engine(engine: Arc<dyn HttpEngine>) -> Self {
        Self {
            engine,
            cookie_jar: CookieJar::new(),
            cache: ResponseCache::new(),
        }
    }

    /// Get the cookie jar
    pub fn cookie_jar(&self) -> &CookieJar {
        &self.cookie_jar
    }

    /// Get the response cache
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Send a request
    ///
    /// Resolves to exactly one of a response or an error result. Network
    /// failures, redirect limits and cancellation are all `Ok(Failure)`;
    /// `Err` is reserved for malformed input.
    pub async fn send(
        &self,
        request: impl Into<RequestInput>,
        config: Option<&ClientConfig>,
        abort: Option<&AbortController>,
    ) -> Result<SendOutcome> {
        let descriptor = request.into().into_descriptor();
        let prepared = PreparedRequest::from_descriptor(&descriptor)?;
        let registration = abort.map(AbortController::register).transpose()?;
        let config = config.cloned().unwrap_or_default();

        let method = prepared.method;
        let url = prepared.url.to_string();
        let started = Instant::now();
        tracing::debug!(%method, %url, "Sending request");

        let exchange = self.exchange(prepared, &config);
        let result = match registration {
            Some(registration) => Abortable::new(exchange, registration)
                .await
                .unwrap_or_else(|_aborted| Err(Error::Aborted)),
            None => exchange.await,
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(response) => {
                tracing::debug!(
                    %method,
                    %url,
                    status = response.status_code,
                    redirects = response.redirects.len(),
                    elapsed_ms,
                    "Request completed"
                );
                Ok(SendOutcome::Success(response))
            }
            Err(err) if err.is_caller_error() => Err(err),
            Err(err) => {
                tracing::debug!(%method, %url, error = %err, elapsed_ms, "Request failed");
                Ok(SendOutcome::Failure(ErrorResult::from_error(&err)))
            }
        }
    }

    /// Run the request through the engine, following redirects
    async fn exchange(
        &self,
        request: PreparedRequest,
        config: &ClientConfig,
    ) -> Result<ResponseResult> {
        let mut current = request;
        let mut redirects: Vec<RedirectInfo> = Vec::new();

        loop {
            let hop = self.engine_request(&current, config);
            let (response, from_cache) = self.execute_hop(hop, config).await?;

            if config.follow_cookies && !from_cache {
                self.cookie_jar
                    .store_response_cookies(&response.headers, &current.url);
            }

            if current.follow_redirects {
                if let Some(next) = redirect_target(&current, &response)? {
                    if redirects.len() as u32 >= current.max_redirects {
                        return Err(Error::TooManyRedirects {
                            max_redirects: current.max_redirects,
                            redirect_chain: redirects.into_iter().map(|r| r.location).collect(),
                        });
                    }
                    let location = next.url.to_string();
                    if redirects.iter().any(|r| r.location == location) {
                        return Err(Error::RedirectLoop { location });
                    }

                    tracing::debug!(
                        status = response.status.as_u16(),
                        method = %next.method,
                        %location,
                        "Following redirect"
                    );
                    redirects.push(RedirectInfo {
                        status_code: response.status.as_u16(),
                        method: next.method,
                        location,
                    });
                    current = next;
                    continue;
                }
            }

            return finish(response, redirects, config);
        }
    }

    /// One exchange, answered from the cache when a fresh entry exists
    ///
    /// The flag tells whether the response came from the cache.
    async fn execute_hop(
        &self,
        hop: EngineRequest,
        config: &ClientConfig,
    ) -> Result<(EngineResponse, bool)> {
        let key = if config.cache {
            ResponseCache::key(&hop)
        } else {
            None
        };

        if let Some(key) = key.as_deref() {
            if let Some(hit) = self.cache.get(key) {
                tracing::debug!(url = %hop.url, "Serving response from cache");
                return Ok((hit, true));
            }
        }

        let url = hop.url.clone();
        let response = self.engine.execute(hop, config).await?;
        if let Some(key) = key.as_deref() {
            if self.cache.store(key, &response) {
                tracing::debug!(%url, "Cached response");
            }
        }
        Ok((response, false))
    }

    /// Wire-level request for one hop
    fn engine_request(&self, request: &PreparedRequest, config: &ClientConfig) -> EngineRequest {
        let mut headers = request.headers.clone();

        if !config.prevent_default_headers {
            headers
                .entry(USER_AGENT)
                .or_insert(HeaderValue::from_static(DEFAULT_USER_AGENT));
            if config.auto_uncompress {
                headers
                    .entry(ACCEPT_ENCODING)
                    .or_insert(HeaderValue::from_static("gzip"));
            }
        }

        if !request.persistent_connection {
            headers.insert(CONNECTION, HeaderValue::from_static("close"));
        }

        if config.follow_cookies && !headers.contains_key(COOKIE) {
            if let Some(cookie_header) = self.cookie_jar.get_cookie_header(&request.url) {
                if let Ok(value) = HeaderValue::from_str(&cookie_header) {
                    headers.insert(COOKIE, value);
                }
            }
        }

        EngineRequest {
            method: request.method,
            url: request.url.clone(),
            headers,
            body: request.body.clone(),
        }
    }
}

fn is_redirect_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

/// Next request when `response` is a redirect the facade follows
///
/// GET and HEAD follow every redirect status with the same method. Any other
/// method only follows a 303, switching to GET and dropping the body.
fn redirect_target(
    current: &PreparedRequest,
    response: &EngineResponse,
) -> Result<Option<PreparedRequest>> {
    if !is_redirect_status(response.status) {
        return Ok(None);
    }
    let Some(location) = response.headers.get(LOCATION) else {
        return Ok(None);
    };

    let method = match current.method {
        HttpMethod::Get | HttpMethod::Head => current.method,
        _ if response.status == StatusCode::SEE_OTHER => HttpMethod::Get,
        _ => return Ok(None),
    };

    let location = location
        .to_str()
        .map_err(|_| Error::Redirect("location header is not valid text".into()))?;
    let url = current
        .url
        .join(location)
        .map_err(|e| Error::Redirect(format!("bad location '{}': {}", location, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Redirect(format!(
            "unsupported redirect scheme '{}'",
            url.scheme()
        )));
    }

    let mut headers = current.headers.clone();
    let body = if method == current.method {
        current.body.clone()
    } else {
        headers.remove(CONTENT_TYPE);
        headers.remove(CONTENT_LENGTH);
        None
    };
    // The jar decides which cookies the next host receives
    headers.remove(COOKIE);

    Ok(Some(PreparedRequest {
        method,
        url,
        headers,
        body,
        follow_redirects: current.follow_redirects,
        max_redirects: current.max_redirects,
        persistent_connection: current.persistent_connection,
    }))
}

/// Turn the terminal hop into the script-visible result
fn finish(
    response: EngineResponse,
    redirects: Vec<RedirectInfo>,
    config: &ClientConfig,
) -> Result<ResponseResult> {
    let body = decode_body(&response.headers, &response.body, config)?;
    let is_redirect = !redirects.is_empty()
        || (is_redirect_status(response.status) && response.headers.contains_key(LOCATION));

    Ok(ResponseResult {
        headers: flatten_headers(&response.headers),
        is_redirect,
        persistent_connection: is_persistent(response.version, &response.headers),
        reason_phrase: response.reason_phrase(),
        status_code: response.status.as_u16(),
        body,
        redirects,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::RequestDescriptor;
    use async_trait::async_trait;
    use bytes::Bytes;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use parking_lot::Mutex;
    use reqwest::header::{HeaderMap, CONTENT_ENCODING, SET_COOKIE};
    use reqwest::Version;
    use std::collections::HashMap;
    use std::io::Write;
    use std::time::Duration;

    /// Engine answering from a fixed route table and recording every hop
    #[derive(Default)]
    struct ScriptedEngine {
        routes: HashMap<String, EngineResponse>,
        seen: Mutex<Vec<EngineRequest>>,
        delay: Option<Duration>,
    }

    impl ScriptedEngine {
        fn route(mut self, url: &str, response: EngineResponse) -> Self {
            self.routes.insert(url.to_string(), response);
            self
        }

        fn delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn seen(&self) -> Vec<EngineRequest> {
            self.seen.lock().clone()
        }
    }

    #[async_trait]
    impl HttpEngine for ScriptedEngine {
        async fn execute(
            &self,
            request: EngineRequest,
            _config: &ClientConfig,
        ) -> Result<EngineResponse> {
            self.seen.lock().push(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.routes
                .get(request.url.as_str())
                .cloned()
                .ok_or_else(|| Error::Connect {
                    url: request.url.to_string(),
                    reason: "connection refused".into(),
                })
        }
    }

    fn ok(body: &str) -> EngineResponse {
        respond(200, &[("content-type", "text/plain")], Bytes::from(body.to_string()))
    }

    fn redirect(status: u16, location: &str) -> EngineResponse {
        respond(status, &[("location", location)], Bytes::new())
    }

    fn respond(status: u16, headers: &[(&str, &str)], body: Bytes) -> EngineResponse {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.append(
                reqwest::header::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        EngineResponse {
            status: StatusCode::from_u16(status).unwrap(),
            version: Version::HTTP_11,
            headers: map,
            body,
        }
    }

    fn facade(engine: ScriptedEngine) -> (HttpFacade, Arc<ScriptedEngine>) {
        let engine = Arc::new(engine);
        (HttpFacade::with_engine(engine.clone()), engine)
    }

    #[tokio::test]
    async fn test_three_hops_then_ok() {
        let (facade, _) = facade(
            ScriptedEngine::default()
                .route("https://example.test/a", redirect(302, "/b"))
                .route("https://example.test/b", redirect(302, "https://example.test/c"))
                .route("https://example.test/c", redirect(302, "d"))
                .route("https://example.test/d", ok("done")),
        );

        let outcome = facade.send("https://example.test/a", None, None).await.unwrap();
        let response = outcome.into_response().unwrap();
        assert_eq!(response.status_code, 200);
        assert!(response.is_redirect);
        assert_eq!(response.body, "done");
        assert_eq!(response.redirects.len(), 3);
        assert_eq!(response.redirects[0].location, "https://example.test/b");
        assert_eq!(response.redirects[2].location, "https://example.test/d");
        assert!(response.redirects.iter().all(|r| r.status_code == 302));
        assert!(response.redirects.iter().all(|r| r.method == HttpMethod::Get));
    }

    #[tokio::test]
    async fn test_redirect_limit() {
        let (facade, _) = facade(
            ScriptedEngine::default()
                .route("https://example.test/a", redirect(301, "/b"))
                .route("https://example.test/b", redirect(301, "/c"))
                .route("https://example.test/c", ok("too far")),
        );

        let request = RequestDescriptor::get("https://example.test/a").max_redirects(1);
        let outcome = facade.send(request, None, None).await.unwrap();
        assert_eq!(outcome.status_code(), 0);
        assert_eq!(outcome.reason_phrase(), "Redirect limit exceeded");
    }

    #[tokio::test]
    async fn test_redirect_loop() {
        let (facade, _) = facade(
            ScriptedEngine::default()
                .route("https://example.test/a", redirect(302, "/b"))
                .route("https://example.test/b", redirect(302, "/a")),
        );

        let request = RequestDescriptor::get("https://example.test/a").max_redirects(10);
        let outcome = facade.send(request, None, None).await.unwrap();
        assert_eq!(outcome.reason_phrase(), "Redirect loop detected");
    }

    #[tokio::test]
    async fn test_redirects_not_followed() {
        let (facade, engine) = facade(
            ScriptedEngine::default().route("https://example.test/a", redirect(302, "/b")),
        );

        let request = RequestDescriptor::get("https://example.test/a").follow_redirects(false);
        let response = facade
            .send(request, None, None)
            .await
            .unwrap()
            .into_response()
            .unwrap();
        assert_eq!(response.status_code, 302);
        assert!(response.is_redirect);
        assert!(response.redirects.is_empty());
        assert_eq!(response.header("location"), Some("/b"));
        assert_eq!(engine.seen().len(), 1);
    }

    #[tokio::test]
    async fn test_post_see_other_becomes_get() {
        let (facade, engine) = facade(
            ScriptedEngine::default()
                .route("https://example.test/form", redirect(303, "/done"))
                .route("https://example.test/done", ok("thanks")),
        );

        let request = RequestDescriptor::post("https://example.test/form").body("a=1");
        let response = facade
            .send(request, None, None)
            .await
            .unwrap()
            .into_response()
            .unwrap();
        assert_eq!(response.redirects[0].method, HttpMethod::Get);

        let seen = engine.seen();
        assert_eq!(seen[1].method, HttpMethod::Get);
        assert!(seen[1].body.is_none());
        assert!(seen[1].headers.get(CONTENT_TYPE).is_none());
    }

    #[tokio::test]
    async fn test_post_found_not_followed() {
        let (facade, _) = facade(
            ScriptedEngine::default().route("https://example.test/form", redirect(302, "/x")),
        );

        let request = RequestDescriptor::post("https://example.test/form").body("a=1");
        let response = facade
            .send(request, None, None)
            .await
            .unwrap()
            .into_response()
            .unwrap();
        assert_eq!(response.status_code, 302);
        assert!(response.is_redirect);
        assert!(response.redirects.is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_is_error_result() {
        let (facade, _) = facade(ScriptedEngine::default());
        let outcome = facade.send("https://unreachable.test/", None, None).await.unwrap();
        let error = outcome.error().unwrap();
        assert_eq!(error.status_code, 0);
        assert!(error.reason_phrase.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_caller_error_propagates() {
        let (facade, engine) = facade(ScriptedEngine::default());
        assert!(facade.send("not a url", None, None).await.is_err());
        assert!(engine.seen().is_empty());
    }

    #[tokio::test]
    async fn test_gzip_passthrough_headers() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"compressed hello").unwrap();
        let gz = encoder.finish().unwrap();
        let length = gz.len().to_string();

        let (facade, engine) = facade(ScriptedEngine::default().route(
            "https://example.test/gz",
            respond(
                200,
                &[
                    ("content-encoding", "gzip"),
                    ("content-length", length.as_str()),
                    ("content-type", "text/plain"),
                ],
                Bytes::from(gz),
            ),
        ));

        let response = facade
            .send("https://example.test/gz", None, None)
            .await
            .unwrap()
            .into_response()
            .unwrap();
        assert_eq!(response.body, "compressed hello");
        assert_eq!(response.header("content-encoding"), Some("gzip"));
        assert_eq!(response.header("content-length"), Some(length.as_str()));
        assert_eq!(engine.seen()[0].headers.get(ACCEPT_ENCODING).unwrap(), "gzip");
    }

    #[tokio::test]
    async fn test_default_headers() {
        let (facade, engine) =
            facade(ScriptedEngine::default().route("https://example.test/", ok("x")));

        facade.send("https://example.test/", None, None).await.unwrap();
        let prevent = ClientConfig::default().prevent_default_headers(true).cache(false);
        facade
            .send("https://example.test/", Some(&prevent), None)
            .await
            .unwrap();

        let seen = engine.seen();
        assert_eq!(seen[0].headers.get(USER_AGENT).unwrap(), DEFAULT_USER_AGENT);
        assert!(seen[1].headers.get(USER_AGENT).is_none());
        assert!(seen[1].headers.get(ACCEPT_ENCODING).is_none());
    }

    #[tokio::test]
    async fn test_connection_close() {
        let (facade, engine) =
            facade(ScriptedEngine::default().route("https://example.test/", ok("x")));
        let request = RequestDescriptor::get("https://example.test/").persistent_connection(false);
        facade.send(request, None, None).await.unwrap();
        assert_eq!(engine.seen()[0].headers.get(CONNECTION).unwrap(), "close");
    }

    #[tokio::test]
    async fn test_cookies_across_hops() {
        let (facade, engine) = facade(
            ScriptedEngine::default()
                .route(
                    "https://example.test/login",
                    respond(
                        302,
                        &[("location", "/home"), ("set-cookie", "sid=42; Path=/")],
                        Bytes::new(),
                    ),
                )
                .route("https://example.test/home", ok("welcome")),
        );

        facade.send("https://example.test/login", None, None).await.unwrap();
        let seen = engine.seen();
        assert!(seen[0].headers.get(COOKIE).is_none());
        assert_eq!(seen[1].headers.get(COOKIE).unwrap(), "sid=42");
        assert_eq!(facade.cookie_jar().len(), 1);
    }

    #[tokio::test]
    async fn test_cookies_disabled() {
        let (facade, engine) = facade(ScriptedEngine::default().route(
            "https://example.test/",
            respond(200, &[(SET_COOKIE.as_str(), "sid=1")], Bytes::new()),
        ));
        let config = ClientConfig::default().follow_cookies(false).cache(false);
        facade.send("https://example.test/", Some(&config), None).await.unwrap();
        facade.send("https://example.test/", Some(&config), None).await.unwrap();
        assert!(facade.cookie_jar().is_empty());
        assert!(engine.seen()[1].headers.get(COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_extreme_cookie_lifetimes_still_settle() {
        let (facade, _) = facade(ScriptedEngine::default().route(
            "https://example.test/",
            respond(
                200,
                &[
                    ("set-cookie", "a=1; Max-Age=99999999999999"),
                    ("set-cookie", "b=2; Max-Age=-99999999999999999999"),
                ],
                Bytes::from("ok"),
            ),
        ));

        let outcome = facade.send("https://example.test/", None, None).await.unwrap();
        assert_eq!(outcome.status_code(), 200);
        assert_eq!(facade.cookie_jar().len(), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_and_bypass() {
        let (facade, engine) = facade(ScriptedEngine::default().route(
            "https://example.test/c",
            respond(200, &[("cache-control", "max-age=300")], Bytes::from("fresh")),
        ));

        facade.send("https://example.test/c", None, None).await.unwrap();
        let cached = facade.send("https://example.test/c", None, None).await.unwrap();
        assert_eq!(cached.response().unwrap().body, "fresh");
        assert_eq!(engine.seen().len(), 1);

        let no_cache = ClientConfig::default().cache(false);
        facade
            .send("https://example.test/c", Some(&no_cache), None)
            .await
            .unwrap();
        assert_eq!(engine.seen().len(), 2);
    }

    #[tokio::test]
    async fn test_cached_chain_still_honors_redirect_policy() {
        let (facade, engine) = facade(
            ScriptedEngine::default()
                .route("https://example.test/a", redirect(302, "/b"))
                .route("https://example.test/b", redirect(302, "/c"))
                .route("https://example.test/c", redirect(302, "/d"))
                .route(
                    "https://example.test/d",
                    respond(200, &[("cache-control", "max-age=300")], Bytes::from("done")),
                ),
        );

        let first = facade.send("https://example.test/a", None, None).await.unwrap();
        assert_eq!(first.status_code(), 200);

        let limited = RequestDescriptor::get("https://example.test/a").max_redirects(1);
        let outcome = facade.send(limited, None, None).await.unwrap();
        assert_eq!(outcome.status_code(), 0);
        assert_eq!(outcome.reason_phrase(), "Redirect limit exceeded");

        let unfollowed = RequestDescriptor::get("https://example.test/a").follow_redirects(false);
        let outcome = facade.send(unfollowed, None, None).await.unwrap();
        assert_eq!(outcome.status_code(), 302);

        let again = facade
            .send("https://example.test/a", None, None)
            .await
            .unwrap()
            .into_response()
            .unwrap();
        assert_eq!(again.body, "done");
        assert_eq!(again.redirects.len(), 3);

        let final_hops = engine
            .seen()
            .iter()
            .filter(|r| r.url.as_str() == "https://example.test/d")
            .count();
        assert_eq!(final_hops, 1);
    }

    #[tokio::test]
    async fn test_cached_body_decoded_per_request() {
        let (facade, engine) = facade(ScriptedEngine::default().route(
            "https://example.test/gbk",
            respond(
                200,
                &[
                    ("cache-control", "max-age=300"),
                    ("content-type", "text/plain; charset=utf-8"),
                ],
                Bytes::from_static(&[0xC4, 0xE3, 0xBA, 0xC3]),
            ),
        ));

        let default = facade
            .send("https://example.test/gbk", None, None)
            .await
            .unwrap()
            .into_response()
            .unwrap();
        assert_ne!(default.body, "你好");

        let forced = ClientConfig::default().encoding("gbk!");
        let decoded = facade
            .send("https://example.test/gbk", Some(&forced), None)
            .await
            .unwrap()
            .into_response()
            .unwrap();
        assert_eq!(decoded.body, "你好");
        assert_eq!(engine.seen().len(), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_does_not_replay_cookies() {
        let (facade, _) = facade(ScriptedEngine::default().route(
            "https://example.test/c",
            respond(
                200,
                &[("cache-control", "max-age=300"), ("set-cookie", "n=1")],
                Bytes::new(),
            ),
        ));

        facade.send("https://example.test/c", None, None).await.unwrap();
        facade.cookie_jar().clear();
        // The jar is empty again, so the second request carries the same headers
        facade.send("https://example.test/c", None, None).await.unwrap();
        assert!(facade.cookie_jar().is_empty());
    }

    #[tokio::test]
    async fn test_omitted_config_matches_default() {
        let routes = || {
            ScriptedEngine::default().route(
                "https://example.test/",
                respond(200, &[("set-cookie", "a=1")], Bytes::from("same")),
            )
        };
        let (first, first_engine) = facade(routes());
        let (second, second_engine) = facade(routes());

        let omitted = first.send("https://example.test/", None, None).await.unwrap();
        let explicit = second
            .send("https://example.test/", Some(&ClientConfig::default()), None)
            .await
            .unwrap();
        assert_eq!(omitted, explicit);
        assert_eq!(first_engine.seen()[0].headers, second_engine.seen()[0].headers);
        assert_eq!(first.cookie_jar().len(), second.cookie_jar().len());
    }

    #[tokio::test]
    async fn test_abort_in_flight() {
        let (facade, _) = facade(
            ScriptedEngine::default()
                .route("https://example.test/slow", ok("late"))
                .delay(Duration::from_secs(30)),
        );
        let controller = AbortController::new();

        let task = {
            let facade = facade.clone();
            let controller = controller.clone();
            tokio::spawn(async move {
                facade
                    .send("https://example.test/slow", None, Some(&controller))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        controller.abort();

        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome, SendOutcome::Failure(ErrorResult::aborted()));
    }

    #[tokio::test]
    async fn test_abort_after_resolution_is_noop() {
        let (facade, _) =
            facade(ScriptedEngine::default().route("https://example.test/", ok("fine")));
        let controller = AbortController::new();

        let outcome = facade
            .send("https://example.test/", None, Some(&controller))
            .await
            .unwrap();
        controller.abort();
        assert!(outcome.is_success());
        assert_eq!(outcome.response().unwrap().body, "fine");
    }

    #[test]
    fn test_abort_settles_once() {
        let (facade, _) = facade(
            ScriptedEngine::default()
                .route("https://example.test/", ok("x"))
                .delay(Duration::from_secs(30)),
        );
        let controller = AbortController::new();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let _guard = runtime.enter();
        let mut send = tokio_test::task::spawn(facade.send(
            "https://example.test/",
            None,
            Some(&controller),
        ));
        tokio_test::assert_pending!(send.poll());
        controller.abort();
        assert!(send.is_woken());
        let outcome = tokio_test::assert_ready!(send.poll()).unwrap();
        assert_eq!(outcome.reason_phrase(), "Request aborted");
    }

    #[tokio::test]
    async fn test_controller_reuse_rejected() {
        let (facade, _) =
            facade(ScriptedEngine::default().route("https://example.test/", ok("x")));
        let controller = AbortController::new();
        facade
            .send("https://example.test/", None, Some(&controller))
            .await
            .unwrap();
        let err = facade
            .send("https://example.test/", None, Some(&controller))
            .await
            .unwrap_err();
        assert!(err.is_caller_error());
    }
}
