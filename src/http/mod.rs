// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HTTP facade for embedded scripts
//!
//! `HttpFacade::send` takes a declarative request, runs it through an
//! [`HttpEngine`] and returns a plain [`SendOutcome`] that scripts can inspect
//! without knowing about native error types.

mod abort;
mod body;
mod cache;
mod config;
mod cookie;
mod engine;
mod facade;
mod request;
mod response;

pub use abort::AbortController;
pub use body::{decode_body, header_charset, meta_charset, select_encoding};
pub use cache::ResponseCache;
pub use config::{ClientConfig, EncodingPreference, FORCE_ENCODING_MARKER};
pub use cookie::{Cookie, CookieJar, SameSite};
pub use engine::{EngineRequest, EngineResponse, HttpEngine, ReqwestEngine};
pub use facade::HttpFacade;
pub use request::{HttpMethod, RequestBody, RequestDescriptor, RequestInput};
pub use response::{ErrorResult, RedirectInfo, ResponseResult, SendOutcome};

/// Default user agent string
pub const DEFAULT_USER_AGENT: &str = concat!("scriptfetch/", env!("CARGO_PKG_VERSION"));

/// Redirect hops followed when a request does not say otherwise
pub const DEFAULT_MAX_REDIRECTS: u32 = 5;

/// Idle timeout of pooled keep-alive connections
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 15_000;
