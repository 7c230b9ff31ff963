// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! # scriptfetch - HTTP for embedded scripts
//!
//! A small HTTP client facade meant to be called from scripts running in an
//! embedded boa_engine context. Every call resolves to a plain response or a
//! plain error object, so scripts never deal with native error types.
//!
//! ## Features
//!
//! - One `send` call taking a URL or a request descriptor
//! - Manual redirect handling with per-hop cookies, limits and loop detection
//! - Gzip bodies decoded while the original headers are kept
//! - Charset selection from headers, `<meta>` tags or a forced label
//! - Cancellation through an abort controller
//! - Promise-based `http` module for JavaScript, with `console` forwarded to tracing
//!
//! ## Example
//!
//! ```rust,no_run
//! use scriptfetch::{ClientConfig, HttpFacade, SendOutcome};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let facade = HttpFacade::new();
//!     let config = ClientConfig::default().follow_cookies(false);
//!
//!     match facade.send("https://example.com", Some(&config), None).await? {
//!         SendOutcome::Success(response) => {
//!             println!("{} {}", response.status_code, response.reason_phrase);
//!         }
//!         SendOutcome::Failure(error) => println!("failed: {}", error.reason_phrase),
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod http;
pub mod js;

// Errors
pub use error::{Error, Result};

// HTTP
pub use http::{
    AbortController, ClientConfig, Cookie, CookieJar, ErrorResult, HttpEngine, HttpFacade,
    HttpMethod, RedirectInfo, RequestBody, RequestDescriptor, RequestInput, ResponseCache,
    ResponseResult, ReqwestEngine, SendOutcome,
};

// JavaScript
pub use js::{ConsoleLevel, ConsoleMessage, ScriptHost, ScriptHostConfig};

/// scriptfetch version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
