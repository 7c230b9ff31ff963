// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! JavaScript host using boa_engine
//!
//! Scripts get a promise-based `http` module (also reachable through
//! `require('http')`) plus a `console` that forwards to `tracing`.

mod bridge;
mod runtime;

pub use runtime::{ConsoleLevel, ConsoleMessage, ScriptHost, ScriptHostConfig};
