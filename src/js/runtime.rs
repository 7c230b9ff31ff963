// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Script host built on boa_engine
//!
//! A [`ScriptHost`] owns one boa context and the tokio runtime that executes
//! the requests scripts start. It must be driven from a thread that is not
//! already inside a tokio runtime.

use std::future::Future;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use boa_engine::context::ContextBuilder;
use boa_engine::job::SimpleJobQueue;
use boa_engine::{js_string, Context, JsString, JsValue, NativeFunction, Source};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc;

use super::bridge::{self, Completion, HttpBridge};
use crate::error::{Error, Result};
use crate::http::{ClientConfig, HttpFacade};

const PRELUDE: &str = include_str!("http_module.js");

/// Script host configuration
#[derive(Debug, Clone)]
pub struct ScriptHostConfig {
    /// Keep console messages for [`ScriptHost::console_output`]
    pub capture_console: bool,
    /// Worker threads of the request runtime
    pub worker_threads: usize,
    /// Client config used when a script passes none
    pub client: Option<ClientConfig>,
    /// Give up waiting for in-flight requests after this long
    pub run_timeout: Option<Duration>,
}

impl Default for ScriptHostConfig {
    fn default() -> Self {
        Self {
            capture_console: true,
            worker_threads: 2,
            client: None,
            run_timeout: None,
        }
    }
}

impl ScriptHostConfig {
    pub fn capture_console(mut self, enabled: bool) -> Self {
        self.capture_console = enabled;
        self
    }

    pub fn worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads.max(1);
        self
    }

    pub fn client(mut self, config: ClientConfig) -> Self {
        self.client = Some(config);
        self
    }

    pub fn run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = Some(timeout);
        self
    }
}

/// Console message type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleMessage {
    pub level: ConsoleLevel,
    pub message: String,
}

/// Console log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Log,
    Info,
    Warn,
    Error,
    Debug,
}

impl ConsoleLevel {
    fn parse(level: &str) -> Self {
        match level {
            "info" => ConsoleLevel::Info,
            "warn" => ConsoleLevel::Warn,
            "error" => ConsoleLevel::Error,
            "debug" => ConsoleLevel::Debug,
            _ => ConsoleLevel::Log,
        }
    }
}

/// JavaScript host exposing the `http` module
pub struct ScriptHost {
    config: ScriptHostConfig,
    context: Context,
    bridge: Rc<HttpBridge>,
    completions: mpsc::UnboundedReceiver<Completion>,
    console_output: Arc<RwLock<Vec<ConsoleMessage>>>,
    facade: HttpFacade,
    runtime: Runtime,
}

impl ScriptHost {
    /// Create a host with its own facade
    pub fn new(config: ScriptHostConfig) -> Result<Self> {
        Self::with_facade(config, HttpFacade::new())
    }

    /// Create a host sharing an existing facade (cookie jar, cache, engine)
    pub fn with_facade(config: ScriptHostConfig, facade: HttpFacade) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(config.worker_threads.max(1))
            .thread_name("scriptfetch-http")
            .enable_all()
            .build()?;

        let mut context = ContextBuilder::new()
            .job_queue(Rc::new(SimpleJobQueue::new()))
            .build()
            .map_err(|e| Error::js(format!("Failed to create JS context: {}", e)))?;

        let (sender, completions) = mpsc::unbounded_channel();
        let bridge = Rc::new(HttpBridge::new(
            facade.clone(),
            runtime.handle().clone(),
            sender,
            config.client.clone(),
        ));
        let console_output = Arc::new(RwLock::new(Vec::new()));

        Self::install_console(&mut context, console_output.clone(), config.capture_console)?;
        bridge::install(&mut context, bridge.clone())?;
        context
            .eval(Source::from_bytes(PRELUDE))
            .map_err(|e| Error::js(format!("Failed to load http module: {}", e)))?;

        Ok(Self {
            config,
            context,
            bridge,
            completions,
            console_output,
            facade,
            runtime,
        })
    }

    /// Evaluate a script and run until every request it started has settled
    ///
    /// Returns the script's completion value as JSON.
    pub fn execute(&mut self, code: &str) -> Result<serde_json::Value> {
        let value = self
            .context
            .eval(Source::from_bytes(code))
            .map_err(|e| Error::js(e.to_string()))?;
        self.run_until_idle()?;
        Ok(to_json(&value, &mut self.context))
    }

    /// Drain promise jobs and settle completed requests until nothing is pending
    pub fn run_until_idle(&mut self) -> Result<()> {
        loop {
            self.context.run_jobs();
            if self.bridge.in_flight() == 0 {
                return Ok(());
            }

            let next = match self.config.run_timeout {
                Some(limit) => self
                    .runtime
                    .block_on(tokio::time::timeout(limit, self.completions.recv()))
                    .map_err(|_| Error::Timeout {
                        operation: "waiting for script requests".to_string(),
                        duration_ms: Some(limit.as_millis() as u64),
                        url: None,
                    })?,
                None => self.runtime.block_on(self.completions.recv()),
            };

            match next {
                Some(completion) => self.settle(completion)?,
                // Every sender is gone, nothing can settle anymore
                None => return Ok(()),
            }
        }
    }

    /// Read a global variable as JSON (`null` when undefined)
    pub fn global_json(&mut self, name: &str) -> Result<serde_json::Value> {
        let global = self.context.global_object();
        let value = global
            .get(JsString::from(name), &mut self.context)
            .map_err(|e| Error::js(e.to_string()))?;
        Ok(to_json(&value, &mut self.context))
    }

    /// Get console output
    pub fn console_output(&self) -> Vec<ConsoleMessage> {
        self.console_output.read().clone()
    }

    /// Clear console output
    pub fn clear_console(&self) {
        self.console_output.write().clear();
    }

    /// Facade the scripts send through
    pub fn facade(&self) -> &HttpFacade {
        &self.facade
    }

    /// Requests started from script that have not settled
    pub fn in_flight(&self) -> usize {
        self.bridge.in_flight()
    }

    /// Run a future on the host's runtime
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    fn settle(&mut self, completion: Completion) -> Result<()> {
        self.bridge.complete(&completion);
        let id = JsValue::from(completion.request_id as f64);

        let (value, error) = match completion.outcome {
            Ok(outcome) => {
                let json = serde_json::to_value(&outcome)?;
                let value = JsValue::from_json(&json, &mut self.context)
                    .map_err(|e| Error::js(e.to_string()))?;
                (value, JsValue::undefined())
            }
            Err(err) => {
                tracing::debug!(request = completion.request_id, error = %err, "Script request rejected");
                (
                    JsValue::undefined(),
                    JsValue::from(JsString::from(err.to_string())),
                )
            }
        };

        let global = self.context.global_object();
        let settle = global
            .get(js_string!("__http_settle"), &mut self.context)
            .map_err(|e| Error::js(e.to_string()))?;
        let settle = settle
            .as_callable()
            .ok_or_else(|| Error::js("http module is not loaded"))?;
        settle
            .call(&JsValue::undefined(), &[id, value, error], &mut self.context)
            .map_err(|e| Error::js(e.to_string()))?;
        Ok(())
    }

    fn install_console(
        context: &mut Context,
        output: Arc<RwLock<Vec<ConsoleMessage>>>,
        capture: bool,
    ) -> Result<()> {
        // SAFETY: the closure captures only an `Arc` of plain Rust state, no GC values.
        let console_fn = unsafe {
            NativeFunction::from_closure(move |_this, args, ctx| {
                let level = args
                    .first()
                    .map(|v| v.to_string(ctx))
                    .transpose()?
                    .map(|s| s.to_std_string_escaped())
                    .unwrap_or_default();
                let message = args
                    .get(1)
                    .map(|v| v.to_string(ctx))
                    .transpose()?
                    .map(|s| s.to_std_string_escaped())
                    .unwrap_or_default();

                let level = ConsoleLevel::parse(&level);
                match level {
                    ConsoleLevel::Error => tracing::error!(target: "scriptfetch::console", "{}", message),
                    ConsoleLevel::Warn => tracing::warn!(target: "scriptfetch::console", "{}", message),
                    ConsoleLevel::Debug => tracing::debug!(target: "scriptfetch::console", "{}", message),
                    ConsoleLevel::Log | ConsoleLevel::Info => {
                        tracing::info!(target: "scriptfetch::console", "{}", message)
                    }
                }
                if capture {
                    output.write().push(ConsoleMessage { level, message });
                }
                Ok(JsValue::undefined())
            })
        };
        bridge::register(context, "__native_console", console_fn)
    }
}

fn to_json(value: &JsValue, context: &mut Context) -> serde_json::Value {
    if value.is_undefined() {
        return serde_json::Value::Null;
    }
    value
        .to_json(context)
        .unwrap_or_else(|_| serde_json::Value::String(value.display().to_string()))
}
