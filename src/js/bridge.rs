// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Native helpers behind the script `http` module
//!
//! boa values never leave the script thread. Arguments are converted to plain
//! Rust values here, the request runs as a tokio task, and its outcome comes
//! back to the host over a channel.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::rc::Rc;

use boa_engine::{
    js_string, Context, JsNativeError, JsResult, JsString, JsValue, NativeFunction,
};
use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::http::{
    AbortController, ClientConfig, ErrorResult, HttpFacade, RequestInput, SendOutcome,
};

/// Property the script-side `AbortController` stores its native id under
const ABORT_ID_PROPERTY: &str = "__abortId";
/// Set by the script-side `AbortController` once `abort()` was called
const ABORTED_PROPERTY: &str = "__aborted";

/// Script-side abort controller passed to `send`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ControllerRef {
    pub id: u64,
    pub aborted: bool,
}

/// Native controller attached to the request that owns it
struct Attached {
    request_id: u64,
    controller: AbortController,
}

/// Result of a request started from script
#[derive(Debug)]
pub(crate) struct Completion {
    pub request_id: u64,
    pub controller_id: Option<u64>,
    pub outcome: Result<SendOutcome>,
}

/// State shared by the native helpers and the host event loop
pub(crate) struct HttpBridge {
    facade: HttpFacade,
    handle: Handle,
    completions: mpsc::UnboundedSender<Completion>,
    default_client: Option<ClientConfig>,
    /// Only controllers attached to an unsettled request live here
    controllers: RefCell<HashMap<u64, Attached>>,
    next_request_id: Cell<u64>,
    next_controller_id: Cell<u64>,
    in_flight: Cell<usize>,
}

impl HttpBridge {
    pub fn new(
        facade: HttpFacade,
        handle: Handle,
        completions: mpsc::UnboundedSender<Completion>,
        default_client: Option<ClientConfig>,
    ) -> Self {
        Self {
            facade,
            handle,
            completions,
            default_client,
            controllers: RefCell::new(HashMap::new()),
            next_request_id: Cell::new(1),
            next_controller_id: Cell::new(1),
            in_flight: Cell::new(0),
        }
    }

    /// Requests started but not yet settled
    pub fn in_flight(&self) -> usize {
        self.in_flight.get()
    }

    /// Book-keeping once a completion has been received
    pub fn complete(&self, completion: &Completion) {
        self.in_flight.set(self.in_flight.get().saturating_sub(1));
        if let Some(id) = completion.controller_id {
            let mut controllers = self.controllers.borrow_mut();
            // A rejected second attach must not detach the owning request
            if controllers
                .get(&id)
                .map_or(false, |attached| attached.request_id == completion.request_id)
            {
                controllers.remove(&id);
            }
        }
    }

    /// Controllers currently attached to unsettled requests
    #[cfg(test)]
    pub fn attached_controllers(&self) -> usize {
        self.controllers.borrow().len()
    }

    fn new_controller_id(&self) -> u64 {
        let id = self.next_controller_id.get();
        self.next_controller_id.set(id + 1);
        id
    }

    fn abort(&self, id: u64) {
        if let Some(attached) = self.controllers.borrow().get(&id) {
            tracing::debug!(controller = id, "Abort requested from script");
            attached.controller.abort();
        }
    }

    /// Native controller for a request, created on first attach
    fn attach(&self, controller: ControllerRef, request_id: u64) -> AbortController {
        let mut controllers = self.controllers.borrow_mut();
        if let Some(attached) = controllers.get(&controller.id) {
            // Still owned by an unsettled request; the facade rejects the reuse
            return attached.controller.clone();
        }
        let native = AbortController::new();
        if controller.aborted {
            native.abort();
        }
        controllers.insert(
            controller.id,
            Attached {
                request_id,
                controller: native.clone(),
            },
        );
        native
    }

    fn start(
        &self,
        request: RequestInput,
        config: Option<ClientConfig>,
        controller: Option<ControllerRef>,
    ) -> JsResult<u64> {
        let config = config.or_else(|| self.default_client.clone());

        let request_id = self.next_request_id.get();
        self.next_request_id.set(request_id + 1);
        self.in_flight.set(self.in_flight.get() + 1);

        let controller_id = controller.map(|c| c.id);
        let controller = controller.map(|c| self.attach(c, request_id));

        let facade = self.facade.clone();
        let completions = self.completions.clone();
        self.handle.spawn(async move {
            let send = facade.send(request, config.as_ref(), controller.as_ref());
            let outcome = AssertUnwindSafe(send)
                .catch_unwind()
                .await
                .unwrap_or_else(|_panic| {
                    tracing::error!(request = request_id, "Request task panicked");
                    Ok(SendOutcome::Failure(ErrorResult::new(
                        "Internal error while sending request",
                    )))
                });
            // The host may already be gone; nobody is left to notify then
            let _ = completions.send(Completion {
                request_id,
                controller_id,
                outcome,
            });
        });

        Ok(request_id)
    }
}

/// Install the native helpers the prelude expects
pub(crate) fn install(context: &mut Context, bridge: Rc<HttpBridge>) -> Result<()> {
    let send_bridge = bridge.clone();
    // SAFETY: the closure captures only an `Rc` of plain Rust state, no GC values.
    let send_fn = unsafe {
        NativeFunction::from_closure(move |_this, args, ctx| {
            native_send(&send_bridge, args, ctx)
        })
    };
    register(context, "__native_http_send", send_fn)?;

    let controller_bridge = bridge.clone();
    // SAFETY: as above.
    let controller_fn = unsafe {
        NativeFunction::from_closure(move |_this, _args, _ctx| {
            Ok(JsValue::from(controller_bridge.new_controller_id() as f64))
        })
    };
    register(context, "__native_http_abort_controller", controller_fn)?;

    let abort_bridge = bridge;
    // SAFETY: as above.
    let abort_fn = unsafe {
        NativeFunction::from_closure(move |_this, args, _ctx| {
            if let Some(id) = args.first().and_then(JsValue::as_number) {
                abort_bridge.abort(id as u64);
            }
            Ok(JsValue::undefined())
        })
    };
    register(context, "__native_http_abort", abort_fn)?;

    Ok(())
}

/// Define a global function
pub(crate) fn register(context: &mut Context, name: &str, function: NativeFunction) -> Result<()> {
    let function = function.to_js_function(context.realm());
    let global = context.global_object();
    global
        .set(JsString::from(name), function, false, context)
        .map_err(|e| Error::js(format!("Failed to register {}: {}", name, e)))?;
    Ok(())
}

fn native_send(bridge: &HttpBridge, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let request = request_input(args.first(), ctx)?;
    let (config, controller) = split_options(args.get(1), args.get(2), ctx)?;
    let id = bridge.start(request, config, controller)?;
    Ok(JsValue::from(id as f64))
}

/// Resolve the two call shapes into `(config, controller)`
///
/// `send(req, controller)` and `send(req, config, controller)` are told apart
/// by whether the second argument is an abort controller.
fn split_options(
    second: Option<&JsValue>,
    third: Option<&JsValue>,
    ctx: &mut Context,
) -> JsResult<(Option<ClientConfig>, Option<ControllerRef>)> {
    let second = second.filter(|v| !v.is_null_or_undefined());
    let third = third.filter(|v| !v.is_null_or_undefined());

    if let Some(value) = second {
        if let Some(controller) = controller_ref(value, ctx)? {
            return Ok((None, Some(controller)));
        }
    }

    let config = second.map(|value| client_config(value, ctx)).transpose()?;
    let controller = match third {
        Some(value) => Some(
            controller_ref(value, ctx)?
                .ok_or_else(|| type_error("third argument must be an AbortController"))?,
        ),
        None => None,
    };
    Ok((config, controller))
}

fn request_input(value: Option<&JsValue>, ctx: &mut Context) -> JsResult<RequestInput> {
    let value = match value {
        Some(value) if !value.is_null_or_undefined() => value,
        _ => return Err(type_error("send() requires a URL or request options")),
    };
    if let Some(url) = value.as_string() {
        return Ok(RequestInput::Url(url.to_std_string_escaped()));
    }
    if !value.is_object() {
        return Err(type_error("request must be a URL string or an options object"));
    }
    let json = plain_json(value, ctx)?;
    let descriptor = serde_json::from_value(json)
        .map_err(|e| type_error(&format!("invalid request options: {}", e)))?;
    Ok(RequestInput::Descriptor(descriptor))
}

fn client_config(value: &JsValue, ctx: &mut Context) -> JsResult<ClientConfig> {
    if !value.is_object() {
        return Err(type_error("client options must be an object"));
    }
    let json = plain_json(value, ctx)?;
    serde_json::from_value(json).map_err(|e| type_error(&format!("invalid client options: {}", e)))
}

/// Convert an options object the way `JSON.stringify` sees it
///
/// Properties holding `undefined` or functions are dropped rather than
/// failing the conversion.
fn plain_json(value: &JsValue, ctx: &mut Context) -> JsResult<serde_json::Value> {
    let json = ctx.global_object().get(js_string!("JSON"), ctx)?;
    let stringify = json
        .as_object()
        .map(|json| json.get(js_string!("stringify"), ctx))
        .transpose()?
        .and_then(|f| f.as_callable().cloned())
        .ok_or_else(|| type_error("JSON.stringify is unavailable"))?;
    let text = stringify.call(&json, &[value.clone()], ctx)?;
    let text = text
        .as_string()
        .map(|s| s.to_std_string_escaped())
        .ok_or_else(|| type_error("options are not serializable"))?;
    serde_json::from_str(&text).map_err(|e| type_error(&format!("options are not serializable: {}", e)))
}

fn controller_ref(value: &JsValue, ctx: &mut Context) -> JsResult<Option<ControllerRef>> {
    let Some(object) = value.as_object() else {
        return Ok(None);
    };
    let Some(id) = object
        .get(JsString::from(ABORT_ID_PROPERTY), ctx)?
        .as_number()
    else {
        return Ok(None);
    };
    let aborted = object
        .get(JsString::from(ABORTED_PROPERTY), ctx)?
        .to_boolean();
    Ok(Some(ControllerRef {
        id: id as u64,
        aborted,
    }))
}

fn type_error(message: &str) -> boa_engine::JsError {
    JsNativeError::typ().with_message(message.to_string()).into()
}
