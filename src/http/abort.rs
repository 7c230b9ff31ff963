// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Cooperative cancellation for one in-flight request

use std::sync::Arc;

use futures::future::{AbortHandle, AbortRegistration};
use parking_lot::Mutex;

use crate::error::{Error, Result};

/// Caller-held token that cancels the request it is attached to
///
/// Clones share state, so one clone can be handed to `send` while another
/// stays with the caller. A controller attaches to a single request.
#[derive(Debug, Clone)]
pub struct AbortController {
    handle: AbortHandle,
    registration: Arc<Mutex<Option<AbortRegistration>>>,
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

impl AbortController {
    pub fn new() -> Self {
        let (handle, registration) = AbortHandle::new_pair();
        Self {
            handle,
            registration: Arc::new(Mutex::new(Some(registration))),
        }
    }

    /// Request cancellation
    ///
    /// Before resolution the request settles as aborted; afterwards this
    /// does nothing. Calling it more than once is harmless.
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Check if abort was requested
    pub fn is_aborted(&self) -> bool {
        self.handle.is_aborted()
    }

    /// Take the registration that binds this controller to a request
    pub(crate) fn register(&self) -> Result<AbortRegistration> {
        self.registration.lock().take().ok_or_else(|| {
            Error::invalid_request("abort controller is already attached to a request")
        })
    }
}
