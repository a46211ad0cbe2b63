//! Error channel: out-of-band engine errors as an observable stream.

use std::ffi::CStr;
use std::fmt;
use std::os::raw::{c_char, c_int};
use std::panic::{self, AssertUnwindSafe};

use crate::engine::call;
use crate::types::EngineError;

/// Identifies a subscriber so it can be removed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

type Subscriber = Box<dyn Fn(&EngineError)>;

/// Publish/subscribe stream of [`EngineError`]s.
///
/// Publishing never unwinds into the caller: a panicking subscriber is
/// logged and skipped, and the remaining subscribers still run.
#[derive(Default)]
pub struct ErrorChannel {
    subscribers: Vec<(SubscriberId, Subscriber)>,
    next_id: u64,
}

impl ErrorChannel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, subscriber: F) -> SubscriberId
    where
        F: Fn(&EngineError) + 'static,
    {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    /// Remove a subscriber. Returns false if it was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Deliver `error` to every subscriber, in subscription order.
    pub fn publish(&self, error: &EngineError) {
        tracing::debug!(code = error.code, kind = ?error.kind, message = %error.message, "publishing engine error");
        for (id, subscriber) in &self.subscribers {
            let delivered = panic::catch_unwind(AssertUnwindSafe(|| subscriber(error)));
            if delivered.is_err() {
                tracing::warn!(subscriber = id.0, "error subscriber panicked");
            }
        }
    }
}

impl fmt::Debug for ErrorChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorChannel")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

/// Error callback handed to the engine.
///
/// Queues the error on the call in progress; the binding publishes it once
/// the engine has returned.
pub extern "system" fn on_engine_error(code: c_int, message: *const c_char) {
    let _ = panic::catch_unwind(AssertUnwindSafe(|| {
        let message = if message.is_null() {
            String::from("(no message)")
        } else {
            // SAFETY: the engine passes a NUL-terminated string valid for the
            // duration of this callback.
            unsafe { CStr::from_ptr(message) }
                .to_string_lossy()
                .into_owned()
        };
        let error = EngineError::reported(code, message);
        if call::with_active(move |ledger| ledger.errors.push(error)).is_none() {
            tracing::warn!(code, "engine reported an error outside of a format call, dropped");
        }
    }));
}
