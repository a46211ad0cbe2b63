//! Per-call state shared with the engine callbacks.
//!
//! The engine's allocation and error callbacks carry no user-data pointer, so
//! the state of the call in progress lives in a thread-local ledger. A
//! [`CallScope`] installs the ledger for the duration of one engine call and
//! frees whatever is still in it when the scope ends.

use std::cell::RefCell;
use std::marker::PhantomData;

use crate::error::MarshalError;
use crate::memory::OwnedBuffer;
use crate::types::EngineError;

/// Buffers handed to the engine and errors it reported during one call.
#[derive(Default)]
pub(crate) struct Ledger {
    pub(crate) buffers: Vec<OwnedBuffer>,
    pub(crate) errors: Vec<EngineError>,
}

thread_local! {
    static ACTIVE: RefCell<Option<Ledger>> = const { RefCell::new(None) };
}

/// Run `f` against the ledger of the call in progress on this thread.
///
/// Returns `None` when no call is active.
pub(crate) fn with_active<R>(f: impl FnOnce(&mut Ledger) -> R) -> Option<R> {
    ACTIVE.with(|active| {
        let mut active = active.try_borrow_mut().ok()?;
        active.as_mut().map(f)
    })
}

/// Guard for one engine call. Not `Send`: the ledger is thread-local.
pub(crate) struct CallScope {
    _thread_bound: PhantomData<*const ()>,
}

impl CallScope {
    pub(crate) fn enter() -> Result<Self, MarshalError> {
        ACTIVE.with(|active| {
            let mut active = active
                .try_borrow_mut()
                .map_err(|_| MarshalError::Reentrant)?;
            if active.is_some() {
                return Err(MarshalError::Reentrant);
            }
            *active = Some(Ledger::default());
            Ok(Self {
                _thread_bound: PhantomData,
            })
        })
    }

    /// Drain the errors the engine reported so far, in order.
    pub(crate) fn take_errors(&self) -> Vec<EngineError> {
        with_active(|ledger| std::mem::take(&mut ledger.errors)).unwrap_or_default()
    }

    /// Move the buffer starting at `ptr` out of the ledger.
    ///
    /// Returns `None` if the bridge never handed out that pointer in this call.
    pub(crate) fn take_buffer(&self, ptr: *const u8) -> Option<OwnedBuffer> {
        with_active(|ledger| {
            let index = ledger.buffers.iter().position(|b| b.as_ptr() == ptr)?;
            Some(ledger.buffers.swap_remove(index))
        })
        .flatten()
    }
}

impl Drop for CallScope {
    fn drop(&mut self) {
        let ledger = ACTIVE.with(|active| match active.try_borrow_mut() {
            Ok(mut active) => active.take(),
            Err(_) => None,
        });
        let Some(ledger) = ledger else {
            return;
        };
        if !ledger.buffers.is_empty() {
            tracing::warn!(
                count = ledger.buffers.len(),
                "engine allocated buffers it did not return, releasing them"
            );
        }
        if !ledger.errors.is_empty() {
            tracing::debug!(
                count = ledger.errors.len(),
                "discarding engine errors that were never collected"
            );
        }
        // Remaining buffers are released here, outside the thread-local borrow.
        drop(ledger);
    }
}
