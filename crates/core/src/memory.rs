//! Memory bridge: the allocator the engine writes its output into.
//!
//! The engine asks for its result buffer through [`on_engine_alloc`]. Every
//! buffer handed out is owned by an [`OwnedBuffer`] in the ledger of the call
//! in progress, so it is released exactly once: either by the binding after
//! copying the output, or by the call scope if the engine never returned it.

use std::alloc::{self, Layout};
use std::cell::Cell;
use std::os::raw::{c_char, c_ulong};
use std::panic::{self, AssertUnwindSafe};
use std::ptr::{self, NonNull};

use crate::engine::call;
use crate::error::MarshalError;

/// Alignment of every bridge allocation. Covers the engine's UTF-16 output.
const BRIDGE_ALIGN: usize = std::mem::align_of::<u64>();

/// Allocation counters for the current thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BridgeStats {
    pub allocated: usize,
    pub released: usize,
}

impl BridgeStats {
    /// Buffers allocated but not yet released.
    #[must_use]
    pub fn live(&self) -> usize {
        self.allocated.saturating_sub(self.released)
    }
}

thread_local! {
    static STATS: Cell<BridgeStats> = const {
        Cell::new(BridgeStats {
            allocated: 0,
            released: 0,
        })
    };
}

/// Snapshot of the bridge counters for the calling thread.
#[must_use]
pub fn stats() -> BridgeStats {
    STATS.with(Cell::get)
}

fn bump(f: impl FnOnce(&mut BridgeStats)) {
    STATS.with(|stats| {
        let mut current = stats.get();
        f(&mut current);
        stats.set(current);
    });
}

/// A zero-initialized heap buffer released on drop.
pub(crate) struct OwnedBuffer {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl OwnedBuffer {
    pub(crate) fn allocate(size: usize) -> Option<Self> {
        if size == 0 {
            return None;
        }
        let layout = Layout::from_size_align(size, BRIDGE_ALIGN).ok()?;
        // SAFETY: `layout` has a non-zero size.
        let ptr = NonNull::new(unsafe { alloc::alloc_zeroed(layout) })?;
        bump(|s| s.allocated += 1);
        Some(Self { ptr, layout })
    }

    pub(crate) fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    pub(crate) fn as_mut_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    pub(crate) fn size(&self) -> usize {
        self.layout.size()
    }

    /// Copy out the UTF-16 string stored in the buffer, up to the first NUL.
    ///
    /// Never reads past the end of the allocation.
    pub(crate) fn read_utf16(&self) -> Result<String, MarshalError> {
        let units = self.size() / std::mem::size_of::<u16>();
        // SAFETY: the allocation is `size` initialized bytes, aligned for u16,
        // and the engine is done writing to it once the call has returned.
        let wide = unsafe { std::slice::from_raw_parts(self.ptr.as_ptr().cast::<u16>(), units) };
        let len = wide
            .iter()
            .position(|&unit| unit == 0)
            .ok_or(MarshalError::Unterminated { size: self.size() })?;
        Ok(String::from_utf16(&wide[..len])?)
    }
}

impl Drop for OwnedBuffer {
    fn drop(&mut self) {
        // SAFETY: `ptr` came from `alloc_zeroed` with this exact layout and
        // `OwnedBuffer` is its only owner.
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) };
        bump(|s| s.released += 1);
    }
}

/// Allocation callback handed to the engine.
///
/// Returns null when `size` is zero, when memory is exhausted, or when no
/// engine call is in progress on this thread.
pub extern "system" fn on_engine_alloc(size: c_ulong) -> *mut c_char {
    let allocated = panic::catch_unwind(AssertUnwindSafe(|| {
        let Ok(size) = usize::try_from(size) else {
            return ptr::null_mut();
        };
        let Some(buffer) = OwnedBuffer::allocate(size) else {
            tracing::warn!(size, "engine allocation request could not be satisfied");
            return ptr::null_mut();
        };
        let ptr = buffer.as_mut_ptr();
        match call::with_active(move |ledger| ledger.buffers.push(buffer)) {
            Some(()) => {
                tracing::trace!(size, "allocated engine buffer");
                ptr.cast::<c_char>()
            }
            None => {
                tracing::warn!(size, "engine requested memory outside of a format call");
                ptr::null_mut()
            }
        }
    }));
    allocated.unwrap_or(ptr::null_mut())
}
