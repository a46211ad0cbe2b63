//! Binding to the external formatting engine.
//!
//! The engine speaks a small C ABI modelled on Artistic Style's
//! `AStyleMainUtf16`: it takes NUL-terminated UTF-16 source and options, an
//! error callback and an allocation callback, and returns a UTF-16 buffer it
//! obtained from the allocation callback (or null on failure). The caller
//! owns that buffer and must free it.
//!
//! [`FormatEngineBinding`] owns that contract. Whatever happens inside the
//! call, the binding returns a [`FormatResult`]; problems surface only on its
//! [`ErrorChannel`].

pub(crate) mod call;
mod library;

pub use library::LibraryEngine;

use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_ulong};
use std::panic::{self, AssertUnwindSafe};

use crate::error::MarshalError;
use crate::error_channel::{on_engine_error, ErrorChannel};
use crate::memory::on_engine_alloc;
use crate::types::{EngineError, FormatRequest, FormatResult};

use call::CallScope;

/// `void (*)(int errorNumber, const char* errorMessage)`
pub type ErrorCallback = extern "system" fn(c_int, *const c_char);

/// `char* (*)(unsigned long memoryNeeded)`
pub type AllocCallback = extern "system" fn(c_ulong) -> *mut c_char;

/// Raw entry points of a formatting engine.
///
/// Implementations forward to the real library ([`LibraryEngine`]) or, in
/// tests, emulate it in-process. They are called only through
/// [`FormatEngineBinding`].
pub trait FormatEngine {
    /// Format `source` with `options`.
    ///
    /// The returned pointer must be null or a buffer obtained from `alloc`
    /// during this call, holding NUL-terminated UTF-16.
    ///
    /// # Safety
    ///
    /// `source` and `options` must point to NUL-terminated UTF-16 strings
    /// that stay valid for the whole call.
    unsafe fn format_utf16(
        &self,
        source: *const u16,
        options: *const u16,
        on_error: ErrorCallback,
        alloc: AllocCallback,
    ) -> *mut u16;

    /// Engine-owned, NUL-terminated version string, or null.
    ///
    /// The caller copies it and never frees it.
    fn version(&self) -> *const c_char;
}

impl<E: FormatEngine + ?Sized> FormatEngine for Box<E> {
    unsafe fn format_utf16(
        &self,
        source: *const u16,
        options: *const u16,
        on_error: ErrorCallback,
        alloc: AllocCallback,
    ) -> *mut u16 {
        // SAFETY: forwarded under the caller's guarantees.
        unsafe { (**self).format_utf16(source, options, on_error, alloc) }
    }

    fn version(&self) -> *const c_char {
        (**self).version()
    }
}

/// Safe front for a [`FormatEngine`].
#[derive(Debug)]
pub struct FormatEngineBinding<E> {
    engine: E,
    errors: ErrorChannel,
}

impl<E: FormatEngine> FormatEngineBinding<E> {
    #[must_use]
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            errors: ErrorChannel::new(),
        }
    }

    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    #[must_use]
    pub fn errors(&self) -> &ErrorChannel {
        &self.errors
    }

    pub fn errors_mut(&mut self) -> &mut ErrorChannel {
        &mut self.errors
    }

    /// Format `text` with the engine.
    ///
    /// Empty `options` means "do not format": the engine is not called and a
    /// failed result comes back. Engine-reported errors and local faults are
    /// published on [`errors`](Self::errors); a fault always yields a failed
    /// result.
    pub fn format(&self, text: &str, options: &str) -> FormatResult {
        if options.is_empty() {
            tracing::trace!("no engine options, skipping engine call");
            return FormatResult::failed();
        }

        let mut reported = Vec::new();
        let outcome = self.call_engine(text, options, &mut reported);

        for error in &reported {
            self.errors.publish(error);
        }

        match outcome {
            Ok(Some(output)) => {
                tracing::trace!(
                    input_len = text.len(),
                    output_len = output.len(),
                    "engine call succeeded"
                );
                FormatResult::succeeded(output)
            }
            Ok(None) => {
                tracing::debug!("engine returned no buffer");
                FormatResult::failed()
            }
            Err(fault) => {
                tracing::debug!(error = %fault, "fault at the engine call boundary");
                self.errors.publish(&EngineError::from(fault));
                FormatResult::failed()
            }
        }
    }

    pub fn format_request(&self, request: &FormatRequest) -> FormatResult {
        self.format(request.source_text(), request.options())
    }

    /// Best-effort engine version. Empty when unavailable.
    pub fn version(&self) -> String {
        let copied = panic::catch_unwind(AssertUnwindSafe(|| {
            let ptr = self.engine.version();
            if ptr.is_null() {
                return String::new();
            }
            // SAFETY: engines hand out a NUL-terminated string they own for
            // at least the lifetime of the engine.
            unsafe { CStr::from_ptr(ptr) }
                .to_string_lossy()
                .into_owned()
        }));
        match copied {
            Ok(version) => version,
            Err(payload) => {
                self.errors
                    .publish(&EngineError::from(MarshalError::from_panic(payload)));
                String::new()
            }
        }
    }

    /// One engine call. Every buffer allocated through the bridge is released
    /// before this returns, on every path.
    fn call_engine(
        &self,
        text: &str,
        options: &str,
        reported: &mut Vec<EngineError>,
    ) -> Result<Option<String>, MarshalError> {
        let source = to_wide("source text", text)?;
        let options = to_wide("options", options)?;

        let scope = CallScope::enter()?;
        let returned = panic::catch_unwind(AssertUnwindSafe(|| {
            // SAFETY: both strings are NUL-terminated and outlive the call.
            unsafe {
                self.engine.format_utf16(
                    source.as_ptr(),
                    options.as_ptr(),
                    on_engine_error,
                    on_engine_alloc,
                )
            }
        }));
        reported.extend(scope.take_errors());

        let returned = returned.map_err(MarshalError::from_panic)?;
        if returned.is_null() {
            return Ok(None);
        }

        let buffer = scope
            .take_buffer(returned.cast_const().cast::<u8>())
            .ok_or(MarshalError::ForeignBuffer)?;
        let output = buffer.read_utf16()?;
        Ok(Some(output))
    }
}

/// Encode as NUL-terminated UTF-16. An interior NUL would silently truncate
/// the engine's view of the text, so it is rejected.
fn to_wide(what: &'static str, s: &str) -> Result<Vec<u16>, MarshalError> {
    let mut wide: Vec<u16> = s.encode_utf16().collect();
    if let Some(offset) = wide.iter().position(|&unit| unit == 0) {
        return Err(MarshalError::InteriorNul { what, offset });
    }
    wide.push(0);
    Ok(wide)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Returns the source unchanged, uppercased when the options ask for it.
    struct EchoEngine;

    unsafe fn read_wide(ptr: *const u16) -> String {
        let mut len = 0;
        // SAFETY: caller passes a NUL-terminated string.
        unsafe {
            while *ptr.add(len) != 0 {
                len += 1;
            }
            String::from_utf16_lossy(std::slice::from_raw_parts(ptr, len))
        }
    }

    impl FormatEngine for EchoEngine {
        unsafe fn format_utf16(
            &self,
            source: *const u16,
            options: *const u16,
            _on_error: ErrorCallback,
            alloc: AllocCallback,
        ) -> *mut u16 {
            // SAFETY: the binding passes valid NUL-terminated strings.
            let (source, options) = unsafe { (read_wide(source), read_wide(options)) };
            let output = if options.contains("--upper") {
                source.to_uppercase()
            } else {
                source
            };
            let wide: Vec<u16> = output.encode_utf16().chain(Some(0)).collect();
            let ptr = alloc((wide.len() * 2) as c_ulong).cast::<u16>();
            if !ptr.is_null() {
                // SAFETY: the buffer holds exactly `wide.len()` units.
                unsafe { std::ptr::copy_nonoverlapping(wide.as_ptr(), ptr, wide.len()) };
            }
            ptr
        }

        fn version(&self) -> *const c_char {
            c"3.4.13".as_ptr()
        }
    }

    #[test]
    fn test_empty_options_skip_engine() {
        let binding = FormatEngineBinding::new(EchoEngine);
        let before = memory::stats();
        let result = binding.format("int x;", "");
        assert_eq!(result, FormatResult::failed());
        assert_eq!(memory::stats(), before);
    }

    #[test]
    fn test_output_copied_and_buffer_released() {
        let binding = FormatEngineBinding::new(EchoEngine);
        let before = memory::stats();
        let result = binding.format("int x;", "--upper");
        assert!(result.succeeded);
        assert_eq!(result.output_text, "INT X;");

        let after = memory::stats();
        assert_eq!(after.allocated - before.allocated, 1);
        assert_eq!(after.released - before.released, 1);
    }

    #[test]
    fn test_non_ascii_round_trips() {
        let binding = FormatEngineBinding::new(EchoEngine);
        let result = binding.format("// größe 🦀\n", "--keep");
        assert_eq!(result.output_text, "// größe 🦀\n");
    }

    #[test]
    fn test_interior_nul_is_a_fault() {
        let mut binding = FormatEngineBinding::new(EchoEngine);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        binding
            .errors_mut()
            .subscribe(move |e| sink.borrow_mut().push(e.clone()));

        let result = binding.format("int a;\0int b;", "--keep");

        assert!(!result.succeeded);
        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].code, EngineError::MARSHALING_FAULT_CODE);
        assert!(seen[0].message.contains("interior NUL"));
    }

    #[test]
    fn test_version_is_copied() {
        let binding = FormatEngineBinding::new(EchoEngine);
        assert_eq!(binding.version(), "3.4.13");
    }

    #[test]
    fn test_format_request() {
        let binding = FormatEngineBinding::new(EchoEngine);
        let request = FormatRequest::new("abc", "--upper");
        assert_eq!(binding.format_request(&request).output_text, "ABC");
    }
}
