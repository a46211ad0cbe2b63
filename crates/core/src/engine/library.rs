//! Artistic Style loaded from a shared library at runtime.

use std::fmt;
use std::os::raw::c_char;
use std::path::{Path, PathBuf};

use libloading::Library;

use super::{AllocCallback, ErrorCallback, FormatEngine};
use crate::error::{Error, Result};

type MainUtf16Fn = unsafe extern "system" fn(
    *const u16,
    *const u16,
    ErrorCallback,
    AllocCallback,
) -> *mut u16;

type GetVersionFn = unsafe extern "system" fn() -> *const c_char;

const MAIN_SYMBOL: &str = "AStyleMainUtf16";
const VERSION_SYMBOL: &str = "AStyleGetVersion";

/// The real formatting engine, resolved from `libastyle`.
pub struct LibraryEngine {
    main: MainUtf16Fn,
    get_version: GetVersionFn,
    path: PathBuf,
    // Must outlive the function pointers above.
    _library: Library,
}

impl LibraryEngine {
    /// Base name of the engine library (`libastyle.so`, `astyle.dll`, ...).
    pub const DEFAULT_NAME: &'static str = "astyle";

    /// Load the engine from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // SAFETY: loading runs the library's initializers. The engine library
        // is chosen by the user and trusted like any other plugin.
        let library = unsafe { Library::new(path) }.map_err(|source| Error::LibraryLoad {
            path: path.to_path_buf(),
            source,
        })?;

        // SAFETY: the symbol types match the engine's exported C signatures.
        let main = unsafe { library.get::<MainUtf16Fn>(MAIN_SYMBOL.as_bytes()) }
            .map(|symbol| *symbol)
            .map_err(|source| Error::MissingSymbol {
                symbol: MAIN_SYMBOL,
                source,
            })?;
        // SAFETY: as above.
        let get_version = unsafe { library.get::<GetVersionFn>(VERSION_SYMBOL.as_bytes()) }
            .map(|symbol| *symbol)
            .map_err(|source| Error::MissingSymbol {
                symbol: VERSION_SYMBOL,
                source,
            })?;

        tracing::debug!(path = %path.display(), "loaded formatting engine");

        Ok(Self {
            main,
            get_version,
            path: path.to_path_buf(),
            _library: library,
        })
    }

    /// Load the engine by its platform library name from the default search path.
    pub fn load_default() -> Result<Self> {
        Self::load(libloading::library_filename(Self::DEFAULT_NAME))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FormatEngine for LibraryEngine {
    unsafe fn format_utf16(
        &self,
        source: *const u16,
        options: *const u16,
        on_error: ErrorCallback,
        alloc: AllocCallback,
    ) -> *mut u16 {
        // SAFETY: the caller upholds the string requirements; the callbacks
        // are plain `extern "system"` functions valid for the whole call.
        unsafe { (self.main)(source, options, on_error, alloc) }
    }

    fn version(&self) -> *const c_char {
        // SAFETY: takes no arguments and returns a static string.
        unsafe { (self.get_version)() }
    }
}

impl fmt::Debug for LibraryEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryEngine")
            .field("path", &self.path)
            .finish()
    }
}
