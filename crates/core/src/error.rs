//! Errors that are allowed to leave the core.
//!
//! Nothing that happens inside an engine call shows up here: those faults are
//! converted into [`EngineError`](crate::EngineError)s and published on the
//! error channel instead.

use std::path::PathBuf;

/// Errors that can occur while setting up or tearing down the formatter.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The engine shared library could not be opened.
    #[error("failed to load formatting engine from {path}: {source}")]
    LibraryLoad {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    /// A required entry point is missing from the engine library.
    #[error("formatting engine is missing symbol `{symbol}`: {source}")]
    MissingSymbol {
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },

    /// `register` was called while a subscription is active.
    #[error("save interceptor is already registered")]
    AlreadyRegistered,

    /// `register` was called after the subscription was released.
    #[error("save interceptor was released and cannot be registered again")]
    SubscriptionReleased,

    /// The host refused an advise or unadvise request.
    #[error("host error: {0}")]
    Host(String),
}

/// Result type alias for savefmt operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Faults raised on our side of the engine call boundary.
///
/// These never propagate: the binding turns them into a marshaling-fault
/// [`EngineError`](crate::EngineError).
#[derive(Debug, thiserror::Error)]
pub(crate) enum MarshalError {
    #[error("{what} contains an interior NUL at UTF-16 offset {offset}")]
    InteriorNul { what: &'static str, offset: usize },

    #[error("engine call re-entered on the same thread")]
    Reentrant,

    #[error("engine returned a buffer that was not allocated through the memory bridge")]
    ForeignBuffer,

    #[error("engine buffer of {size} bytes has no NUL terminator")]
    Unterminated { size: usize },

    #[error("engine output is not valid UTF-16: {0}")]
    InvalidUtf16(#[from] std::string::FromUtf16Error),

    #[error("engine call panicked: {0}")]
    Panicked(String),
}

impl MarshalError {
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self::Panicked(message)
    }
}

impl From<MarshalError> for crate::EngineError {
    fn from(err: MarshalError) -> Self {
        crate::EngineError::fault(err.to_string())
    }
}
