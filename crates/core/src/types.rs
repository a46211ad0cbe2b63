//! Core types for savefmt.
//!
//! These are the values that cross the format-invocation boundary: what goes
//! into the engine, what comes back out, and what the engine reports on the
//! side.

use std::fmt;

use serde::Serialize;

/// Source text and the engine option string to format it with.
///
/// An empty option string means "do not format".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatRequest {
    source_text: String,
    options: String,
}

impl FormatRequest {
    #[must_use]
    pub fn new(source_text: impl Into<String>, options: impl Into<String>) -> Self {
        Self {
            source_text: source_text.into(),
            options: options.into(),
        }
    }

    #[must_use]
    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    #[must_use]
    pub fn options(&self) -> &str {
        &self.options
    }

    /// True when the request carries no options and would not be formatted.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.options.is_empty()
    }
}

/// Outcome of a single engine call.
///
/// `succeeded` is true only when the engine handed back a buffer and it was
/// copied out without a fault. An empty `output_text` with `succeeded` set is
/// a valid engine answer, but callers should not write it back.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormatResult {
    pub output_text: String,
    pub succeeded: bool,
}

impl FormatResult {
    #[must_use]
    pub fn succeeded(output_text: String) -> Self {
        Self {
            output_text,
            succeeded: true,
        }
    }

    #[must_use]
    pub fn failed() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.output_text.is_empty()
    }
}

/// Where an [`EngineError`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// The engine called the error callback.
    EngineReported,
    /// Something went wrong on our side of the call boundary.
    MarshalingFault,
}

/// An error delivered out of band during an engine call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineError {
    pub code: i32,
    pub message: String,
    pub kind: ErrorKind,
}

impl EngineError {
    /// Code used for every fault raised locally at the call boundary.
    pub const MARSHALING_FAULT_CODE: i32 = -1;

    #[must_use]
    pub fn reported(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            kind: ErrorKind::EngineReported,
        }
    }

    #[must_use]
    pub fn fault(message: impl Into<String>) -> Self {
        Self {
            code: Self::MARSHALING_FAULT_CODE,
            message: message.into(),
            kind: ErrorKind::MarshalingFault,
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Languages the formatter knows how to classify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Cpp,
    CSharp,
    Java,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Cpp, Language::CSharp, Language::Java];

    /// Classify a host-provided language tag.
    ///
    /// Matching is ASCII case-insensitive and ignores surrounding whitespace.
    /// Besides the host tags (`gcc`, `avrgcc`, `c/c++`, `csharp`) this accepts
    /// the configuration keys and common short names (`c`, `cpp`, `c++`, `c#`,
    /// `java`), so a Java document is recognized and then skipped for lack of
    /// options rather than as an unknown language. Returns `None` for anything
    /// else.
    ///
    /// # Examples
    ///
    /// ```
    /// use savefmt_core::Language;
    ///
    /// assert_eq!(Language::from_tag("C/C++"), Some(Language::Cpp));
    /// assert_eq!(Language::from_tag("AvrGCC"), Some(Language::Cpp));
    /// assert_eq!(Language::from_tag("Python"), None);
    /// ```
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "gcc" | "avrgcc" | "c/c++" | "c" | "cpp" | "c++" => Some(Self::Cpp),
            "csharp" | "c#" => Some(Self::CSharp),
            "java" => Some(Self::Java),
            _ => None,
        }
    }

    /// Key used in configuration tables.
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Self::Cpp => "cpp",
            Self::CSharp => "csharp",
            Self::Java => "java",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_tags_case_insensitive() {
        assert_eq!(Language::from_tag("c/c++"), Some(Language::Cpp));
        assert_eq!(Language::from_tag("GCC"), Some(Language::Cpp));
        assert_eq!(Language::from_tag("avrgcc"), Some(Language::Cpp));
        assert_eq!(Language::from_tag("CSharp"), Some(Language::CSharp));
        assert_eq!(Language::from_tag("JAVA"), Some(Language::Java));
    }

    #[test]
    fn test_short_names_and_config_keys() {
        for language in Language::ALL {
            assert_eq!(Language::from_tag(language.key()), Some(language));
        }
        assert_eq!(Language::from_tag(" C++ "), Some(Language::Cpp));
        assert_eq!(Language::from_tag("c#"), Some(Language::CSharp));
    }

    #[test]
    fn test_unrecognized_tags() {
        assert_eq!(Language::from_tag("Python"), None);
        assert_eq!(Language::from_tag(""), None);
        assert_eq!(Language::from_tag("plaintext"), None);
    }

    #[test]
    fn test_engine_error_display() {
        let err = EngineError::reported(130, "Invalid option: --bogus");
        assert_eq!(err.to_string(), "130: Invalid option: --bogus");
        assert_eq!(err.kind, ErrorKind::EngineReported);

        let fault = EngineError::fault("returned buffer is not terminated");
        assert_eq!(fault.code, EngineError::MARSHALING_FAULT_CODE);
        assert_eq!(fault.kind, ErrorKind::MarshalingFault);
    }

    #[test]
    fn test_format_request_noop() {
        assert!(FormatRequest::new("int x;", "").is_noop());
        assert!(!FormatRequest::new("int x;", "--style=kr").is_noop());
    }

    #[test]
    fn test_failed_result_is_empty() {
        let result = FormatResult::failed();
        assert!(!result.succeeded);
        assert!(result.is_empty());
    }
}
