//! Format a document in place right before it is saved.

use std::fmt;

use serde::Serialize;

use crate::engine::{FormatEngine, FormatEngineBinding};
use crate::host::{Document, DocumentTable, ReplaceOptions, SaveNotifier};
use crate::interceptor::SaveInterceptor;
use crate::options::OptionsTable;
use crate::types::Language;

/// Why a document was left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    ReadOnly,
    UnrecognizedLanguage,
    EmptyText,
    NoOptions,
    EngineFailed,
    EmptyOutput,
    ReplaceFailed,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ReadOnly => "read-only",
            Self::UnrecognizedLanguage => "unrecognized language",
            Self::EmptyText => "empty document",
            Self::NoOptions => "no options for language",
            Self::EngineFailed => "engine failed",
            Self::EmptyOutput => "engine produced no output",
            Self::ReplaceFailed => "replace failed",
        };
        f.write_str(s)
    }
}

/// What happened to a document on before-save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "kebab-case")]
pub enum FormatOutcome {
    Formatted,
    Skipped(SkipReason),
}

/// Decides whether a document gets formatted and writes the result back.
#[derive(Debug)]
pub struct FormatOrchestrator<E> {
    binding: FormatEngineBinding<E>,
    options: OptionsTable,
}

impl<E: FormatEngine> FormatOrchestrator<E> {
    #[must_use]
    pub fn new(binding: FormatEngineBinding<E>, options: OptionsTable) -> Self {
        Self { binding, options }
    }

    #[must_use]
    pub fn binding(&self) -> &FormatEngineBinding<E> {
        &self.binding
    }

    pub fn binding_mut(&mut self) -> &mut FormatEngineBinding<E> {
        &mut self.binding
    }

    #[must_use]
    pub fn options(&self) -> &OptionsTable {
        &self.options
    }

    /// Format `document` in place.
    ///
    /// Only a successful, non-empty engine result replaces the text; every
    /// other path leaves the document as it was. Never fails: the save must
    /// go ahead either way.
    pub fn on_before_save<D: Document + ?Sized>(&self, document: &mut D) -> FormatOutcome {
        let outcome = self.format_document(document);
        match outcome {
            FormatOutcome::Formatted => {
                tracing::debug!(document = document.full_name(), "formatted before save");
            }
            FormatOutcome::Skipped(reason) => {
                tracing::debug!(document = document.full_name(), %reason, "not formatted");
            }
        }
        outcome
    }

    fn format_document<D: Document + ?Sized>(&self, document: &mut D) -> FormatOutcome {
        use FormatOutcome::Skipped;

        if document.is_read_only() {
            return Skipped(SkipReason::ReadOnly);
        }
        let Some(language) = Language::from_tag(document.language()) else {
            return Skipped(SkipReason::UnrecognizedLanguage);
        };

        let text = document.text();
        if text.is_empty() {
            return Skipped(SkipReason::EmptyText);
        }

        let options = self.options.options_for(language);
        if options.is_empty() {
            return Skipped(SkipReason::NoOptions);
        }

        let result = self.binding.format(&text, options);
        if !result.succeeded {
            return Skipped(SkipReason::EngineFailed);
        }
        if result.is_empty() {
            return Skipped(SkipReason::EmptyOutput);
        }

        if let Err(e) = document.replace_text(&result.output_text, ReplaceOptions::PRESERVE) {
            tracing::warn!(document = document.full_name(), error = %e, "could not write formatted text");
            return Skipped(SkipReason::ReplaceFailed);
        }
        FormatOutcome::Formatted
    }
}

impl<E: FormatEngine + 'static> FormatOrchestrator<E> {
    /// Handle every before-save event raised by `interceptor`.
    pub fn attach_to<H>(self, interceptor: &mut SaveInterceptor<H>)
    where
        H: DocumentTable + SaveNotifier,
    {
        interceptor.on_before_save(move |document| {
            self.on_before_save(document);
        });
    }
}
