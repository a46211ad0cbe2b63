//! Engine options per language.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::Language;

/// Google-derived style used for C and C++ unless configured otherwise.
pub const CPP_DEFAULT_OPTIONS: &str = "--style=google --indent=spaces=2 --indent-modifiers \
--indent-switches --indent-cases --indent-preproc-define --indent-col1-comments \
--min-conditional-indent=0 --pad-oper --pad-header --align-pointer=type \
--align-reference=type --add-brackets --close-templates --max-code-length=80 \
--break-after-logical";

/// Maps each language to the option string passed to the engine.
///
/// Languages without an entry are not formatted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, String>",
    into = "BTreeMap<String, String>"
)]
pub struct OptionsTable {
    entries: BTreeMap<Language, String>,
}

impl Default for OptionsTable {
    fn default() -> Self {
        Self::empty().with(Language::Cpp, CPP_DEFAULT_OPTIONS)
    }
}

impl OptionsTable {
    /// A table that formats nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, language: Language, options: impl Into<String>) -> Self {
        self.set(language, options);
        self
    }

    pub fn set(&mut self, language: Language, options: impl Into<String>) {
        self.entries.insert(language, options.into());
    }

    /// Options for `language`, or `""` when it should not be formatted.
    #[must_use]
    pub fn options_for(&self, language: Language) -> &str {
        self.entries.get(&language).map_or("", String::as_str)
    }

    /// Overlay `overrides` on this table, entry by entry.
    ///
    /// An empty string in `overrides` turns formatting off for that language.
    pub fn merge(&mut self, overrides: &OptionsTable) {
        for (language, options) in &overrides.entries {
            self.entries.insert(*language, options.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Language, &str)> {
        self.entries.iter().map(|(l, o)| (*l, o.as_str()))
    }
}

impl TryFrom<BTreeMap<String, String>> for OptionsTable {
    type Error = String;

    fn try_from(raw: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        let mut table = Self::empty();
        for (tag, options) in raw {
            let language =
                Language::from_tag(&tag).ok_or_else(|| format!("unknown language `{tag}`"))?;
            table.set(language, options);
        }
        Ok(table)
    }
}

impl From<OptionsTable> for BTreeMap<String, String> {
    fn from(table: OptionsTable) -> Self {
        table
            .entries
            .into_iter()
            .map(|(language, options)| (language.key().to_string(), options))
            .collect()
    }
}
