//! Configuration file loading and environment variable handling.
//!
//! Precedence: CLI args > Environment vars > Config file > Defaults

use savefmt_core::OptionsTable;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Default config file content for `--config-init`.
pub const DEFAULT_CONFIG: &str = r#"# savefmt configuration
# See: savefmt --help for all options

# Path to the Artistic Style shared library.
# Default: libastyle.so / libastyle.dylib / astyle.dll on the library search path.
# library = "/usr/local/lib/libastyle.so"

# Engine options per language. An empty string disables formatting.
# Languages not listed keep their built-in defaults (only cpp is formatted).
[options]
# cpp = "--style=google --indent=spaces=2 --max-code-length=80"
# csharp = "--style=allman"
# java = "--style=java"
"#;

/// Configuration loaded from file and environment.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub library: Option<PathBuf>,
    pub options: Option<OptionsTable>,
}

impl Config {
    /// Get the config file path.
    ///
    /// - Linux/macOS: `~/.config/savefmt/config.toml`
    /// - Windows: `%APPDATA%\savefmt\config.toml`
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("savefmt").join("config.toml"))
    }

    /// Load config from file. Returns default if file doesn't exist.
    pub fn load() -> Self {
        let Some(path) = Self::path() else {
            return Self::default();
        };

        let Ok(contents) = fs::read_to_string(&path) else {
            return Self::default();
        };

        toml::from_str(&contents).unwrap_or_else(|e| {
            eprintln!("Warning: Failed to parse {}: {}", path.display(), e);
            Self::default()
        })
    }

    /// Get the engine library with precedence: env > config.
    ///
    /// `None` means "load by platform name from the default search path".
    pub fn library(&self) -> Option<PathBuf> {
        std::env::var_os("SAVEFMT_LIBRARY")
            .map(PathBuf::from)
            .or_else(|| self.library.clone())
    }

    /// Built-in options overlaid with the `[options]` table.
    pub fn options(&self) -> OptionsTable {
        let mut table = OptionsTable::default();
        if let Some(overrides) = &self.options {
            table.merge(overrides);
        }
        table
    }
}

/// Create a default config file at the standard location.
pub fn init_config() -> Result<PathBuf, String> {
    let path = Config::path().ok_or("Cannot determine config directory")?;

    if path.exists() {
        return Err(format!("Config file already exists: {}", path.display()));
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| format!("Failed to create directory: {}", e))?;
    }

    fs::write(&path, DEFAULT_CONFIG).map_err(|e| format!("Failed to write config: {}", e))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use savefmt_core::{Language, CPP_DEFAULT_OPTIONS};

    #[test]
    fn test_default_config_is_valid_toml() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).expect("DEFAULT_CONFIG should parse");
        assert_eq!(config.library, None);
        assert_eq!(config.options(), OptionsTable::default());
    }

    #[test]
    fn test_options_override_per_language() {
        let toml = r#"
library = "/opt/astyle/libastyle.so"

[options]
java = "--style=java"
cpp = ""
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.library,
            Some(PathBuf::from("/opt/astyle/libastyle.so"))
        );

        let table = config.options();
        assert_eq!(table.options_for(Language::Java), "--style=java");
        assert_eq!(table.options_for(Language::Cpp), "");
        assert_eq!(table.options_for(Language::CSharp), "");
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(
            config.options().options_for(Language::Cpp),
            CPP_DEFAULT_OPTIONS
        );
    }

    #[test]
    fn test_unknown_language_rejected() {
        let toml = r#"
[options]
python = "--whatever"
"#;
        assert!(toml::from_str::<Config>(toml).is_err());
    }
}
