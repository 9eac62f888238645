//! Optional `gramex.toml` configuration.
//!
//! # Example
//!
//! ```toml
//! [parse]
//! require_full_consumption = false
//! max_depth = 512
//! max_steps = 2000000
//!
//! [precedence]
//! strict = true
//! max_rounds = 32
//! ```
//!
//! Every key is optional; missing keys keep the library defaults.

use std::path::Path;

use gramex_core::ParseOptions;
use gramex_precedence::BuildOptions;
use serde::{Deserialize, Serialize};

/// File looked up in the working directory when `--config` is not given.
pub(crate) const DEFAULT_CONFIG_FILE: &str = "gramex.toml";

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct GramexConfig {
    /// `[parse]` section: top-down driver and matcher limits.
    pub parse: ParseOptions,
    /// `[precedence]` section: table builder options.
    pub precedence: BuildOptions,
}

// ── Functions ─────────────────────────────────────────────────────────────────

/// Read and parse a config TOML file from `path`.
pub(crate) fn read_config(path: &Path) -> Result<GramexConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;

    toml::from_str(&content).map_err(|e| format!("could not parse '{}': {}", path.display(), e))
}

/// The explicit config if given, else `./gramex.toml` if it exists, else
/// defaults.
pub(crate) fn load_config(explicit: Option<&Path>) -> Result<GramexConfig, String> {
    if let Some(path) = explicit {
        return read_config(path);
    }
    let fallback = Path::new(DEFAULT_CONFIG_FILE);
    if fallback.is_file() {
        log::debug!("using {}", fallback.display());
        return read_config(fallback);
    }
    Ok(GramexConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: GramexConfig = toml::from_str(
            "[parse]\nrequire_full_consumption = false\n\n[precedence]\nstrict = true\n",
        )
        .unwrap();
        assert!(!config.parse.require_full_consumption);
        assert_eq!(config.parse.limits.max_depth, 256);
        assert_eq!(config.parse.limits.max_steps, 1_000_000);
        assert!(config.precedence.strict);
        assert_eq!(config.precedence.max_rounds, 64);
    }

    #[test]
    fn test_empty_config_is_default() {
        let config: GramexConfig = toml::from_str("").unwrap();
        assert_eq!(config, GramexConfig::default());
    }

    #[test]
    fn test_read_config_reports_path_on_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[parse]\nmax_depth = \"deep\"").unwrap();
        let err = read_config(file.path()).unwrap_err();
        assert!(err.starts_with("could not parse"), "{}", err);
    }

    #[test]
    fn test_limits_read_from_parse_section() {
        let config: GramexConfig = toml::from_str("[parse]\nmax_depth = 12\nmax_steps = 99\n").unwrap();
        assert_eq!(config.parse.limits.max_depth, 12);
        assert_eq!(config.parse.limits.max_steps, 99);
        assert!(config.parse.require_full_consumption);
    }
}
