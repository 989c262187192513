//! Configuration loading and config file resolution
//!
//! Configuration is a single optional TOML file. Every field has a built-in
//! default, so a missing file is not an error:
//!
//! ```toml
//! [allocation]
//! min_daily_allocation = 1000
//! zero_cap_policy = "unlimited"   # or "blocked"
//! partial_match_ceiling = 0.9
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `PROMO_CONFIG` environment variable
//! 3. `<user config dir>/promo-alloc/config.toml`
//! 4. Compiled defaults (fallback)

use crate::models::ZeroCapPolicy;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "PROMO_CONFIG";

/// Minimum worthwhile allocation per campaign day
pub const DEFAULT_MIN_DAILY_ALLOCATION: u64 = 1000;

/// Highest relevance a partial (non-exact) genre match can reach
pub const DEFAULT_PARTIAL_MATCH_CEILING: f64 = 0.9;

/// Top-level TOML configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub allocation: AllocationParams,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Tunables for matching and allocation
///
/// Passed explicitly into every engine call; there is no global copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationParams {
    /// Per-day floor below which a vendor-limited allocation is not proposed (0 disables)
    #[serde(default = "default_min_daily_allocation")]
    pub min_daily_allocation: u64,

    /// Treatment of vendors whose daily cap is 0 or unset
    #[serde(default)]
    pub zero_cap_policy: ZeroCapPolicy,

    /// Scale applied to partial genre similarity, must lie in (0, 1)
    #[serde(default = "default_partial_match_ceiling")]
    pub partial_match_ceiling: f64,
}

impl Default for AllocationParams {
    fn default() -> Self {
        Self {
            min_daily_allocation: DEFAULT_MIN_DAILY_ALLOCATION,
            zero_cap_policy: ZeroCapPolicy::default(),
            partial_match_ceiling: DEFAULT_PARTIAL_MATCH_CEILING,
        }
    }
}

impl AllocationParams {
    /// Check ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        let ceiling = self.partial_match_ceiling;
        if !(ceiling > 0.0 && ceiling < 1.0) {
            return Err(Error::Config(format!(
                "partial_match_ceiling must be in (0, 1), got {}",
                ceiling
            )));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_min_daily_allocation() -> u64 {
    DEFAULT_MIN_DAILY_ALLOCATION
}

fn default_partial_match_ceiling() -> f64 {
    DEFAULT_PARTIAL_MATCH_CEILING
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        config.allocation.validate()?;
        Ok(config)
    }

    /// Load from a file; a missing file yields defaults with a warning
    ///
    /// A file that exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Config file {} not found, using built-in defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

/// Resolve which config file to read, following the priority order above
///
/// Returns `None` when no source names a file and no user config exists.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: User config directory
    default_config_path().filter(|p| p.exists())
}

/// `<user config dir>/promo-alloc/config.toml` for the current platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("promo-alloc").join("config.toml"))
}

/// Resolve and load configuration, falling back to compiled defaults
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    match resolve_config_path(cli_arg) {
        Some(path) => TomlConfig::load(&path),
        None => Ok(TomlConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.allocation.min_daily_allocation, 1000);
        assert_eq!(config.allocation.zero_cap_policy, ZeroCapPolicy::Unlimited);
        assert_eq!(config.allocation.partial_match_ceiling, 0.9);
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config, TomlConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = TomlConfig::from_toml_str(
            "[allocation]\nzero_cap_policy = \"blocked\"\n",
        )
        .unwrap();
        assert_eq!(config.allocation.zero_cap_policy, ZeroCapPolicy::Blocked);
        assert_eq!(config.allocation.min_daily_allocation, 1000);
    }

    #[test]
    fn test_ceiling_out_of_range_rejected() {
        for bad in ["1.0", "0.0", "1.5", "-0.2"] {
            let doc = format!("[allocation]\npartial_match_ceiling = {}\n", bad);
            assert!(
                matches!(TomlConfig::from_toml_str(&doc), Err(Error::Config(_))),
                "ceiling {} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let result = TomlConfig::from_toml_str("[allocation]\nzero_cap_policy = \"maybe\"\n");
        assert!(matches!(result, Err(Error::Toml(_))));
    }
}
