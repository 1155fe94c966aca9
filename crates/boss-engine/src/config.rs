//! Engine configuration.
//!
//! [`EngineConfig`] carries the tunables of the pipeline with defaults for
//! every key. [`EngineConfig::load`] layers, from lowest to highest priority:
//! built-in defaults, an optional TOML/JSON file, and `BOSS_`-prefixed
//! environment variables (`BOSS_CACHE_EXPIRE_MS=500`).

use std::path::{Path, PathBuf};

use ::config::{Config, Environment, File};
use boss_core::ConfigError;
use boss_core::constants::{
    DEFAULT_CACHE_EXPIRE_MS, DEFAULT_LEDGER_MAX_AGE_MS, DEFAULT_RATING_UPDATE_INTERVAL_MS,
    DEFAULT_TOP_DAMAGERS_LIMIT,
};
use serde::{Deserialize, Serialize};

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "BOSS";

/// Configuration for a [`BossEngine`](crate::BossEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How long computed attribute multipliers stay fresh.
    pub cache_expire_ms: i64,
    /// Minimum interval between difficulty-score recomputations.
    pub rating_update_interval_ms: i64,
    /// Ledgers older than this are dropped by `purge_expired`.
    pub ledger_max_age_ms: i64,
    /// Length of the top-damagers listing in encounter reports.
    pub top_damagers_limit: usize,
    /// Log level filter string (e.g. "info", "debug", "boss_engine=trace").
    pub log_level: String,
    /// Log output format: "text" or "json".
    pub log_format: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_expire_ms: DEFAULT_CACHE_EXPIRE_MS,
            rating_update_interval_ms: DEFAULT_RATING_UPDATE_INTERVAL_MS,
            ledger_max_age_ms: DEFAULT_LEDGER_MAX_AGE_MS,
            top_damagers_limit: DEFAULT_TOP_DAMAGERS_LIMIT,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }
}

impl EngineConfig {
    /// `<config dir>/boss-engine/engine.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("boss-engine").join("engine.toml"))
    }

    /// Load from `path` (must exist) or, if `None`, from the default path
    /// when present, then apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, Environment::with_prefix(ENV_PREFIX))
    }

    fn load_with(path: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        match path {
            Some(path) => builder = builder.add_source(File::from(path).required(true)),
            None => {
                if let Some(default) = Self::default_path() {
                    builder = builder.add_source(File::from(default).required(false));
                }
            }
        }
        let cfg: EngineConfig = builder
            .add_source(env.try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("cache_expire_ms", self.cache_expire_ms),
            ("rating_update_interval_ms", self.rating_update_interval_ms),
            ("ledger_max_age_ms", self.ledger_max_age_ms),
        ] {
            if value < 0 {
                return Err(ConfigError::Invalid {
                    key,
                    reason: format!("must not be negative, got {value}"),
                });
            }
        }
        if self.top_damagers_limit == 0 {
            return Err(ConfigError::Invalid {
                key: "top_damagers_limit",
                reason: "must be at least 1".into(),
            });
        }
        if !matches!(self.log_format.as_str(), "text" | "json") {
            return Err(ConfigError::Invalid {
                key: "log_format",
                reason: format!("expected \"text\" or \"json\", got {:?}", self.log_format),
            });
        }
        Ok(())
    }
}
