//! Runtime configuration read from `KEYSTASH_*` environment variables.
//!
//! Every setting has a default; a value that does not parse is replaced by
//! the default and logged once logging is up (see [`Config::warnings`]).

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use keystash_store::AppName;
use tracing::level_filters::LevelFilter;

pub const DEFAULT_ORIGIN: &str = "default";
pub const DEFAULT_TOAST_SECS: u64 = 4;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreConfig {
    /// Per-origin file under the platform config directory
    Origin(String),
    /// Explicit file path
    Path(PathBuf),
    /// Nothing is written to disk
    Memory,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub log_level: LevelFilter,
    pub store: StoreConfig,
    pub quota_bytes: Option<usize>,
    pub toast_ttl: Duration,
    warnings: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LevelFilter::INFO,
            store: StoreConfig::Origin(DEFAULT_ORIGIN.to_string()),
            quota_bytes: None,
            toast_ttl: Duration::from_secs(DEFAULT_TOAST_SECS),
            warnings: Vec::new(),
        }
    }
}

impl Config {
    /// Read the process environment.
    ///
    /// - `KEYSTASH_LOG`: `trace|debug|info|warn|error` (default `info`)
    /// - `KEYSTASH_MEMORY`: `1`/`true` keeps everything in memory
    /// - `KEYSTASH_STORE`: explicit store file
    /// - `KEYSTASH_ORIGIN`: origin name (default `default`)
    /// - `KEYSTASH_QUOTA_BYTES`: byte quota for keys plus values
    /// - `KEYSTASH_TOAST_SECS`: toast lifetime (default 4)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Config::default();
        let mut warnings = Vec::new();

        if let Some(level) = lookup("KEYSTASH_LOG") {
            config.log_level = parse_level(&level).unwrap_or_else(|| {
                warnings.push(format!("unknown log level {level:?}, using info"));
                LevelFilter::INFO
            });
        }

        let memory = lookup("KEYSTASH_MEMORY")
            .is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"));

        config.store = if memory {
            StoreConfig::Memory
        } else if let Some(path) = lookup("KEYSTASH_STORE").filter(|p| !p.trim().is_empty()) {
            StoreConfig::Path(PathBuf::from(path))
        } else {
            let origin = match lookup("KEYSTASH_ORIGIN").map(|o| o.trim().to_string()) {
                Some(origin) if AppName::is_valid_origin(&origin) => origin,
                Some(origin) if !origin.is_empty() => {
                    warnings.push(format!(
                        "ignoring KEYSTASH_ORIGIN={origin:?}: not a plain file name"
                    ));
                    DEFAULT_ORIGIN.to_string()
                }
                _ => DEFAULT_ORIGIN.to_string(),
            };
            StoreConfig::Origin(origin)
        };

        config.quota_bytes = parse_var(&lookup, "KEYSTASH_QUOTA_BYTES", &mut warnings);

        if let Some(secs) = parse_var::<u64>(&lookup, "KEYSTASH_TOAST_SECS", &mut warnings) {
            config.toast_ttl = Duration::from_secs(secs);
        }

        config.warnings = warnings;
        config
    }

    /// Problems found while reading the environment
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

fn parse_level(level: &str) -> Option<LevelFilter> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(LevelFilter::TRACE),
        "debug" => Some(LevelFilter::DEBUG),
        "info" => Some(LevelFilter::INFO),
        "warn" => Some(LevelFilter::WARN),
        "error" => Some(LevelFilter::ERROR),
        "off" => Some(LevelFilter::OFF),
        _ => None,
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    warnings: &mut Vec<String>,
) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warnings.push(format!("ignoring {name}={raw:?}: not a number"));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(config(&[]), Config::default());
    }

    #[test]
    fn reads_every_setting() {
        let config = config(&[
            ("KEYSTASH_LOG", "Debug"),
            ("KEYSTASH_ORIGIN", "work"),
            ("KEYSTASH_QUOTA_BYTES", "5242880"),
            ("KEYSTASH_TOAST_SECS", "10"),
        ]);
        assert_eq!(config.log_level, LevelFilter::DEBUG);
        assert_eq!(config.store, StoreConfig::Origin("work".into()));
        assert_eq!(config.quota_bytes, Some(5_242_880));
        assert_eq!(config.toast_ttl, Duration::from_secs(10));
        assert!(config.warnings().is_empty());
    }

    #[test]
    fn memory_wins_over_path_and_path_over_origin() {
        let with_path = config(&[("KEYSTASH_STORE", "/tmp/kv.json"), ("KEYSTASH_ORIGIN", "x")]);
        assert_eq!(with_path.store, StoreConfig::Path("/tmp/kv.json".into()));

        let memory = config(&[("KEYSTASH_STORE", "/tmp/kv.json"), ("KEYSTASH_MEMORY", "true")]);
        assert_eq!(memory.store, StoreConfig::Memory);
    }

    #[test]
    fn bad_values_fall_back_with_a_warning() {
        let config = config(&[
            ("KEYSTASH_LOG", "loud"),
            ("KEYSTASH_QUOTA_BYTES", "lots"),
            ("KEYSTASH_TOAST_SECS", "-1"),
        ]);
        assert_eq!(config.log_level, LevelFilter::INFO);
        assert_eq!(config.quota_bytes, None);
        assert_eq!(config.toast_ttl, Duration::from_secs(DEFAULT_TOAST_SECS));
        assert_eq!(config.warnings().len(), 3);
    }

    #[test]
    fn origins_with_path_separators_are_rejected() {
        for origin in ["../outside", "nested/origin", ".."] {
            let config = config(&[("KEYSTASH_ORIGIN", origin)]);
            assert_eq!(config.store, StoreConfig::Origin(DEFAULT_ORIGIN.into()));
            assert_eq!(config.warnings().len(), 1);
        }
    }
}
