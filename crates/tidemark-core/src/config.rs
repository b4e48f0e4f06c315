//! Configuration for Tidemark.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`TIDEMARK__` prefix, `__` separator)
//! 2. Config file (`tidemark.toml`, optional)
//! 3. Defaults

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::TidemarkError;

/// Which bookmark manager to construct.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ManagerKind {
    /// Track the frontier and chain transactions causally.
    #[default]
    Default,
    /// Never hand out bookmarks; every transaction starts unconstrained.
    Noop,
}

/// Top-level Tidemark configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct TidemarkConfig {
    /// Manager flavour.
    pub manager: ManagerKind,

    /// Persisted frontier used to seed the manager.
    pub seed_file: Option<PathBuf>,

    /// Write every frontier update back to `seed_file`.
    pub persist: bool,

    /// Capacity of the broadcast channel carrying update events.
    pub event_capacity: usize,

    /// Default log filter when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for TidemarkConfig {
    fn default() -> Self {
        Self {
            manager: ManagerKind::default(),
            seed_file: None,
            persist: false,
            event_capacity: 1024,
            log_filter: "info".to_string(),
        }
    }
}

impl TidemarkConfig {
    /// Load from `<file_prefix>.toml` (if present) and the environment.
    pub fn load(file_prefix: &str) -> Result<Self, TidemarkError> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("TIDEMARK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded: TidemarkConfig = cfg.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    fn validate(&self) -> Result<(), TidemarkError> {
        if self.event_capacity == 0 {
            return Err(TidemarkError::Config(
                "event_capacity must be greater than zero".to_string(),
            ));
        }
        if self.persist && self.seed_file.is_none() {
            return Err(TidemarkError::Config(
                "persist requires seed_file to be set".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TidemarkConfig::default();
        assert_eq!(config.manager, ManagerKind::Default);
        assert_eq!(config.seed_file, None);
        assert!(!config.persist);
        assert_eq!(config.event_capacity, 1024);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("absent");
        let config = TidemarkConfig::load(prefix.to_str().unwrap()).unwrap();
        assert_eq!(config.event_capacity, 1024);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tidemark.toml");
        std::fs::write(
            &path,
            r#"
manager = "noop"
seed_file = "/var/lib/tidemark/frontier.json"
persist = true
event_capacity = 16
"#,
        )
        .unwrap();

        let prefix = dir.path().join("tidemark");
        let config = TidemarkConfig::load(prefix.to_str().unwrap()).unwrap();
        assert_eq!(config.manager, ManagerKind::Noop);
        assert_eq!(
            config.seed_file,
            Some(PathBuf::from("/var/lib/tidemark/frontier.json"))
        );
        assert!(config.persist);
        assert_eq!(config.event_capacity, 16);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_persist_without_seed_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.toml"), "persist = true\n").unwrap();

        let prefix = dir.path().join("bad");
        let err = TidemarkConfig::load(prefix.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, TidemarkError::Config(_)));
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cap.toml"), "event_capacity = 0\n").unwrap();

        let prefix = dir.path().join("cap");
        assert!(TidemarkConfig::load(prefix.to_str().unwrap()).is_err());
    }
}
