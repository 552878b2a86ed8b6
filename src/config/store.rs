use crate::config::{ApplyReport, Config};
use crate::error::{RerunError, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Default file name for the persisted configuration
pub const DEFAULT_CONFIG_FILE: &str = "auto-rerun.json";

/// Configuration backed by an optional JSON file
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: Option<PathBuf>,
    config: Config,
}

impl ConfigStore {
    /// Store that is never written to disk
    pub fn in_memory(config: Config) -> Self {
        Self { path: None, config }
    }

    /// Load from `path`, starting from defaults and applying each valid field.
    ///
    /// A missing file or a document that is not a JSON object yields defaults.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut config = Config::default();

        if path.exists() {
            let raw = fs::read_to_string(&path)?;
            match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(fields)) => {
                    let report = config.apply(&fields);
                    for (key, reason) in &report.rejected {
                        log::debug!("Ignoring config field '{}' from {}: {}", key, path.display(), reason);
                    }
                }
                Ok(_) => log::warn!("{} does not hold a JSON object, using defaults", path.display()),
                Err(e) => log::warn!("Failed to parse {}: {}, using defaults", path.display(), e),
            }
        } else {
            log::debug!("No config at {}, using defaults", path.display());
        }

        Ok(Self { path: Some(path), config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Apply a partial update and persist the result
    pub fn update(&mut self, patch: &Value) -> Result<ApplyReport> {
        let fields = patch
            .as_object()
            .ok_or_else(|| RerunError::Config("configuration update must be a JSON object".to_string()))?;

        let report = self.config.apply(fields);
        for (key, reason) in &report.rejected {
            log::debug!("Rejected config field '{}': {}", key, reason);
        }

        self.save()?;
        Ok(report)
    }

    /// Write the current configuration, if the store is file backed
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(&self.config)?;
        fs::write(path, json)?;
        log::debug!("Saved config to {}", path.display());
        Ok(())
    }
}
