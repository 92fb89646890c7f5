//! Runtime configuration.
//!
//! # Responsibility
//! - Describe where the store and logs live and how the day is framed.
//! - Load from JSON with per-field defaults, then validate.
//!
//! # Invariants
//! - A loaded config is always validated before use.
//! - Missing fields fall back to `TimelineConfig::default()`.

use crate::layout::visibility::LayoutFilters;
use crate::logging::default_log_level;
use crate::model::day::{offset_from_minutes, TimelineDay};
use crate::model::validation::ValidationError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_DB_FILE_NAME: &str = "timeline.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimelineConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// Absolute directory for rolling log files. Logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    /// Minutes east of UTC that define local midnight.
    pub utc_offset_minutes: i32,
    pub show_hidden: bool,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
            utc_offset_minutes: 0,
            show_hidden: false,
        }
    }
}

impl TimelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ValidationError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|err| ValidationError::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ValidationError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|err| {
            ValidationError::InvalidConfig(format!("cannot read `{}`: {err}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ValidationError::InvalidConfig(
                "dbPath must not be empty".to_string(),
            ));
        }
        if let Some(log_dir) = &self.log_dir {
            if !log_dir.is_absolute() {
                return Err(ValidationError::InvalidConfig(format!(
                    "logDir must be absolute, got `{}`",
                    log_dir.display()
                )));
            }
        }
        offset_from_minutes(self.utc_offset_minutes)?;
        Ok(())
    }

    pub fn day(&self, date: NaiveDate) -> Result<TimelineDay, ValidationError> {
        TimelineDay::with_offset_minutes(date, self.utc_offset_minutes)
    }

    pub fn filters(&self) -> LayoutFilters {
        LayoutFilters {
            show_hidden: self.show_hidden,
        }
    }
}
