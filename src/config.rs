//! Startup configuration and principal history files.
//!
//! Both files are JSON. `generalconfig.json` holds the growth parameters
//! shared by every calculation; `principalstockhistory.json` holds observed
//! principal values for display.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::core::GrowthParams;

pub const DEFAULT_CONFIG_FILE: &str = "generalconfig.json";
pub const DEFAULT_HISTORY_FILE: &str = "principalstockhistory.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    Missing(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Growth parameters loaded once at startup.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    pub principal_inflation: f64,
    pub rate_stock: f64,
    pub rate_inflation: f64,
    pub number_of_compounds_per_year: u32,
    pub annual_contribution: f64,
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let settings: Settings = read_json(path.as_ref())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.number_of_compounds_per_year == 0 {
            return Err(invalid_value("number_of_compounds_per_year", "must be > 0"));
        }
        if !self.principal_inflation.is_finite() || self.principal_inflation <= 0.0 {
            return Err(invalid_value("principal_inflation", "must be > 0"));
        }
        if !self.rate_stock.is_finite() {
            return Err(invalid_value("rate_stock", "must be finite"));
        }
        if !self.rate_inflation.is_finite() {
            return Err(invalid_value("rate_inflation", "must be finite"));
        }
        if !self.annual_contribution.is_finite() || self.annual_contribution < 0.0 {
            return Err(invalid_value("annual_contribution", "must be >= 0"));
        }
        Ok(())
    }

    pub fn params(&self, principal_stock: f64) -> GrowthParams {
        GrowthParams {
            principal_stock,
            principal_inflation: self.principal_inflation,
            rate_stock: self.rate_stock,
            rate_inflation: self.rate_inflation,
            compounds_per_year: self.number_of_compounds_per_year,
            annual_contribution: self.annual_contribution,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HistoryEntry {
    pub date: String,
    pub principal_stock: f64,
}

#[derive(Debug, Deserialize)]
struct HistoryFile {
    principal_stock_history: Vec<HistoryEntry>,
}

/// Observed principal values in file order.
pub fn load_history(path: impl AsRef<Path>) -> Result<Vec<HistoryEntry>, ConfigError> {
    let file: HistoryFile = read_json(path.as_ref())?;
    for entry in &file.principal_stock_history {
        if !entry.principal_stock.is_finite() {
            return Err(invalid_value(
                "principal_stock_history",
                &format!("non-finite principal_stock for {}", entry.date),
            ));
        }
    }
    Ok(file.principal_stock_history)
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ConfigError> {
    let display = path.display().to_string();
    if !path.is_file() {
        return Err(ConfigError::Missing(display));
    }
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: display.clone(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: display,
        source,
    })
}

fn invalid_value(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}
