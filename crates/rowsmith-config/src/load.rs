use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::errors::{ConfigError, Result};
use crate::model::{GenerationConfig, TableRule};

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(ConfigFormat::Json),
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Ok(ConfigFormat::Toml),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

/// A table entry that could not be parsed. The rest of the file still loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedTable {
    /// Position of the entry in `tables`.
    pub index: usize,
    pub table_name: Option<String>,
    pub reason: String,
}

/// Parsed configuration plus per-table rejections.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: GenerationConfig,
    pub rejected: Vec<RejectedTable>,
    /// Raw document, used for structural validation.
    pub raw: Value,
    pub source: Option<PathBuf>,
}

/// Load a configuration file (`.json` or `.toml`).
pub fn load_config(path: &Path) -> Result<LoadedConfig> {
    let format = ConfigFormat::from_path(path)?;
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut loaded = parse_config_str(&text, format)?;
    loaded.source = Some(path.to_path_buf());
    debug!(
        path = %path.display(),
        tables = loaded.config.tables.len(),
        rejected = loaded.rejected.len(),
        "configuration loaded"
    );
    Ok(loaded)
}

pub fn parse_config_str(text: &str, format: ConfigFormat) -> Result<LoadedConfig> {
    let value: Value = match format {
        ConfigFormat::Json => serde_json::from_str(text)?,
        ConfigFormat::Toml => toml::from_str(text)?,
    };
    parse_config_value(value)
}

/// Split a raw document into typed sections.
///
/// `database` and `global_settings` must parse or the whole document is
/// rejected. Each `tables` entry is parsed on its own; entries that fail
/// (unknown rule type, wrong field type) are reported in `rejected`.
pub fn parse_config_value(value: Value) -> Result<LoadedConfig> {
    let Value::Object(root) = &value else {
        return Err(ConfigError::Invalid(
            "configuration root must be an object".to_string(),
        ));
    };

    let database = section(root, "database")?;
    let global_settings = section(root, "global_settings")?;

    let entries = match root.get("tables") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(entries)) => entries.clone(),
        Some(_) => {
            return Err(ConfigError::Invalid("`tables` must be an array".to_string()));
        }
    };

    let mut tables = Vec::with_capacity(entries.len());
    let mut rejected = Vec::new();
    for (index, entry) in entries.into_iter().enumerate() {
        let table_name = entry
            .get("table_name")
            .and_then(Value::as_str)
            .map(str::to_string);
        match serde_json::from_value::<TableRule>(entry) {
            Ok(rule) => tables.push(rule),
            Err(err) => {
                warn!(
                    index,
                    table = table_name.as_deref().unwrap_or("<unnamed>"),
                    error = %err,
                    "table configuration rejected"
                );
                rejected.push(RejectedTable {
                    index,
                    table_name,
                    reason: err.to_string(),
                });
            }
        }
    }

    Ok(LoadedConfig {
        config: GenerationConfig {
            database,
            tables,
            global_settings,
        },
        rejected,
        raw: value,
        source: None,
    })
}

fn section<T: DeserializeOwned + Default>(root: &Map<String, Value>, key: &str) -> Result<T> {
    match root.get(key) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|err| ConfigError::Invalid(format!("`{key}`: {err}"))),
    }
}
