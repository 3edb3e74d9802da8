//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Generate `BatcherFile`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let file = ConfigLoader::load_from_path(Path::new("batcher.toml")).unwrap();
//! println!("Probe interval: {}ms", file.batcher.probe_interval_ms);
//! ```

mod parser;
mod validator;

pub use contracts::BatcherFile;
pub use parser::ConfigFormat;
pub use validator::validate;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<BatcherFile, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<BatcherFile, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Serialize BatcherFile to TOML string
    pub fn to_toml(file: &BatcherFile) -> Result<String, ContractError> {
        toml::to_string_pretty(file)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize BatcherFile to JSON string
    pub fn to_json(file: &BatcherFile) -> Result<String, ContractError> {
        serde_json::to_string_pretty(file)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate configuration content
    fn parse_and_validate(content: &str, format: ConfigFormat) -> Result<BatcherFile, ContractError> {
        let file = parser::parse(content, format)?;
        validator::validate(&file)?;
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL_TOML: &str = r#"
[batcher]
name = "kv_writer"
probe_interval_ms = 50
avg_item_ceiling_ms = 4.0

[simulation]
probe_ms = 5.0
call_overhead_ms = 4.5
per_item_cost_ms = 0.5
producers = 2
items_per_producer = 10
payload_bytes = 16
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let file = result.unwrap();
        assert_eq!(file.batcher.name, "kv_writer");
    }

    #[test]
    fn test_round_trip_toml() {
        let file = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&file).unwrap();
        let file2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(file.batcher.name, file2.batcher.name);
        assert_eq!(file.batcher.avg_item_ceiling_ms, file2.batcher.avg_item_ceiling_ms);
        assert_eq!(file.simulation.producers, file2.simulation.producers);
    }

    #[test]
    fn test_round_trip_json() {
        let file = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&file).unwrap();
        let file2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(file.batcher.probe_interval_ms, file2.batcher.probe_interval_ms);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
[batcher]
probe_interval_ms = 0
"#;
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("probe_interval_ms"));
    }

    #[test]
    fn test_load_from_path_detects_format() {
        let mut tmp = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        tmp.write_all(MINIMAL_TOML.as_bytes()).unwrap();
        let file = ConfigLoader::load_from_path(tmp.path()).unwrap();
        assert_eq!(file.batcher.probe_interval_ms, 50);
    }

    #[test]
    fn test_load_from_path_unknown_extension() {
        let tmp = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = ConfigLoader::load_from_path(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }
}
