//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::{BatcherFile, ContractError};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<BatcherFile, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<BatcherFile, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<BatcherFile, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::NextAvgFormula;

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[batcher]
name = "kv_writer"
probe_interval_ms = 50
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let file = result.unwrap();
        assert_eq!(file.batcher.name, "kv_writer");
        assert_eq!(file.batcher.probe_interval_ms, 50);
        assert_eq!(file.batcher.packing_threshold_ms, 0.1);
        assert_eq!(file.simulation.producers, 4);
    }

    #[test]
    fn test_parse_toml_full() {
        let content = r#"
[batcher]
name = "kv_writer"
probe_interval_ms = 250
packing_threshold_ms = 0.5
avg_item_ceiling_ms = 8.0
probe_timeout_ms = 100
next_avg_formula = "corrected"
failure_channel_capacity = 16

[simulation]
probe_ms = 10.0
call_overhead_ms = 9.0
per_item_cost_ms = 1.0
producers = 8
items_per_producer = 1000
payload_bytes = 128
"#;
        let file = parse_toml(content).unwrap();
        assert_eq!(file.batcher.probe_timeout_ms, Some(100));
        assert_eq!(file.batcher.next_avg_formula, NextAvgFormula::Corrected);
        assert_eq!(file.simulation.producers, 8);
        assert_eq!(file.simulation.payload_bytes, 128);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "batcher": { "name": "json_batcher", "probe_interval_ms": 20 }
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        assert_eq!(result.unwrap().batcher.probe_interval_ms, 20);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
