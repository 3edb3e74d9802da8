//! 配置校验模块
//!
//! 校验规则：
//! - batcher 参数合法 (probe_interval_ms > 0 等)
//! - simulation 成本非负且有限
//! - producers > 0

use contracts::{BatcherFile, ContractError, SimulationConfig};

/// 校验 BatcherFile 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(file: &BatcherFile) -> Result<(), ContractError> {
    file.batcher.validate()?;
    validate_simulation(&file.simulation)?;
    Ok(())
}

/// 校验模拟负载配置
fn validate_simulation(sim: &SimulationConfig) -> Result<(), ContractError> {
    let costs = [
        ("simulation.probe_ms", sim.probe_ms),
        ("simulation.call_overhead_ms", sim.call_overhead_ms),
        ("simulation.per_item_cost_ms", sim.per_item_cost_ms),
    ];
    for (field, value) in costs {
        if !value.is_finite() || value < 0.0 {
            return Err(ContractError::config_validation(
                field,
                format!("must be finite and >= 0, got {value}"),
            ));
        }
    }

    if sim.producers == 0 {
        return Err(ContractError::config_validation(
            "simulation.producers",
            "producers must be > 0",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{BatcherConfig, ConfigVersion};

    fn minimal_file() -> BatcherFile {
        BatcherFile {
            version: ConfigVersion::V1,
            batcher: BatcherConfig::with_probe_interval_ms(50),
            simulation: SimulationConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        let file = minimal_file();
        assert!(validate(&file).is_ok());
    }

    #[test]
    fn test_zero_probe_interval() {
        let mut file = minimal_file();
        file.batcher.probe_interval_ms = 0;
        let err = validate(&file).unwrap_err().to_string();
        assert!(err.contains("probe_interval_ms must be > 0"), "got: {err}");
    }

    #[test]
    fn test_empty_name() {
        let mut file = minimal_file();
        file.batcher.name = "  ".into();
        let err = validate(&file).unwrap_err().to_string();
        assert!(err.contains("cannot be empty"), "got: {err}");
    }

    #[test]
    fn test_negative_cost() {
        let mut file = minimal_file();
        file.simulation.per_item_cost_ms = -1.0;
        let err = validate(&file).unwrap_err().to_string();
        assert!(err.contains("simulation.per_item_cost_ms"), "got: {err}");
    }

    #[test]
    fn test_zero_producers() {
        let mut file = minimal_file();
        file.simulation.producers = 0;
        let err = validate(&file).unwrap_err().to_string();
        assert!(err.contains("producers must be > 0"), "got: {err}");
    }
}
