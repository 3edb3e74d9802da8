//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{BatcherFile, LatencyEstimate};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    name: String,
    probe_interval_ms: u64,
    packing_threshold_ms: f64,
    avg_item_ceiling_ms: f64,
    next_avg_formula: String,
    producers: usize,
    items_per_producer: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(file) => {
            let warnings = collect_warnings(&file);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", file.version),
                    name: file.batcher.name.clone(),
                    probe_interval_ms: file.batcher.probe_interval_ms,
                    packing_threshold_ms: file.batcher.packing_threshold_ms,
                    avg_item_ceiling_ms: file.batcher.avg_item_ceiling_ms,
                    next_avg_formula: format!("{:?}", file.batcher.next_avg_formula),
                    producers: file.simulation.producers,
                    items_per_producer: file.simulation.items_per_producer,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(file: &BatcherFile) -> Vec<String> {
    let mut warnings = Vec::new();
    let batcher = &file.batcher;

    let estimate = LatencyEstimate::from_probe(file.simulation.probe_ms);
    if estimate.latency_millis <= batcher.packing_threshold_ms {
        warnings.push(format!(
            "simulated latency {:.3}ms never exceeds packing_threshold_ms {}; every offer goes direct",
            estimate.latency_millis, batcher.packing_threshold_ms
        ));
    }

    if let Some(timeout) = batcher.probe_timeout_ms {
        if timeout >= batcher.probe_interval_ms {
            warnings.push(format!(
                "probe_timeout_ms {} is not below probe_interval_ms {}",
                timeout, batcher.probe_interval_ms
            ));
        }
    }

    if batcher.avg_item_ceiling_ms < batcher.packing_threshold_ms {
        warnings.push("avg_item_ceiling_ms is below packing_threshold_ms; batches will rarely grow".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Batcher: {}", summary.name);
            println!("  Probe interval: {}ms", summary.probe_interval_ms);
            println!("  Packing threshold: {}ms", summary.packing_threshold_ms);
            println!("  Avg item ceiling: {}ms", summary.avg_item_ceiling_ms);
            println!("  Formula: {}", summary.next_avg_formula);
            println!(
                "  Simulation: {} producers x {} items",
                summary.producers, summary.items_per_producer
            );
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_valid_file_with_warning() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[batcher]\nname = \"fast\"\n\n[simulation]\nprobe_ms = 0.05"
        )
        .unwrap();

        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        };
        let result = validate_config(&args);

        assert!(result.valid);
        assert_eq!(result.summary.as_ref().unwrap().name, "fast");
        assert_eq!(result.warnings.unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[batcher]\nprobe_interval_ms = 0").unwrap();

        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        };
        let result = validate_config(&args);

        assert!(!result.valid);
        assert!(result.error.unwrap().contains("probe_interval_ms"));
    }

    #[test]
    fn test_missing_file() {
        let args = ValidateArgs {
            config: "/no/such/batcher.toml".into(),
            json: false,
        };
        assert!(!validate_config(&args).valid);
    }
}
