//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{LoggerBlueprint, RemoteDestination};

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
    enabled_sinks: Vec<String>,
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
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint, std::env::var_os("MULTILOG_REMOTE_TOKEN").is_some());

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
                    version: format!("{:?}", blueprint.version),
                    enabled_sinks: blueprint
                        .enabled_sinks()
                        .iter()
                        .map(|k| k.to_string())
                        .collect(),
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
fn collect_warnings(blueprint: &LoggerBlueprint, has_remote_token: bool) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.enabled_sinks().is_empty() {
        warnings.push("No sinks enabled - events will be discarded".to_string());
    }

    if let Some(file) = blueprint.file.as_ref().filter(|f| f.enabled) {
        if !file.folder_path.exists() {
            warnings.push(format!(
                "file.folder_path '{}' does not exist yet - it will be created on first write",
                file.folder_path.display()
            ));
        }
    }

    if let Some(remote) = blueprint.remote.as_ref().filter(|r| r.enabled) {
        if let RemoteDestination::Guild {
            channel: None,
            category: Some(_),
            ..
        } = &remote.destination
        {
            warnings.push(
                "remote routes by tag under a category - untagged events are not delivered"
                    .to_string(),
            );
        }
        if !has_remote_token {
            warnings.push(
                "MULTILOG_REMOTE_TOKEN is not set - remote events will stay queued".to_string(),
            );
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Enabled sinks: {}", summary.enabled_sinks.join(", "));
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
