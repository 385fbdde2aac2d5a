//! `validate` command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::{BridgeConfig, ContractError, ReturnCode, TransportKind};
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
    #[serde(skip_serializing_if = "Vec::is_empty")]
    documents: Vec<DocumentResult>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    transport: String,
    tick_interval_ms: u64,
    marker_count: usize,
    output_count: usize,
    preflight_count: usize,
}

/// Outcome of parsing one referenced document
#[derive(Serialize)]
struct DocumentResult {
    kind: &'static str,
    path: String,
    valid: bool,
    /// Registration result code (0 = success)
    #[serde(skip_serializing_if = "Option::is_none")]
    return_code: Option<i8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl DocumentResult {
    fn new<T>(kind: &'static str, path: &Path, result: Result<T, ContractError>) -> Self {
        let path = path.display().to_string();
        match result {
            Ok(_) => Self {
                kind,
                path,
                valid: true,
                return_code: Some(ReturnCode::Success as i8),
                error: None,
            },
            Err(e) => Self {
                kind,
                path,
                valid: false,
                return_code: match &e {
                    ContractError::Document { source, .. } => Some(source.code() as i8),
                    _ => None,
                },
                error: Some(e.to_string()),
            },
        }
    }
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
            documents: Vec::new(),
        };
    }

    let config = match ConfigLoader::load_from_path(&args.config) {
        Ok(config) => config,
        Err(e) => {
            return ValidationResult {
                valid: false,
                config_path,
                error: Some(e.to_string()),
                warnings: None,
                summary: None,
                documents: Vec::new(),
            }
        }
    };

    let documents = validate_documents(&config);
    let invalid = documents.iter().filter(|d| !d.valid).count();
    let warnings = collect_warnings(&config);

    ValidationResult {
        valid: invalid == 0,
        config_path,
        error: (invalid > 0).then(|| format!("{invalid} referenced document(s) rejected")),
        warnings: (!warnings.is_empty()).then_some(warnings),
        summary: Some(ConfigSummary {
            version: format!("{:?}", config.version),
            transport: format!("{:?}", config.transport.kind),
            tick_interval_ms: config.bridge.tick_interval_ms,
            marker_count: config.markers.len(),
            output_count: config.outputs.len(),
            preflight_count: config.preflight.len(),
        }),
        documents,
    }
}

/// Parse every referenced document the same way `run` registers them
fn validate_documents(config: &BridgeConfig) -> Vec<DocumentResult> {
    let markers = config.markers.iter().map(|m| {
        DocumentResult::new("marker", &m.path, ConfigLoader::load_marker_input(&m.path))
    });
    let outputs = config.outputs.iter().map(|o| {
        DocumentResult::new("patchboard", &o.path, ConfigLoader::load_patchboard(&o.path))
    });
    markers.chain(outputs).collect()
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &BridgeConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.markers.is_empty() && config.outputs.is_empty() {
        warnings.push("No marker inputs or outputs configured - nothing to bridge".to_string());
    }

    if config.bridge.packet_sink.is_none() {
        warnings.push("No packet_sink configured - packets will only be logged".to_string());
    }

    if config.transport.kind == TransportKind::Memory {
        warnings.push(
            "Memory transport selected - no external marker streams will connect".to_string(),
        );
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }

    if let Some(ref summary) = result.summary {
        println!("\n  Version: {}", summary.version);
        println!("  Transport: {}", summary.transport);
        println!("  Tick interval: {} ms", summary.tick_interval_ms);
        println!("  Marker inputs: {}", summary.marker_count);
        println!("  Outputs: {}", summary.output_count);
        println!("  Preflight commands: {}", summary.preflight_count);
    }

    if !result.documents.is_empty() {
        println!("\n  Documents:");
        for doc in &result.documents {
            let mark = if doc.valid { "✓" } else { "✗" };
            println!("  {} [{}] {}", mark, doc.kind, doc.path);
            if let Some(ref error) = doc.error {
                let code = doc.return_code.map(|c| format!(" (code {c})")).unwrap_or_default();
                println!("      {}{}", error, code);
            }
        }
    }

    if let Some(ref warnings) = result.warnings {
        println!("\n⚠ Warnings:");
        for warning in warnings {
            println!("  - {}", warning);
        }
    }
}
