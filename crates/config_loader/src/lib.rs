//! # Config Loader
//!
//! Configuration loading and document parsing.
//!
//! Responsibilities:
//! - Parse the TOML/JSON bridge configuration and validate it
//! - Resolve referenced document paths against the configuration file
//! - Parse marker-input and patchboard JSON documents
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("bridge.toml")).unwrap();
//! println!("tick: {}ms", config.bridge.tick_interval_ms);
//! ```

mod document;
mod marker_doc;
mod parser;
mod patchboard;
mod validator;

pub use contracts::BridgeConfig;
pub use marker_doc::parse_marker_input;
pub use parser::ConfigFormat;
pub use patchboard::parse_patchboard;

use contracts::{ContractError, MarkerInputSpec, PatchSchema};
use std::path::Path;
use tracing::debug;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    /// Relative document paths are rewritten against the file's directory.
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<BridgeConfig, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        let mut config = Self::load_from_str(&content, format)?;
        if let Some(base) = path.parent() {
            Self::resolve_paths(&mut config, base);
        }
        Ok(config)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<BridgeConfig, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Read a referenced JSON document as text
    pub fn read_document(path: &Path) -> Result<String, ContractError> {
        debug!(path = %path.display(), "reading document");
        Self::read_file(path)
    }

    /// Read and parse a marker-input document
    pub fn load_marker_input(path: &Path) -> Result<MarkerInputSpec, ContractError> {
        let text = Self::read_document(path)?;
        parse_marker_input(&text)
            .map_err(|e| ContractError::document(path.display().to_string(), e))
    }

    /// Read and parse a patchboard document
    pub fn load_patchboard(path: &Path) -> Result<PatchSchema, ContractError> {
        let text = Self::read_document(path)?;
        parse_patchboard(&text)
            .map_err(|e| ContractError::document(path.display().to_string(), e))
    }

    /// Serialize BridgeConfig to TOML string
    pub fn to_toml(config: &BridgeConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize BridgeConfig to JSON string
    pub fn to_json(config: &BridgeConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
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

    fn resolve_paths(config: &mut BridgeConfig, base: &Path) {
        let markers = config.markers.iter_mut().map(|m| &mut m.path);
        let outputs = config.outputs.iter_mut().map(|o| &mut o.path);
        for path in markers.chain(outputs) {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    /// Parse and validate configuration content
    fn parse_and_validate(
        content: &str,
        format: ConfigFormat,
    ) -> Result<BridgeConfig, ContractError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ConfigError;
    use std::fs;
    use tempfile::TempDir;

    const MINIMAL_TOML: &str = r#"
[bridge]
tick_interval_ms = 5

[[markers]]
path = "markers.json"

[[outputs]]
source_id = "emotibit1"
path = "eda.json"

[[preflight]]
command = "echo ready"
expect = "ready"
"#;

    const EDA_BOARD: &str = r#"{"patchboard": {"inputType": "EmotiBit", "outputType": "LSL",
        "settings": {"output": {"meta-data": {"channels": [
            {"name": "EDA", "type": "EDA", "nominal_srate": 15}]}}}}}"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.bridge.tick_interval_ms, 5);
        assert_eq!(config.preflight.len(), 1);
    }

    #[test]
    fn test_round_trip_toml() {
        let config = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&config).unwrap();
        let config2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(config.outputs[0].source_id, config2.outputs[0].source_id);
        assert_eq!(config.markers[0].path, config2.markers[0].path);
    }

    #[test]
    fn test_round_trip_json() {
        let config = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&config).unwrap();
        let config2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(config.bridge.tick_interval_ms, config2.bridge.tick_interval_ms);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
[[outputs]]
source_id = "dev"
path = "a.json"

[[outputs]]
source_id = "dev"
path = "b.json"
"#;
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("duplicate"));
    }

    #[test]
    fn test_load_from_path_resolves_documents() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("bridge.toml");
        fs::write(&config_path, MINIMAL_TOML).unwrap();
        fs::write(dir.path().join("eda.json"), EDA_BOARD).unwrap();

        let config = ConfigLoader::load_from_path(&config_path).unwrap();
        assert_eq!(config.outputs[0].path, dir.path().join("eda.json"));
        assert_eq!(config.markers[0].path, dir.path().join("markers.json"));

        let schema = ConfigLoader::load_patchboard(&config.outputs[0].path).unwrap();
        assert_eq!(schema.num_patches(), 1);
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bridge.yaml");
        fs::write(&path, "").unwrap();
        let err = ConfigLoader::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn test_document_error_names_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("markers.json");
        fs::write(&path, r#"{"lsl": {}}"#).unwrap();
        match ConfigLoader::load_marker_input(&path).unwrap_err() {
            ContractError::Document { document, source } => {
                assert!(document.ends_with("markers.json"));
                assert_eq!(source, ConfigError::tag_not_found("marker"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
