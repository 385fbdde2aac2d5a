//! JSON document helpers shared by the marker-input and patchboard parsers

use contracts::ConfigError;
use serde_json::Value;

/// Parse document text into a JSON tree
pub(crate) fn parse_document(text: &str) -> Result<Value, ConfigError> {
    serde_json::from_str(text)
        .map_err(|e| ConfigError::format_incorrect(format!("document is not valid JSON: {e}")))
}

/// Required member of an object node
///
/// A missing key and a non-object parent both report the key as missing.
pub(crate) fn member<'a>(node: &'a Value, key: &str) -> Result<&'a Value, ConfigError> {
    node.get(key)
        .ok_or_else(|| ConfigError::tag_not_found(key))
}

/// Walk a chain of required members, failing on the first absent key
pub(crate) fn path<'a>(node: &'a Value, keys: &[&str]) -> Result<&'a Value, ConfigError> {
    keys.iter().try_fold(node, |current, key| member(current, key))
}

/// Required string member
pub(crate) fn string_member<'a>(node: &'a Value, key: &str) -> Result<&'a str, ConfigError> {
    member(node, key)?
        .as_str()
        .ok_or_else(|| ConfigError::format_incorrect(format!("'{key}' must be a string")))
}

/// Text form of a scalar node
///
/// Numbers and booleans render as their JSON text and `null` as the empty
/// string. Arrays and objects have no text form.
pub(crate) fn scalar_text(node: &Value, key: &str) -> Result<String, ConfigError> {
    match node {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        Value::Array(_) | Value::Object(_) => Err(ConfigError::format_incorrect(format!(
            "'{key}' must be a scalar value"
        ))),
    }
}
