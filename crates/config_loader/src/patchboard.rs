//! Patchboard document parser
//!
//! A patchboard describes the channels a device source publishes:
//!
//! ```json
//! {
//!   "patchboard": {
//!     "inputType": "EmotiBit",
//!     "outputType": "LSL",
//!     "patches": { "EA": "EDA", "PI": "PPG_IR" },
//!     "settings": { "output": { "meta-data": { "channels": [
//!       { "name": "EDA", "type": "EDA", "nominal_srate": 15.0 },
//!       { "name": "PPG_IR", "type": "PPG", "nominal_srate": 25.0 }
//!     ] } } }
//!   }
//! }
//! ```
//!
//! `patches` is optional; without it each channel is patched from a type
//! tag equal to its own name. It may also be written as an array of
//! `{ "input": .., "output": .. }` objects.

use std::collections::{BTreeMap, HashSet};

use contracts::{
    ChannelDescriptor, ConfigError, PatchSchema, SUPPORTED_INPUT_TYPE, SUPPORTED_OUTPUT_TYPE,
};
use serde_json::Value;
use tracing::warn;

use crate::document::{member, parse_document, path, string_member};

const CHANNELS_PATH: [&str; 4] = ["settings", "output", "meta-data", "channels"];

/// Parse and validate a patchboard document
///
/// Checks run in a fixed order and the first failure is returned:
/// families present, families supported, channel path present, channel
/// list shape, then each channel entry.
///
/// # Errors
/// - `TagNotFound` naming the first missing key
/// - `ValueMismatch` for an unsupported input or output family
/// - `FormatIncorrect` for a non-array or empty channel list, malformed
///   entries, duplicate channel names or a malformed `patches` member
pub fn parse_patchboard(text: &str) -> Result<PatchSchema, ConfigError> {
    let doc = parse_document(text)?;
    let board = member(&doc, "patchboard")?;

    let input_type = string_member(board, "inputType")?;
    let output_type = string_member(board, "outputType")?;
    if input_type != SUPPORTED_INPUT_TYPE {
        return Err(ConfigError::value_mismatch(format!(
            "supported patchboard input types: {SUPPORTED_INPUT_TYPE}, got '{input_type}'"
        )));
    }
    if output_type != SUPPORTED_OUTPUT_TYPE {
        return Err(ConfigError::value_mismatch(format!(
            "supported patchboard output types: {SUPPORTED_OUTPUT_TYPE}, got '{output_type}'"
        )));
    }

    let channels = parse_channels(path(board, &CHANNELS_PATH)?)?;
    let patches = match board.get("patches") {
        Some(value) => parse_patches(value)?,
        None => channels
            .iter()
            .map(|c| (c.name.clone(), c.name.clone()))
            .collect(),
    };

    for (tag, name) in &patches {
        if !channels.iter().any(|c| &c.name == name) {
            warn!(type_tag = %tag, channel = %name, "patch targets an undeclared channel");
        }
    }

    Ok(PatchSchema {
        input_type: input_type.to_string(),
        output_type: output_type.to_string(),
        patches,
        channels,
    })
}

fn parse_channels(node: &Value) -> Result<Vec<ChannelDescriptor>, ConfigError> {
    let entries = node
        .as_array()
        .ok_or_else(|| ConfigError::format_incorrect("channels must be an array"))?;
    if entries.is_empty() {
        return Err(ConfigError::format_incorrect(
            "channels must be a non-empty array",
        ));
    }

    let mut seen = HashSet::new();
    let mut channels = Vec::with_capacity(entries.len());
    for entry in entries {
        let name = string_member(entry, "name")?;
        let channel_type = string_member(entry, "type")?;
        let nominal_srate = member(entry, "nominal_srate")?.as_f64().ok_or_else(|| {
            ConfigError::format_incorrect(format!("channels[{name}].nominal_srate must be a number"))
        })?;

        if !seen.insert(name) {
            return Err(ConfigError::format_incorrect(format!(
                "duplicate channel name '{name}'"
            )));
        }

        channels.push(ChannelDescriptor {
            name: name.to_string(),
            channel_type: channel_type.to_string(),
            nominal_srate,
        });
    }
    Ok(channels)
}

fn parse_patches(node: &Value) -> Result<BTreeMap<String, String>, ConfigError> {
    match node {
        Value::Object(map) => map
            .iter()
            .map(|(tag, name)| {
                name.as_str()
                    .map(|n| (tag.clone(), n.to_string()))
                    .ok_or_else(|| {
                        ConfigError::format_incorrect(format!("patches[{tag}] must be a string"))
                    })
            })
            .collect(),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                let input = string_member(item, "input")?;
                let output = string_member(item, "output")?;
                Ok((input.to_string(), output.to_string()))
            })
            .collect(),
        _ => Err(ConfigError::format_incorrect(
            "patches must be an object or an array",
        )),
    }
}
