//! Output stream model
//!
//! Patch schemas parsed from patchboard documents and the stream
//! descriptions handed to the publisher.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::SourceId;

/// Only patchboard input family the bridge understands
pub const SUPPORTED_INPUT_TYPE: &str = "EmotiBit";

/// Only patchboard output family the bridge understands
pub const SUPPORTED_OUTPUT_TYPE: &str = "LSL";

/// Numeric encoding of a published channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelFormat {
    #[default]
    Float32,
}

/// One output channel declared in a patchboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDescriptor {
    /// Stream name (e.g. "EDA")
    pub name: String,

    /// Stream content type (e.g. "float", "PPG")
    #[serde(rename = "type")]
    pub channel_type: String,

    /// Nominal sampling rate (Hz)
    pub nominal_srate: f64,
}

/// Parsed patchboard for one source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchSchema {
    /// Patchboard input family, always [`SUPPORTED_INPUT_TYPE`]
    pub input_type: String,

    /// Patchboard output family, always [`SUPPORTED_OUTPUT_TYPE`]
    pub output_type: String,

    /// Device type tag -> output channel name
    pub patches: BTreeMap<String, String>,

    /// Declared output channels, in document order
    pub channels: Vec<ChannelDescriptor>,
}

impl PatchSchema {
    /// Number of patches (type tag mappings)
    pub fn num_patches(&self) -> usize {
        self.patches.len()
    }

    /// Output channel name patched from a device type tag
    pub fn channel_for(&self, type_tag: &str) -> Option<&str> {
        self.patches.get(type_tag).map(String::as_str)
    }

    /// Declared channel by name
    pub fn channel(&self, name: &str) -> Option<&ChannelDescriptor> {
        self.channels.iter().find(|c| c.name == name)
    }
}

/// Key of one published output channel
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputChannelKey {
    pub source_id: SourceId,
    pub channel_name: String,
}

impl OutputChannelKey {
    pub fn new(source_id: impl Into<SourceId>, channel_name: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            channel_name: channel_name.into(),
        }
    }
}

impl fmt::Display for OutputChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.source_id, self.channel_name)
    }
}

/// Description of a stream to publish
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub name: String,
    pub channel_type: String,
    pub channel_count: u32,
    pub nominal_srate: f64,
    pub channel_format: ChannelFormat,
    pub source_id: SourceId,
}

impl StreamInfo {
    /// Single-channel float32 stream for a patchboard channel
    pub fn for_channel(channel: &ChannelDescriptor, source_id: &SourceId) -> Self {
        Self {
            name: channel.name.clone(),
            channel_type: channel.channel_type.clone(),
            channel_count: 1,
            nominal_srate: channel.nominal_srate,
            channel_format: ChannelFormat::Float32,
            source_id: source_id.clone(),
        }
    }

    pub fn key(&self) -> OutputChannelKey {
        OutputChannelKey::new(self.source_id.clone(), self.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> PatchSchema {
        PatchSchema {
            input_type: SUPPORTED_INPUT_TYPE.into(),
            output_type: SUPPORTED_OUTPUT_TYPE.into(),
            patches: BTreeMap::from([("EA".to_string(), "EDA".to_string())]),
            channels: vec![ChannelDescriptor {
                name: "EDA".into(),
                channel_type: "float".into(),
                nominal_srate: 15.0,
            }],
        }
    }

    #[test]
    fn test_channel_lookup_through_patch() {
        let s = schema();
        assert_eq!(s.num_patches(), 1);
        assert_eq!(s.channel_for("EA"), Some("EDA"));
        assert_eq!(s.channel_for("PI"), None);
        assert_eq!(s.channel("EDA").map(|c| c.nominal_srate), Some(15.0));
    }

    #[test]
    fn test_stream_info_for_channel() {
        let s = schema();
        let info = StreamInfo::for_channel(&s.channels[0], &"emotibit1".into());
        assert_eq!(info.channel_count, 1);
        assert_eq!(info.channel_format, ChannelFormat::Float32);
        assert_eq!(info.key().to_string(), "emotibit1/EDA");
    }
}
