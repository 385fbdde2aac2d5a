//! BridgeConfig - Config Loader output
//!
//! Runtime configuration of the bridge process: tick rate, transport,
//! which marker / patchboard documents to register, preflight commands.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete bridge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Driver settings
    #[serde(default)]
    pub bridge: BridgeSettings,

    /// Transport selection
    #[serde(default)]
    pub transport: TransportConfig,

    /// Marker-input documents to register
    #[serde(default)]
    pub markers: Vec<MarkerInputEntry>,

    /// Patchboard documents to register, one per source
    #[serde(default)]
    pub outputs: Vec<OutputEntry>,

    /// Commands that must succeed before the bridge starts
    #[serde(default)]
    pub preflight: Vec<PreflightCommand>,
}

/// Driver settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeSettings {
    /// Interval between drain ticks (milliseconds), must be > 0
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// UDP address receiving encoded packets (None = log only)
    #[serde(default)]
    pub packet_sink: Option<String>,

    /// Initial packet counter value
    #[serde(default)]
    pub initial_packet_counter: u16,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            packet_sink: None,
            initial_packet_counter: 0,
        }
    }
}

fn default_tick_interval_ms() -> u64 {
    10
}

/// Transport configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Transport type
    #[serde(default)]
    pub kind: TransportKind,

    /// UDP address marker datagrams arrive on (udp only)
    #[serde(default)]
    pub marker_bind: Option<String>,

    /// UDP address published samples are sent to (udp only)
    #[serde(default)]
    pub publish_addr: Option<String>,
}

/// Transport type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// In-process transport, no network
    #[default]
    Memory,
    /// JSON datagrams over UDP
    Udp,
}

/// Marker-input document reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerInputEntry {
    /// Path to the JSON document (relative paths resolve against the config file)
    pub path: PathBuf,
}

/// Patchboard document reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputEntry {
    /// Device source id the patchboard applies to
    pub source_id: String,

    /// Path to the JSON document (relative paths resolve against the config file)
    pub path: PathBuf,
}

/// External command run before the bridge starts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreflightCommand {
    /// Shell command line
    pub command: String,

    /// Substring whose presence in stdout marks success
    pub expect: String,
}
