//! Protocol constants
//!
//! Shared bit-for-bit with the packet consumer; do not edit.

/// Separates header fields and payload fields
pub const PAYLOAD_DELIMITER: char = ',';

/// Terminates a packet
pub const PACKET_DELIMITER: char = '\n';

/// Header protocol version
pub const PROTOCOL_VERSION: u8 = 1;

/// Header data reliability (percent)
pub const DATA_RELIABILITY: u8 = 100;

/// strftime format of local wall-clock timestamps
pub const TIMESTAMP_STRING_FORMAT: &str = "%Y-%m-%d_%H-%M-%S-%6f";

/// Packet type tags
pub mod type_tag {
    /// Marker sample received from a marker stream
    pub const LSL_MARKER: &str = "LM";
    /// Pair of timestamps from two clock domains
    pub const TIMESTAMP_CROSS_TIME: &str = "TX";
    /// Local wall-clock timestamp
    pub const TIMESTAMP_LOCAL: &str = "TL";
}

/// Labels preceding values inside a payload
pub mod payload_label {
    /// Marker timestamp corrected into the local clock domain
    pub const LSL_MARKER_RX_TIMESTAMP: &str = "LR";
    /// Marker timestamp in the publisher's clock domain
    pub const LSL_MARKER_SRC_TIMESTAMP: &str = "LM";
    /// Local stream clock
    pub const LSL_LOCAL_CLOCK_TIMESTAMP: &str = "LC";
    /// Start of marker sample channels
    pub const LSL_MARKER_DATA: &str = "LD";
}
