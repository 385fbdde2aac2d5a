//! Packet framing
//!
//! Wire layout (one line of CSV):
//!
//! ```text
//! timestamp_ms,packet_number,data_length,type_tag,protocol_version,data_reliability[,payload]\n
//! ```
//!
//! The payload is appended only when `data_length > 0`. Payload fields each
//! carry their own trailing delimiter, so a non-empty packet ends in `",\n"`.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::vocab::{DATA_RELIABILITY, PACKET_DELIMITER, PAYLOAD_DELIMITER, PROTOCOL_VERSION};

/// Number of comma-separated header fields
const HEADER_FIELDS: usize = 6;

/// Packet header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PacketHeader {
    /// Milliseconds since the sender started
    pub timestamp_ms: u32,
    /// Wrapping sequence number
    pub packet_number: u16,
    /// Number of payload fields
    pub data_length: u16,
    pub type_tag: String,
    pub protocol_version: u8,
    pub data_reliability: u8,
}

impl fmt::Display for PacketHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = PAYLOAD_DELIMITER;
        write!(
            f,
            "{}{d}{}{d}{}{d}{}{d}{}{d}{}",
            self.timestamp_ms,
            self.packet_number,
            self.data_length,
            self.type_tag,
            self.protocol_version,
            self.data_reliability
        )
    }
}

/// A framed packet ready for the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPacket {
    header: PacketHeader,
    text: String,
}

impl EncodedPacket {
    pub fn header(&self) -> &PacketHeader {
        &self.header
    }

    pub fn type_tag(&self) -> &str {
        &self.header.type_tag
    }

    pub fn packet_number(&self) -> u16 {
        self.header.packet_number
    }

    /// Full wire text including the packet delimiter
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    /// Payload fields (empty strings between delimiters are preserved)
    pub fn payload_fields(&self) -> Vec<&str> {
        if self.header.data_length == 0 {
            return Vec::new();
        }
        self.text
            .trim_end_matches(PACKET_DELIMITER)
            .split(PAYLOAD_DELIMITER)
            .skip(HEADER_FIELDS)
            .take(self.header.data_length as usize)
            .collect()
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for EncodedPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text.trim_end_matches(PACKET_DELIMITER))
    }
}

/// Frame a payload into a packet
///
/// `payload` must already be delimited (see [`crate::append_field`]) and
/// `data_length` must be its field count.
pub fn build_packet(
    type_tag: &str,
    packet_number: u16,
    payload: &str,
    data_length: u16,
    timestamp_ms: u32,
) -> EncodedPacket {
    let header = PacketHeader {
        timestamp_ms,
        packet_number,
        data_length,
        type_tag: type_tag.to_string(),
        protocol_version: PROTOCOL_VERSION,
        data_reliability: DATA_RELIABILITY,
    };

    let mut text = header.to_string();
    if data_length > 0 {
        text.push(PAYLOAD_DELIMITER);
        text.push_str(payload);
    }
    text.push(PACKET_DELIMITER);

    EncodedPacket { header, text }
}

/// Header decode error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("packet header has {found} fields, expected 6")]
    TooShort { found: usize },

    #[error("invalid header field '{field}': {value:?}")]
    InvalidField { field: &'static str, value: String },
}

/// Decode the header of a packet line
pub fn parse_header(packet: &str) -> Result<PacketHeader, HeaderError> {
    let line = packet.trim_end_matches(PACKET_DELIMITER);
    let fields: Vec<&str> = line.splitn(HEADER_FIELDS + 1, PAYLOAD_DELIMITER).collect();
    if fields.len() < HEADER_FIELDS {
        return Err(HeaderError::TooShort {
            found: fields.len(),
        });
    }

    Ok(PacketHeader {
        timestamp_ms: parse_field("timestamp", fields[0])?,
        packet_number: parse_field("packet_number", fields[1])?,
        data_length: parse_field("data_length", fields[2])?,
        type_tag: fields[3].to_string(),
        protocol_version: parse_field("protocol_version", fields[4])?,
        data_reliability: parse_field("data_reliability", fields[5])?,
    })
}

fn parse_field<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, HeaderError> {
    value.parse().map_err(|_| HeaderError::InvalidField {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{type_tag, Payload};

    #[test]
    fn test_build_packet_layout() {
        let mut payload = Payload::new();
        payload.push("LR").push(101.5_f64).push("LD").push("stim_on");
        let packet = build_packet(
            type_tag::LSL_MARKER,
            42,
            payload.as_str(),
            payload.len(),
            5000,
        );

        assert_eq!(packet.as_str(), "5000,42,4,LM,1,100,LR,101.5,LD,stim_on,\n");
        assert_eq!(packet.packet_number(), 42);
        assert_eq!(packet.type_tag(), "LM");
        assert_eq!(packet.payload_fields(), vec!["LR", "101.5", "LD", "stim_on"]);
    }

    #[test]
    fn test_empty_payload_has_header_only() {
        let packet = build_packet(type_tag::TIMESTAMP_LOCAL, 0, "", 0, 0);
        assert_eq!(packet.as_str(), "0,0,0,TL,1,100\n");
        assert!(packet.payload_fields().is_empty());
    }

    #[test]
    fn test_parse_header() {
        let packet = build_packet(type_tag::TIMESTAMP_CROSS_TIME, 65535, "LC,1,", 2, 12);
        let header = parse_header(packet.as_str()).unwrap();
        assert_eq!(&header, packet.header());
        assert_eq!(header.protocol_version, 1);
        assert_eq!(header.data_reliability, 100);
    }

    #[test]
    fn test_parse_header_rejects_garbage() {
        assert_eq!(
            parse_header("1,2,3"),
            Err(HeaderError::TooShort { found: 3 })
        );
        assert!(matches!(
            parse_header("x,2,3,TX,1,100"),
            Err(HeaderError::InvalidField { field: "timestamp", .. })
        ));
    }
}
