//! # Packet Codec
//!
//! EmotiBit CSV packet encoding.
//!
//! Responsibilities:
//! - Render payload fields as text (floats at 7 significant digits)
//! - Frame a payload with the six-field packet header
//! - Hold the type-tag / payload-label vocabulary shared with the consumer
//!
//! Encoding never fails; garbage in is garbage on the wire.
//!
//! # Example
//!
//! ```
//! use packet_codec::{build_packet, payload_label, type_tag, Payload};
//!
//! let mut payload = Payload::new();
//! payload.push(payload_label::LSL_LOCAL_CLOCK_TIMESTAMP);
//! payload.push(12.5_f64);
//! let packet = build_packet(type_tag::TIMESTAMP_CROSS_TIME, 7, payload.as_str(), payload.len(), 1000);
//! assert_eq!(packet.as_str(), "1000,7,2,TX,1,100,LC,12.5,\n");
//! ```

mod field;
mod packet;
pub mod vocab;

pub use field::{append_field, format_significant, Payload, PayloadField, FLOAT_PRECISION};
pub use packet::{build_packet, parse_header, EncodedPacket, HeaderError, PacketHeader};
pub use vocab::{payload_label, type_tag};
pub use vocab::{
    DATA_RELIABILITY, PACKET_DELIMITER, PAYLOAD_DELIMITER, PROTOCOL_VERSION,
    TIMESTAMP_STRING_FORMAT,
};
