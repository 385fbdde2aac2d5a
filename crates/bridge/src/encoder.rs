//! Marker sample encoding
//!
//! Each marker sample becomes three packets, numbered consecutively:
//!
//! | type | payload |
//! |------|---------|
//! | `LM` | `LR,<ts+tc>,LM,<ts>,LC,<local clock>,LD,<channels...>` |
//! | `TX` | `LC,<ts+tc>,LM,<ts>` |
//! | `TX` | `TL,<wall clock>,LC,<fresh local clock>` |

use contracts::{Clock, MarkerSample};
use packet_codec::{
    build_packet, payload_label, type_tag, EncodedPacket, Payload, TIMESTAMP_STRING_FORMAT,
};

/// Encode one marker sample, advancing `packet_counter` once per packet
///
/// The counter wraps at `u16::MAX`.
pub fn encode_marker_sample(
    sample: &MarkerSample,
    clock: &dyn Clock,
    packet_counter: &mut u16,
) -> [EncodedPacket; 3] {
    let source_ts = sample.timestamp;
    let corrected_ts = sample.corrected_timestamp();

    let mut payload = Payload::new();
    payload
        .push_labeled(payload_label::LSL_MARKER_RX_TIMESTAMP, corrected_ts)
        .push_labeled(payload_label::LSL_MARKER_SRC_TIMESTAMP, source_ts)
        .push_labeled(payload_label::LSL_LOCAL_CLOCK_TIMESTAMP, clock.local_clock())
        .push(payload_label::LSL_MARKER_DATA);
    for channel in &sample.channels {
        payload.push(channel);
    }
    let marker = frame(type_tag::LSL_MARKER, &payload, clock, packet_counter);

    // LC carries the corrected timestamp here, not a fresh clock read
    payload.clear();
    payload
        .push_labeled(payload_label::LSL_LOCAL_CLOCK_TIMESTAMP, corrected_ts)
        .push_labeled(payload_label::LSL_MARKER_SRC_TIMESTAMP, source_ts);
    let cross_time = frame(type_tag::TIMESTAMP_CROSS_TIME, &payload, clock, packet_counter);

    payload.clear();
    payload
        .push_labeled(
            type_tag::TIMESTAMP_LOCAL,
            clock.wall_clock_string(TIMESTAMP_STRING_FORMAT).as_str(),
        )
        .push_labeled(payload_label::LSL_LOCAL_CLOCK_TIMESTAMP, clock.local_clock());
    let local_time = frame(type_tag::TIMESTAMP_CROSS_TIME, &payload, clock, packet_counter);

    [marker, cross_time, local_time]
}

fn frame(
    tag: &str,
    payload: &Payload,
    clock: &dyn Clock,
    packet_counter: &mut u16,
) -> EncodedPacket {
    let packet = build_packet(
        tag,
        *packet_counter,
        payload.as_str(),
        payload.len(),
        clock.elapsed_millis(),
    );
    *packet_counter = packet_counter.wrapping_add(1);
    packet
}
