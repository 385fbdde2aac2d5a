//! BridgeState - registries, packet counter and clock behind one owner

use std::sync::Arc;
use std::time::Instant;

use config_loader::{parse_marker_input, parse_patchboard};
use contracts::{
    Clock, ConfigError, MarkerStreamSummary, PatchSchema, SourceId, StreamTransport, TickSummary,
};
use marker_input::MarkerInputRegistry;
use packet_codec::EncodedPacket;
use stream_output::OutputStreamRegistry;
use tracing::{debug, instrument, warn};

use crate::clock::SystemClock;
use crate::encoder::encode_marker_sample;
use crate::error::BridgeError;

/// Result of one driver tick
#[derive(Debug, Clone, Default)]
pub struct TickOutput {
    pub packets: Vec<EncodedPacket>,
    pub summary: TickSummary,
}

/// Bridge state
///
/// Owns both registries, the shared packet counter and the local clock.
/// Every mutation goes through `&mut self`, so configuration and ticking
/// are serialized by whoever owns the state.
pub struct BridgeState {
    transport: Arc<dyn StreamTransport>,
    outputs: OutputStreamRegistry,
    markers: MarkerInputRegistry,
    clock: Arc<dyn Clock>,
    packet_counter: u16,
    last_error: Option<String>,
}

impl BridgeState {
    /// Create an empty state on `transport`
    pub fn new(transport: Arc<dyn StreamTransport>, clock: Arc<dyn Clock>) -> Self {
        let outputs = OutputStreamRegistry::new(transport.create_publisher());
        Self {
            transport,
            outputs,
            markers: MarkerInputRegistry::new(),
            clock,
            packet_counter: 0,
            last_error: None,
        }
    }

    /// Create an empty state using the system clock
    pub fn with_system_clock(transport: Arc<dyn StreamTransport>) -> Self {
        Self::new(transport, Arc::new(SystemClock::new()))
    }

    // ===== Output streams =====

    /// Parse a patchboard document and publish its channels under `source_id`
    ///
    /// A source registered before is torn down first. On failure nothing is
    /// registered and the message is kept for [`Self::last_error_message`].
    #[instrument(name = "bridge_add_outputs", skip(self, json), fields(source_id = %source_id))]
    pub fn add_data_stream_outputs(&mut self, json: &str, source_id: &str) -> Result<(), BridgeError> {
        let result = parse_patchboard(json)
            .map_err(BridgeError::from)
            .and_then(|schema| self.register_schema(source_id, schema));
        observability::record_registration("output", result.is_ok());
        self.remember(&result);
        result
    }

    fn register_schema(&mut self, source_id: &str, schema: PatchSchema) -> Result<(), BridgeError> {
        self.outputs
            .register_schema(SourceId::from(source_id), schema)
            .map_err(BridgeError::from)
    }

    /// Publish one device sample
    ///
    /// Returns false when `source_id` is unknown, `type_tag` is not patched
    /// for it, the channel has no stream, or the transport rejects the push.
    pub fn add_sample(&mut self, values: &[f32], type_tag: &str, source_id: &str) -> bool {
        let result = self.outputs.publish(source_id, type_tag, values);
        observability::record_sample_published(source_id, result.is_ok());
        match result {
            Ok(()) => true,
            Err(e) => {
                debug!(source_id, type_tag, error = %e, "sample not published");
                false
            }
        }
    }

    /// Drop every output schema and recreate the publisher
    pub fn clear_data_stream_outputs(&mut self) {
        self.outputs.clear_all(self.transport.create_publisher());
    }

    pub fn outputs(&self) -> &OutputStreamRegistry {
        &self.outputs
    }

    // ===== Marker inputs =====

    /// Parse a marker-input document and subscribe to its stream
    #[instrument(name = "bridge_add_marker_input", skip(self, json))]
    pub fn add_marker_input(&mut self, json: &str) -> Result<(), ConfigError> {
        let result = parse_marker_input(json).map(|spec| {
            let receiver = self
                .transport
                .subscribe_markers(&spec.name, spec.source_id.as_deref());
            self.markers.subscribe(spec, receiver);
        });
        observability::record_registration("marker", result.is_ok());
        self.remember(&result);
        result
    }

    /// Tear down every marker subscription
    pub fn clear_marker_inputs(&mut self) {
        self.markers.clear();
    }

    pub fn markers(&self) -> &MarkerInputRegistry {
        &self.markers
    }

    pub fn marker_stream_info(&self) -> Vec<MarkerStreamSummary> {
        self.markers.marker_stream_info()
    }

    // ===== Driver =====

    /// Drain connected marker subscriptions into packets
    ///
    /// Each sample yields an `LM` packet followed by two `TX` packets.
    pub fn create_marker_input_packets(&mut self) -> Vec<EncodedPacket> {
        let drained = self.markers.drain();
        let mut packets = Vec::with_capacity(drained.len() * 3);
        for marker in &drained {
            let triple =
                encode_marker_sample(&marker.sample, self.clock.as_ref(), &mut self.packet_counter);
            packets.extend(triple);
        }
        if !packets.is_empty() {
            debug!(
                markers = drained.len(),
                packets = packets.len(),
                next_packet = self.packet_counter,
                "marker packets created"
            );
        }
        packets
    }

    /// Run one tick and report what it produced
    pub fn tick(&mut self) -> TickOutput {
        let started = Instant::now();
        let packets = self.create_marker_input_packets();
        let streams = self.markers.marker_stream_info();
        let summary = TickSummary {
            markers_drained: packets.len() / 3,
            packets_emitted: packets.len(),
            last_packet_number: packets.last().map(EncodedPacket::packet_number),
            connected_streams: streams.iter().filter(|s| s.connected).count(),
            total_streams: streams.len(),
            duration_ms: started.elapsed().as_secs_f64() * 1000.0,
        };
        TickOutput { packets, summary }
    }

    /// Number the next packet will carry
    pub fn packet_counter(&self) -> u16 {
        self.packet_counter
    }

    /// Share the device's packet numbering
    pub fn set_packet_counter(&mut self, value: u16) {
        self.packet_counter = value;
    }

    // ===== Errors =====

    /// Message of the most recent failed registration
    ///
    /// Cleared by the next successful registration.
    pub fn last_error_message(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn remember<E: std::fmt::Display>(&mut self, result: &Result<(), E>) {
        match result {
            Ok(()) => self.last_error = None,
            Err(e) => {
                warn!(error = %e, "registration rejected");
                self.last_error = Some(e.to_string());
            }
        }
    }
}
