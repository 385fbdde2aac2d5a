//! Bridge orchestrator - wires transport, state, packet sink and the tick loop.
//!
//! The memory transport runs without any network peers (optionally fed by
//! mock marker sources); the UDP transport exchanges JSON datagrams.

use std::collections::BTreeSet;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use bridge::{BridgeState, EncodedPacket, MemoryTransport, StreamTransport, UdpTransport};
use config_loader::ConfigLoader;
use contracts::{BridgeConfig, ContractError, PreflightCommand, TransportConfig, TransportKind};
use marker_input::{MemoryMarkerHub, MockMarkerConfig, MockMarkerSource};
use observability::{record_packet_emitted, record_packet_sink_error, record_tick_metrics};
use system_call::SystemCall;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::RunStats;
use crate::error::CliError;

/// Source id used by mock markers when the subscription is not pinned
const MOCK_SOURCE_ID: &str = "mock";

/// Bridge run configuration
#[derive(Debug, Clone)]
pub struct BridgeRunConfig {
    /// Loaded bridge configuration
    pub config: BridgeConfig,

    /// Maximum number of ticks (None = unlimited)
    pub max_ticks: Option<u64>,

    /// Run timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,

    /// Mock marker rate in Hz (memory transport only)
    pub mock_markers_hz: Option<f64>,

    /// Whether preflight commands run before the bridge starts
    pub run_preflight: bool,
}

/// Main bridge runner
pub struct BridgeRunner {
    config: BridgeRunConfig,
}

impl BridgeRunner {
    pub fn new(config: BridgeRunConfig) -> Self {
        Self { config }
    }

    /// Run until `shutdown` resolves, the tick limit or the timeout
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<RunStats> {
        let start_time = Instant::now();
        let settings = &self.config.config;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        if self.config.run_preflight {
            run_preflight(&settings.preflight).await?;
        }

        let transport = ActiveTransport::open(&settings.transport).await?;
        let mut state = BridgeState::with_system_clock(transport.stream_transport());
        state.set_packet_counter(settings.bridge.initial_packet_counter);
        register_documents(&mut state, settings)?;

        let sink = match settings.bridge.packet_sink.as_deref() {
            Some(addr) => Some(PacketSink::connect(addr).await?),
            None => {
                info!("No packet sink configured - packets are only logged");
                None
            }
        };

        let mocks = self.start_mock_markers(&transport, &state);

        let mut stats = RunStats {
            marker_streams: state.markers().len(),
            output_sources: state.outputs().sources().len(),
            ..Default::default()
        };
        self.tick_loop(&mut state, sink.as_ref(), &mut stats, shutdown)
            .await;

        // Shutdown
        info!("Shutting down bridge...");
        for (source, handle) in mocks {
            source.stop();
            if tokio::time::timeout(Duration::from_secs(1), handle).await.is_err() {
                debug!("mock marker source did not stop in time");
            }
        }
        state.clear_marker_inputs();
        state.clear_data_stream_outputs();
        drop(state);
        transport.shutdown().await;

        stats.duration = start_time.elapsed();
        info!(
            duration_secs = stats.duration.as_secs_f64(),
            packets = stats.packets,
            "Bridge shutdown complete"
        );
        Ok(stats)
    }

    async fn tick_loop(
        &self,
        state: &mut BridgeState,
        sink: Option<&PacketSink>,
        stats: &mut RunStats,
        shutdown: impl Future<Output = ()>,
    ) {
        let settings = &self.config.config.bridge;
        let mut ticker = tokio::time::interval(Duration::from_millis(settings.tick_interval_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let deadline = self
            .config
            .timeout
            .map(|timeout| tokio::time::Instant::now() + timeout);
        tokio::pin!(shutdown);

        info!(
            tick_interval_ms = settings.tick_interval_ms,
            max_ticks = ?self.config.max_ticks,
            marker_streams = stats.marker_streams,
            output_sources = stats.output_sources,
            "Bridge running"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping bridge...");
                    break;
                }
                _ = sleep_until(deadline) => {
                    warn!(timeout_secs = self.config.timeout.map(|t| t.as_secs()), "Bridge run timed out");
                    break;
                }
                _ = ticker.tick() => {}
            }

            let output = state.tick();
            record_tick_metrics(&output.summary);
            stats.ticks += 1;
            stats.markers += output.summary.markers_drained as u64;
            stats.metrics.update(&output.summary);

            for packet in &output.packets {
                stats.packets += 1;
                record_packet_emitted(packet.type_tag());
                stats.metrics.count_packet(packet.type_tag());
                info!(packet = %packet, "Packet emitted");

                if let Some(sink) = sink {
                    if let Err(e) = sink.send(packet).await {
                        stats.sink_errors += 1;
                        record_packet_sink_error();
                        warn!(addr = %sink.addr, error = %e, "Packet sink send failed");
                    }
                }
            }

            if let Some(max) = self.config.max_ticks {
                if stats.ticks >= max {
                    info!(ticks = stats.ticks, "Reached max ticks limit");
                    break;
                }
            }
        }
    }

    /// One mock source per distinct subscribed (stream, source id)
    fn start_mock_markers(
        &self,
        transport: &ActiveTransport,
        state: &BridgeState,
    ) -> Vec<(MockMarkerSource, JoinHandle<u64>)> {
        let Some(frequency_hz) = self.config.mock_markers_hz else {
            return Vec::new();
        };
        let Some(hub) = transport.memory_hub() else {
            warn!("Mock markers need the memory transport - ignoring");
            return Vec::new();
        };

        let streams: BTreeSet<(String, String)> = state
            .marker_stream_info()
            .into_iter()
            .map(|s| {
                let source_id = s.source_id.unwrap_or_else(|| MOCK_SOURCE_ID.to_string());
                (s.name, source_id)
            })
            .collect();

        streams
            .into_iter()
            .map(|(stream_name, source_id)| {
                info!(stream = %stream_name, source_id = %source_id, frequency_hz, "Starting mock marker source");
                let source = MockMarkerSource::new(MockMarkerConfig {
                    stream_name,
                    source_id,
                    frequency_hz,
                    ..Default::default()
                });
                let handle = source.start(hub);
                (source, handle)
            })
            .collect()
    }
}

/// Run preflight commands in order, failing on the first one without its response
pub async fn run_preflight(commands: &[PreflightCommand]) -> Result<(), CliError> {
    for cmd in commands {
        info!(command = %cmd.command, expect = %cmd.expect, "Running preflight command");
        let output = SystemCall::new(&cmd.command, &cmd.expect)
            .stop_on_match(true)
            .spawn()
            .wait()
            .await
            .map_err(|e| CliError::preflight(&cmd.command, e.to_string()))?;

        if !output.matched {
            return Err(CliError::preflight(
                &cmd.command,
                format!("expected '{}' in output", cmd.expect),
            ));
        }
    }
    Ok(())
}

/// Register every marker-input and patchboard document of the configuration
fn register_documents(state: &mut BridgeState, config: &BridgeConfig) -> Result<()> {
    for entry in &config.markers {
        let path = entry.path.display().to_string();
        let text = ConfigLoader::read_document(&entry.path)
            .with_context(|| format!("Failed to read marker input {path}"))?;
        state
            .add_marker_input(&text)
            .map_err(|e| ContractError::document(path, e))?;
    }

    for entry in &config.outputs {
        let text = ConfigLoader::read_document(&entry.path)
            .with_context(|| format!("Failed to read patchboard {}", entry.path.display()))?;
        state
            .add_data_stream_outputs(&text, &entry.source_id)
            .with_context(|| {
                format!(
                    "Failed to register outputs for '{}' from {}",
                    entry.source_id,
                    entry.path.display()
                )
            })?;
    }

    info!(
        markers = state.markers().len(),
        sources = state.outputs().sources().len(),
        streams = state.outputs().stream_count(),
        "Documents registered"
    );
    Ok(())
}

async fn sleep_until(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Transport the run was started with
enum ActiveTransport {
    Memory(Arc<MemoryTransport>),
    Udp(Arc<UdpTransport>),
}

impl ActiveTransport {
    async fn open(config: &TransportConfig) -> Result<Self> {
        match config.kind {
            TransportKind::Memory => {
                info!("Running with the MEMORY transport (no external streams)");
                Ok(Self::Memory(Arc::new(MemoryTransport::logging())))
            }
            TransportKind::Udp => {
                let marker_bind = config.marker_bind.as_deref().unwrap_or_default();
                let publish = config.publish_addr.as_deref().unwrap_or_default();
                let publish_addr: SocketAddr = publish
                    .parse()
                    .map_err(|_| CliError::invalid_address("transport.publish_addr", publish))?;

                let transport = UdpTransport::bind(marker_bind, publish_addr)
                    .await
                    .context("Failed to open UDP transport")?;
                info!(
                    marker_addr = %transport.marker_addr(),
                    publish_addr = %publish_addr,
                    "UDP transport ready"
                );
                Ok(Self::Udp(Arc::new(transport)))
            }
        }
    }

    fn stream_transport(&self) -> Arc<dyn StreamTransport> {
        match self {
            Self::Memory(t) => t.clone() as Arc<dyn StreamTransport>,
            Self::Udp(t) => t.clone() as Arc<dyn StreamTransport>,
        }
    }

    fn memory_hub(&self) -> Option<&MemoryMarkerHub> {
        match self {
            Self::Memory(t) => Some(t.hub()),
            Self::Udp(_) => None,
        }
    }

    async fn shutdown(self) {
        if let Self::Udp(transport) = self {
            match Arc::try_unwrap(transport) {
                Ok(transport) => transport.shutdown().await,
                Err(_) => warn!("UDP transport still in use at shutdown"),
            }
        }
    }
}

/// UDP destination for encoded packets
struct PacketSink {
    socket: UdpSocket,
    addr: String,
}

impl PacketSink {
    async fn connect(addr: &str) -> Result<Self, CliError> {
        let target: SocketAddr = addr
            .parse()
            .map_err(|_| CliError::invalid_address("bridge.packet_sink", addr))?;
        let local: SocketAddr = if target.is_ipv4() {
            ([0u8; 4], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };

        let socket = UdpSocket::bind(local)
            .await
            .map_err(|e| CliError::packet_sink(addr, e))?;
        socket
            .connect(target)
            .await
            .map_err(|e| CliError::packet_sink(addr, e))?;

        info!(addr = %target, "Packet sink connected");
        Ok(Self {
            socket,
            addr: addr.to_string(),
        })
    }

    async fn send(&self, packet: &EncodedPacket) -> std::io::Result<usize> {
        self.socket.send(packet.as_bytes()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const MARKERS: &str = r#"{"lsl": {"marker": {"name": "StimMarkers", "sourceId": "stim-pc"}}}"#;

    const EDA_BOARD: &str = r#"{"patchboard": {"inputType": "EmotiBit", "outputType": "LSL",
        "settings": {"output": {"meta-data": {"channels": [
            {"name": "EDA", "type": "EDA", "nominal_srate": 15}]}}}}}"#;

    fn write_config(dir: &TempDir, extra: &str) -> BridgeConfig {
        fs::write(dir.path().join("markers.json"), MARKERS).unwrap();
        fs::write(dir.path().join("eda.json"), EDA_BOARD).unwrap();
        let content = format!(
            r#"
[bridge]
tick_interval_ms = 5
{extra}

[[markers]]
path = "markers.json"

[[outputs]]
source_id = "emotibit1"
path = "eda.json"
"#
        );
        let path = dir.path().join("bridge.toml");
        fs::write(&path, content).unwrap();
        ConfigLoader::load_from_path(&path).unwrap()
    }

    fn run_config(config: BridgeConfig, max_ticks: u64) -> BridgeRunConfig {
        BridgeRunConfig {
            config,
            max_ticks: Some(max_ticks),
            timeout: Some(Duration::from_secs(10)),
            metrics_port: None,
            mock_markers_hz: Some(200.0),
            run_preflight: true,
        }
    }

    #[tokio::test]
    async fn test_memory_run_with_mock_markers() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir, "");

        let stats = BridgeRunner::new(run_config(config, 40))
            .run(std::future::pending())
            .await
            .unwrap();

        assert_eq!(stats.ticks, 40);
        assert_eq!(stats.marker_streams, 1);
        assert_eq!(stats.output_sources, 1);
        assert!(stats.markers > 0, "mock markers should have been drained");
        assert_eq!(stats.packets, stats.markers * 3);
        assert_eq!(stats.metrics.packets_by_type.get("LM"), Some(&stats.markers));
    }

    #[tokio::test]
    async fn test_packets_reach_sink() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let sink_addr = receiver.local_addr().unwrap();
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir, &format!("packet_sink = \"{sink_addr}\""));

        let run = tokio::spawn(BridgeRunner::new(run_config(config, 100)).run(std::future::pending()));

        let mut buf = [0u8; 1024];
        let n = tokio::time::timeout(Duration::from_secs(5), receiver.recv(&mut buf))
            .await
            .expect("no packet received")
            .unwrap();
        let text = std::str::from_utf8(&buf[..n]).unwrap();
        let header = packet_codec::parse_header(text).unwrap();
        assert_eq!(header.type_tag, "LM");
        assert!(text.ends_with(",\n"));

        let stats = run.await.unwrap().unwrap();
        assert_eq!(stats.sink_errors, 0);
    }

    #[tokio::test]
    async fn test_shutdown_signal_stops_run() {
        let dir = TempDir::new().unwrap();
        let mut run = run_config(write_config(&dir, ""), 0);
        run.max_ticks = None;

        let stats = BridgeRunner::new(run)
            .run(tokio::time::sleep(Duration::from_millis(50)))
            .await
            .unwrap();
        assert!(stats.ticks > 0);
    }

    #[tokio::test]
    async fn test_invalid_document_fails_run() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir, "");
        fs::write(dir.path().join("eda.json"), r#"{"patchboard": {}}"#).unwrap();

        let err = BridgeRunner::new(run_config(config, 1))
            .run(std::future::pending())
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("inputType"), "got: {err:#}");
    }

    #[tokio::test]
    async fn test_preflight_gates_start() {
        let commands = vec![PreflightCommand {
            command: "echo ready".into(),
            expect: "ready".into(),
        }];
        run_preflight(&commands).await.unwrap();

        let commands = vec![PreflightCommand {
            command: "echo busy".into(),
            expect: "ready".into(),
        }];
        let err = run_preflight(&commands).await.unwrap_err();
        assert!(matches!(err, CliError::Preflight { .. }));
    }
}
