//! UDP marker receiver
//!
//! Marker publishers send one JSON datagram per sample:
//!
//! ```json
//! {"stream": "PsychoPyMarkers", "source_id": "stim-pc-1",
//!  "timestamp": 1034.25, "time_correction": -0.002, "channels": ["go"]}
//! ```
//!
//! The first datagram of a `(stream, source_id)` pair opens an outlet on
//! the hub; it stays open until the receiver stops.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use contracts::MarkerSample;
use serde::{Deserialize, Serialize};
use tokio::net::UdpSocket;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::error::{MarkerInputError, Result};
use crate::memory::{MarkerOutlet, MemoryMarkerHub};
use crate::metrics::MarkerMetrics;

const MAX_DATAGRAM_SIZE: usize = 65507;

/// Wire form of one marker sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerDatagram {
    pub stream: String,
    #[serde(default)]
    pub source_id: String,
    #[serde(flatten)]
    pub sample: MarkerSample,
}

impl MarkerDatagram {
    /// Decode a datagram payload
    pub fn decode(data: &[u8]) -> Result<Self> {
        let datagram: Self = serde_json::from_slice(data).map_err(|e| MarkerInputError::Decode {
            message: e.to_string(),
        })?;
        if datagram.stream.is_empty() {
            return Err(MarkerInputError::Decode {
                message: "stream name is empty".to_string(),
            });
        }
        Ok(datagram)
    }
}

/// Background task feeding received marker datagrams into a hub
pub struct UdpMarkerReceiver {
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
    metrics: Arc<MarkerMetrics>,
}

impl UdpMarkerReceiver {
    /// Bind `addr` and start receiving into `hub`
    #[instrument(name = "udp_marker_receiver_bind", skip(hub))]
    pub async fn bind(addr: &str, hub: MemoryMarkerHub) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| MarkerInputError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        let local_addr = socket.local_addr().map_err(|source| MarkerInputError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        let metrics = Arc::new(MarkerMetrics::new());
        let (shutdown, shutdown_rx) = oneshot::channel();

        info!(addr = %local_addr, "marker receiver listening");
        let task = tokio::spawn(receive_loop(socket, hub, shutdown_rx, Arc::clone(&metrics)));

        Ok(Self {
            local_addr,
            shutdown: Some(shutdown),
            task,
            metrics,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn metrics(&self) -> &Arc<MarkerMetrics> {
        &self.metrics
    }

    /// Stop receiving and close every outlet the receiver opened
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            warn!(error = %e, "marker receiver task failed");
        }
    }
}

impl Drop for UdpMarkerReceiver {
    fn drop(&mut self) {
        if self.shutdown.is_some() {
            self.task.abort();
        }
    }
}

async fn receive_loop(
    socket: UdpSocket,
    hub: MemoryMarkerHub,
    mut shutdown: oneshot::Receiver<()>,
    metrics: Arc<MarkerMetrics>,
) {
    let mut outlets: HashMap<(String, String), MarkerOutlet> = HashMap::new();
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            received = socket.recv_from(&mut buf) => {
                let (n, peer) = match received {
                    Ok(r) => r,
                    Err(e) => {
                        warn!(error = %e, "marker receive failed");
                        continue;
                    }
                };
                let datagram = match MarkerDatagram::decode(&buf[..n]) {
                    Ok(d) => d,
                    Err(e) => {
                        metrics.record_decode_error();
                        warn!(peer = %peer, error = %e, "dropping marker datagram");
                        continue;
                    }
                };
                let outlet = outlets
                    .entry((datagram.stream.clone(), datagram.source_id.clone()))
                    .or_insert_with(|| {
                        debug!(peer = %peer, stream = %datagram.stream, "new marker publisher");
                        hub.open_outlet(&datagram.stream, &datagram.source_id)
                    });
                outlet.push(datagram.sample);
                metrics.record_received(1);
            }
        }
    }

    debug!(publishers = outlets.len(), "marker receiver stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::MarkerInlet;
    use std::time::Duration;

    #[test]
    fn test_decode_datagram() {
        let d = MarkerDatagram::decode(
            br#"{"stream":"M","source_id":"pc","timestamp":2.0,"time_correction":0.5,"channels":["go"]}"#,
        )
        .unwrap();
        assert_eq!(d.stream, "M");
        assert_eq!(d.sample.corrected_timestamp(), 2.5);

        let d = MarkerDatagram::decode(br#"{"stream":"M","timestamp":2.0,"channels":[]}"#).unwrap();
        assert_eq!(d.source_id, "");

        assert!(MarkerDatagram::decode(b"not json").is_err());
        assert!(MarkerDatagram::decode(br#"{"stream":"","timestamp":1,"channels":[]}"#).is_err());
    }

    #[tokio::test]
    async fn test_receiver_feeds_hub() {
        let hub = MemoryMarkerHub::new();
        let mut inlet = hub.subscribe("Stim", None);
        let receiver = UdpMarkerReceiver::bind("127.0.0.1:0", hub.clone()).await.unwrap();

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let datagram = MarkerDatagram {
            stream: "Stim".into(),
            source_id: "pc".into(),
            sample: MarkerSample::new(10.0, 0.0, vec!["go".into()]),
        };
        let data = serde_json::to_vec(&datagram).unwrap();
        sender.send_to(&data, receiver.local_addr()).await.unwrap();

        let mut samples = Vec::new();
        for _ in 0..50 {
            samples = inlet.flush();
            if !samples.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].channels, vec!["go".to_string()]);
        assert!(inlet.is_connected());

        receiver.stop().await;
        assert!(!inlet.is_connected());
    }
}
