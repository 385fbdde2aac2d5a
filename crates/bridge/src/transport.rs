//! StreamTransport implementations
//!
//! - [`MemoryTransport`]: in-process hub, memory or log publishers
//! - [`UdpTransport`]: JSON marker datagrams in, JSON stream datagrams out

use std::net::SocketAddr;
use std::sync::{Mutex, PoisonError};

use contracts::{MarkerInlet, StreamPublisher, StreamTransport};
use marker_input::{MemoryMarkerHub, UdpMarkerReceiver};
use stream_output::{LogPublisher, MemoryPublisher, UdpPublisher};
use tracing::{debug, info, instrument};

use crate::error::BridgeError;

/// In-process transport
///
/// Marker inlets subscribe to the shared [`MemoryMarkerHub`]. Publishers
/// are [`MemoryPublisher`]s, or [`LogPublisher`]s when built with
/// [`MemoryTransport::logging`].
#[derive(Default)]
pub struct MemoryTransport {
    hub: MemoryMarkerHub,
    log_publishers: bool,
    latest: Mutex<MemoryPublisher>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport whose publishers log every stream event
    pub fn logging() -> Self {
        Self {
            log_publishers: true,
            ..Self::default()
        }
    }

    /// Hub marker outlets publish into
    pub fn hub(&self) -> &MemoryMarkerHub {
        &self.hub
    }

    /// Most recently created memory publisher
    pub fn publisher(&self) -> MemoryPublisher {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl StreamTransport for MemoryTransport {
    fn subscribe_markers(&self, name: &str, source_id: Option<&str>) -> Box<dyn MarkerInlet> {
        Box::new(self.hub.subscribe(name, source_id))
    }

    fn create_publisher(&self) -> Box<dyn StreamPublisher> {
        if self.log_publishers {
            return Box::new(LogPublisher::new("memory"));
        }
        let publisher = MemoryPublisher::new();
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = publisher.clone();
        debug!("memory publisher created");
        Box::new(publisher)
    }
}

/// UDP transport
///
/// Marker datagrams received on the bound socket feed an internal hub;
/// publishers send stream datagrams to the publish address.
pub struct UdpTransport {
    hub: MemoryMarkerHub,
    receiver: UdpMarkerReceiver,
    template: UdpPublisher,
}

impl UdpTransport {
    /// Bind the marker socket and connect the publish socket
    #[instrument(name = "udp_transport_bind")]
    pub async fn bind(marker_bind: &str, publish_addr: SocketAddr) -> Result<Self, BridgeError> {
        let hub = MemoryMarkerHub::new();
        let receiver = UdpMarkerReceiver::bind(marker_bind, hub.clone()).await?;
        let template = UdpPublisher::connect(publish_addr).await?;

        info!(
            marker_addr = %receiver.local_addr(),
            publish_addr = %publish_addr,
            "udp transport ready"
        );

        Ok(Self {
            hub,
            receiver,
            template,
        })
    }

    /// Address marker datagrams are received on
    pub fn marker_addr(&self) -> SocketAddr {
        self.receiver.local_addr()
    }

    /// Hub fed by the marker receiver
    pub fn hub(&self) -> &MemoryMarkerHub {
        &self.hub
    }

    /// Stop the marker receiver
    pub async fn shutdown(self) {
        self.receiver.stop().await;
    }
}

impl StreamTransport for UdpTransport {
    fn subscribe_markers(&self, name: &str, source_id: Option<&str>) -> Box<dyn MarkerInlet> {
        Box::new(self.hub.subscribe(name, source_id))
    }

    fn create_publisher(&self) -> Box<dyn StreamPublisher> {
        Box::new(self.template.fresh())
    }
}
