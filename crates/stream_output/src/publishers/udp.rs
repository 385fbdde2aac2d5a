//! UdpPublisher - fire-and-forget JSON datagrams
//!
//! Every stream event is one datagram:
//!
//! ```json
//! {"event":"open","info":{"name":"EDA","channel_type":"EDA",...}}
//! {"event":"sample","source_id":"emotibit1","name":"EDA","channel_type":"EDA","values":[0.25]}
//! {"event":"close","source_id":"emotibit1","name":"EDA"}
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;

use contracts::{ContractError, OutputChannelKey, StreamInfo, StreamPublisher};
use serde::Serialize;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, error, instrument, warn};

/// Max datagram size we are willing to send (IPv4 UDP payload limit)
const MAX_DATAGRAM_SIZE: usize = 65507;

/// Datagrams queued for the send worker before pushes start failing
const QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Datagram<'a> {
    Open {
        info: &'a StreamInfo,
    },
    Sample {
        source_id: &'a str,
        name: &'a str,
        channel_type: &'a str,
        values: &'a [f32],
    },
    Close {
        source_id: &'a str,
        name: &'a str,
    },
}

/// Publisher that sends stream events over UDP
///
/// Datagrams are queued to a worker task owning the socket. Publishers created with [`UdpPublisher::fresh`] share
/// the worker but track their own streams.
pub struct UdpPublisher {
    tx: mpsc::Sender<Vec<u8>>,
    target: SocketAddr,
    streams: HashMap<OutputChannelKey, StreamInfo>,
}

impl UdpPublisher {
    /// Bind an ephemeral socket and connect it to `target`
    #[instrument(name = "udp_publisher_connect")]
    pub async fn connect(target: SocketAddr) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(unspecified_for(target)).await?;
        socket.connect(target).await?;

        debug!(target = %target, "UdpPublisher connected");

        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        tokio::spawn(send_worker(socket, rx, target));

        Ok(Self {
            tx,
            target,
            streams: HashMap::new(),
        })
    }

    /// New publisher on the same socket with no streams
    pub fn fresh(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            target: self.target,
            streams: HashMap::new(),
        }
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    fn encode(&self, stream: &str, datagram: &Datagram<'_>) -> Result<Vec<u8>, ContractError> {
        let data = serde_json::to_vec(datagram)
            .map_err(|e| ContractError::stream_push(stream, format!("json error: {e}")))?;
        if data.len() > MAX_DATAGRAM_SIZE {
            return Err(ContractError::stream_push(
                stream,
                format!("datagram of {} bytes exceeds {MAX_DATAGRAM_SIZE}", data.len()),
            ));
        }
        Ok(data)
    }

    fn transmit(&self, stream: &str, data: Vec<u8>) -> Result<(), ContractError> {
        self.tx.try_send(data).map_err(|e| {
            let reason = match e {
                mpsc::error::TrySendError::Full(_) => "send queue full",
                mpsc::error::TrySendError::Closed(_) => "send worker stopped",
            };
            ContractError::stream_push(stream, reason)
        })
    }
}

/// Worker owning the socket; exits once every publisher is dropped
/// Ephemeral wildcard address in the same family as `target`
fn unspecified_for(target: SocketAddr) -> SocketAddr {
    if target.is_ipv4() {
        ([0u8; 4], 0).into()
    } else {
        ([0u16; 8], 0).into()
    }
}

async fn send_worker(socket: UdpSocket, mut rx: mpsc::Receiver<Vec<u8>>, target: SocketAddr) {
    while let Some(data) = rx.recv().await {
        match socket.send(&data).await {
            Ok(sent) => debug!(target = %target, bytes = sent, "sent"),
            // Log but don't fail - UDP is best-effort
            Err(e) => error!(target = %target, error = %e, "UDP send failed"),
        }
    }
    debug!(target = %target, "UdpPublisher send worker stopped");
}

impl StreamPublisher for UdpPublisher {
    #[instrument(
        name = "udp_publisher_add_stream",
        skip(self, info),
        fields(target = %self.target, stream = %info.name, source_id = %info.source_id)
    )]
    fn add_stream(&mut self, info: &StreamInfo) -> Result<(), ContractError> {
        let key = info.key();
        let stream = key.to_string();
        if self.streams.contains_key(&key) {
            return Err(ContractError::stream_open(stream, "stream already open"));
        }
        let data = self
            .encode(&stream, &Datagram::Open { info })
            .map_err(|e| ContractError::stream_open(&stream, e.to_string()))?;
        self.transmit(&stream, data)
            .map_err(|e| ContractError::stream_open(&stream, e.to_string()))?;
        self.streams.insert(key, info.clone());
        Ok(())
    }

    fn remove_stream(&mut self, key: &OutputChannelKey) -> bool {
        if self.streams.remove(key).is_none() {
            return false;
        }
        let stream = key.to_string();
        let datagram = Datagram::Close {
            source_id: key.source_id.as_str(),
            name: &key.channel_name,
        };
        // The stream is gone locally even if the close notice is lost
        if let Err(e) = self
            .encode(&stream, &datagram)
            .and_then(|data| self.transmit(&stream, data))
        {
            warn!(stream = %stream, error = %e, "close notice not sent");
        }
        true
    }

    fn push_sample(
        &mut self,
        key: &OutputChannelKey,
        channel_type: &str,
        values: &[f32],
    ) -> Result<(), ContractError> {
        let stream = key.to_string();
        if !self.streams.contains_key(key) {
            return Err(ContractError::StreamNotFound { stream });
        }
        let data = self.encode(
            &stream,
            &Datagram::Sample {
                source_id: key.source_id.as_str(),
                name: &key.channel_name,
                channel_type,
                values,
            },
        )?;
        self.transmit(&stream, data)
    }

    fn stream_count(&self) -> usize {
        self.streams.len()
    }
}
