//! MemoryPublisher - in-process publisher recording every stream and sample

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{ContractError, OutputChannelKey, StreamInfo, StreamPublisher};
use tracing::trace;

/// One sample accepted by a [`MemoryPublisher`]
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedSample {
    pub key: OutputChannelKey,
    pub channel_type: String,
    pub values: Vec<f32>,
}

#[derive(Debug, Default)]
struct MemoryState {
    streams: BTreeMap<OutputChannelKey, StreamInfo>,
    samples: Vec<PublishedSample>,
    fail_pushes: bool,
}

/// Publisher that keeps everything in memory
///
/// Clones share state, so a test can keep one clone while the registry owns
/// another behind `Box<dyn StreamPublisher>`.
#[derive(Debug, Clone, Default)]
pub struct MemoryPublisher {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Streams currently open, ordered by key
    pub fn streams(&self) -> Vec<StreamInfo> {
        self.lock().streams.values().cloned().collect()
    }

    /// Whether a stream with this key is open
    pub fn has_stream(&self, key: &OutputChannelKey) -> bool {
        self.lock().streams.contains_key(key)
    }

    /// Every sample pushed so far, in push order
    pub fn samples(&self) -> Vec<PublishedSample> {
        self.lock().samples.clone()
    }

    /// Make subsequent pushes fail with a transport error
    pub fn set_fail_pushes(&self, fail: bool) {
        self.lock().fail_pushes = fail;
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StreamPublisher for MemoryPublisher {
    fn add_stream(&mut self, info: &StreamInfo) -> Result<(), ContractError> {
        let key = info.key();
        let mut state = self.lock();
        if state.streams.contains_key(&key) {
            return Err(ContractError::stream_open(key.to_string(), "stream already open"));
        }
        trace!(stream = %key, srate = info.nominal_srate, "memory stream opened");
        state.streams.insert(key, info.clone());
        Ok(())
    }

    fn remove_stream(&mut self, key: &OutputChannelKey) -> bool {
        self.lock().streams.remove(key).is_some()
    }

    fn push_sample(
        &mut self,
        key: &OutputChannelKey,
        channel_type: &str,
        values: &[f32],
    ) -> Result<(), ContractError> {
        let mut state = self.lock();
        if state.fail_pushes {
            return Err(ContractError::stream_push(key.to_string(), "push rejected"));
        }
        if !state.streams.contains_key(key) {
            return Err(ContractError::StreamNotFound {
                stream: key.to_string(),
            });
        }
        state.samples.push(PublishedSample {
            key: key.clone(),
            channel_type: channel_type.to_string(),
            values: values.to_vec(),
        });
        Ok(())
    }

    fn stream_count(&self) -> usize {
        self.lock().streams.len()
    }
}
