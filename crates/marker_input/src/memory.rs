//! In-memory marker hub
//!
//! Outlets publish marker samples under a `(name, source_id)` pair; inlets
//! subscribe by name and optionally pin a source id. An inlet is connected
//! while at least one matching outlet is open.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_channel::{unbounded, Receiver, Sender};
use contracts::{MarkerInlet, MarkerSample};
use tracing::{debug, trace};

#[derive(Debug)]
struct Subscription {
    name: String,
    source_id: Option<String>,
    tx: Sender<MarkerSample>,
}

impl Subscription {
    fn matches(&self, name: &str, source_id: &str) -> bool {
        self.name == name && self.source_id.as_deref().map_or(true, |id| id == source_id)
    }
}

#[derive(Debug, Default)]
struct HubState {
    /// Open outlet count per (name, source_id)
    outlets: HashMap<(String, String), usize>,
    subscriptions: Vec<Subscription>,
}

impl HubState {
    fn is_published(&self, name: &str, source_id: Option<&str>) -> bool {
        self.outlets.iter().any(|((n, s), count)| {
            *count > 0 && n == name && source_id.map_or(true, |id| id == s)
        })
    }
}

/// Shared in-memory marker transport
///
/// Cloning yields another handle to the same hub.
#[derive(Debug, Clone, Default)]
pub struct MemoryMarkerHub {
    state: Arc<Mutex<HubState>>,
}

impl MemoryMarkerHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to marker stream `name`, restricted to `source_id` when given
    pub fn subscribe(&self, name: &str, source_id: Option<&str>) -> MemoryInlet {
        let (tx, rx) = unbounded();
        self.lock().subscriptions.push(Subscription {
            name: name.to_string(),
            source_id: source_id.map(str::to_string),
            tx,
        });
        debug!(stream = name, source_id = ?source_id, "marker inlet subscribed");
        MemoryInlet {
            name: name.to_string(),
            source_id: source_id.map(str::to_string),
            rx,
            hub: self.clone(),
        }
    }

    /// Open an outlet publishing marker stream `name` from `source_id`
    pub fn open_outlet(&self, name: &str, source_id: &str) -> MarkerOutlet {
        let key = (name.to_string(), source_id.to_string());
        *self.lock().outlets.entry(key.clone()).or_insert(0) += 1;
        debug!(stream = name, source_id, "marker outlet opened");
        MarkerOutlet {
            key,
            hub: self.clone(),
        }
    }

    /// Number of live subscriptions
    pub fn subscription_count(&self) -> usize {
        let mut state = self.lock();
        state.subscriptions.retain(|s| !s.tx.is_closed());
        state.subscriptions.len()
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Publishing end of a marker stream
#[derive(Debug)]
pub struct MarkerOutlet {
    key: (String, String),
    hub: MemoryMarkerHub,
}

impl MarkerOutlet {
    pub fn name(&self) -> &str {
        &self.key.0
    }

    pub fn source_id(&self) -> &str {
        &self.key.1
    }

    /// Deliver a sample to every matching subscription
    ///
    /// Returns the number of subscriptions reached. Subscriptions whose
    /// inlet was dropped are pruned.
    pub fn push(&self, sample: MarkerSample) -> usize {
        let (name, source_id) = (&self.key.0, &self.key.1);
        let mut state = self.hub.lock();
        state.subscriptions.retain(|s| !s.tx.is_closed());
        let mut delivered = 0;
        for sub in state.subscriptions.iter().filter(|s| s.matches(name, source_id)) {
            if sub.tx.try_send(sample.clone()).is_ok() {
                delivered += 1;
            }
        }
        trace!(stream = %name, source_id = %source_id, delivered, "marker pushed");
        delivered
    }
}

impl Drop for MarkerOutlet {
    fn drop(&mut self) {
        let mut state = self.hub.lock();
        if let Some(count) = state.outlets.get_mut(&self.key) {
            *count -= 1;
            if *count == 0 {
                state.outlets.remove(&self.key);
            }
        }
        debug!(stream = %self.key.0, source_id = %self.key.1, "marker outlet closed");
    }
}

/// Subscribing end of a marker stream
#[derive(Debug)]
pub struct MemoryInlet {
    name: String,
    source_id: Option<String>,
    rx: Receiver<MarkerSample>,
    hub: MemoryMarkerHub,
}

impl MemoryInlet {
    /// Samples waiting to be flushed
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl MarkerInlet for MemoryInlet {
    fn name(&self) -> &str {
        &self.name
    }

    fn source_id(&self) -> Option<&str> {
        self.source_id.as_deref()
    }

    fn is_connected(&self) -> bool {
        self.hub
            .lock()
            .is_published(&self.name, self.source_id.as_deref())
    }

    fn flush(&mut self) -> Vec<MarkerSample> {
        let mut samples = Vec::with_capacity(self.rx.len());
        while let Ok(sample) = self.rx.try_recv() {
            samples.push(sample);
        }
        samples
    }
}
