//! OutputStreamRegistry - per-source schemas and their published streams

use std::collections::HashMap;
use std::sync::Arc;

use contracts::{
    ContractError, OutputChannelKey, PatchSchema, SourceId, StreamInfo, StreamPublisher,
};
use tracing::{debug, info, instrument, warn};

use crate::error::PublishError;
use crate::metrics::PublisherMetrics;

/// Registry of output schemas keyed by device source id
///
/// Every `(source_id, channel)` key in the type map has exactly one open
/// stream on the publisher.
pub struct OutputStreamRegistry {
    schemas: HashMap<SourceId, PatchSchema>,
    types: HashMap<OutputChannelKey, String>,
    publisher: Box<dyn StreamPublisher>,
    metrics: Arc<PublisherMetrics>,
}

impl OutputStreamRegistry {
    /// Create an empty registry publishing through `publisher`
    pub fn new(publisher: Box<dyn StreamPublisher>) -> Self {
        Self {
            schemas: HashMap::new(),
            types: HashMap::new(),
            publisher,
            metrics: Arc::new(PublisherMetrics::new()),
        }
    }

    /// Register a schema, opening one stream per channel
    ///
    /// A schema already registered under `source_id` is torn down first.
    /// When a stream cannot be opened the streams opened so far are closed
    /// and nothing is registered.
    #[instrument(
        name = "output_register_schema",
        skip(self, source_id, schema),
        fields(channels = schema.channels.len())
    )]
    pub fn register_schema(
        &mut self,
        source_id: impl Into<SourceId>,
        schema: PatchSchema,
    ) -> Result<(), ContractError> {
        let source_id = source_id.into();
        if self.unregister_schema(&source_id) {
            debug!(source_id = %source_id, "replacing existing schema");
        }

        let mut opened: Vec<OutputChannelKey> = Vec::with_capacity(schema.channels.len());
        for channel in &schema.channels {
            let info = StreamInfo::for_channel(channel, &source_id);
            if let Err(e) = self.publisher.add_stream(&info) {
                warn!(source_id = %source_id, channel = %channel.name, error = %e, "stream open failed");
                for key in &opened {
                    self.publisher.remove_stream(key);
                }
                return Err(e);
            }
            opened.push(info.key());
            self.metrics.inc_opened();
        }

        for (key, channel) in opened.into_iter().zip(&schema.channels) {
            self.types.insert(key, channel.channel_type.clone());
        }
        info!(
            source_id = %source_id,
            patches = schema.num_patches(),
            "output schema registered"
        );
        self.schemas.insert(source_id, schema);
        Ok(())
    }

    /// Remove a source's schema and close its streams
    ///
    /// Returns false when the source was not registered.
    pub fn unregister_schema(&mut self, source_id: &str) -> bool {
        let Some(schema) = self.schemas.remove(source_id) else {
            return false;
        };
        let mut closed = 0;
        for channel in &schema.channels {
            let key = OutputChannelKey::new(source_id, channel.name.as_str());
            self.types.remove(&key);
            if self.publisher.remove_stream(&key) {
                closed += 1;
            }
        }
        self.metrics.add_closed(closed);
        debug!(source_id, closed, "output schema unregistered");
        true
    }

    /// Number of patches for a source, 0 when unknown
    pub fn count_patches(&self, source_id: &str) -> usize {
        self.schemas.get(source_id).map_or(0, PatchSchema::num_patches)
    }

    pub fn is_known_source(&self, source_id: &str) -> bool {
        self.schemas.contains_key(source_id)
    }

    /// Channel type registered for `(source_id, channel_name)`
    pub fn resolve_type(&self, source_id: &str, channel_name: &str) -> Option<&str> {
        self.types
            .get(&OutputChannelKey::new(source_id, channel_name))
            .map(String::as_str)
    }

    /// Output channel a device type tag is patched to
    pub fn resolve_channel(&self, source_id: &str, type_tag: &str) -> Option<&str> {
        self.schemas.get(source_id)?.channel_for(type_tag)
    }

    /// Registered sources, sorted
    pub fn sources(&self) -> Vec<&SourceId> {
        let mut sources: Vec<_> = self.schemas.keys().collect();
        sources.sort();
        sources
    }

    pub fn schema(&self, source_id: &str) -> Option<&PatchSchema> {
        self.schemas.get(source_id)
    }

    /// Drop every schema and mapping and switch to a fresh publisher
    ///
    /// Streams on the old publisher are closed before it is dropped.
    #[instrument(name = "output_clear_all", skip(self, publisher))]
    pub fn clear_all(&mut self, publisher: Box<dyn StreamPublisher>) {
        let mut closed = 0;
        for key in self.types.keys() {
            if self.publisher.remove_stream(key) {
                closed += 1;
            }
        }
        self.metrics.add_closed(closed);
        self.schemas.clear();
        self.types.clear();
        self.publisher = publisher;
        info!(closed, "output registry cleared");
    }

    /// Resolve a device sample to its output stream and push it
    ///
    /// # Errors
    /// - `UnknownSource` when no schema is registered for `source_id`
    /// - `UnpatchedTypeTag` when the schema has no patch for `type_tag`
    /// - `UnregisteredChannel` when the patched channel has no stream
    /// - `Transport` when the publisher rejects the sample
    pub fn publish(
        &mut self,
        source_id: &str,
        type_tag: &str,
        values: &[f32],
    ) -> Result<(), PublishError> {
        let result = self.try_publish(source_id, type_tag, values);
        match &result {
            Ok(()) => self.metrics.inc_published(),
            Err(_) => self.metrics.inc_rejected(),
        }
        result
    }

    fn try_publish(
        &mut self,
        source_id: &str,
        type_tag: &str,
        values: &[f32],
    ) -> Result<(), PublishError> {
        let schema = self
            .schemas
            .get(source_id)
            .ok_or_else(|| PublishError::UnknownSource {
                source_id: source_id.to_string(),
            })?;
        let channel = schema
            .channel_for(type_tag)
            .ok_or_else(|| PublishError::UnpatchedTypeTag {
                source_id: source_id.to_string(),
                type_tag: type_tag.to_string(),
            })?;
        let key = OutputChannelKey::new(source_id, channel);
        let channel_type = self
            .types
            .get(&key)
            .ok_or_else(|| PublishError::UnregisteredChannel {
                key: key.to_string(),
            })?;
        self.publisher.push_sample(&key, channel_type, values)?;
        Ok(())
    }

    /// Streams open on the current publisher
    pub fn stream_count(&self) -> usize {
        self.publisher.stream_count()
    }

    pub fn metrics(&self) -> &Arc<PublisherMetrics> {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publishers::MemoryPublisher;
    use contracts::{ChannelDescriptor, SUPPORTED_INPUT_TYPE, SUPPORTED_OUTPUT_TYPE};
    use std::collections::BTreeMap;

    fn channel(name: &str, channel_type: &str, srate: f64) -> ChannelDescriptor {
        ChannelDescriptor {
            name: name.into(),
            channel_type: channel_type.into(),
            nominal_srate: srate,
        }
    }

    fn schema(patches: &[(&str, &str)], channels: Vec<ChannelDescriptor>) -> PatchSchema {
        PatchSchema {
            input_type: SUPPORTED_INPUT_TYPE.into(),
            output_type: SUPPORTED_OUTPUT_TYPE.into(),
            patches: patches
                .iter()
                .map(|(t, n)| (t.to_string(), n.to_string()))
                .collect::<BTreeMap<_, _>>(),
            channels,
        }
    }

    fn eda_schema() -> PatchSchema {
        schema(&[("EDA", "EDA")], vec![channel("EDA", "float", 15.0)])
    }

    fn registry() -> (OutputStreamRegistry, MemoryPublisher) {
        let publisher = MemoryPublisher::new();
        (
            OutputStreamRegistry::new(Box::new(publisher.clone())),
            publisher,
        )
    }

    #[test]
    fn test_register_single_channel() {
        let (mut reg, publisher) = registry();
        reg.register_schema("emotibit1", eda_schema()).unwrap();

        assert_eq!(reg.count_patches("emotibit1"), 1);
        assert_eq!(reg.resolve_type("emotibit1", "EDA"), Some("float"));
        assert!(reg.is_known_source("emotibit1"));

        let streams = publisher.streams();
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].channel_count, 1);
        assert_eq!(streams[0].nominal_srate, 15.0);
        assert_eq!(streams[0].source_id, "emotibit1");
    }

    #[test]
    fn test_unknown_lookups() {
        let (mut reg, _) = registry();
        reg.register_schema("emotibit1", eda_schema()).unwrap();
        assert_eq!(reg.count_patches("other"), 0);
        assert_eq!(reg.resolve_type("other", "EDA"), None);
        assert_eq!(reg.resolve_type("emotibit1", "PPG"), None);
        assert_eq!(reg.resolve_channel("emotibit1", "XX"), None);
    }

    #[test]
    fn test_reregistration_tears_down_old_channels() {
        let (mut reg, publisher) = registry();
        reg.register_schema(
            "dev",
            schema(
                &[("EA", "EDA"), ("T1", "TEMP")],
                vec![channel("EDA", "EDA", 15.0), channel("TEMP", "Temp", 7.5)],
            ),
        )
        .unwrap();
        reg.register_schema(
            "dev",
            schema(&[("PI", "PPG_IR")], vec![channel("PPG_IR", "PPG", 25.0)]),
        )
        .unwrap();

        assert_eq!(reg.count_patches("dev"), 1);
        assert_eq!(reg.resolve_type("dev", "EDA"), None);
        assert_eq!(reg.resolve_type("dev", "PPG_IR"), Some("PPG"));
        assert_eq!(publisher.stream_count(), 1);
        assert!(publisher.has_stream(&OutputChannelKey::new("dev", "PPG_IR")));
        assert_eq!(reg.metrics().closed_count(), 2);
    }

    #[test]
    fn test_failed_open_rolls_back() {
        let (mut reg, publisher) = registry();
        // Pre-open the second channel so the registry's open collides
        let mut squatter = publisher.clone();
        squatter
            .add_stream(&StreamInfo::for_channel(
                &channel("TEMP", "Temp", 7.5),
                &SourceId::new("dev"),
            ))
            .unwrap();

        let result = reg.register_schema(
            "dev",
            schema(&[], vec![channel("EDA", "EDA", 15.0), channel("TEMP", "Temp", 7.5)]),
        );
        assert!(result.is_err());
        assert!(!reg.is_known_source("dev"));
        assert!(!publisher.has_stream(&OutputChannelKey::new("dev", "EDA")));
        assert_eq!(reg.resolve_type("dev", "EDA"), None);
    }

    #[test]
    fn test_clear_all() {
        let (mut reg, old_publisher) = registry();
        reg.register_schema("a", eda_schema()).unwrap();
        reg.register_schema("b", eda_schema()).unwrap();
        assert_eq!(reg.sources().len(), 2);

        let new_publisher = MemoryPublisher::new();
        reg.clear_all(Box::new(new_publisher.clone()));

        for source in ["a", "b"] {
            assert!(!reg.is_known_source(source));
            assert_eq!(reg.count_patches(source), 0);
        }
        assert_eq!(old_publisher.stream_count(), 0);
        assert!(reg.sources().is_empty());

        reg.register_schema("a", eda_schema()).unwrap();
        assert_eq!(new_publisher.stream_count(), 1);
    }

    #[test]
    fn test_publish_resolution() {
        let (mut reg, publisher) = registry();
        reg.register_schema(
            "dev",
            schema(&[("EA", "EDA")], vec![channel("EDA", "EDA", 15.0)]),
        )
        .unwrap();

        assert!(matches!(
            reg.publish("ghost", "EA", &[1.0]),
            Err(PublishError::UnknownSource { .. })
        ));
        assert!(matches!(
            reg.publish("dev", "PI", &[1.0]),
            Err(PublishError::UnpatchedTypeTag { .. })
        ));
        reg.publish("dev", "EA", &[0.75]).unwrap();

        let samples = publisher.samples();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].key, OutputChannelKey::new("dev", "EDA"));
        assert_eq!(samples[0].channel_type, "EDA");

        let snap = reg.metrics().snapshot();
        assert_eq!(snap.published_count, 1);
        assert_eq!(snap.rejected_count, 2);
    }

    #[test]
    fn test_patch_to_undeclared_channel() {
        let (mut reg, _) = registry();
        reg.register_schema(
            "dev",
            schema(&[("XX", "MISSING")], vec![channel("EDA", "EDA", 15.0)]),
        )
        .unwrap();
        assert!(matches!(
            reg.publish("dev", "XX", &[1.0]),
            Err(PublishError::UnregisteredChannel { .. })
        ));
    }

    #[test]
    fn test_transport_failure_surfaces() {
        let (mut reg, publisher) = registry();
        reg.register_schema("dev", eda_schema()).unwrap();
        publisher.set_fail_pushes(true);
        assert!(matches!(
            reg.publish("dev", "EDA", &[1.0]),
            Err(PublishError::Transport(_))
        ));
    }
}
