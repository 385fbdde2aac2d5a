//! LogPublisher - logs stream lifecycle and samples via tracing

use std::collections::HashMap;

use contracts::{ContractError, OutputChannelKey, StreamInfo, StreamPublisher};
use tracing::{debug, info, instrument};

/// Publisher that logs samples for debugging
pub struct LogPublisher {
    name: String,
    streams: HashMap<OutputChannelKey, StreamInfo>,
}

impl LogPublisher {
    /// Create a new LogPublisher with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            streams: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl StreamPublisher for LogPublisher {
    #[instrument(
        name = "log_publisher_add_stream",
        skip(self, info),
        fields(publisher = %self.name, stream = %info.name, source_id = %info.source_id)
    )]
    fn add_stream(&mut self, info: &StreamInfo) -> Result<(), ContractError> {
        let key = info.key();
        if self.streams.contains_key(&key) {
            return Err(ContractError::stream_open(key.to_string(), "stream already open"));
        }
        info!(
            channel_type = %info.channel_type,
            nominal_srate = info.nominal_srate,
            format = ?info.channel_format,
            "stream opened"
        );
        self.streams.insert(key, info.clone());
        Ok(())
    }

    fn remove_stream(&mut self, key: &OutputChannelKey) -> bool {
        let removed = self.streams.remove(key).is_some();
        if removed {
            info!(publisher = %self.name, stream = %key, "stream closed");
        }
        removed
    }

    fn push_sample(
        &mut self,
        key: &OutputChannelKey,
        channel_type: &str,
        values: &[f32],
    ) -> Result<(), ContractError> {
        if !self.streams.contains_key(key) {
            return Err(ContractError::StreamNotFound {
                stream: key.to_string(),
            });
        }
        debug!(
            publisher = %self.name,
            stream = %key,
            channel_type,
            values = ?values,
            "sample published"
        );
        Ok(())
    }

    fn stream_count(&self) -> usize {
        self.streams.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ChannelDescriptor, SourceId};

    #[test]
    fn test_log_publisher_lifecycle() {
        let mut publisher = LogPublisher::new("test_log");
        let channel = ChannelDescriptor {
            name: "TEMP".into(),
            channel_type: "Temp".into(),
            nominal_srate: 7.5,
        };
        let info = StreamInfo::for_channel(&channel, &SourceId::new("dev"));

        assert!(publisher.push_sample(&info.key(), "Temp", &[36.6]).is_err());
        publisher.add_stream(&info).unwrap();
        assert!(publisher.push_sample(&info.key(), "Temp", &[36.6]).is_ok());
        assert_eq!(publisher.stream_count(), 1);
        assert!(publisher.remove_stream(&info.key()));
        assert_eq!(publisher.stream_count(), 0);
    }

    #[test]
    fn test_log_publisher_name() {
        let publisher = LogPublisher::new("my_logger");
        assert_eq!(publisher.name(), "my_logger");
    }
}
