//! # Stream Output
//!
//! 输出流注册与样本发布模块。
//!
//! 负责：
//! - 按 source_id 保存 patchboard schema
//! - 维护 `(source_id, channel) -> type` 映射
//! - 为每个通道在发布端创建单通道 float32 流
//! - 将设备样本解析到对应通道并发布

pub mod error;
pub mod metrics;
pub mod publishers;
pub mod registry;

pub use contracts::{OutputChannelKey, PatchSchema, StreamInfo, StreamPublisher};
pub use error::PublishError;
pub use metrics::{MetricsSnapshot, PublisherMetrics};
pub use publishers::{LogPublisher, MemoryPublisher, PublishedSample, UdpPublisher};
pub use registry::OutputStreamRegistry;
