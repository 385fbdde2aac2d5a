//! # Bridge
//!
//! Marker/stream 桥接核心。
//!
//! 负责：
//! - 持有输出流注册表、marker 订阅注册表、包计数器与本地时钟
//! - 每个 tick 排空已连接的 marker 订阅，编码为 EmotiBit 数据包
//! - 将设备样本解析到输出流并发布
//!
//! ## 使用示例
//!
//! ```
//! use std::sync::Arc;
//! use bridge::{BridgeState, MemoryTransport};
//! use contracts::{ManualClock, MarkerSample};
//!
//! let transport = Arc::new(MemoryTransport::new());
//! let mut state = BridgeState::new(transport.clone(), Arc::new(ManualClock::new(1.0, 0.001)));
//!
//! state
//!     .add_marker_input(r#"{"lsl": {"marker": {"name": "Markers"}}}"#)
//!     .unwrap();
//! let outlet = transport.hub().open_outlet("Markers", "stim-pc");
//! outlet.push(MarkerSample::new(10.0, 0.5, vec!["go".into()]));
//!
//! let packets = state.create_marker_input_packets();
//! let tags: Vec<_> = packets.iter().map(|p| p.type_tag()).collect();
//! assert_eq!(tags, ["LM", "TX", "TX"]);
//! ```

mod clock;
mod encoder;
mod error;
mod state;
mod transport;

pub use clock::SystemClock;
pub use encoder::encode_marker_sample;
pub use error::BridgeError;
pub use state::{BridgeState, TickOutput};
pub use transport::{MemoryTransport, UdpTransport};

// Re-export contracts types
pub use contracts::{Clock, ManualClock, MarkerSample, StreamTransport, TickSummary};
pub use packet_codec::EncodedPacket;
