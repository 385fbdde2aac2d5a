//! Bridge run orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::{BridgeRunConfig, BridgeRunner};
pub use stats::RunStats;
