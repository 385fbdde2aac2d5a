//! # System Call
//!
//! 在后台任务中运行 shell 命令，并在输出中查找期望的响应。
//!
//! - 命令通过平台 shell 启动（Unix 上为 `sh -c`，Windows 上为 `cmd /C`）
//! - stdout 被累积，出现目标子串即标记为 matched
//! - 结果通过 oneshot 通道只投递一次
//! - 不设超时，调用方通过 [`SystemCallHandle::cancel`] 终止
//!
//! ## 使用示例
//!
//! ```no_run
//! use system_call::SystemCall;
//!
//! # async fn demo() -> Result<(), system_call::SystemCallError> {
//! let handle = SystemCall::new("emotibit-check --ping", "pong").spawn();
//! let output = handle.wait().await?;
//! if output.matched {
//!     println!("device answered: {}", output.output.trim());
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod runner;

pub use error::SystemCallError;
pub use runner::{SystemCall, SystemCallHandle, SystemCallOutput};
