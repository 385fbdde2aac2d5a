//! 子进程错误类型

use std::io;

use thiserror::Error;

/// 子进程调用错误
#[derive(Debug, Error)]
pub enum SystemCallError {
    /// 进程无法启动
    #[error("failed to launch '{command}': {source}")]
    LaunchFailed {
        command: String,
        #[source]
        source: io::Error,
    },

    /// 读取输出或等待退出时出错
    #[error("io fault while running '{command}': {source}")]
    IoFault {
        command: String,
        #[source]
        source: io::Error,
    },

    /// 调用方取消
    #[error("'{command}' was cancelled")]
    Cancelled { command: String },
}

impl SystemCallError {
    /// 出错的命令
    pub fn command(&self) -> &str {
        match self {
            Self::LaunchFailed { command, .. }
            | Self::IoFault { command, .. }
            | Self::Cancelled { command } => command,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
