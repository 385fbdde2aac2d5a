//! Marker input 错误类型

use thiserror::Error;

/// Marker input 错误
#[derive(Debug, Error)]
pub enum MarkerInputError {
    /// 无法绑定接收端口
    #[error("failed to bind marker receiver on {addr}: {source}")]
    Bind {
        /// 绑定地址
        addr: String,
        /// 底层 IO 错误
        #[source]
        source: std::io::Error,
    },

    /// 数据报解析失败
    #[error("failed to decode marker datagram: {message}")]
    Decode {
        /// 错误消息
        message: String,
    },
}

/// Marker input Result 类型别名
pub type Result<T> = std::result::Result<T, MarkerInputError>;
