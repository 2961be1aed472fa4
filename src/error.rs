//! 错误类型
//!
//! 信道上的丢包/损坏/延迟不是错误；这里只有配置错误与协议不变量被破坏两类，
//! 后者意味着实现有 bug，一旦出现立即终止本次运行。

use std::path::PathBuf;

use thiserror::Error;

use crate::proto::Protocol;
use crate::sim::SimTime;

/// 配置校验失败：在任何仿真活动开始之前返回。
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be a probability in [0, 1], got {value}")]
    Probability { field: &'static str, value: f64 },

    #[error("{field} must be finite and > 0, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("window_size must be in 1..={max}, got {value}")]
    WindowSize { value: usize, max: usize },

    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// 一次协议运行的致命错误。
#[derive(Debug, Error)]
pub enum RdtError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("[{protocol}] protocol invariant violated: {detail}")]
    InvariantViolation { protocol: Protocol, detail: String },

    #[error("[{protocol}] run hit its deadline at {at:?}: delivered {delivered} of {expected} packets")]
    Incomplete {
        protocol: Protocol,
        delivered: usize,
        expected: usize,
        at: SimTime,
    },

    #[error("[{protocol}] delivered payload #{index} is {got:?}, expected {expected:?}")]
    DeliveryMismatch {
        protocol: Protocol,
        index: usize,
        expected: Option<String>,
        got: Option<String>,
    },
}

impl RdtError {
    pub(crate) fn invariant(protocol: Protocol, detail: impl Into<String>) -> Self {
        RdtError::InvariantViolation {
            protocol,
            detail: detail.into(),
        }
    }
}
