//! 统计信息
//!
//! 一次协议运行的计数器。

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// DATA 发送次数（含重传）
    pub data_sent: u64,
    pub data_retransmitted: u64,
    pub acks_sent: u64,
    pub acks_received: u64,
    pub corrupt_acks: u64,
    pub channel_drops: u64,
    pub channel_corruptions: u64,
    pub channel_delays: u64,
    pub timeouts: u64,
    pub delivered: u64,
}
