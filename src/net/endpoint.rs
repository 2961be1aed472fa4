//! 端点标识
//!
//! 一次运行只有两个端点：发送方与接收方。

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Sender,
    Receiver,
}
