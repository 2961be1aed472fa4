//! 结构化追踪事件
//!
//! 核心不格式化文本：每个重要状态转移都记录一条 `TraceEvent`，由外部（CLI / 测试）
//! 渲染或序列化为 JSON。

mod types;

pub use types::{AckIgnoreReason, RejectReason, TraceEvent, TraceEventKind, TraceLog};
