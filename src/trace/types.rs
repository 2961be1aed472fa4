use serde::{Deserialize, Serialize};

use crate::net::PacketKind;
use crate::proto::Protocol;

/// 接收方丢弃 DATA 包的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    Corrupt,
    OutOfOrder,
    Duplicate,
}

/// 发送方忽略 ACK 的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckIgnoreReason {
    Corrupt,
    /// 已滑过窗口的旧 ACK
    Stale,
    /// 窗口内但已确认过
    Duplicate,
    /// 接收方尚未收到任何数据时发出的占位 ACK
    NoDataYet,
}

/// 追踪事件类型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceEventKind {
    /// 发送方发出 DATA（`retrans` 表示重传）
    DataSent { seq: u64, checksum: u16, retrans: bool },
    /// 接收方收到 DATA（尚未校验）
    DataReceived { seq: u64, checksum: u16 },
    /// 接收方按序接受 DATA
    DataAccepted { seq: u64 },
    /// SR 接收方缓存乱序 DATA
    DataBuffered { seq: u64 },
    DataRejected { seq: u64, reason: RejectReason },
    AckSent { seq: u64, checksum: u16 },
    AckReceived { seq: u64, checksum: u16 },
    AckIgnored { seq: u64, reason: AckIgnoreReason },
    ChannelDrop { pkt_kind: PacketKind, seq: u64 },
    ChannelCorrupt { pkt_kind: PacketKind, seq: u64 },
    ChannelDelay { pkt_kind: PacketKind, seq: u64, delay_ns: u64 },
    TimerStarted { timer: u64, seq: u64, expires_ns: u64 },
    TimerCancelled { timer: u64, seq: u64 },
    TimerExpired { timer: u64, seq: u64 },
    /// 载荷交付给应用层
    Delivered { seq: u64, payload: String },
    /// 发送方所有载荷均已确认
    SenderDone { acked: usize },
    RunComplete { delivered: Vec<String> },
}

/// 一条追踪事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// 仿真时间（纳秒，和 `SimTime.0` 同口径）
    pub t_ns: u64,
    pub protocol: Protocol,
    #[serde(flatten)]
    pub kind: TraceEventKind,
}

/// 事件收集器（存内存，运行结束后可写 JSON 文件）
#[derive(Debug, Default, Clone)]
pub struct TraceLog {
    pub events: Vec<TraceEvent>,
}

impl TraceLog {
    pub fn push(&mut self, ev: TraceEvent) {
        self.events.push(ev);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TraceEventKind> {
        self.events.iter().map(|e| &e.kind)
    }

    /// 按发送顺序列出 DATA 的序号；`retrans` 为 Some 时只统计对应类别。
    pub fn data_sent_seqs(&self, retrans: Option<bool>) -> Vec<u64> {
        self.iter()
            .filter_map(|k| match k {
                TraceEventKind::DataSent { seq, retrans: r, .. }
                    if retrans.is_none_or(|want| want == *r) =>
                {
                    Some(*seq)
                }
                _ => None,
            })
            .collect()
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.events)
    }
}
