//! 可靠传输协议
//!
//! 三种经典 rdt 协议共享同一组能力（`Sender` / `Receiver`），区别只在窗口、定时器
//! 与确认策略：
//! - Stop-and-Wait（rdt 3.0）：交替位，单个在途包
//! - Go-Back-N：累计确认，单定时器，超时重传整个窗口
//! - Selective Repeat：逐包确认，每包一个定时器，接收方缓存乱序包

pub mod gbn;
pub mod sr;
pub mod stop_wait;
mod window;

pub use window::{InFlight, ReuseGuard, SendWindow};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::error::RdtError;
use crate::net::{LinkApi, Packet};
use crate::sim::{SimTime, Simulator, TimerId};
use crate::trace::{AckIgnoreReason, TraceEventKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    StopWait,
    GoBackN,
    SelectiveRepeat,
}

impl Protocol {
    pub const ALL: [Protocol; 3] = [
        Protocol::StopWait,
        Protocol::GoBackN,
        Protocol::SelectiveRepeat,
    ];

    /// 按配置构造一对收发端。
    pub fn build(self, cfg: &SimConfig) -> (Box<dyn Sender>, Box<dyn Receiver>) {
        match self {
            Protocol::StopWait => (
                Box::new(stop_wait::StopWaitSender::new()),
                Box::new(stop_wait::StopWaitReceiver::new()),
            ),
            Protocol::GoBackN => (
                Box::new(gbn::GbnSender::new(cfg.window_size)),
                Box::new(gbn::GbnReceiver::new()),
            ),
            Protocol::SelectiveRepeat => (
                Box::new(sr::SrSender::new(cfg.window_size)),
                Box::new(sr::SrReceiver::new(cfg.window_size)),
            ),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Protocol::StopWait => "stop-and-wait",
            Protocol::GoBackN => "go-back-n",
            Protocol::SelectiveRepeat => "selective-repeat",
        })
    }
}

/// 发送方状态机
pub trait Sender {
    fn protocol(&self) -> Protocol;

    /// 应用层提交一个载荷；窗口已满时排队，待窗口滑动后再发。
    fn submit(
        &mut self,
        payload: String,
        sim: &mut Simulator,
        link: &mut dyn LinkApi,
    ) -> Result<(), RdtError>;

    fn on_ack(&mut self, ack: Packet, sim: &mut Simulator, link: &mut dyn LinkApi)
    -> Result<(), RdtError>;

    /// 定时器 `id`（保护序号 `seq`）到期。
    fn on_timeout(
        &mut self,
        id: TimerId,
        seq: u64,
        sim: &mut Simulator,
        link: &mut dyn LinkApi,
    ) -> Result<(), RdtError>;

    /// `LinkApi::wake_at` 请求的时刻已到。
    fn on_wake(&mut self, _sim: &mut Simulator, _link: &mut dyn LinkApi) -> Result<(), RdtError> {
        Ok(())
    }

    /// 已被确认的载荷数
    fn acked(&self) -> usize;

    /// 没有排队载荷，也没有在途包
    fn is_done(&self) -> bool;

    /// 每个事件处理完之后调用；返回 Err 表示实现有 bug。
    fn check_invariants(&self) -> Result<(), RdtError> {
        Ok(())
    }
}

/// 接收方状态机
pub trait Receiver {
    fn on_data(&mut self, pkt: Packet, sim: &mut Simulator, link: &mut dyn LinkApi)
    -> Result<(), RdtError>;
}

pub(crate) fn ignore_ack(link: &mut dyn LinkApi, now: SimTime, seq: u64, reason: AckIgnoreReason) {
    if reason == AckIgnoreReason::Corrupt {
        link.stats_mut().corrupt_acks += 1;
    }
    tracing::debug!(protocol = %link.protocol(), seq, ?reason, "忽略 ACK");
    link.record(now, TraceEventKind::AckIgnored { seq, reason });
}
