//! 协议运行世界
//!
//! 一次运行 = 一个发送方 + 一个接收方 + 一条 `Link`。不同运行之间没有任何共享状态。
//! 处理函数返回的第一个错误被记录下来，随后仿真器停止（fail fast）。

use super::api::LinkApi;
use super::endpoint::Endpoint;
use super::link::Link;
use super::packet::{Packet, PacketKind};
use crate::error::RdtError;
use crate::proto::{Receiver, Sender};
use crate::sim::{SimTime, Simulator, TimerId, World};
use crate::trace::TraceEventKind;
use std::any::Any;
use tracing::{error, info, warn};

pub struct RdtWorld {
    pub link: Link,
    sender: Box<dyn Sender>,
    receiver: Box<dyn Receiver>,
    fault: Option<RdtError>,
    done_at: Option<SimTime>,
}

impl RdtWorld {
    pub fn new(link: Link, sender: Box<dyn Sender>, receiver: Box<dyn Receiver>) -> Self {
        Self {
            link,
            sender,
            receiver,
            fault: None,
            done_at: None,
        }
    }

    pub fn sender(&self) -> &dyn Sender {
        self.sender.as_ref()
    }

    pub fn fault(&self) -> Option<&RdtError> {
        self.fault.as_ref()
    }

    pub fn take_fault(&mut self) -> Option<RdtError> {
        self.fault.take()
    }

    /// 发送方确认完全部载荷的时刻
    pub fn done_at(&self) -> Option<SimTime> {
        self.done_at
    }

    /// 应用层向发送方提交一个载荷（窗口满时在发送方排队）。
    pub fn submit(&mut self, payload: String, sim: &mut Simulator) {
        let r = self.sender.submit(payload, sim, &mut self.link);
        self.settle(r);
    }

    pub(crate) fn on_packet(&mut self, to: Endpoint, pkt: Packet, sim: &mut Simulator) {
        if self.fault.is_some() {
            return;
        }
        let now = sim.now();
        let r = match (to, pkt.kind()) {
            (Endpoint::Receiver, PacketKind::Data) => {
                self.link.record(
                    now,
                    TraceEventKind::DataReceived {
                        seq: pkt.seq(),
                        checksum: pkt.checksum(),
                    },
                );
                self.receiver.on_data(pkt, sim, &mut self.link)
            }
            (Endpoint::Sender, PacketKind::Ack) => {
                self.link.stats.acks_received += 1;
                self.link.record(
                    now,
                    TraceEventKind::AckReceived {
                        seq: pkt.seq(),
                        checksum: pkt.checksum(),
                    },
                );
                self.sender.on_ack(pkt, sim, &mut self.link)
            }
            (to, kind) => Err(RdtError::invariant(
                self.link.protocol(),
                format!("{kind:?} packet routed to {to:?}"),
            )),
        };
        self.settle(r);
    }

    pub(crate) fn on_timer(&mut self, id: TimerId, sim: &mut Simulator) {
        if self.fault.is_some() {
            return;
        }
        // 已取消的定时器认领失败
        let Some(seq) = self.link.timers.fire(id) else {
            return;
        };
        warn!(protocol = %self.link.protocol(), timer = id.0, seq, "⏰ 定时器超时");
        self.link.stats.timeouts += 1;
        self.link
            .record(sim.now(), TraceEventKind::TimerExpired { timer: id.0, seq });
        let r = self.sender.on_timeout(id, seq, sim, &mut self.link);
        self.settle(r);
    }

    pub(crate) fn on_wake(&mut self, sim: &mut Simulator) {
        if self.fault.is_some() {
            return;
        }
        let r = self.sender.on_wake(sim, &mut self.link);
        self.settle(r);
    }

    fn settle(&mut self, r: Result<(), RdtError>) {
        let r = r.and_then(|()| self.sender.check_invariants());
        if let Err(e) = r {
            error!(error = %e, "❌ 协议不变量被破坏，终止运行");
            if self.fault.is_none() {
                self.fault = Some(e);
            }
        }
    }
}

impl World for RdtWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn on_tick(&mut self, sim: &mut Simulator) {
        if self.done_at.is_none() && self.fault.is_none() && self.sender.is_done() {
            let now = sim.now();
            self.done_at = Some(now);
            let acked = self.sender.acked();
            info!(protocol = %self.link.protocol(), acked, at = ?now, "✅ 所有载荷均已确认");
            self.link.record(now, TraceEventKind::SenderDone { acked });
        }
    }

    fn should_stop(&self) -> bool {
        self.fault.is_some()
    }
}
