//! Stop-and-Wait（rdt 3.0，交替位协议）
//!
//! 发送方：WAIT_FOR_APP_DATA -> WAIT_FOR_ACK -> WAIT_FOR_APP_DATA。
//! 接收方：校验失败静默丢弃，迫使发送方超时；重复包只重发 ACK 不重复交付。
//!
//! 交替位只能区分相邻两个包，因此新包首发之前，上一个包的全部副本及其 ACK
//! 必须已离开信道（见 `ReuseGuard`，跨度为 1）。

use std::collections::VecDeque;

use super::window::ReuseGuard;
use super::{ignore_ack, Protocol, Receiver, Sender};
use crate::error::RdtError;
use crate::net::{LinkApi, Packet};
use crate::sim::{SimTime, Simulator, TimerId};
use crate::trace::{AckIgnoreReason, RejectReason, TraceEventKind};
use tracing::{debug, info};

#[derive(Debug)]
struct Outstanding {
    /// 第几个载荷（不回绕）
    index: u64,
    packet: Packet,
    timer: TimerId,
}

#[derive(Debug)]
pub struct StopWaitSender {
    seq: u64,
    backlog: VecDeque<String>,
    waiting: Option<Outstanding>,
    acked: usize,
    guard: ReuseGuard,
    wake: Option<SimTime>,
}

impl Default for StopWaitSender {
    fn default() -> Self {
        Self::new()
    }
}

impl StopWaitSender {
    pub fn new() -> Self {
        Self {
            seq: 0,
            backlog: VecDeque::new(),
            waiting: None,
            acked: 0,
            guard: ReuseGuard::new(1),
            wake: None,
        }
    }

    /// 当前（或下一个）包使用的序号位
    pub fn seq_bit(&self) -> u64 {
        self.seq
    }

    pub fn is_waiting_for_ack(&self) -> bool {
        self.waiting.is_some()
    }

    fn pump(&mut self, sim: &mut Simulator, link: &mut dyn LinkApi) {
        if self.waiting.is_some() || self.backlog.is_empty() {
            return;
        }
        let index = self.acked as u64;
        let ready = self.guard.ready_at(index, link.max_delay());
        if ready > sim.now() {
            if self.wake.is_none_or(|at| at > ready) {
                debug!(index, ready = ?ready, "上一个包的副本可能仍在信道中，推迟首发");
                link.wake_at(ready, sim);
                self.wake = Some(ready);
            }
            return;
        }
        let Some(payload) = self.backlog.pop_front() else {
            return;
        };
        let packet = Packet::data(self.seq, payload);
        info!(protocol = %Protocol::StopWait, pkt = %packet, "📤 发送数据包");
        link.send_data(packet.clone(), false, sim);
        self.guard.sent(index, sim.now());
        let timer = link.start_timer(self.seq, sim);
        self.waiting = Some(Outstanding {
            index,
            packet,
            timer,
        });
    }

    fn retransmit(&mut self, sim: &mut Simulator, link: &mut dyn LinkApi) {
        let Some(w) = self.waiting.as_mut() else {
            return;
        };
        link.cancel_timer(w.timer, w.packet.seq(), sim.now());
        debug!(pkt = %w.packet, "🔁 重传数据包");
        link.send_data(w.packet.clone(), true, sim);
        w.timer = link.start_timer(w.packet.seq(), sim);
        self.guard.record(w.index, sim.now());
    }
}

impl Sender for StopWaitSender {
    fn protocol(&self) -> Protocol {
        Protocol::StopWait
    }

    fn submit(
        &mut self,
        payload: String,
        sim: &mut Simulator,
        link: &mut dyn LinkApi,
    ) -> Result<(), RdtError> {
        self.backlog.push_back(payload);
        self.pump(sim, link);
        Ok(())
    }

    fn on_ack(
        &mut self,
        ack: Packet,
        sim: &mut Simulator,
        link: &mut dyn LinkApi,
    ) -> Result<(), RdtError> {
        let now = sim.now();
        if ack.is_corrupt() {
            // 损坏的 ACK 不做任何事，等待超时
            ignore_ack(link, now, ack.seq(), AckIgnoreReason::Corrupt);
            return Ok(());
        }
        let Some(w) = self.waiting.as_ref() else {
            ignore_ack(link, now, ack.seq(), AckIgnoreReason::Stale);
            return Ok(());
        };
        if ack.seq() != w.packet.seq() {
            debug!(ack = ack.seq(), want = w.packet.seq(), "ACK 序号不符，重传");
            self.retransmit(sim, link);
            return Ok(());
        }

        let timer = w.timer;
        link.cancel_timer(timer, ack.seq(), now);
        self.waiting = None;
        self.acked += 1;
        self.seq = 1 - self.seq;
        debug!(seq = ack.seq(), acked = self.acked, "ACK 确认，切换序号位");
        self.pump(sim, link);
        Ok(())
    }

    fn on_timeout(
        &mut self,
        id: TimerId,
        seq: u64,
        sim: &mut Simulator,
        link: &mut dyn LinkApi,
    ) -> Result<(), RdtError> {
        let Some(w) = self.waiting.as_ref() else {
            return Err(RdtError::invariant(
                Protocol::StopWait,
                format!("timer {} for seq {seq} fired with nothing in flight", id.0),
            ));
        };
        if w.timer != id {
            return Err(RdtError::invariant(
                Protocol::StopWait,
                format!("stale timer {} fired, current is {}", id.0, w.timer.0),
            ));
        }
        self.retransmit(sim, link);
        Ok(())
    }

    fn on_wake(&mut self, sim: &mut Simulator, link: &mut dyn LinkApi) -> Result<(), RdtError> {
        if self.wake.is_some_and(|at| at <= sim.now()) {
            self.wake = None;
        }
        self.pump(sim, link);
        Ok(())
    }

    fn acked(&self) -> usize {
        self.acked
    }

    fn is_done(&self) -> bool {
        self.waiting.is_none() && self.backlog.is_empty()
    }

    fn check_invariants(&self) -> Result<(), RdtError> {
        if self.seq > 1 {
            return Err(RdtError::invariant(
                Protocol::StopWait,
                format!("sequence bit is {}", self.seq),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct StopWaitReceiver {
    expected: u64,
}

impl StopWaitReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expected_bit(&self) -> u64 {
        self.expected
    }
}

impl Receiver for StopWaitReceiver {
    fn on_data(
        &mut self,
        pkt: Packet,
        sim: &mut Simulator,
        link: &mut dyn LinkApi,
    ) -> Result<(), RdtError> {
        let now = sim.now();
        let seq = pkt.seq();
        if pkt.is_corrupt() {
            debug!(pkt = %pkt, "数据包损坏，静默丢弃");
            link.record(
                now,
                TraceEventKind::DataRejected {
                    seq,
                    reason: RejectReason::Corrupt,
                },
            );
            return Ok(());
        }
        if seq > 1 {
            return Err(RdtError::invariant(
                Protocol::StopWait,
                format!("received sequence bit {seq}"),
            ));
        }

        if seq == self.expected {
            link.record(now, TraceEventKind::DataAccepted { seq });
            if let Some(payload) = pkt.into_payload() {
                link.deliver(seq, payload, now);
            }
            self.expected = 1 - self.expected;
        } else {
            debug!(seq, "重复数据包，仅重发 ACK");
            link.record(
                now,
                TraceEventKind::DataRejected {
                    seq,
                    reason: RejectReason::Duplicate,
                },
            );
        }
        link.send_ack(Packet::ack(seq), sim);
        Ok(())
    }
}
