//! Go-Back-N
//!
//! - 序号是不回绕的逻辑计数器，ACK(n) 表示 "≤ n 的包全部收到"（累计确认）。
//! - 发送方只有一个定时器，保护最老的未确认包；超时后按序重传 `[base, next_seq)`。
//! - 接收方只接受 `expected` 且校验通过的包，其余一律丢弃并重发上一个累计 ACK。

use super::window::SendWindow;
use super::{ignore_ack, Protocol, Receiver, Sender};
use crate::error::RdtError;
use crate::net::{LinkApi, Packet};
use crate::sim::{Simulator, TimerId};
use crate::trace::{AckIgnoreReason, RejectReason, TraceEventKind};
use tracing::{debug, info};

/// 接收方尚未按序收到任何包时发出的占位 ACK 序号。
pub const NO_DATA_ACK: u64 = u64::MAX;

#[derive(Debug)]
pub struct GbnSender {
    window: SendWindow,
    /// 唯一的定时器及其计时开始时保护的序号
    timer: Option<(TimerId, u64)>,
}

impl GbnSender {
    pub fn new(window_size: usize) -> Self {
        Self {
            window: SendWindow::new(window_size),
            timer: None,
        }
    }

    pub fn window(&self) -> &SendWindow {
        &self.window
    }

    fn pump(&mut self, sim: &mut Simulator, link: &mut dyn LinkApi) {
        while let Some((seq, payload)) = self.window.next_to_send() {
            let packet = Packet::data(seq, payload);
            info!(protocol = %Protocol::GoBackN, pkt = %packet, "📤 发送数据包");
            link.send_data(packet.clone(), false, sim);
            let first_outstanding = self.window.is_empty();
            self.window.push(packet, None);
            if first_outstanding {
                self.restart_timer(sim, link);
            }
        }
    }

    /// 取消旧定时器；窗口非空时为新的 base 重新计时。
    fn restart_timer(&mut self, sim: &mut Simulator, link: &mut dyn LinkApi) {
        if let Some((id, seq)) = self.timer.take() {
            link.cancel_timer(id, seq, sim.now());
        }
        if !self.window.is_empty() {
            let base = self.window.base();
            self.timer = Some((link.start_timer(base, sim), base));
        }
    }
}

impl Sender for GbnSender {
    fn protocol(&self) -> Protocol {
        Protocol::GoBackN
    }

    fn submit(
        &mut self,
        payload: String,
        sim: &mut Simulator,
        link: &mut dyn LinkApi,
    ) -> Result<(), RdtError> {
        self.window.enqueue(payload);
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
        let n = ack.seq();
        if ack.is_corrupt() {
            ignore_ack(link, now, n, AckIgnoreReason::Corrupt);
            return Ok(());
        }
        if n == NO_DATA_ACK {
            ignore_ack(link, now, n, AckIgnoreReason::NoDataYet);
            return Ok(());
        }
        if n >= self.window.next_seq() {
            return Err(RdtError::invariant(
                Protocol::GoBackN,
                format!(
                    "ACK {n} acknowledges data never sent (next_seq {})",
                    self.window.next_seq()
                ),
            ));
        }
        if n < self.window.base() {
            ignore_ack(link, now, n, AckIgnoreReason::Stale);
            return Ok(());
        }

        let released = self.window.slide_to(n + 1);
        debug!(
            ack = n,
            released = released.len(),
            base = self.window.base(),
            next_seq = self.window.next_seq(),
            "累计确认，窗口滑动"
        );
        self.restart_timer(sim, link);
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
        if self.timer.map(|(t, _)| t) != Some(id) || self.window.is_empty() {
            return Err(RdtError::invariant(
                Protocol::GoBackN,
                format!(
                    "timer {} (seq {seq}) fired but current timer is {:?} with {} outstanding",
                    id.0,
                    self.timer.map(|(t, _)| t.0),
                    self.window.outstanding()
                ),
            ));
        }
        self.timer = None;
        debug!(
            base = self.window.base(),
            next_seq = self.window.next_seq(),
            "🔁 超时，回退重传整个窗口"
        );
        let mut resend = Vec::with_capacity(self.window.outstanding() as usize);
        for (_, f) in self.window.in_flight_mut() {
            f.tx_count += 1;
            resend.push(f.packet.clone());
        }
        for packet in resend {
            link.send_data(packet, true, sim);
        }
        self.restart_timer(sim, link);
        Ok(())
    }

    fn acked(&self) -> usize {
        self.window.base() as usize
    }

    fn is_done(&self) -> bool {
        self.window.is_empty() && self.window.backlog_len() == 0
    }

    fn check_invariants(&self) -> Result<(), RdtError> {
        self.window
            .check()
            .map_err(|detail| RdtError::invariant(Protocol::GoBackN, detail))?;
        if self.window.is_empty() == self.timer.is_some() {
            return Err(RdtError::invariant(
                Protocol::GoBackN,
                format!(
                    "timer running = {} with {} outstanding packets",
                    self.timer.is_some(),
                    self.window.outstanding()
                ),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct GbnReceiver {
    expected: u64,
}

impl GbnReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expected_seq(&self) -> u64 {
        self.expected
    }

    fn last_ack(&self) -> u64 {
        self.expected.checked_sub(1).unwrap_or(NO_DATA_ACK)
    }
}

impl Receiver for GbnReceiver {
    fn on_data(
        &mut self,
        pkt: Packet,
        sim: &mut Simulator,
        link: &mut dyn LinkApi,
    ) -> Result<(), RdtError> {
        let now = sim.now();
        let seq = pkt.seq();
        let reason = if pkt.is_corrupt() {
            Some(RejectReason::Corrupt)
        } else if seq < self.expected {
            Some(RejectReason::Duplicate)
        } else if seq > self.expected {
            Some(RejectReason::OutOfOrder)
        } else {
            None
        };

        if let Some(reason) = reason {
            debug!(seq, expected = self.expected, ?reason, "丢弃数据包，重发上一个累计 ACK");
            link.record(now, TraceEventKind::DataRejected { seq, reason });
            link.send_ack(Packet::ack(self.last_ack()), sim);
            return Ok(());
        }

        link.record(now, TraceEventKind::DataAccepted { seq });
        if let Some(payload) = pkt.into_payload() {
            link.deliver(seq, payload, now);
        }
        link.send_ack(Packet::ack(seq), sim);
        self.expected += 1;
        Ok(())
    }
}
