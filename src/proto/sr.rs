//! Selective Repeat
//!
//! 线上序号取模 `2 × W`，保证新旧窗口的序号不会混淆。发送方内部仍用不回绕的逻辑序号，
//! 收到 ACK 时把线上序号映射回当前窗口内唯一的逻辑序号。
//!
//! 发送方每个在途包一个定时器，超时只重传该包；`base` 只越过连续的已确认前缀。
//! 接收方接受窗口内任意顺序的包并逐包确认，只把从 `recv_base` 开始的连续段交付给应用层。
//!
//! 逻辑序号 `n` 与 `n - W` 在接收方看来可能混淆，所以 `n` 要等 `n - W` 的所有副本
//! 及其 ACK 离开信道后才首发（`ReuseGuard`）；等待期间由 `ResumeSend` 唤醒。

use std::collections::BTreeMap;

use super::window::{ReuseGuard, SendWindow};
use super::{ignore_ack, Protocol, Receiver, Sender};
use crate::error::RdtError;
use crate::net::{LinkApi, Packet};
use crate::sim::{SimTime, Simulator, TimerId};
use crate::trace::{AckIgnoreReason, RejectReason, TraceEventKind};
use tracing::{debug, info};

/// 序号空间大小
pub fn seq_modulus(window_size: usize) -> u64 {
    (window_size.max(1) as u64).saturating_mul(2)
}

/// 模 `modulus` 下从 `base` 到 `seq` 的前向距离；`seq` 须小于 `modulus`。
fn wire_offset(seq: u64, base: u64, modulus: u64) -> u64 {
    let base = base % modulus;
    if seq >= base {
        seq - base
    } else {
        modulus - (base - seq)
    }
}

#[derive(Debug)]
pub struct SrSender {
    window: SendWindow,
    modulus: u64,
    acked: usize,
    guard: ReuseGuard,
    /// 已请求的恢复时刻
    wake: Option<SimTime>,
}

impl SrSender {
    pub fn new(window_size: usize) -> Self {
        Self {
            window: SendWindow::new(window_size),
            modulus: seq_modulus(window_size),
            acked: 0,
            guard: ReuseGuard::new(window_size as u64),
            wake: None,
        }
    }

    pub fn window(&self) -> &SendWindow {
        &self.window
    }

    pub fn modulus(&self) -> u64 {
        self.modulus
    }

    /// 线上序号 -> 当前窗口内的逻辑序号
    fn logical(&self, wire: u64) -> Option<u64> {
        let base = self.window.base();
        let offset = wire_offset(wire, base, self.modulus);
        (offset < self.window.outstanding()).then_some(base + offset)
    }

    fn pump(&mut self, sim: &mut Simulator, link: &mut dyn LinkApi) {
        while self.window.has_room() && self.window.backlog_len() > 0 {
            let ready = self.guard.ready_at(self.window.next_seq(), link.max_delay());
            if ready > sim.now() {
                if self.wake.is_none_or(|at| at > ready) {
                    debug!(seq = self.window.next_seq(), ready = ?ready, "旧副本可能仍在信道中，推迟首发");
                    link.wake_at(ready, sim);
                    self.wake = Some(ready);
                }
                return;
            }
            let Some((seq, payload)) = self.window.next_to_send() else {
                return;
            };
            let packet = Packet::data(seq % self.modulus, payload);
            info!(protocol = %Protocol::SelectiveRepeat, logical = seq, pkt = %packet, "📤 发送数据包");
            link.send_data(packet.clone(), false, sim);
            self.guard.sent(seq, sim.now());
            let timer = link.start_timer(seq, sim);
            self.window.push(packet, Some(timer));
        }
    }
}

impl Sender for SrSender {
    fn protocol(&self) -> Protocol {
        Protocol::SelectiveRepeat
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
        if n >= self.modulus {
            return Err(RdtError::invariant(
                Protocol::SelectiveRepeat,
                format!("ACK seq {n} outside sequence space 0..{}", self.modulus),
            ));
        }
        let Some(logical) = self.logical(n) else {
            ignore_ack(link, now, n, AckIgnoreReason::Stale);
            return Ok(());
        };
        let Some(slot) = self.window.get_mut(logical) else {
            return Err(RdtError::invariant(
                Protocol::SelectiveRepeat,
                format!("no slot tracked for in-window seq {logical}"),
            ));
        };
        if slot.acked {
            ignore_ack(link, now, n, AckIgnoreReason::Duplicate);
            return Ok(());
        }

        slot.acked = true;
        if let Some(id) = slot.timer.take() {
            link.cancel_timer(id, logical, now);
        }
        self.acked += 1;

        let slid = if logical == self.window.base() {
            self.window.slide_acked_prefix()
        } else {
            0
        };
        debug!(
            ack = n,
            logical,
            slid,
            base = self.window.base(),
            next_seq = self.window.next_seq(),
            "逐包确认"
        );
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
        let slot = self
            .window
            .get_mut(seq)
            .filter(|f| !f.acked && f.timer == Some(id))
            .ok_or_else(|| {
                RdtError::invariant(
                    Protocol::SelectiveRepeat,
                    format!("timer {} fired for seq {seq} which is not awaiting it", id.0),
                )
            })?;
        debug!(logical = seq, pkt = %slot.packet, "🔁 超时，只重传该包");
        slot.tx_count += 1;
        let packet = slot.packet.clone();
        link.send_data(packet, true, sim);
        slot.timer = Some(link.start_timer(seq, sim));
        self.guard.record(seq, sim.now());
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
        self.window.is_empty() && self.window.backlog_len() == 0
    }

    fn check_invariants(&self) -> Result<(), RdtError> {
        self.window
            .check()
            .map_err(|detail| RdtError::invariant(Protocol::SelectiveRepeat, detail))?;
        for (seq, f) in self.window.in_flight() {
            if f.acked == f.timer.is_some() {
                return Err(RdtError::invariant(
                    Protocol::SelectiveRepeat,
                    format!("seq {seq}: acked = {} but timer running = {}", f.acked, f.timer.is_some()),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct SrReceiver {
    window: u64,
    modulus: u64,
    /// 线上序号空间中的窗口左沿
    recv_base: u64,
    /// 已确认、尚未交付的乱序包（线上序号 -> 载荷）
    buffer: BTreeMap<u64, String>,
}

impl SrReceiver {
    pub fn new(window_size: usize) -> Self {
        Self {
            window: window_size.max(1) as u64,
            modulus: seq_modulus(window_size),
            recv_base: 0,
            buffer: BTreeMap::new(),
        }
    }

    pub fn recv_base(&self) -> u64 {
        self.recv_base
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

impl Receiver for SrReceiver {
    fn on_data(
        &mut self,
        pkt: Packet,
        sim: &mut Simulator,
        link: &mut dyn LinkApi,
    ) -> Result<(), RdtError> {
        let now = sim.now();
        let seq = pkt.seq();
        if pkt.is_corrupt() {
            debug!(pkt = %pkt, "数据包损坏，丢弃且不确认");
            link.record(
                now,
                TraceEventKind::DataRejected {
                    seq,
                    reason: RejectReason::Corrupt,
                },
            );
            return Ok(());
        }
        if seq >= self.modulus {
            return Err(RdtError::invariant(
                Protocol::SelectiveRepeat,
                format!("DATA seq {seq} outside sequence space 0..{}", self.modulus),
            ));
        }

        // 模 2W 下，偏移 < W 为当前窗口，其余都落在上一个窗口 [recv_base - W, recv_base)
        let offset = wire_offset(seq, self.recv_base, self.modulus);
        if offset >= self.window || self.buffer.contains_key(&seq) {
            debug!(seq, recv_base = self.recv_base, "重复数据包，重发 ACK 但不交付");
            link.record(
                now,
                TraceEventKind::DataRejected {
                    seq,
                    reason: RejectReason::Duplicate,
                },
            );
            link.send_ack(Packet::ack(seq), sim);
            return Ok(());
        }

        link.record(
            now,
            if offset == 0 {
                TraceEventKind::DataAccepted { seq }
            } else {
                TraceEventKind::DataBuffered { seq }
            },
        );
        if let Some(payload) = pkt.into_payload() {
            self.buffer.insert(seq, payload);
        }
        link.send_ack(Packet::ack(seq), sim);

        while let Some(payload) = self.buffer.remove(&self.recv_base) {
            link.deliver(self.recv_base, payload, now);
            self.recv_base = (self.recv_base + 1) % self.modulus;
        }
        Ok(())
    }
}
