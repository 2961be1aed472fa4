//! 发送窗口（GBN / SR 共用）
//!
//! ```text
//!   base               next_seq
//!    │                    │
//! ───┼────────────────────┼──────────────▶ 逻辑序号
//!    │ <── in flight ───▶ │ <── backlog ──▶
//! ```
//!
//! 序号是不回绕的逻辑计数器；线上序号如何取模由具体协议决定。

use std::collections::{BTreeMap, VecDeque};

use crate::net::Packet;
use crate::sim::{SimTime, TimerId};

/// 一个在途包
#[derive(Debug, Clone)]
pub struct InFlight {
    /// 线上包（序号可能已取模）
    pub packet: Packet,
    pub acked: bool,
    /// SR 每包一个定时器；GBN 不使用
    pub timer: Option<TimerId>,
    pub tx_count: u32,
}

#[derive(Debug)]
pub struct SendWindow {
    size: usize,
    base: u64,
    next_seq: u64,
    slots: BTreeMap<u64, InFlight>,
    backlog: VecDeque<String>,
}

impl SendWindow {
    pub fn new(size: usize) -> Self {
        Self {
            size: size.max(1),
            base: 0,
            next_seq: 0,
            slots: BTreeMap::new(),
            backlog: VecDeque::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// 未确认的包数 `next_seq - base`
    pub fn outstanding(&self) -> u64 {
        self.next_seq - self.base
    }

    pub fn is_empty(&self) -> bool {
        self.base == self.next_seq
    }

    pub fn has_room(&self) -> bool {
        self.outstanding() < self.size as u64
    }

    pub fn enqueue(&mut self, payload: String) {
        self.backlog.push_back(payload);
    }

    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    /// 窗口有空位且有排队载荷时，取出下一个 (逻辑序号, 载荷)。调用方随后必须 `push`。
    pub fn next_to_send(&mut self) -> Option<(u64, String)> {
        if !self.has_room() {
            return None;
        }
        let payload = self.backlog.pop_front()?;
        Some((self.next_seq, payload))
    }

    /// 登记一个新发出的包，占用序号 `next_seq`。
    pub fn push(&mut self, packet: Packet, timer: Option<TimerId>) {
        self.slots.insert(
            self.next_seq,
            InFlight {
                packet,
                acked: false,
                timer,
                tx_count: 1,
            },
        );
        self.next_seq += 1;
    }

    pub fn get(&self, seq: u64) -> Option<&InFlight> {
        self.slots.get(&seq)
    }

    pub fn get_mut(&mut self, seq: u64) -> Option<&mut InFlight> {
        self.slots.get_mut(&seq)
    }

    /// 在途包，按序号升序
    pub fn in_flight(&self) -> impl Iterator<Item = (u64, &InFlight)> {
        self.slots.iter().map(|(s, f)| (*s, f))
    }

    pub fn in_flight_mut(&mut self) -> impl Iterator<Item = (u64, &mut InFlight)> {
        self.slots.iter_mut().map(|(s, f)| (*s, f))
    }

    /// 累计确认：丢弃所有 `< new_base` 的在途包。`new_base` 不得越过 `next_seq`。
    pub fn slide_to(&mut self, new_base: u64) -> Vec<InFlight> {
        let new_base = new_base.min(self.next_seq);
        let mut released = Vec::new();
        while self.base < new_base {
            if let Some(f) = self.slots.remove(&self.base) {
                released.push(f);
            }
            self.base += 1;
        }
        released
    }

    /// 越过从 `base` 开始的连续已确认前缀；遇到第一个未确认包即停止。
    pub fn slide_acked_prefix(&mut self) -> usize {
        let mut n = 0;
        while self.slots.get(&self.base).is_some_and(|f| f.acked) {
            self.slots.remove(&self.base);
            self.base += 1;
            n += 1;
        }
        n
    }

    /// 窗口结构不变量；违反时返回描述。
    pub fn check(&self) -> Result<(), String> {
        if self.next_seq < self.base {
            return Err(format!(
                "next_seq {} fell behind base {}",
                self.next_seq, self.base
            ));
        }
        if self.outstanding() > self.size as u64 {
            return Err(format!(
                "{} packets outstanding exceeds window size {}",
                self.outstanding(),
                self.size
            ));
        }
        if self.slots.len() as u64 != self.outstanding() {
            return Err(format!(
                "{} tracked slots for {} outstanding packets",
                self.slots.len(),
                self.outstanding()
            ));
        }
        if let Some((&first, f)) = self.slots.iter().next() {
            if first != self.base {
                return Err(format!("oldest tracked slot {first} is not base {}", self.base));
            }
            if f.acked {
                return Err(format!("base {} is acked but the window did not slide", self.base));
            }
        }
        Ok(())
    }
}

/// 新序号的首发闸门
///
/// 接收方窗口越过逻辑序号 `n - span` 之后，`n - span` 的迟到副本会与 `n` 混淆
/// （SR 为 `span = W`，交替位为 `span = 1`）。因此 `n` 只有在 `n - span` 最后一次
/// 发出的副本以及它触发的 ACK 都已离开信道之后才能首发：最后一次发送时刻 +
/// 2 × 最大信道延迟。信道不延迟时，同一时刻内的 FIFO 已足够，不需要等待。
#[derive(Debug)]
pub struct ReuseGuard {
    span: u64,
    last_tx: BTreeMap<u64, SimTime>,
}

impl ReuseGuard {
    pub fn new(span: u64) -> Self {
        Self {
            span: span.max(1),
            last_tx: BTreeMap::new(),
        }
    }

    /// 记录 `seq` 的一次（重）发送。
    pub fn record(&mut self, seq: u64, at: SimTime) {
        self.last_tx.insert(seq, at);
    }

    /// `seq` 最早可以首发的时刻。
    pub fn ready_at(&self, seq: u64, max_delay: SimTime) -> SimTime {
        let Some(prev) = seq.checked_sub(self.span) else {
            return SimTime::ZERO;
        };
        let Some(&last) = self.last_tx.get(&prev) else {
            return SimTime::ZERO;
        };
        if max_delay == SimTime::ZERO {
            return last;
        }
        // 恰好 2 × max_delay 时刻到达的 ACK 必须先于新包被处理
        last.saturating_add(max_delay)
            .saturating_add(max_delay)
            .saturating_add(SimTime(1))
    }

    /// `seq` 已首发：比 `seq + 1 - span` 更老的记录不会再被查询。
    pub fn sent(&mut self, seq: u64, at: SimTime) {
        self.record(seq, at);
        let keep_from = (seq + 1).saturating_sub(self.span);
        self.last_tx = self.last_tx.split_off(&keep_from);
    }
}
