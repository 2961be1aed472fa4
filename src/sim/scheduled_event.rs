//! 调度事件
//!
//! 队列中的一项：执行时间 + 入队序号 + 事件对象。

use super::event::Event;
use super::time::SimTime;
use std::cmp::{Ordering, Reverse};

/// 调度事件。同一时刻的事件按入队顺序（`seq`）执行，保证同一时刻内 FIFO。
pub struct ScheduledEvent {
    pub(crate) at: SimTime,
    pub(crate) seq: u64,
    pub(crate) ev: Box<dyn Event>,
}

impl ScheduledEvent {
    // BinaryHeap 是 max-heap，用 Reverse 得到 (时间, 序号) 最小优先。
    fn key(&self) -> Reverse<(SimTime, u64)> {
        Reverse((self.at, self.seq))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ScheduledEvent {}
