//! 可取消定时器
//!
//! 定时器本身只是一个 `TimerId` + 一条调度在到期时刻的事件。到期事件执行时先向
//! `TimerTable` 认领（`fire`）：已被取消的定时器认领失败，因此取消之后绝不会再触发，
//! 且"触发"与"取消"二者只有一个能生效。

use std::collections::HashMap;

/// 定时器标识符（单次运行内唯一，不复用）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// 活跃定时器表。
#[derive(Debug, Default)]
pub struct TimerTable {
    next_id: u64,
    armed: HashMap<TimerId, u64>,
}

impl TimerTable {
    /// 登记一个新定时器。`key` 由调用方解释（例如被保护的序号）。
    pub fn arm(&mut self, key: u64) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.armed.insert(id, key);
        id
    }

    /// 取消定时器；重复取消或取消已触发的定时器返回 false。
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.armed.remove(&id).is_some()
    }

    /// 到期认领：成功则返回 `key`，之后该定时器不再活跃。
    pub fn fire(&mut self, id: TimerId) -> Option<u64> {
        self.armed.remove(&id)
    }

    pub fn active(&self) -> usize {
        self.armed.len()
    }
}
