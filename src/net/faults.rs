//! 信道故障模型
//!
//! 每次发送只做一次决定（丢失 / 损坏 / 延迟），重传会重新决定。随机模型用可设种子的
//! `StdRng`；脚本模型用于构造确定性的测试场景。

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::endpoint::Endpoint;
use super::packet::{Packet, PacketKind};
use crate::config::SimConfig;
use crate::sim::SimTime;

/// 一次发送的结局
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fate {
    Lost,
    Delivered {
        corrupt: bool,
        /// None 表示立即交付
        delay: Option<SimTime>,
    },
}

impl Fate {
    pub const CLEAN: Fate = Fate::Delivered {
        corrupt: false,
        delay: None,
    };
}

/// 故障决策源
pub trait FaultModel {
    fn decide(&mut self, pkt: &Packet, to: Endpoint) -> Fate;

    /// 本模型可能施加的最大延迟（不延迟时为 0）。
    fn max_delay(&self) -> SimTime;
}

/// 不注入任何故障。
#[derive(Debug, Default, Clone, Copy)]
pub struct Lossless;

impl FaultModel for Lossless {
    fn decide(&mut self, _pkt: &Packet, _to: Endpoint) -> Fate {
        Fate::CLEAN
    }

    fn max_delay(&self) -> SimTime {
        SimTime::ZERO
    }
}

/// 按概率独立采样：先判丢包（丢了就结束），再判损坏，最后判延迟。
#[derive(Debug, Clone)]
pub struct RandomFaults {
    prob_loss: f64,
    prob_corruption: f64,
    prob_delay: f64,
    max_delay: SimTime,
    rng: StdRng,
}

impl RandomFaults {
    pub fn new(
        prob_loss: f64,
        prob_corruption: f64,
        prob_delay: f64,
        max_delay: SimTime,
        seed: u64,
    ) -> Self {
        Self {
            prob_loss,
            prob_corruption,
            prob_delay,
            max_delay,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_config(cfg: &SimConfig) -> Self {
        Self::new(
            cfg.prob_loss,
            cfg.prob_corruption,
            cfg.prob_delay,
            cfg.max_delay(),
            cfg.seed,
        )
    }
}

impl FaultModel for RandomFaults {
    fn decide(&mut self, _pkt: &Packet, _to: Endpoint) -> Fate {
        if self.rng.random::<f64>() < self.prob_loss {
            return Fate::Lost;
        }
        let corrupt = self.rng.random::<f64>() < self.prob_corruption;
        let delay = if self.rng.random::<f64>() < self.prob_delay {
            Some(SimTime(self.rng.random_range(0..=self.max_delay.0)))
        } else {
            None
        };
        Fate::Delivered { corrupt, delay }
    }

    fn max_delay(&self) -> SimTime {
        if self.prob_delay > 0.0 {
            self.max_delay
        } else {
            SimTime::ZERO
        }
    }
}

/// 脚本化故障动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultAction {
    Drop,
    Corrupt,
    Delay(SimTime),
}

#[derive(Debug, Clone)]
struct FaultRule {
    kind: PacketKind,
    seq: u64,
    action: FaultAction,
    remaining: usize,
}

/// 确定性故障：命中规则的包按规则处理（每条规则只生效有限次），其余交给兜底模型。
pub struct ScriptedFaults {
    rules: Vec<FaultRule>,
    fallback: Box<dyn FaultModel>,
}

impl Default for ScriptedFaults {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedFaults {
    /// 兜底为无故障信道。
    pub fn new() -> Self {
        Self::with_fallback(Box::new(Lossless))
    }

    pub fn with_fallback(fallback: Box<dyn FaultModel>) -> Self {
        Self {
            rules: Vec::new(),
            fallback,
        }
    }

    pub fn rule(mut self, kind: PacketKind, seq: u64, action: FaultAction, times: usize) -> Self {
        self.rules.push(FaultRule {
            kind,
            seq,
            action,
            remaining: times,
        });
        self
    }

    /// 丢弃第一个序号为 `seq` 的 DATA 包。
    pub fn drop_data_once(self, seq: u64) -> Self {
        self.rule(PacketKind::Data, seq, FaultAction::Drop, 1)
    }

    /// 损坏第一个序号为 `seq` 的 DATA 包。
    pub fn corrupt_data_once(self, seq: u64) -> Self {
        self.rule(PacketKind::Data, seq, FaultAction::Corrupt, 1)
    }

    /// 丢弃第一个序号为 `seq` 的 ACK。
    pub fn drop_ack_once(self, seq: u64) -> Self {
        self.rule(PacketKind::Ack, seq, FaultAction::Drop, 1)
    }

    /// 损坏第一个序号为 `seq` 的 ACK。
    pub fn corrupt_ack_once(self, seq: u64) -> Self {
        self.rule(PacketKind::Ack, seq, FaultAction::Corrupt, 1)
    }

    /// 延迟第一个序号为 `seq` 的 DATA 包。
    pub fn delay_data_once(self, seq: u64, by: SimTime) -> Self {
        self.rule(PacketKind::Data, seq, FaultAction::Delay(by), 1)
    }
}

impl FaultModel for ScriptedFaults {
    fn decide(&mut self, pkt: &Packet, to: Endpoint) -> Fate {
        let hit = self
            .rules
            .iter_mut()
            .find(|r| r.remaining > 0 && r.kind == pkt.kind() && r.seq == pkt.seq());
        let Some(rule) = hit else {
            return self.fallback.decide(pkt, to);
        };
        rule.remaining -= 1;
        match rule.action {
            FaultAction::Drop => Fate::Lost,
            FaultAction::Corrupt => Fate::Delivered {
                corrupt: true,
                delay: None,
            },
            FaultAction::Delay(by) => Fate::Delivered {
                corrupt: false,
                delay: Some(by),
            },
        }
    }

    fn max_delay(&self) -> SimTime {
        let scripted = self
            .rules
            .iter()
            .filter_map(|r| match r.action {
                FaultAction::Delay(by) => Some(by),
                _ => None,
            })
            .max()
            .unwrap_or(SimTime::ZERO);
        scripted.max(self.fallback.max_delay())
    }
}
