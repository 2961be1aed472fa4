mod config;
mod run;
mod timer;

use crate::net::{LinkApi, Packet, Stats};
use crate::proto::Protocol;
use crate::sim::{SimTime, Simulator, TimerId, TimerTable};
use crate::trace::{TraceEvent, TraceEventKind, TraceLog};

/// 不经过信道的 `LinkApi`：记录所有发送、定时器与交付，超时由测试手动触发。
pub(crate) struct RecordingLink {
    pub protocol: Protocol,
    /// 由 `LinkApi::max_delay` 报告；默认 0
    pub max_delay: SimTime,
    pub wakes: Vec<SimTime>,
    pub data: Vec<(Packet, bool)>,
    pub acks: Vec<Packet>,
    pub timers: TimerTable,
    pub cancelled: Vec<TimerId>,
    pub delivered: Vec<String>,
    pub trace: TraceLog,
    pub stats: Stats,
}

impl RecordingLink {
    pub fn new(protocol: Protocol) -> Self {
        Self {
            protocol,
            max_delay: SimTime::ZERO,
            wakes: Vec::new(),
            data: Vec::new(),
            acks: Vec::new(),
            timers: TimerTable::default(),
            cancelled: Vec::new(),
            delivered: Vec::new(),
            trace: TraceLog::default(),
            stats: Stats::default(),
        }
    }

    pub fn data_seqs(&self) -> Vec<u64> {
        self.data.iter().map(|(p, _)| p.seq()).collect()
    }

    pub fn ack_seqs(&self) -> Vec<u64> {
        self.acks.iter().map(Packet::seq).collect()
    }

    pub fn retransmitted_seqs(&self) -> Vec<u64> {
        self.data
            .iter()
            .filter(|(_, r)| *r)
            .map(|(p, _)| p.seq())
            .collect()
    }
}

impl LinkApi for RecordingLink {
    fn protocol(&self) -> Protocol {
        self.protocol
    }

    fn send_data(&mut self, pkt: Packet, retrans: bool, _sim: &mut Simulator) {
        self.data.push((pkt, retrans));
    }

    fn send_ack(&mut self, pkt: Packet, _sim: &mut Simulator) {
        self.acks.push(pkt);
    }

    fn start_timer(&mut self, seq: u64, _sim: &mut Simulator) -> TimerId {
        self.timers.arm(seq)
    }

    fn cancel_timer(&mut self, id: TimerId, _seq: u64, _now: SimTime) {
        if self.timers.cancel(id) {
            self.cancelled.push(id);
        }
    }

    fn max_delay(&self) -> SimTime {
        self.max_delay
    }

    fn wake_at(&mut self, at: SimTime, _sim: &mut Simulator) {
        self.wakes.push(at);
    }

    fn deliver(&mut self, _seq: u64, payload: String, _now: SimTime) {
        self.delivered.push(payload);
    }

    fn record(&mut self, now: SimTime, kind: TraceEventKind) {
        self.trace.push(TraceEvent {
            t_ns: now.0,
            protocol: self.protocol,
            kind,
        });
    }

    fn stats_mut(&mut self) -> &mut Stats {
        &mut self.stats
    }
}

pub(crate) fn payloads(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("DATA_{i}")).collect()
}
