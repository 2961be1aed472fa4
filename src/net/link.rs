//! 一次运行的"外部世界"
//!
//! 持有信道、定时器表、追踪日志、统计与应用层接收槽，是 `LinkApi` 的唯一实现。

use super::api::LinkApi;
use super::channel::Channel;
use super::endpoint::Endpoint;
use super::faults::Fate;
use super::packet::Packet;
use super::resume_send::ResumeSend;
use super::stats::Stats;
use super::timer_fired::TimerFired;
use crate::proto::Protocol;
use crate::sim::{SimTime, Simulator, TimerId, TimerTable};
use crate::trace::{TraceEvent, TraceEventKind, TraceLog};
use tracing::{debug, info};

pub struct Link {
    protocol: Protocol,
    channel: Channel,
    timeout: SimTime,
    pub timers: TimerTable,
    pub trace: TraceLog,
    pub stats: Stats,
    /// 应用层按序收到的载荷
    pub delivered: Vec<String>,
}

impl Link {
    pub fn new(protocol: Protocol, channel: Channel, timeout: SimTime) -> Self {
        Self {
            protocol,
            channel,
            timeout,
            timers: TimerTable::default(),
            trace: TraceLog::default(),
            stats: Stats::default(),
            delivered: Vec::new(),
        }
    }

    fn transmit(&mut self, pkt: Packet, to: Endpoint, sim: &mut Simulator) {
        let (pkt_kind, seq) = (pkt.kind(), pkt.seq());
        let now = sim.now();
        match self.channel.transmit(pkt, to, sim) {
            Fate::Lost => {
                self.stats.channel_drops += 1;
                self.record(now, TraceEventKind::ChannelDrop { pkt_kind, seq });
            }
            Fate::Delivered { corrupt, delay } => {
                if corrupt {
                    self.stats.channel_corruptions += 1;
                    self.record(now, TraceEventKind::ChannelCorrupt { pkt_kind, seq });
                }
                if let Some(d) = delay {
                    self.stats.channel_delays += 1;
                    self.record(
                        now,
                        TraceEventKind::ChannelDelay {
                            pkt_kind,
                            seq,
                            delay_ns: d.0,
                        },
                    );
                }
            }
        }
    }
}

impl LinkApi for Link {
    fn protocol(&self) -> Protocol {
        self.protocol
    }

    fn send_data(&mut self, pkt: Packet, retrans: bool, sim: &mut Simulator) {
        self.stats.data_sent += 1;
        if retrans {
            self.stats.data_retransmitted += 1;
        }
        self.record(
            sim.now(),
            TraceEventKind::DataSent {
                seq: pkt.seq(),
                checksum: pkt.checksum(),
                retrans,
            },
        );
        self.transmit(pkt, Endpoint::Receiver, sim);
    }

    fn send_ack(&mut self, pkt: Packet, sim: &mut Simulator) {
        self.stats.acks_sent += 1;
        self.record(
            sim.now(),
            TraceEventKind::AckSent {
                seq: pkt.seq(),
                checksum: pkt.checksum(),
            },
        );
        self.transmit(pkt, Endpoint::Sender, sim);
    }

    fn start_timer(&mut self, seq: u64, sim: &mut Simulator) -> TimerId {
        let expires_at = sim.now().saturating_add(self.timeout);
        let id = self.timers.arm(seq);
        sim.schedule(expires_at, TimerFired { id });
        debug!(timer = id.0, seq, expires_at = ?expires_at, "⏱️  启动定时器");
        self.record(
            sim.now(),
            TraceEventKind::TimerStarted {
                timer: id.0,
                seq,
                expires_ns: expires_at.0,
            },
        );
        id
    }

    fn cancel_timer(&mut self, id: TimerId, seq: u64, now: SimTime) {
        if self.timers.cancel(id) {
            debug!(timer = id.0, seq, "取消定时器");
            self.record(now, TraceEventKind::TimerCancelled { timer: id.0, seq });
        }
    }

    fn max_delay(&self) -> SimTime {
        self.channel.max_delay()
    }

    fn wake_at(&mut self, at: SimTime, sim: &mut Simulator) {
        debug!(at = ?at, "⏸️  等待旧副本离开信道");
        sim.schedule(at, ResumeSend);
    }

    fn deliver(&mut self, seq: u64, payload: String, now: SimTime) {
        info!(protocol = %self.protocol, seq, payload = %payload, "📬 交付给应用层");
        self.stats.delivered += 1;
        self.delivered.push(payload.clone());
        self.record(now, TraceEventKind::Delivered { seq, payload });
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
