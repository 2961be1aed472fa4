//! 不可靠信道
//!
//! 对每次发送询问故障模型，然后把（可能被损坏的）包按延迟调度为 `DeliverPacket`
//! 事件。信道本身从不复制包：每次未丢失的发送恰好产生一次交付。

use super::deliver_packet::DeliverPacket;
use super::endpoint::Endpoint;
use super::faults::{Fate, FaultModel};
use super::packet::Packet;
use crate::sim::{SimTime, Simulator};
use tracing::{debug, trace};

pub struct Channel {
    faults: Box<dyn FaultModel>,
}

impl Channel {
    pub fn new(faults: Box<dyn FaultModel>) -> Self {
        Self { faults }
    }

    /// 任何一次发送在信道中停留的最长时间
    pub fn max_delay(&self) -> SimTime {
        self.faults.max_delay()
    }

    /// 把 `pkt` 送往 `to`，返回本次发送的结局。
    #[tracing::instrument(level = "debug", skip(self, sim), fields(pkt = %pkt, to = ?to))]
    pub fn transmit(&mut self, pkt: Packet, to: Endpoint, sim: &mut Simulator) -> Fate {
        let fate = self.faults.decide(&pkt, to);
        match fate {
            Fate::Lost => {
                debug!("🕳️  信道丢包");
            }
            Fate::Delivered { corrupt, delay } => {
                let pkt = if corrupt {
                    debug!("⚡ 信道损坏数据包");
                    pkt.corrupted()
                } else {
                    pkt
                };
                let delay = delay.unwrap_or(SimTime::ZERO);
                trace!(delay = ?delay, "调度数据包到达事件");
                sim.schedule_in(delay, DeliverPacket { to, pkt });
            }
        }
        fate
    }
}
