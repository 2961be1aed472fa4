//! 数据包交付事件
//!
//! 信道把包交给某个端点处理。

use super::endpoint::Endpoint;
use super::packet::Packet;
use super::rdt_world::RdtWorld;
use crate::sim::{Event, Simulator, World};
use tracing::trace;

/// 事件：把一个 packet 交给某个端点处理。
#[derive(Debug)]
pub struct DeliverPacket {
    pub to: Endpoint,
    pub pkt: Packet,
}

impl Event for DeliverPacket {
    #[tracing::instrument(level = "debug", skip(self, sim, world), fields(to = ?self.to, seq = self.pkt.seq()))]
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let DeliverPacket { to, pkt } = *self;
        trace!(pkt = %pkt, now = ?sim.now(), "数据包到达端点");
        let Some(w) = world.as_any_mut().downcast_mut::<RdtWorld>() else {
            return;
        };
        w.on_packet(to, pkt, sim);
    }
}
